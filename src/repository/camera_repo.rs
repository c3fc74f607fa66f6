use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

use crate::dto::camera_dto::AiConfigPatch;
use crate::model::camera::{Camera, CameraStatus, UploadedVideo, Zone};
use crate::repository::mongo::{create_index, unique};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::time;

#[derive(Debug, Clone, Default)]
pub struct CameraFilter {
    pub zone: Option<Zone>,
    pub status: Option<CameraStatus>,
}

impl CameraFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(zone) = self.zone {
            filter.insert("location.zone", zone.as_str());
        }
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        filter
    }
}

#[async_trait]
pub trait CameraRepository: Send + Sync {
    async fn insert(&self, camera: Camera) -> RepositoryResult<Camera>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Camera>>;
    async fn find_by_camera_id(&self, camera_id: &str) -> RepositoryResult<Option<Camera>>;
    /// Sorted by cameraId
    async fn list(&self, filter: &CameraFilter, skip: u64, limit: i64) -> RepositoryResult<Vec<Camera>>;
    async fn count(&self, filter: &CameraFilter) -> RepositoryResult<u64>;
    async fn count_by_status(&self) -> RepositoryResult<BTreeMap<String, i64>>;
    async fn update(&self, camera: Camera) -> RepositoryResult<Camera>;
    /// Atomic `$inc` of the detection counter plus the last detection time
    async fn record_detection(&self, id: &ObjectId, detected_at: &str) -> RepositoryResult<()>;
    async fn push_video(&self, id: &ObjectId, video: UploadedVideo) -> RepositoryResult<()>;
    /// Sets the fields present in `patch` on one camera, or every camera when `camera_id`
    /// is None. Returns the match count.
    async fn set_ai_config(&self, camera_id: Option<&str>, patch: &AiConfigPatch) -> RepositoryResult<u64>;
}

pub struct MongoCameraRepository {
    collection: Collection<Camera>,
}

impl MongoCameraRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Camera>("cameras"),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_index(&self.collection, doc! { "cameraId": 1 }, unique()).await?;
        create_index(&self.collection, doc! { "location.zone": 1, "status": 1 }, None).await
    }
}

#[async_trait]
impl CameraRepository for MongoCameraRepository {
    #[instrument(skip(self, camera), fields(camera_id = %camera.camera_id))]
    async fn insert(&self, mut camera: Camera) -> RepositoryResult<Camera> {
        camera.id = Some(ObjectId::new());
        let now = time::now();
        camera.created_at = Some(now.clone());
        camera.updated_at = Some(now);
        self.collection.insert_one(&camera, None).await.map_err(|e| {
            error!("Failed to insert camera: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Camera created");
        Ok(camera)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Camera>> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find camera: {}", e)))
    }

    async fn find_by_camera_id(&self, camera_id: &str) -> RepositoryResult<Option<Camera>> {
        self.collection
            .find_one(doc! { "cameraId": camera_id.trim().to_uppercase() }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find camera: {}", e)))
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &CameraFilter, skip: u64, limit: i64) -> RepositoryResult<Vec<Camera>> {
        let options = FindOptions::builder()
            .sort(doc! { "cameraId": 1 })
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(filter.to_document(), options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list cameras: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read cameras: {}", e)))
    }

    async fn count(&self, filter: &CameraFilter) -> RepositoryResult<u64> {
        self.collection
            .count_documents(filter.to_document(), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to count cameras: {}", e)))
    }

    async fn count_by_status(&self) -> RepositoryResult<BTreeMap<String, i64>> {
        let pipeline = vec![doc! { "$group": { "_id": "$status", "count": { "$sum": 1 } } }];
        let cursor = self
            .collection
            .aggregate(pipeline, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to group cameras: {}", e)))?;
        let groups: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read camera groups: {}", e)))?;

        let mut counts = BTreeMap::new();
        for group in groups {
            if let Ok(status) = group.get_str("_id") {
                let count = group.get_i32("count").map(i64::from).unwrap_or(0);
                counts.insert(status.to_string(), count);
            }
        }
        Ok(counts)
    }

    #[instrument(skip(self, camera), fields(camera_id = %camera.camera_id))]
    async fn update(&self, mut camera: Camera) -> RepositoryResult<Camera> {
        let id = camera
            .id
            .ok_or_else(|| RepositoryError::validation("Camera has no id"))?;
        camera.updated_at = Some(time::now());

        let mut fields = bson::to_document(&camera)?;
        fields.remove("_id");
        fields.remove("createdAt");
        // counters and videos are only changed through their own atomic operators
        fields.remove("statistics");
        fields.remove("uploadedVideos");

        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await
            .map_err(RepositoryError::from)?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("Camera not found: {}", id)));
        }
        Ok(camera)
    }

    async fn record_detection(&self, id: &ObjectId, detected_at: &str) -> RepositoryResult<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$inc": { "statistics.totalDetections": 1_i64 },
                    "$set": { "statistics.lastDetection": detected_at },
                },
                None,
            )
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to record detection: {}", e)))?;
        Ok(())
    }

    #[instrument(skip(self, video), fields(object_key = %video.object_key))]
    async fn push_video(&self, id: &ObjectId, video: UploadedVideo) -> RepositoryResult<()> {
        let video = bson::to_bson(&video)?;
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "uploadedVideos": video }, "$set": { "updatedAt": time::now() } },
                None,
            )
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to save video metadata: {}", e)))?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("Camera not found: {}", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn set_ai_config(&self, camera_id: Option<&str>, patch: &AiConfigPatch) -> RepositoryResult<u64> {
        let filter = match camera_id {
            Some(camera_id) => doc! { "cameraId": camera_id.trim().to_uppercase() },
            None => Document::new(),
        };
        let mut fields = doc! { "updatedAt": time::now() };
        for (key, value) in bson::to_document(patch)? {
            if value != Bson::Null {
                fields.insert(format!("aiConfig.{}", key), value);
            }
        }
        let update = doc! { "$set": fields };
        let result = self
            .collection
            .update_many(filter, update, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to update AI config: {}", e)))?;
        Ok(result.matched_count)
    }
}
