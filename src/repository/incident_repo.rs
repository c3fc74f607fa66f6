use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database};
use tracing::{error, info, instrument, warn};

use crate::model::camera::Zone;
use crate::model::incident::{Incident, IncidentStatus, IncidentType, Severity};
use crate::repository::mongo::{create_index, unique};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::time;

/// Query over incidents. Empty vectors and `None` mean "any".
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub types: Vec<IncidentType>,
    pub severities: Vec<Severity>,
    pub statuses: Vec<IncidentStatus>,
    pub camera: Option<ObjectId>,
    pub camera_id: Option<String>,
    pub zone: Option<Zone>,
    /// Inclusive lower bound on createdAt (RFC 3339)
    pub created_from: Option<String>,
    /// Inclusive upper bound on createdAt (RFC 3339)
    pub created_to: Option<String>,
}

impl IncidentFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if !self.types.is_empty() {
            let types: Vec<&str> = self.types.iter().map(|t| t.as_str()).collect();
            filter.insert("type", doc! { "$in": types });
        }
        if !self.severities.is_empty() {
            let severities: Vec<&str> = self.severities.iter().map(|s| s.as_str()).collect();
            filter.insert("severity", doc! { "$in": severities });
        }
        if !self.statuses.is_empty() {
            let statuses: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
            filter.insert("status", doc! { "$in": statuses });
        }
        if let Some(camera) = self.camera {
            filter.insert("camera", camera);
        }
        if let Some(camera_id) = &self.camera_id {
            filter.insert("cameraId", camera_id.to_uppercase());
        }
        if let Some(zone) = self.zone {
            filter.insert("location.zone", zone.as_str());
        }
        let mut created = Document::new();
        if let Some(from) = &self.created_from {
            created.insert("$gte", from.as_str());
        }
        if let Some(to) = &self.created_to {
            created.insert("$lte", to.as_str());
        }
        if !created.is_empty() {
            filter.insert("createdAt", created);
        }
        filter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncidentSortField {
    #[default]
    CreatedAt,
    Severity,
    Status,
    Type,
}

impl IncidentSortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt" | "timestamp" => Some(Self::CreatedAt),
            "severity" => Some(Self::Severity),
            "status" => Some(Self::Status),
            "type" => Some(Self::Type),
            _ => None,
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Severity => "severity",
            Self::Status => "status",
            Self::Type => "type",
        }
    }
}

/// Aggregation for a page sorted by severity rank rather than by the stored string
pub fn severity_sort_pipeline(filter: Document, page: &IncidentPage) -> Vec<Document> {
    let ranks: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
    let direction = if page.descending { -1 } else { 1 };
    vec![
        doc! { "$match": filter },
        doc! { "$addFields": { "severityRank": { "$indexOfArray": [ranks, "$severity"] } } },
        doc! { "$sort": { "severityRank": direction, "createdAt": -1 } },
        doc! { "$skip": page.skip as i64 },
        doc! { "$limit": page.limit },
        doc! { "$project": { "severityRank": 0 } },
    ]
}

#[derive(Debug, Clone, Copy)]
pub struct IncidentPage {
    pub skip: u64,
    pub limit: i64,
    pub sort_by: IncidentSortField,
    pub descending: bool,
}

#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the idempotency key was seen before
    async fn insert(&self, incident: Incident) -> RepositoryResult<Incident>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Incident>>;
    async fn find_by_incident_id(&self, incident_id: &str) -> RepositoryResult<Option<Incident>>;
    async fn find_by_idempotency_key(&self, key: &str) -> RepositoryResult<Option<Incident>>;
    async fn list(&self, filter: &IncidentFilter, page: IncidentPage) -> RepositoryResult<Vec<Incident>>;
    /// Every match, newest first
    async fn find_all(&self, filter: &IncidentFilter) -> RepositoryResult<Vec<Incident>>;
    async fn count(&self, filter: &IncidentFilter) -> RepositoryResult<u64>;
    /// Compare-and-swap on `version`: writes only when the stored version equals
    /// `incident.version`, and returns the document with the version bumped.
    async fn update_versioned(&self, incident: Incident) -> RepositoryResult<Incident>;
}

pub struct MongoIncidentRepository {
    collection: Collection<Incident>,
}

impl MongoIncidentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Incident>("incidents"),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_index(&self.collection, doc! { "incidentId": 1 }, unique()).await?;
        create_index(
            &self.collection,
            doc! { "idempotencyKey": 1 },
            Some(IndexOptions::builder().unique(true).sparse(true).build()),
        )
        .await?;
        create_index(&self.collection, doc! { "createdAt": -1 }, None).await?;
        create_index(&self.collection, doc! { "cameraId": 1, "createdAt": -1 }, None).await?;
        create_index(&self.collection, doc! { "status": 1, "severity": 1 }, None).await
    }

    async fn find_one(&self, filter: Document) -> RepositoryResult<Option<Incident>> {
        self.collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find incident: {}", e)))
    }

    async fn collect(&self, filter: Document, options: FindOptions) -> RepositoryResult<Vec<Incident>> {
        let cursor = self
            .collection
            .find(filter, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list incidents: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read incidents: {}", e)))
    }
}

#[async_trait]
impl IncidentRepository for MongoIncidentRepository {
    #[instrument(skip(self, incident), fields(incident_id = %incident.incident_id, severity = %incident.severity))]
    async fn insert(&self, mut incident: Incident) -> RepositoryResult<Incident> {
        incident.id = Some(ObjectId::new());
        incident.version = 0;
        let now = time::now();
        incident.created_at.get_or_insert_with(|| now.clone());
        incident.updated_at = Some(now);

        match self.collection.insert_one(&incident, None).await {
            Ok(_) => {
                info!("Incident created");
                Ok(incident)
            }
            Err(e) if RepositoryError::is_duplicate_key(&e) => {
                warn!("Duplicate incident insert rejected: {}", e);
                Err(RepositoryError::already_exists(format!("Incident already exists: {}", e)))
            }
            Err(e) => {
                error!("Failed to insert incident: {}", e);
                Err(RepositoryError::database(format!("Failed to insert incident: {}", e)))
            }
        }
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Incident>> {
        self.find_one(doc! { "_id": id }).await
    }

    async fn find_by_incident_id(&self, incident_id: &str) -> RepositoryResult<Option<Incident>> {
        self.find_one(doc! { "incidentId": incident_id }).await
    }

    async fn find_by_idempotency_key(&self, key: &str) -> RepositoryResult<Option<Incident>> {
        self.find_one(doc! { "idempotencyKey": key }).await
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &IncidentFilter, page: IncidentPage) -> RepositoryResult<Vec<Incident>> {
        if page.sort_by == IncidentSortField::Severity {
            let cursor = self
                .collection
                .aggregate(severity_sort_pipeline(filter.to_document(), &page), None)
                .await
                .map_err(|e| RepositoryError::database(format!("Failed to list incidents: {}", e)))?;
            let documents: Vec<Document> = cursor
                .try_collect()
                .await
                .map_err(|e| RepositoryError::database(format!("Failed to read incidents: {}", e)))?;
            return documents
                .into_iter()
                .map(|d| bson::from_document(d).map_err(RepositoryError::from))
                .collect();
        }

        let direction = if page.descending { -1 } else { 1 };
        let mut sort = doc! { page.sort_by.field_name(): direction };
        if page.sort_by != IncidentSortField::CreatedAt {
            sort.insert("createdAt", -1);
        }
        let options = FindOptions::builder()
            .sort(sort)
            .skip(page.skip)
            .limit(page.limit)
            .build();
        self.collect(filter.to_document(), options).await
    }

    async fn find_all(&self, filter: &IncidentFilter) -> RepositoryResult<Vec<Incident>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        self.collect(filter.to_document(), options).await
    }

    async fn count(&self, filter: &IncidentFilter) -> RepositoryResult<u64> {
        self.collection
            .count_documents(filter.to_document(), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to count incidents: {}", e)))
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.incident_id, version = incident.version))]
    async fn update_versioned(&self, mut incident: Incident) -> RepositoryResult<Incident> {
        let id = incident
            .id
            .ok_or_else(|| RepositoryError::validation("Incident has no id"))?;
        let expected = incident.version;
        incident.version = expected + 1;
        incident.updated_at = Some(time::now());

        let mut fields = bson::to_document(&incident)?;
        fields.remove("_id");
        fields.remove("createdAt");
        fields.remove("incidentId");

        let result = self
            .collection
            .update_one(doc! { "_id": id, "version": expected }, doc! { "$set": fields }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to update incident: {}", e)))?;

        if result.matched_count == 0 {
            return match self.find_by_id(&id).await? {
                Some(current) => {
                    warn!(current = current.version, expected, "Incident version mismatch");
                    Err(RepositoryError::conflict(format!(
                        "Incident {} was modified concurrently (version {}, expected {})",
                        incident.incident_id, current.version, expected
                    )))
                }
                None => Err(RepositoryError::not_found(format!("Incident not found: {}", id))),
            };
        }
        Ok(incident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_to_document() {
        let filter = IncidentFilter {
            severities: vec![Severity::High, Severity::Critical],
            camera_id: Some("cam-01".to_string()),
            created_from: Some("2026-01-01T00:00:00.000Z".to_string()),
            ..Default::default()
        };
        assert_eq!(
            filter.to_document(),
            doc! {
                "severity": { "$in": ["high", "critical"] },
                "cameraId": "CAM-01",
                "createdAt": { "$gte": "2026-01-01T00:00:00.000Z" },
            }
        );
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!(IncidentSortField::parse("timestamp"), Some(IncidentSortField::CreatedAt));
        assert_eq!(IncidentSortField::parse("severity"), Some(IncidentSortField::Severity));
        assert_eq!(IncidentSortField::parse("password"), None);
    }

    #[test]
    fn test_severity_sort_uses_rank() {
        let page = IncidentPage {
            skip: 40,
            limit: 20,
            sort_by: IncidentSortField::Severity,
            descending: true,
        };
        let pipeline = severity_sort_pipeline(doc! { "status": "pending" }, &page);
        assert_eq!(pipeline[0], doc! { "$match": { "status": "pending" } });
        assert_eq!(
            pipeline[1],
            doc! { "$addFields": { "severityRank": { "$indexOfArray": [["low", "medium", "high", "critical"], "$severity"] } } }
        );
        assert_eq!(pipeline[2], doc! { "$sort": { "severityRank": -1, "createdAt": -1 } });
        assert_eq!(pipeline[3], doc! { "$skip": 40_i64 });
        assert_eq!(pipeline[4], doc! { "$limit": 20_i64 });
    }
}
