use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use tracing::{error, info, instrument};

use crate::model::report::{Report, ReportType};
use crate::repository::mongo::{create_index, unique};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::time;

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub report_type: Option<ReportType>,
    /// Reports whose period starts at or after this instant
    pub start_from: Option<String>,
    /// Reports whose period ends at or before this instant
    pub end_to: Option<String>,
}

impl ReportFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(report_type) = self.report_type {
            filter.insert("type", report_type.as_str());
        }
        if let Some(from) = &self.start_from {
            filter.insert("period.startDate", doc! { "$gte": from.as_str() });
        }
        if let Some(to) = &self.end_to {
            filter.insert("period.endDate", doc! { "$lte": to.as_str() });
        }
        filter
    }
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn insert(&self, report: Report) -> RepositoryResult<Report>;
    async fn find_by_report_id(&self, report_id: &str) -> RepositoryResult<Option<Report>>;
    /// Newest first
    async fn list(&self, filter: &ReportFilter, skip: u64, limit: i64) -> RepositoryResult<Vec<Report>>;
    async fn count(&self, filter: &ReportFilter) -> RepositoryResult<u64>;
    async fn update(&self, report: Report) -> RepositoryResult<Report>;
}

pub struct MongoReportRepository {
    collection: Collection<Report>,
}

impl MongoReportRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Report>("reports"),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_index(&self.collection, doc! { "reportId": 1 }, unique()).await?;
        create_index(&self.collection, doc! { "type": 1, "createdAt": -1 }, None).await
    }
}

#[async_trait]
impl ReportRepository for MongoReportRepository {
    #[instrument(skip(self, report), fields(report_id = %report.report_id))]
    async fn insert(&self, mut report: Report) -> RepositoryResult<Report> {
        report.id = Some(ObjectId::new());
        let now = time::now();
        report.created_at = Some(now.clone());
        report.updated_at = Some(now);
        self.collection.insert_one(&report, None).await.map_err(|e| {
            error!("Failed to insert report: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Report stored");
        Ok(report)
    }

    async fn find_by_report_id(&self, report_id: &str) -> RepositoryResult<Option<Report>> {
        self.collection
            .find_one(doc! { "reportId": report_id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find report: {}", e)))
    }

    async fn list(&self, filter: &ReportFilter, skip: u64, limit: i64) -> RepositoryResult<Vec<Report>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(skip)
            .limit(limit)
            // embedded incident rows are only needed for download
            .projection(doc! { "incidents": 0 })
            .build();
        let cursor = self
            .collection
            .find(filter.to_document(), options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list reports: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::serialization(format!("Failed to read reports: {}", e)))
    }

    async fn count(&self, filter: &ReportFilter) -> RepositoryResult<u64> {
        self.collection
            .count_documents(filter.to_document(), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to count reports: {}", e)))
    }

    #[instrument(skip(self, report), fields(report_id = %report.report_id))]
    async fn update(&self, mut report: Report) -> RepositoryResult<Report> {
        let id = report
            .id
            .ok_or_else(|| RepositoryError::validation("Report has no id"))?;
        report.updated_at = Some(time::now());
        let mut fields = bson::to_document(&report)?;
        fields.remove("_id");
        fields.remove("createdAt");

        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to update report: {}", e)))?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("Report not found: {}", report.report_id)));
        }
        Ok(report)
    }
}
