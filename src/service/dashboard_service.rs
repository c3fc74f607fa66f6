use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;

use crate::dto::dashboard_dto::{
    CameraPerformance, CameraPerformanceResponse, CameraPerformanceSummary, DashboardResponse, SystemHealth,
};
use crate::model::camera::{Camera, CameraStatus};
use crate::model::incident::{Incident, IncidentStatus, Severity};
use crate::realtime::events::LiveData;
use crate::realtime::RealtimeHub;
use crate::repository::camera_repo::{CameraFilter, CameraRepository};
use crate::repository::incident_repo::{IncidentFilter, IncidentPage, IncidentRepository, IncidentSortField};
use crate::service::detection_service::time_range_days;
use crate::util::error::ServiceError;
use crate::util::time;

const CRITICAL_LIMIT: i64 = 5;

fn online_cameras(by_status: &BTreeMap<String, i64>) -> i64 {
    by_status.get(CameraStatus::Online.as_str()).copied().unwrap_or(0)
}

/// "operational" when every camera is online, "degraded" otherwise
pub fn system_status(online: i64, total: i64) -> &'static str {
    if online == total {
        "operational"
    } else {
        "degraded"
    }
}

/// Per-camera incident count and accuracy, sorted by cameraId.
/// False positives count as detections but not towards accuracy.
pub fn camera_performance(cameras: &[Camera], incidents: &[Incident]) -> (Vec<CameraPerformance>, CameraPerformanceSummary) {
    let mut by_camera: HashMap<ObjectId, Vec<&Incident>> = HashMap::new();
    for incident in incidents {
        by_camera.entry(incident.camera).or_default().push(incident);
    }

    let mut rows: Vec<CameraPerformance> = cameras
        .iter()
        .map(|camera| {
            let recent = camera.id.and_then(|id| by_camera.get(&id)).map(Vec::as_slice).unwrap_or(&[]);
            let detection_count = recent.len() as i64;
            let confirmed = recent.iter().filter(|i| i.status != IncidentStatus::FalsePositive).count() as i64;
            let accuracy = if detection_count > 0 {
                confirmed as f64 / detection_count as f64 * 100.0
            } else {
                100.0
            };
            CameraPerformance {
                camera_id: camera.camera_id.clone(),
                name: camera.name.clone(),
                location: camera.location.clone(),
                status: camera.status,
                uptime: camera.statistics.uptime,
                detection_count,
                accuracy,
                last_activity: recent.iter().filter_map(|i| i.created_at.clone()).max(),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));

    let summary = CameraPerformanceSummary {
        total_cameras: rows.len(),
        average_accuracy: if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.accuracy).sum::<f64>() / rows.len() as f64
        },
        total_detections: rows.iter().map(|r| r.detection_count).sum(),
    };
    (rows, summary)
}

#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn dashboard(&self) -> Result<DashboardResponse, ServiceError>;
    async fn live_data(&self) -> Result<LiveData, ServiceError>;
    async fn camera_performance(&self, time_range: Option<String>) -> Result<CameraPerformanceResponse, ServiceError>;
}

pub struct DashboardServiceImpl {
    pub camera_repo: Arc<dyn CameraRepository>,
    pub incident_repo: Arc<dyn IncidentRepository>,
    pub hub: Arc<RealtimeHub>,
}

impl DashboardServiceImpl {
    pub fn new(
        camera_repo: Arc<dyn CameraRepository>,
        incident_repo: Arc<dyn IncidentRepository>,
        hub: Arc<RealtimeHub>,
    ) -> Self {
        Self {
            camera_repo,
            incident_repo,
            hub,
        }
    }
}

#[async_trait]
impl DashboardService for DashboardServiceImpl {
    async fn dashboard(&self) -> Result<DashboardResponse, ServiceError> {
        let now = Utc::now();
        let midnight = now.date_naive().and_hms_opt(0, 0, 0).map(|d| d.and_utc()).unwrap_or(now);
        let today = self
            .incident_repo
            .find_all(&IncidentFilter {
                created_from: Some(time::format(&midnight)),
                ..Default::default()
            })
            .await?;
        let mut incident_summary = BTreeMap::new();
        for incident in &today {
            *incident_summary.entry(incident.status.as_str().to_string()).or_insert(0) += 1;
        }

        let camera_status = self.camera_repo.count_by_status().await?;
        let total_cameras: i64 = camera_status.values().sum();

        let critical_incidents = self
            .incident_repo
            .list(
                &IncidentFilter {
                    severities: vec![Severity::High, Severity::Critical],
                    statuses: vec![IncidentStatus::Detected, IncidentStatus::Pending],
                    ..Default::default()
                },
                IncidentPage {
                    skip: 0,
                    limit: CRITICAL_LIMIT,
                    sort_by: IncidentSortField::CreatedAt,
                    descending: true,
                },
            )
            .await?;

        let system_health = SystemHealth {
            ai_processing_engine: "online".to_string(),
            database_connection: "online".to_string(),
            camera_network: format!("{}/{}", online_cameras(&camera_status), total_cameras),
            connected_clients: self.hub.connection_count().await,
            last_update: time::now(),
        };

        Ok(DashboardResponse {
            incident_summary,
            camera_status,
            critical_incidents,
            system_health,
        })
    }

    async fn live_data(&self) -> Result<LiveData, ServiceError> {
        let by_status = self.camera_repo.count_by_status().await?;
        let active_cameras = online_cameras(&by_status);
        let total_cameras: i64 = by_status.values().sum();
        let pending_incidents = self
            .incident_repo
            .count(&IncidentFilter {
                statuses: vec![IncidentStatus::Detected, IncidentStatus::Pending],
                ..Default::default()
            })
            .await?;

        Ok(LiveData {
            timestamp: time::now(),
            system_status: system_status(active_cameras, total_cameras).to_string(),
            active_cameras,
            total_cameras,
            pending_incidents,
        })
    }

    #[instrument(skip(self))]
    async fn camera_performance(&self, time_range: Option<String>) -> Result<CameraPerformanceResponse, ServiceError> {
        let time_range = time_range
            .filter(|r| time_range_days(r).is_some())
            .unwrap_or_else(|| "7d".to_string());
        let days = time_range_days(&time_range).unwrap_or(7);

        let camera_filter = CameraFilter::default();
        let total = self.camera_repo.count(&camera_filter).await?;
        let cameras = self.camera_repo.list(&camera_filter, 0, total.max(1) as i64).await?;
        let incidents = self
            .incident_repo
            .find_all(&IncidentFilter {
                created_from: Some(time::format(&(Utc::now() - Duration::days(days)))),
                ..Default::default()
            })
            .await?;

        let (cameras, summary) = camera_performance(&cameras, &incidents);
        Ok(CameraPerformanceResponse {
            time_range,
            cameras,
            summary,
        })
    }
}
