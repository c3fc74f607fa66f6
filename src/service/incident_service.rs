use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::dto::incident_dto::{
    CreateIncidentRequest, DateRange, IncidentListQuery, IncidentListResponse, IncidentStats, StatsPeriod,
    UpdateStatusRequest,
};
use crate::model::camera::{Camera, Coordinates};
use crate::model::incident::{
    format_incident_id, AiDetection, Incident, IncidentLocation, IncidentResponse, IncidentStatus,
};
use crate::realtime::{IncidentEvent, RealtimeHub};
use crate::repository::camera_repo::CameraRepository;
use crate::repository::incident_repo::{IncidentFilter, IncidentPage, IncidentRepository, IncidentSortField};
use crate::repository::mongo::CounterRepository;
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;
use crate::util::response::{normalize_paging, page_skip, Pagination};
use crate::util::time;

pub const DEFAULT_MODEL_VERSION: &str = "1.2.3";
const INCIDENT_SEQUENCE: &str = "incident";

/// Allocates the next `INC-{millis}-{seq}` identifier
pub async fn allocate_incident_id(counters: &dyn CounterRepository, at: &DateTime<Utc>) -> Result<String, ServiceError> {
    let sequence = counters.next_sequence(INCIDENT_SEQUENCE).await?;
    Ok(format_incident_id(at.timestamp_millis(), sequence))
}

/// Place text used when the caller gives none
pub fn default_specific(camera: &Camera) -> String {
    format!("{} vicinity", camera.name)
}

/// Accepts either the document id or the `INC-...` identifier
pub async fn find_incident(repo: &dyn IncidentRepository, id: &str) -> Result<Incident, ServiceError> {
    let found = match ObjectId::parse_str(id) {
        Ok(oid) => repo.find_by_id(&oid).await?,
        Err(_) => repo.find_by_incident_id(id).await?,
    };
    found.ok_or_else(|| ServiceError::NotFound("Incident not found".to_string()))
}

/// `[start, end)` window covered by a stats period
pub fn period_window(period: StatsPeriod, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = now.date_naive().and_hms_opt(0, 0, 0).map(|n| n.and_utc()).unwrap_or(now);
    match period {
        StatsPeriod::Today => (midnight, midnight + Duration::days(1)),
        StatsPeriod::Week => (now - Duration::days(7), now),
        StatsPeriod::Month => {
            let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc())
                .unwrap_or(midnight);
            let (year, month) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
            let next = NaiveDate::from_ymd_opt(year, month, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc())
                .unwrap_or(now);
            (first, next)
        }
    }
}

/// Counts and mean resolution time over a set of incidents
pub fn summarize(
    period: StatsPeriod,
    incidents: &[Incident],
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> IncidentStats {
    let mut by_type = BTreeMap::new();
    let mut by_severity = BTreeMap::new();
    let mut by_status = BTreeMap::new();
    let mut response_minutes = Vec::new();

    for incident in incidents {
        *by_type.entry(incident.incident_type.as_str().to_string()).or_insert(0) += 1;
        *by_severity.entry(incident.severity.as_str().to_string()).or_insert(0) += 1;
        *by_status.entry(incident.status.as_str().to_string()).or_insert(0) += 1;
        if let (Some(created), Some(resolved)) = (&incident.created_at, &incident.response.resolved_at) {
            if let Some(minutes) = time::minutes_between(created, resolved) {
                response_minutes.push(minutes);
            }
        }
    }

    let average = if response_minutes.is_empty() {
        0.0
    } else {
        response_minutes.iter().sum::<f64>() / response_minutes.len() as f64
    };

    IncidentStats {
        period,
        total_incidents: incidents.len() as i64,
        by_type,
        by_severity,
        by_status,
        average_response_time: average.round() as i64,
        date_range: DateRange {
            start_date: time::format(start),
            end_date: time::format(end),
        },
    }
}

/// Applies a status change to `incident` in place. Closed incidents and moves
/// back to `detected` are rejected.
pub fn apply_status_change(
    incident: &mut Incident,
    request: &UpdateStatusRequest,
    actor: ObjectId,
    now: &str,
) -> Result<(), ServiceError> {
    if !incident.status.can_transition_to(request.status) {
        return Err(ServiceError::InvalidInput(format!(
            "Cannot change status from {} to {}",
            incident.status, request.status
        )));
    }

    incident.status = request.status;
    if request.status == IncidentStatus::InProgress && incident.response.assigned_to.is_none() {
        incident.response.assigned_to = Some(actor);
        incident.response.assigned_at = Some(now.to_string());
    }
    if request.status == IncidentStatus::Resolved {
        incident.response.resolved_by = Some(actor);
        incident.response.resolved_at = Some(now.to_string());
        if let Some(action) = request.action_taken.as_ref().filter(|a| !a.is_empty()) {
            incident.response.action_taken = Some(action.clone());
        }
    }
    if let Some(notes) = request.notes.as_ref().filter(|n| !n.is_empty()) {
        incident.response.notes = Some(notes.clone());
    }
    Ok(())
}

#[async_trait]
pub trait IncidentService: Send + Sync {
    async fn create_incident(&self, request: CreateIncidentRequest) -> Result<Incident, ServiceError>;
    async fn list_incidents(&self, query: IncidentListQuery) -> Result<IncidentListResponse, ServiceError>;
    async fn get_incident(&self, id: &str) -> Result<Incident, ServiceError>;
    async fn update_status(
        &self,
        id: &str,
        request: UpdateStatusRequest,
        actor: ObjectId,
    ) -> Result<Incident, ServiceError>;
    async fn assign_incident(&self, id: &str, assignee_id: &str, assigner: ObjectId) -> Result<Incident, ServiceError>;
    async fn get_stats(&self, period: StatsPeriod) -> Result<IncidentStats, ServiceError>;
}

pub struct IncidentServiceImpl {
    pub incident_repo: Arc<dyn IncidentRepository>,
    pub camera_repo: Arc<dyn CameraRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub counters: Arc<dyn CounterRepository>,
    pub hub: Arc<RealtimeHub>,
}

impl IncidentServiceImpl {
    pub fn new(
        incident_repo: Arc<dyn IncidentRepository>,
        camera_repo: Arc<dyn CameraRepository>,
        user_repo: Arc<dyn UserRepository>,
        counters: Arc<dyn CounterRepository>,
        hub: Arc<RealtimeHub>,
    ) -> Self {
        Self {
            incident_repo,
            camera_repo,
            user_repo,
            counters,
            hub,
        }
    }

    async fn build_filter(&self, query: &IncidentListQuery) -> Result<IncidentFilter, ServiceError> {
        let mut filter = IncidentFilter {
            types: query.incident_type.into_iter().collect(),
            severities: query.severity.into_iter().collect(),
            statuses: query.status.into_iter().collect(),
            zone: query.zone,
            ..Default::default()
        };
        if let Some(camera_id) = query.camera_id.as_deref().filter(|c| !c.is_empty()) {
            // unknown cameras fall back to the stored cameraId so the page is simply empty
            match self.camera_repo.find_by_camera_id(camera_id).await? {
                Some(camera) => filter.camera = camera.id,
                None => filter.camera_id = Some(camera_id.to_string()),
            }
        }
        if let Some(start) = &query.start_date {
            filter.created_from = Some(
                time::normalize(start).ok_or_else(|| ServiceError::InvalidInput("Invalid startDate".to_string()))?,
            );
        }
        if let Some(end) = &query.end_date {
            filter.created_to = Some(
                time::normalize(end).ok_or_else(|| ServiceError::InvalidInput("Invalid endDate".to_string()))?,
            );
        }
        Ok(filter)
    }
}

#[async_trait]
impl IncidentService for IncidentServiceImpl {
    #[instrument(skip(self, request), fields(camera_id = %request.camera_id, incident_type = %request.incident_type))]
    async fn create_incident(&self, request: CreateIncidentRequest) -> Result<Incident, ServiceError> {
        let camera = self
            .camera_repo
            .find_by_camera_id(&request.camera_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Camera not found".to_string()))?;
        let camera_oid = camera
            .id
            .ok_or_else(|| ServiceError::InternalError("Camera has no id".to_string()))?;

        let now = Utc::now();
        let now_str = time::format(&now);
        let location = request.location.unwrap_or_default();
        let bounding_box = request.ai_detection.bounding_box;
        let processed_at = request
            .ai_detection
            .processed_at
            .as_deref()
            .and_then(time::normalize)
            .unwrap_or_else(|| now_str.clone());

        let incident = Incident {
            id: None,
            incident_id: allocate_incident_id(self.counters.as_ref(), &now).await?,
            incident_type: request.incident_type,
            severity: request.severity,
            status: IncidentStatus::Detected,
            camera: camera_oid,
            camera_id: camera.camera_id.clone(),
            location: IncidentLocation {
                zone: location.zone.unwrap_or(camera.location.zone),
                specific: location
                    .specific
                    .filter(|s| !s.is_empty())
                    .or_else(|| camera.location.position.clone())
                    .or_else(|| Some(default_specific(&camera))),
                coordinates: location
                    .coordinates
                    .or_else(|| bounding_box.map(|b| Coordinates { x: b.x, y: b.y })),
            },
            description: request.description.trim().to_string(),
            ai_detection: Some(AiDetection {
                confidence: request.ai_detection.confidence,
                bounding_box,
                model_version: request
                    .ai_detection
                    .model_version
                    .unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string()),
                processed_at,
            }),
            evidence: request.evidence.unwrap_or_default(),
            response: IncidentResponse::default(),
            idempotency_key: None,
            version: 0,
            created_at: Some(now_str.clone()),
            updated_at: None,
        };

        let incident = self.incident_repo.insert(incident).await?;
        self.camera_repo.record_detection(&camera_oid, &now_str).await?;
        self.hub.broadcast_incident(IncidentEvent::NewIncident, &incident).await;
        info!(incident_id = %incident.incident_id, "New incident created");
        Ok(incident)
    }

    #[instrument(skip(self))]
    async fn list_incidents(&self, query: IncidentListQuery) -> Result<IncidentListResponse, ServiceError> {
        let (page, limit) = normalize_paging(query.page, query.limit, 20, 100);
        let sort_by = match query.sort_by.as_deref() {
            None => IncidentSortField::CreatedAt,
            Some(field) => IncidentSortField::parse(field)
                .ok_or_else(|| ServiceError::InvalidInput(format!("Cannot sort by {}", field)))?,
        };
        let descending = query.sort_order.as_deref() != Some("asc");
        let filter = self.build_filter(&query).await?;

        let incidents = self
            .incident_repo
            .list(
                &filter,
                IncidentPage {
                    skip: page_skip(page, limit),
                    limit: limit as i64,
                    sort_by,
                    descending,
                },
            )
            .await?;
        let total = self.incident_repo.count(&filter).await?;
        Ok(IncidentListResponse {
            incidents,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn get_incident(&self, id: &str) -> Result<Incident, ServiceError> {
        find_incident(self.incident_repo.as_ref(), id).await
    }

    #[instrument(skip(self, request), fields(status = %request.status))]
    async fn update_status(
        &self,
        id: &str,
        request: UpdateStatusRequest,
        actor: ObjectId,
    ) -> Result<Incident, ServiceError> {
        let mut incident = find_incident(self.incident_repo.as_ref(), id).await?;
        if let Some(expected) = request.expected_version {
            if expected != incident.version {
                warn!(expected, current = incident.version, "Stale incident update rejected");
                return Err(ServiceError::Conflict(format!(
                    "Incident was modified (version {}, expected {})",
                    incident.version, expected
                )));
            }
        }

        apply_status_change(&mut incident, &request, actor, &time::now())?;
        let incident = self.incident_repo.update_versioned(incident).await?;
        self.hub.broadcast_incident(IncidentEvent::IncidentUpdated, &incident).await;
        info!(incident_id = %incident.incident_id, user = %actor, "Incident status updated");
        Ok(incident)
    }

    #[instrument(skip(self))]
    async fn assign_incident(&self, id: &str, assignee_id: &str, assigner: ObjectId) -> Result<Incident, ServiceError> {
        let assignee_oid =
            ObjectId::parse_str(assignee_id).map_err(|_| ServiceError::NotFound("Assignee not found".to_string()))?;
        let assignee = self
            .user_repo
            .find_by_id(&assignee_oid)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Assignee not found".to_string()))?;

        let mut incident = find_incident(self.incident_repo.as_ref(), id).await?;
        if incident.status.is_closed() {
            return Err(ServiceError::InvalidInput(format!(
                "Cannot assign a {} incident",
                incident.status
            )));
        }
        incident.status = IncidentStatus::InProgress;
        incident.response.assigned_to = Some(assignee_oid);
        incident.response.assigned_at = Some(time::now());

        let incident = self.incident_repo.update_versioned(incident).await?;
        self.hub.broadcast_incident(IncidentEvent::IncidentAssigned, &incident).await;
        info!(
            incident_id = %incident.incident_id,
            assignee = %assignee.username,
            assigner = %assigner,
            "Incident assigned"
        );
        Ok(incident)
    }

    async fn get_stats(&self, period: StatsPeriod) -> Result<IncidentStats, ServiceError> {
        let (start, end) = period_window(period, Utc::now());
        let filter = IncidentFilter {
            created_from: Some(time::format(&start)),
            ..Default::default()
        };
        let end_str = time::format(&end);
        let incidents: Vec<Incident> = self
            .incident_repo
            .find_all(&filter)
            .await?
            .into_iter()
            .filter(|i| i.created_at.as_deref().is_some_and(|c| c < end_str.as_str()))
            .collect();
        Ok(summarize(period, &incidents, &start, &end))
    }
}
