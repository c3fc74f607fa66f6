use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::dto::camera_dto::{AiConfigUpdateRequest, AiConfigUpdateResponse};
use crate::dto::detection_dto::{
    DailyDetections, DetectionData, DetectionPayload, DetectionResponse, DetectionStatsResponse, DetectionSummary, TypeDetections,
    ValidDetection,
};
use crate::model::camera::Coordinates;
use crate::model::incident::{
    AiDetection, Incident, IncidentLocation, IncidentResponse, IncidentStatus, IncidentType, Severity,
};
use crate::realtime::{IncidentEvent, RealtimeHub};
use crate::repository::camera_repo::CameraRepository;
use crate::repository::incident_repo::{IncidentFilter, IncidentRepository};
use crate::repository::mongo::CounterRepository;
use crate::repository::repository_error::RepositoryError;
use crate::service::incident_service::{allocate_incident_id, default_specific, DEFAULT_MODEL_VERSION};
use crate::util::error::{FieldError, ServiceError};
use crate::util::time;

/// Checks the webhook body and collects one error per problem
pub fn validate_detection(payload: DetectionPayload) -> Result<ValidDetection, Vec<FieldError>> {
    let mut errors = Vec::new();

    let camera_id = payload.camera_id.filter(|c| !c.trim().is_empty());
    if camera_id.is_none() {
        errors.push(FieldError::new("cameraId", "Camera ID is required"));
    }
    let detection = payload.detection.unwrap_or_default();
    if payload_missing_detection(&detection) {
        errors.push(FieldError::new("detection", "Detection data is required"));
    }

    let incident_type = match detection.detection_type.as_deref().filter(|t| !t.is_empty()) {
        None => {
            errors.push(FieldError::new("detection.type", "Detection type is required"));
            None
        }
        Some(raw) => match raw.parse::<IncidentType>() {
            Ok(t) => Some(t),
            Err(message) => {
                errors.push(FieldError::new("detection.type", &message));
                None
            }
        },
    };

    let confidence = match detection.confidence {
        None => {
            errors.push(FieldError::new("detection.confidence", "Confidence score is required"));
            None
        }
        Some(c) if !(0.0..=1.0).contains(&c) => {
            errors.push(FieldError::new("detection.confidence", "Confidence must be between 0 and 1"));
            None
        }
        Some(c) => Some(c),
    };

    let timestamp = match payload.timestamp.as_deref().filter(|t| !t.is_empty()) {
        None => {
            errors.push(FieldError::new("timestamp", "Timestamp is required"));
            None
        }
        Some(raw) => {
            let normalized = time::normalize(raw);
            if normalized.is_none() {
                errors.push(FieldError::new("timestamp", "Timestamp must be a valid date"));
            }
            normalized
        }
    };

    match (camera_id, incident_type, confidence, timestamp) {
        (Some(camera_id), Some(incident_type), Some(confidence), Some(timestamp)) if errors.is_empty() => {
            Ok(ValidDetection {
                camera_id,
                incident_type,
                confidence,
                bounding_box: detection.bounding_box,
                model_version: detection.model_version,
                timestamp,
                location: payload.location,
                evidence: payload.evidence,
                idempotency_key: payload.idempotency_key.filter(|k| !k.is_empty()),
            })
        }
        _ => Err(errors),
    }
}

fn payload_missing_detection(detection: &DetectionData) -> bool {
    detection.detection_type.is_none()
        && detection.confidence.is_none()
        && detection.bounding_box.is_none()
        && detection.model_version.is_none()
}

/// `weight(type) * confidence`
pub fn score(incident_type: IncidentType, confidence: f64) -> f64 {
    incident_type.weight() * confidence
}

pub fn severity_for(incident_type: IncidentType, confidence: f64) -> Severity {
    Severity::from_score(score(incident_type, confidence))
}

/// Groups incidents per UTC day, then per type, oldest day first
pub fn detection_stats(incidents: &[Incident]) -> (Vec<DailyDetections>, DetectionSummary) {
    #[derive(Default)]
    struct Bucket {
        count: i64,
        confidence_sum: f64,
        confidence_count: i64,
        false_positives: i64,
    }

    let mut days: BTreeMap<String, BTreeMap<&'static str, (IncidentType, Bucket)>> = BTreeMap::new();
    for incident in incidents {
        let Some(day) = incident.created_at.as_deref().and_then(|c| c.get(..10)) else {
            continue;
        };
        let (_, bucket) = days
            .entry(day.to_string())
            .or_default()
            .entry(incident.incident_type.as_str())
            .or_insert_with(|| (incident.incident_type, Bucket::default()));
        bucket.count += 1;
        if let Some(ai) = &incident.ai_detection {
            bucket.confidence_sum += ai.confidence;
            bucket.confidence_count += 1;
        }
        if incident.status == IncidentStatus::FalsePositive {
            bucket.false_positives += 1;
        }
    }

    let daily: Vec<DailyDetections> = days
        .into_iter()
        .map(|(date, types)| {
            let detections: Vec<TypeDetections> = types
                .into_values()
                .map(|(detection_type, b)| TypeDetections {
                    detection_type,
                    count: b.count,
                    avg_confidence: (b.confidence_count > 0).then(|| b.confidence_sum / b.confidence_count as f64),
                    false_positives: b.false_positives,
                })
                .collect();
            DailyDetections {
                date,
                total_detections: detections.iter().map(|d| d.count).sum(),
                total_false_positives: detections.iter().map(|d| d.false_positives).sum(),
                detections,
            }
        })
        .collect();

    let total_detections: i64 = daily.iter().map(|d| d.total_detections).sum();
    let total_false_positives: i64 = daily.iter().map(|d| d.total_false_positives).sum();
    let accuracy = if total_detections > 0 {
        (total_detections - total_false_positives) as f64 / total_detections as f64 * 100.0
    } else {
        100.0
    };
    (
        daily,
        DetectionSummary {
            total_detections,
            total_false_positives,
            accuracy,
        },
    )
}

/// Days covered by a `24h`, `7d` or `30d` range
pub fn time_range_days(time_range: &str) -> Option<i64> {
    match time_range {
        "24h" => Some(1),
        "7d" => Some(7),
        "30d" => Some(30),
        _ => None,
    }
}

#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn process_detection(&self, payload: DetectionPayload) -> Result<DetectionResponse, ServiceError>;
    async fn get_detection_stats(&self, time_range: Option<String>) -> Result<DetectionStatsResponse, ServiceError>;
    async fn update_ai_config(&self, request: AiConfigUpdateRequest) -> Result<AiConfigUpdateResponse, ServiceError>;
}

pub struct DetectionServiceImpl {
    pub camera_repo: Arc<dyn CameraRepository>,
    pub incident_repo: Arc<dyn IncidentRepository>,
    pub counters: Arc<dyn CounterRepository>,
    pub hub: Arc<RealtimeHub>,
}

impl DetectionServiceImpl {
    pub fn new(
        camera_repo: Arc<dyn CameraRepository>,
        incident_repo: Arc<dyn IncidentRepository>,
        counters: Arc<dyn CounterRepository>,
        hub: Arc<RealtimeHub>,
    ) -> Self {
        Self {
            camera_repo,
            incident_repo,
            counters,
            hub,
        }
    }

    fn duplicate_response(&self, incident: &Incident, threshold: f64) -> DetectionResponse {
        DetectionResponse {
            processed: true,
            incident_created: false,
            incident_id: Some(incident.incident_id.clone()),
            severity: Some(incident.severity),
            confidence: incident.ai_detection.as_ref().map(|a| a.confidence).unwrap_or_default(),
            threshold,
            duplicate: true,
        }
    }
}

#[async_trait]
impl DetectionService for DetectionServiceImpl {
    #[instrument(skip(self, payload))]
    async fn process_detection(&self, payload: DetectionPayload) -> Result<DetectionResponse, ServiceError> {
        let detection = validate_detection(payload).map_err(ServiceError::Validation)?;

        let camera = self
            .camera_repo
            .find_by_camera_id(&detection.camera_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Camera not found: {}", detection.camera_id)))?;
        let camera_oid = camera
            .id
            .ok_or_else(|| ServiceError::InternalError("Camera has no id".to_string()))?;
        let threshold = camera.confidence_threshold();

        if let Some(key) = &detection.idempotency_key {
            if let Some(existing) = self.incident_repo.find_by_idempotency_key(key).await? {
                info!(key = %key, incident_id = %existing.incident_id, "Duplicate detection delivery");
                return Ok(self.duplicate_response(&existing, threshold));
            }
        }

        if detection.confidence < threshold {
            debug!(
                confidence = detection.confidence,
                threshold,
                camera_id = %camera.camera_id,
                "Detection below threshold"
            );
            return Ok(DetectionResponse {
                processed: true,
                incident_created: false,
                incident_id: None,
                severity: None,
                confidence: detection.confidence,
                threshold,
                duplicate: false,
            });
        }

        let severity = severity_for(detection.incident_type, detection.confidence);
        let now = Utc::now();
        let now_str = time::format(&now);
        let location = detection.location.clone().unwrap_or_default();

        let incident = Incident {
            id: None,
            incident_id: allocate_incident_id(self.counters.as_ref(), &now).await?,
            incident_type: detection.incident_type,
            severity,
            status: IncidentStatus::Detected,
            camera: camera_oid,
            camera_id: camera.camera_id.clone(),
            location: IncidentLocation {
                zone: location.zone.unwrap_or(camera.location.zone),
                specific: location
                    .specific
                    .filter(|s| !s.is_empty())
                    .or_else(|| Some(default_specific(&camera))),
                coordinates: location
                    .coordinates
                    .or_else(|| detection.bounding_box.map(|b| Coordinates { x: b.x, y: b.y })),
            },
            description: detection.incident_type.describe_at(&camera.name),
            ai_detection: Some(AiDetection {
                confidence: detection.confidence,
                bounding_box: detection.bounding_box,
                model_version: detection
                    .model_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string()),
                processed_at: detection.timestamp.clone(),
            }),
            evidence: detection.evidence.clone().unwrap_or_default(),
            response: IncidentResponse::default(),
            idempotency_key: detection.idempotency_key.clone(),
            version: 0,
            created_at: Some(now_str.clone()),
            updated_at: None,
        };

        let incident = match self.incident_repo.insert(incident).await {
            Ok(incident) => incident,
            // a concurrent delivery with the same key won the insert
            Err(RepositoryError::AlreadyExists(msg)) => {
                let key = detection.idempotency_key.as_deref().unwrap_or_default();
                warn!(key = %key, "Idempotent insert raced: {}", msg);
                return match self.incident_repo.find_by_idempotency_key(key).await? {
                    Some(existing) => Ok(self.duplicate_response(&existing, threshold)),
                    None => Err(ServiceError::Conflict(msg)),
                };
            }
            Err(e) => return Err(e.into()),
        };

        self.camera_repo.record_detection(&camera_oid, &now_str).await?;
        self.hub.broadcast_incident(IncidentEvent::AiDetection, &incident).await;
        info!(
            incident_id = %incident.incident_id,
            camera_id = %camera.camera_id,
            severity = %severity,
            "AI detection processed"
        );

        Ok(DetectionResponse {
            processed: true,
            incident_created: true,
            incident_id: Some(incident.incident_id.clone()),
            severity: Some(severity),
            confidence: detection.confidence,
            threshold,
            duplicate: false,
        })
    }

    async fn get_detection_stats(&self, time_range: Option<String>) -> Result<DetectionStatsResponse, ServiceError> {
        let time_range = time_range
            .filter(|r| time_range_days(r).is_some())
            .unwrap_or_else(|| "7d".to_string());
        let days = time_range_days(&time_range).unwrap_or(7);
        let filter = IncidentFilter {
            created_from: Some(time::format(&(Utc::now() - Duration::days(days)))),
            ..Default::default()
        };
        let incidents = self.incident_repo.find_all(&filter).await?;
        let (detection_stats, summary) = detection_stats(&incidents);
        Ok(DetectionStatsResponse {
            time_range,
            detection_stats,
            summary,
        })
    }

    #[instrument(skip(self, request), fields(camera_id = ?request.camera_id))]
    async fn update_ai_config(&self, request: AiConfigUpdateRequest) -> Result<AiConfigUpdateResponse, ServiceError> {
        let camera_id = request.camera_id.as_deref().filter(|c| !c.is_empty());
        let modified_count = self.camera_repo.set_ai_config(camera_id, &request.config).await?;
        if camera_id.is_some() && modified_count == 0 {
            return Err(ServiceError::NotFound("Camera not found".to_string()));
        }
        info!(modified_count, "AI configuration updated");
        Ok(AiConfigUpdateResponse {
            modified_count,
            configuration: request.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::incident::Evidence;
    use crate::model::camera::Zone;
    use bson::oid::ObjectId;

    fn payload() -> DetectionPayload {
        DetectionPayload {
            camera_id: Some("cam-001".to_string()),
            detection: Some(DetectionData {
                detection_type: Some("illegal_dumping".to_string()),
                confidence: Some(0.9),
                bounding_box: None,
                model_version: None,
            }),
            timestamp: Some("2026-03-02T10:00:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_scoring_examples() {
        assert!((score(IncidentType::IllegalDumping, 0.9) - 2.7).abs() < 1e-9);
        assert_eq!(severity_for(IncidentType::IllegalDumping, 0.9), Severity::Critical);
        assert_eq!(severity_for(IncidentType::CleanlinessViolation, 0.95), Severity::Low);
        assert_eq!(severity_for(IncidentType::Overflow, 1.0), Severity::High);
        assert_eq!(severity_for(IncidentType::DrainClogging, 0.75), Severity::Medium);
    }

    #[test]
    fn test_valid_payload() {
        let valid = validate_detection(payload()).unwrap();
        assert_eq!(valid.incident_type, IncidentType::IllegalDumping);
        assert_eq!(valid.timestamp, "2026-03-02T10:00:00.000Z");
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let errors = validate_detection(DetectionPayload::default()).unwrap_err();
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Camera ID is required",
                "Detection data is required",
                "Detection type is required",
                "Confidence score is required",
                "Timestamp is required",
            ]
        );
    }

    #[test]
    fn test_bad_type_and_confidence() {
        let mut bad = payload();
        bad.detection = Some(DetectionData {
            detection_type: Some("fire".to_string()),
            confidence: Some(1.2),
            bounding_box: None,
            model_version: None,
        });
        let errors = validate_detection(bad).unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("detection.type", "Invalid detection type"),
                FieldError::new("detection.confidence", "Confidence must be between 0 and 1"),
            ]
        );
    }

    fn stored(day: &str, incident_type: IncidentType, confidence: f64, status: IncidentStatus) -> Incident {
        Incident {
            id: Some(ObjectId::new()),
            incident_id: format!("INC-{}", day),
            incident_type,
            severity: Severity::Low,
            status,
            camera: ObjectId::new(),
            camera_id: "CAM-001".to_string(),
            location: IncidentLocation { zone: Zone::C, specific: None, coordinates: None },
            description: String::new(),
            ai_detection: Some(AiDetection {
                confidence,
                bounding_box: None,
                model_version: DEFAULT_MODEL_VERSION.to_string(),
                processed_at: format!("{}T00:00:00.000Z", day),
            }),
            evidence: Evidence::default(),
            response: IncidentResponse::default(),
            idempotency_key: None,
            version: 0,
            created_at: Some(format!("{}T09:00:00.000Z", day)),
            updated_at: None,
        }
    }

    #[test]
    fn test_detection_stats_groups_by_day_and_type() {
        let incidents = vec![
            stored("2026-03-02", IncidentType::Overflow, 0.9, IncidentStatus::Detected),
            stored("2026-03-02", IncidentType::Overflow, 0.8, IncidentStatus::FalsePositive),
            stored("2026-03-01", IncidentType::IllegalDumping, 0.95, IncidentStatus::Resolved),
        ];
        let (daily, summary) = detection_stats(&incidents);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, "2026-03-01");
        assert_eq!(daily[1].detections[0].count, 2);
        assert!((daily[1].detections[0].avg_confidence.unwrap() - 0.85).abs() < 1e-9);
        assert_eq!(summary.total_detections, 3);
        assert_eq!(summary.total_false_positives, 1);
        assert!((summary.accuracy - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_empty_stats_are_fully_accurate() {
        let (daily, summary) = detection_stats(&[]);
        assert!(daily.is_empty());
        assert_eq!(summary.accuracy, 100.0);
    }
}
