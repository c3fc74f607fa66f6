use serde::{Deserialize, Serialize};

use crate::model::camera::CameraStatus;
use crate::model::incident::{Incident, IncidentLocation, IncidentStatus, IncidentType, Severity};

/// Why an incident is being broadcast; sent as `type` in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentEvent {
    NewIncident,
    AiDetection,
    IncidentUpdated,
    IncidentAssigned,
}

impl IncidentEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentEvent::NewIncident => "new_incident",
            IncidentEvent::AiDetection => "ai_detection",
            IncidentEvent::IncidentUpdated => "incident_updated",
            IncidentEvent::IncidentAssigned => "incident_assigned",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSnapshot {
    pub id: String,
    pub incident_id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub camera: String,
    pub camera_id: String,
    pub location: IncidentLocation,
    pub description: String,
    pub assigned_to: Option<String>,
    pub created_at: Option<String>,
}

impl From<&Incident> for IncidentSnapshot {
    fn from(incident: &Incident) -> Self {
        IncidentSnapshot {
            id: incident.id_hex(),
            incident_id: incident.incident_id.clone(),
            incident_type: incident.incident_type,
            severity: incident.severity,
            status: incident.status,
            camera: incident.camera.to_hex(),
            camera_id: incident.camera_id.clone(),
            location: incident.location.clone(),
            description: incident.description.clone(),
            assigned_to: incident.response.assigned_to.map(|id| id.to_hex()),
            created_at: incident.created_at.clone(),
        }
    }
}

/// Payload of `incident_update`, `camera_incident` and `critical_incident`
#[derive(Debug, Clone, Serialize)]
pub struct IncidentEventData {
    #[serde(rename = "type")]
    pub event_type: IncidentEvent,
    pub timestamp: String,
    pub incident: IncidentSnapshot,
}

/// Payload of `camera_status_change` and `camera_update`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatusData {
    pub camera_id: String,
    pub status: CameraStatus,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedData {
    pub message: String,
    pub user_id: String,
    pub role: String,
}

/// Reply to `request_live_data`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveData {
    pub timestamp: String,
    pub system_status: String,
    pub active_cameras: i64,
    pub total_cameras: i64,
    pub pending_incidents: u64,
}

/// Messages a connected client may send, `{"event": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    SubscribeToCamera(String),
    UnsubscribeFromCamera(String),
    RequestLiveData,
}

#[derive(Serialize)]
struct Frame<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Serialize one outgoing frame
pub fn frame<T: Serialize>(event: &str, data: &T) -> serde_json::Result<String> {
    serde_json::to_string(&Frame { event, data })
}
