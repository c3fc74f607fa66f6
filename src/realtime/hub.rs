use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::model::camera::CameraStatus;
use crate::model::incident::{Incident, Severity};
use crate::model::user::Role;
use crate::realtime::events::{frame, CameraStatusData, IncidentEvent, IncidentEventData, IncidentSnapshot};
use crate::util::time;

pub const AUTHENTICATED_ROOM: &str = "authenticated_users";

pub fn role_room(role: Role) -> String {
    format!("role_{}", role)
}

pub fn user_room(user_id: &str) -> String {
    format!("user_{}", user_id)
}

pub fn camera_room(camera_id: &str) -> String {
    format!("camera_{}", camera_id)
}

struct ClientConnection {
    user_id: String,
    rooms: HashSet<String>,
    tx: mpsc::UnboundedSender<String>,
}

/// Room based pub/sub over per-connection channels. Delivery is fire-and-forget.
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register an authenticated connection and join its default rooms
    pub async fn register(&self, user_id: &str, role: Role) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let rooms = HashSet::from([AUTHENTICATED_ROOM.to_string(), role_room(role), user_room(user_id)]);

        self.connections.write().await.insert(
            id,
            ClientConnection {
                user_id: user_id.to_string(),
                rooms,
                tx,
            },
        );
        info!(connection_id = %id, user_id = %user_id, role = %role, "Client connected");
        (id, rx)
    }

    pub async fn unregister(&self, id: &Uuid) {
        if let Some(conn) = self.connections.write().await.remove(id) {
            info!(connection_id = %id, user_id = %conn.user_id, "Client disconnected");
        }
    }

    pub async fn join(&self, id: &Uuid, room: String) {
        if let Some(conn) = self.connections.write().await.get_mut(id) {
            debug!(connection_id = %id, room = %room, "Joined room");
            conn.rooms.insert(room);
        }
    }

    pub async fn leave(&self, id: &Uuid, room: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(id) {
            debug!(connection_id = %id, room = %room, "Left room");
            conn.rooms.remove(room);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send to every connection in `room`. Connections whose receiver is gone are dropped.
    pub async fn emit_to<T: Serialize>(&self, room: &str, event: &str, data: &T) {
        let text = match frame(event, data) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, event = %event, "Failed to serialize event");
                return;
            }
        };

        let closed: Vec<Uuid> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(_, conn)| conn.rooms.contains(room))
                .filter_map(|(id, conn)| conn.tx.send(text.clone()).err().map(|_| *id))
                .collect()
        };

        if !closed.is_empty() {
            warn!(count = closed.len(), "Dropping closed connections");
            let mut connections = self.connections.write().await;
            for id in closed {
                connections.remove(&id);
            }
        }
    }

    /// Send to a single connection
    pub async fn emit_to_connection<T: Serialize>(&self, id: &Uuid, event: &str, data: &T) {
        let text = match frame(event, data) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, event = %event, "Failed to serialize event");
                return;
            }
        };
        if let Some(conn) = self.connections.read().await.get(id) {
            let _ = conn.tx.send(text);
        }
    }

    /// `incident_update` to everyone, `camera_incident` to the camera room and
    /// `critical_incident` to admins when severity is critical
    pub async fn broadcast_incident(&self, event_type: IncidentEvent, incident: &Incident) {
        let data = IncidentEventData {
            event_type,
            timestamp: time::now(),
            incident: IncidentSnapshot::from(incident),
        };

        self.emit_to(AUTHENTICATED_ROOM, "incident_update", &data).await;
        if !incident.camera_id.is_empty() {
            self.emit_to(&camera_room(&incident.camera_id), "camera_incident", &data)
                .await;
        }
        if incident.severity == Severity::Critical {
            self.emit_to(&role_room(Role::Admin), "critical_incident", &data).await;
        }
        info!(event = event_type.as_str(), incident_id = %incident.incident_id, "Broadcasted incident");
    }

    pub async fn broadcast_camera_status(&self, camera_id: &str, status: CameraStatus, reason: Option<String>) {
        let data = CameraStatusData {
            camera_id: camera_id.to_string(),
            status,
            timestamp: time::now(),
            reason,
        };
        self.emit_to(AUTHENTICATED_ROOM, "camera_status_change", &data).await;
        self.emit_to(&camera_room(camera_id), "camera_update", &data).await;
        info!(camera_id = %camera_id, status = %status, "Broadcasted camera status change");
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::camera::Zone;
    use crate::model::incident::{Evidence, IncidentLocation, IncidentResponse, IncidentStatus, IncidentType};
    use bson::oid::ObjectId;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn incident(severity: Severity) -> Incident {
        Incident {
            id: Some(ObjectId::new()),
            incident_id: "INC-1700000000000-0001".to_string(),
            incident_type: IncidentType::IllegalDumping,
            severity,
            status: IncidentStatus::Detected,
            camera: ObjectId::new(),
            camera_id: "CAM-09".to_string(),
            location: IncidentLocation { zone: Zone::B, specific: None, coordinates: None },
            description: "Illegal waste dumping activity detected at Gate 3".to_string(),
            ai_detection: None,
            evidence: Evidence::default(),
            response: IncidentResponse::default(),
            idempotency_key: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    fn events(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            out.push(value["event"].as_str().unwrap().to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_critical_incident_fan_out() {
        let hub = RealtimeHub::new();
        let (_, mut admin) = hub.register("admin-1", Role::Admin).await;
        let (watcher, mut operator) = hub.register("op-1", Role::Camera).await;
        let (_, mut analyst) = hub.register("an-1", Role::Analyst).await;
        hub.join(&watcher, camera_room("CAM-09")).await;

        hub.broadcast_incident(IncidentEvent::AiDetection, &incident(Severity::Critical)).await;

        assert_eq!(events(&mut admin), vec!["incident_update", "critical_incident"]);
        assert_eq!(events(&mut operator), vec!["incident_update", "camera_incident"]);
        assert_eq!(events(&mut analyst), vec!["incident_update"]);
    }

    #[tokio::test]
    async fn test_non_critical_incident_skips_admin_room() {
        let hub = RealtimeHub::new();
        let (_, mut admin) = hub.register("admin-1", Role::Admin).await;

        hub.broadcast_incident(IncidentEvent::IncidentUpdated, &incident(Severity::High)).await;
        assert_eq!(events(&mut admin), vec!["incident_update"]);
    }

    #[tokio::test]
    async fn test_incident_payload_shape() {
        let hub = RealtimeHub::new();
        let (_, mut rx) = hub.register("u1", Role::Reporting).await;
        let mut assigned = incident(Severity::Low);
        let officer = ObjectId::new();
        assigned.response.assigned_to = Some(officer);
        hub.broadcast_incident(IncidentEvent::NewIncident, &assigned).await;

        let value: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(value["data"]["type"], "new_incident");
        assert_eq!(value["data"]["incident"]["incidentId"], "INC-1700000000000-0001");
        assert_eq!(value["data"]["incident"]["cameraId"], "CAM-09");
        assert_eq!(value["data"]["incident"]["assignedTo"], officer.to_hex());
    }

    #[tokio::test]
    async fn test_camera_status_fan_out() {
        let hub = RealtimeHub::new();
        let (watcher, mut subscribed) = hub.register("op-1", Role::Camera).await;
        let (_, mut other) = hub.register("op-2", Role::Camera).await;
        hub.join(&watcher, camera_room("CAM-09")).await;

        hub.broadcast_camera_status("CAM-09", CameraStatus::Maintenance, Some("Lens cleaning".to_string()))
            .await;

        assert_eq!(events(&mut subscribed), vec!["camera_status_change", "camera_update"]);
        assert_eq!(events(&mut other), vec!["camera_status_change"]);
    }

    #[tokio::test]
    async fn test_emit_only_reaches_room_members() {
        let hub = RealtimeHub::new();
        let (a, mut rx_a) = hub.register("u1", Role::Admin).await;
        let (_b, mut rx_b) = hub.register("u2", Role::Camera).await;

        hub.join(&a, camera_room("CAM-01")).await;
        hub.emit_to(&camera_room("CAM-01"), "camera_update", &"x").await;

        assert_eq!(rx_a.try_recv().unwrap(), r#"{"event":"camera_update","data":"x"}"#);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_and_closed_receivers() {
        let hub = RealtimeHub::new();
        let (a, mut rx_a) = hub.register("u1", Role::Analyst).await;
        let (_b, rx_b) = hub.register("u2", Role::Analyst).await;
        drop(rx_b);

        hub.join(&a, camera_room("CAM-02")).await;
        hub.leave(&a, &camera_room("CAM-02")).await;
        hub.emit_to(&camera_room("CAM-02"), "camera_update", &1).await;
        assert!(rx_a.try_recv().is_err());

        hub.emit_to(&role_room(Role::Analyst), "ping", &1).await;
        assert!(rx_a.try_recv().is_ok());
        assert_eq!(hub.connection_count().await, 1);
    }
}
