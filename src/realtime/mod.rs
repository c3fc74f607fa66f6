//! WebSocket fan-out of incident and camera changes.
//!
//! Every connection joins `authenticated_users`, `role_{role}` and `user_{id}`;
//! camera rooms (`camera_{cameraId}`) are joined on request.

pub mod events;
pub mod hub;

pub use events::{ClientMessage, IncidentEvent};
pub use hub::RealtimeHub;
