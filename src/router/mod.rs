pub mod ai_router;
pub mod analytics_router;
pub mod auth_router;
pub mod camera_router;
pub mod incident_router;
pub mod manager_router;
pub mod payout_router;
pub mod report_router;
pub mod ws_router;
