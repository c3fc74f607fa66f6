pub mod ai_handler;
pub mod analytics_handler;
pub mod auth_handler;
pub mod camera_handler;
pub mod incident_handler;
pub mod manager_handler;
pub mod payout_handler;
pub mod report_handler;
pub mod ws_handler;
