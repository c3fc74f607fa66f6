pub mod auth_service;
pub mod camera_service;
pub mod dashboard_service;
pub mod detection_service;
pub mod incident_service;
pub mod manager_service;
pub mod payout_service;
pub mod report_service;
