pub mod auth_dto;
pub mod camera_dto;
pub mod dashboard_dto;
pub mod detection_dto;
pub mod incident_dto;
pub mod manager_dto;
pub mod payout_dto;
pub mod report_dto;
