pub mod camera_repo;
pub mod incident_repo;
pub mod mongo;
pub mod otp_repo;
pub mod payout_repo;
pub mod report_repo;
pub mod repository_error;
pub mod user_repo;
