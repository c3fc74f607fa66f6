pub mod camera;
pub mod incident;
pub mod otp;
pub mod payout;
pub mod report;
pub mod user;
