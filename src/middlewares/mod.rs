pub mod auth;
pub mod error_details;
pub mod policy;
pub mod rate_limit;

pub use auth::{authorize, CurrentUser, Guard};
pub use error_details::expose_error_details;
pub use policy::Action;
pub use rate_limit::{rate_limit, RateLimiter};
