pub mod app;
pub mod routes;

pub use app::App;
pub use routes::{build_router, AppServices};
