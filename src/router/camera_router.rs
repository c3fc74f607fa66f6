use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::camera_handler::{
    add_camera_handler, camera_health_handler, get_camera_handler, list_cameras_handler, restart_camera_handler,
    update_camera_handler, upload_video_handler,
};
use crate::middlewares::{authorize, Action, Guard};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::camera_service::CameraServiceImpl;

pub fn camera_router(service: Arc<CameraServiceImpl>, auth: Arc<AuthServiceImpl>, max_upload_bytes: usize) -> Router {
    let view = Router::new()
        .route("/cameras", get(list_cameras_handler))
        .route("/cameras/{id}", get(get_camera_handler))
        .route("/cameras/{id}/health", get(camera_health_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth.clone(), Action::ViewCameras),
            authorize,
        ));

    let manage = Router::new()
        .route("/cameras", post(add_camera_handler))
        .route("/cameras/{id}", put(update_camera_handler))
        .route("/cameras/{id}/restart", post(restart_camera_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth.clone(), Action::ManageCameras),
            authorize,
        ));

    let upload = Router::new()
        .route("/cameras/{id}/videos", post(upload_video_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth, Action::UploadVideo),
            authorize,
        ));

    view.merge(manage).merge(upload).with_state(service)
}
