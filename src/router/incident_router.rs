use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::incident_handler::{
    assign_incident_handler, create_incident_handler, get_incident_handler, incident_stats_handler,
    list_incidents_handler, update_status_handler,
};
use crate::middlewares::{authorize, Action, Guard};
use crate::service::auth_service::AuthServiceImpl;
use crate::service::incident_service::IncidentServiceImpl;

pub fn incident_router(service: Arc<IncidentServiceImpl>, auth: Arc<AuthServiceImpl>) -> Router {
    let read = Router::new()
        .route("/incidents", get(list_incidents_handler))
        .route("/incidents/stats", get(incident_stats_handler))
        .route("/incidents/{id}", get(get_incident_handler))
        .route_layer(middleware::from_fn_with_state(Guard::authenticated(auth.clone()), authorize));

    let create = Router::new()
        .route("/incidents", post(create_incident_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth.clone(), Action::CreateIncident),
            authorize,
        ));

    let status = Router::new()
        .route("/incidents/{id}/status", put(update_status_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth.clone(), Action::UpdateIncidentStatus),
            authorize,
        ));

    let assign = Router::new()
        .route("/incidents/{id}/assign", post(assign_incident_handler))
        .route_layer(middleware::from_fn_with_state(
            Guard::for_action(auth, Action::AssignIncident),
            authorize,
        ));

    read.merge(create).merge(status).merge(assign).with_state(service)
}
