use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::middlewares::policy::Action;
use crate::model::user::{Role, User};
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::util::error::{HandlerError, ServiceError};
use crate::util::jwt::JwtTokenUtils;

/// The signed-in user, placed in request extensions by [`authorize`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl TryFrom<&User> for CurrentUser {
    type Error = ServiceError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let id = user
            .id
            .ok_or_else(|| ServiceError::Unauthorized("Invalid token".to_string()))?;
        Ok(CurrentUser {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        })
    }
}

/// Route guard state: who may pass, and how tokens are checked
#[derive(Clone)]
pub struct Guard {
    pub auth: Arc<AuthServiceImpl>,
    pub action: Option<Action>,
}

impl Guard {
    /// Any active, signed-in user
    pub fn authenticated(auth: Arc<AuthServiceImpl>) -> Self {
        Guard { auth, action: None }
    }

    pub fn for_action(auth: Arc<AuthServiceImpl>, action: Action) -> Self {
        Guard {
            auth,
            action: Some(action),
        }
    }
}

pub async fn authorize(
    State(guard): State<Guard>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HandlerError::unauthorized("Access denied. No token provided."))?;
    let token = guard
        .auth
        .jwt_utils
        .extract_token_from_header(header)
        .map_err(|_| HandlerError::unauthorized("Access denied. No token provided."))?;

    let user = guard.auth.authenticate(&token).await.map_err(|e| {
        debug!("Rejected token: {}", e);
        HandlerError::from(e)
    })?;
    let current = CurrentUser::try_from(&user)?;

    if let Some(action) = guard.action {
        if !action.permits(current.role) {
            warn!(user_id = %current.id, role = %current.role, action = ?action, "Insufficient permissions");
            return Err(HandlerError::forbidden("Insufficient permissions"));
        }
    }

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}
