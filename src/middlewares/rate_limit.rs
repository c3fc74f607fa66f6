use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::util::error::HandlerError;
use crate::util::redis::RedisServiceTrait;

const LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Fixed window counter per client address, kept in Redis
#[derive(Clone)]
pub struct RateLimiter {
    pub redis: Arc<dyn RedisServiceTrait>,
    pub scope: &'static str,
    pub window_secs: u64,
    pub max_requests: i64,
}

impl RateLimiter {
    pub fn api(redis: Arc<dyn RedisServiceTrait>, config: &RateLimitConfig) -> Self {
        RateLimiter {
            redis,
            scope: "api",
            window_secs: config.window_secs(),
            max_requests: config.max_requests,
        }
    }

    pub fn webhook(redis: Arc<dyn RedisServiceTrait>, config: &RateLimitConfig) -> Self {
        RateLimiter {
            redis,
            scope: "webhook",
            window_secs: config.window_secs(),
            max_requests: config.webhook_max_requests,
        }
    }

    pub fn key(&self, client: &str) -> String {
        format!("rate_limit:{}:{}", self.scope, client)
    }
}

/// First `X-Forwarded-For` hop, else the peer address
pub fn client_address(req: &Request<Body>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Requests are let through when Redis is unavailable
pub async fn rate_limit(State(limiter): State<RateLimiter>, req: Request<Body>, next: Next) -> Response {
    let client = client_address(&req);
    match limiter.redis.increment_in_window(&limiter.key(&client), limiter.window_secs).await {
        Ok((count, ttl)) if count > limiter.max_requests => {
            warn!(client = %client, scope = limiter.scope, count, "Rate limit exceeded");
            let mut response = HandlerError::too_many_requests(LIMIT_MESSAGE).into_response();
            if let Ok(value) = HeaderValue::from_str(&ttl.max(1).to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
        Ok(_) => next.run(req).await,
        Err(e) => {
            warn!(client = %client, "Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
