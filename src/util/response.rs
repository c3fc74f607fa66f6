use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success envelope shared by every endpoint: `{success, message?, data?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Page metadata attached to list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u64,
    pub pages: u64,
    pub total: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Pagination {
            current: page,
            pages,
            total,
            limit,
        }
    }
}

/// Clamp user supplied paging to `page >= 1` and `1 <= limit <= max`.
/// `page` is also capped so that the skip offset fits in an `i64`.
pub fn normalize_paging(page: Option<u64>, limit: Option<u64>, default_limit: u64, max_limit: u64) -> (u64, u64) {
    let limit = limit.filter(|l| *l >= 1).unwrap_or(default_limit).min(max_limit).max(1);
    let max_page = i64::MAX as u64 / limit;
    let page = page.filter(|p| *p >= 1).unwrap_or(1).min(max_page);
    (page, limit)
}

/// Documents to skip before `page`
pub fn page_skip(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_empty_fields() {
        let json = serde_json::to_value(ApiResponse::message("Logged out")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "Logged out"}));
    }

    #[test]
    fn test_pagination_rounds_up() {
        let p = Pagination::new(2, 20, 41);
        assert_eq!(p.pages, 3);
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
    }

    #[test]
    fn test_normalize_paging() {
        assert_eq!(normalize_paging(None, None, 20, 100), (1, 20));
        assert_eq!(normalize_paging(Some(0), Some(500), 20, 100), (1, 100));
        assert_eq!(normalize_paging(Some(3), Some(5), 20, 100), (3, 5));
    }

    #[test]
    fn test_huge_page_is_capped() {
        let (page, limit) = normalize_paging(Some(u64::MAX), Some(100), 20, 100);
        assert_eq!(limit, 100);
        assert_eq!(page, i64::MAX as u64 / 100);
        assert!(page_skip(page, limit) <= i64::MAX as u64);
        assert_eq!(page_skip(u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(page_skip(1, 20), 0);
    }
}
