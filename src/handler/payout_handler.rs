use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::dto::payout_dto::UpdatePayoutRequest;
use crate::middlewares::CurrentUser;
use crate::service::payout_service::{PayoutService, PayoutServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;
use crate::util::validated_json::ValidatedJson;

pub async fn list_payouts_handler(
    State(service): State<Arc<PayoutServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let payouts = service.list_payouts().await?;
    Ok(ApiResponse::ok(payouts))
}

pub async fn update_payout_handler(
    State(service): State<Arc<PayoutServiceImpl>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdatePayoutRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.update_payout(&id, payload, user.id).await?;
    let message = if res.stored {
        "Payout approved and saved"
    } else {
        "Payout status updated, not stored"
    };
    Ok(ApiResponse::with_message(message, res))
}

pub async fn delete_payout_handler(
    State(service): State<Arc<PayoutServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    service.delete_payout(&id).await?;
    Ok(ApiResponse::message("Payout deleted successfully"))
}
