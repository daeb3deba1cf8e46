//! Session settlement handler.
//!
//! ```text
//! POST /api/v1/sessions
//! Idempotency-Key: 550e8400-e29b-41d4-a716-446655440000
//! {"accuracy":92.5,"config":{"mode":"numeric","depth":2,"totalRounds":10},...}
//! ```

use actix_web::{HttpRequest, post, web};

use crate::domain::ports::SettleSessionRequest;
use crate::domain::settlement::{SessionOutcomePayload, SettlementResponse};
use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Settle a finished session for the signed-in account.
///
/// Repeating a request with the same `Idempotency-Key` and body returns the
/// original response with `replayed: true`; the same key with a different
/// body is a `409 Conflict`.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    request_body = SessionOutcomePayload,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "UUID making retries safe")
    ),
    responses(
        (status = 200, description = "Session settled", body = SettlementResponse),
        (status = 400, description = "Invalid session outcome", body = Error),
        (status = 401, description = "No signed-in account", body = Error),
        (status = 403, description = "Configuration not unlocked", body = Error),
        (status = 404, description = "Account not found", body = Error),
        (status = 409, description = "Energy exhausted or idempotency conflict", body = Error),
        (status = 503, description = "Storage unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sessions"],
    operation_id = "settleSession"
)]
#[post("/sessions")]
pub async fn settle_session(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    payload: web::Json<SessionOutcomePayload>,
) -> ApiResult<web::Json<SettlementResponse>> {
    let account_id = session.require_account_id()?;
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;

    let response = state
        .settlement
        .settle(SettleSessionRequest {
            account_id,
            idempotency_key,
            payload: payload.into_inner(),
        })
        .await?;
    Ok(web::Json(response))
}
