//! Progress handler.
//!
//! ```text
//! GET /api/v1/progress
//! ```

use actix_web::{get, web};

use crate::domain::Error;
use crate::domain::ports::ProgressView;
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Experience, rank, currency, recovered energy and every unlock tree for
/// the signed-in account. Reading never writes recovered energy back.
#[utoipa::path(
    get,
    path = "/api/v1/progress",
    responses(
        (status = 200, description = "Progress", body = ProgressView),
        (status = 401, description = "No signed-in account", body = Error),
        (status = 404, description = "Account not found", body = Error),
        (status = 503, description = "Storage unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["progress"],
    operation_id = "getProgress"
)]
#[get("/progress")]
pub async fn get_progress(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ProgressView>> {
    let account_id = session.require_account_id()?;
    let view = state.progress.progress(&account_id).await?;
    Ok(web::Json(view))
}
