//! Leaderboard handlers.
//!
//! ```text
//! GET /api/v1/leaderboards/rank?scope=weekly
//! GET /api/v1/leaderboards/currency/me
//! ```

use actix_web::{get, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::Error;
use crate::domain::leaderboard::{BoardKey, BoardKeyError};
use crate::domain::ports::{LeaderboardView, ViewerPosition};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Query string accepted by the leaderboard endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScopeQuery {
    /// `all-time` (default) or `weekly`; weekly is rank-only.
    pub scope: Option<String>,
}

fn board_key(kind: &str, query: &ScopeQuery) -> Result<BoardKey, Error> {
    BoardKey::parse(kind, query.scope.as_deref()).map_err(|err| {
        let field = match err {
            BoardKeyError::UnknownKind(_) => "kind",
            BoardKeyError::UnknownScope(_) | BoardKeyError::UnsupportedScope { .. } => "scope",
        };
        Error::invalid_request(err.to_string()).with_details(json!({ "field": field }))
    })
}

/// Cached top of a board.
///
/// Served from a snapshot younger than the configured TTL; otherwise one
/// caller recomputes it while the others receive the previous snapshot with
/// `stale: true`.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboards/{kind}",
    params(
        ("kind" = String, Path, description = "`currency` or `rank`"),
        ScopeQuery
    ),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardView),
        (status = 400, description = "Unknown kind or unsupported scope", body = Error),
        (status = 401, description = "No signed-in account", body = Error),
        (status = 503, description = "Leaderboards disabled or not yet computed", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["leaderboards"],
    operation_id = "getLeaderboard"
)]
#[get("/leaderboards/{kind}")]
pub async fn get_leaderboard(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<ScopeQuery>,
) -> ApiResult<web::Json<LeaderboardView>> {
    session.require_account_id()?;
    let key = board_key(&path.into_inner(), &query)?;
    let view = state.leaderboards.top(key).await?;
    Ok(web::Json(view))
}

/// The caller's own position, computed against live data.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboards/{kind}/me",
    params(
        ("kind" = String, Path, description = "`currency` or `rank`"),
        ScopeQuery
    ),
    responses(
        (status = 200, description = "Viewer position", body = ViewerPosition),
        (status = 400, description = "Unknown kind or unsupported scope", body = Error),
        (status = 401, description = "No signed-in account", body = Error),
        (status = 503, description = "Leaderboards disabled", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["leaderboards"],
    operation_id = "getLeaderboardPosition"
)]
#[get("/leaderboards/{kind}/me")]
pub async fn get_leaderboard_position(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<ScopeQuery>,
) -> ApiResult<web::Json<ViewerPosition>> {
    let account_id = session.require_account_id()?;
    let key = board_key(&path.into_inner(), &query)?;
    let position = state.leaderboards.position(key, account_id).await?;
    Ok(web::Json(position))
}
