//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer together
//! with the domain payloads they exchange, plus the session cookie security
//! scheme. Swagger UI serves it in debug builds and `openapi-dump` prints it
//! for client generators.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::leaderboard::{LeaderboardEntry, LeaderboardKind, LeaderboardScope};
use crate::domain::ports::{LeaderboardView, ProgressView, ViewerPosition};
use crate::domain::rewards::{Bonuses, RewardBreakdown};
use crate::domain::settlement::{SessionConfigPayload, SessionOutcomePayload, SettlementResponse};
use crate::domain::{EnergyReading, Error, ErrorCode, GameMode, UnlockState, UnlockTrees};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Private session cookie minted by the account service with the shared session key.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Cogtrain settlement API",
        description = "Session settlement, leaderboards and progression for the training games.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::sessions::settle_session,
        crate::inbound::http::leaderboards::get_leaderboard,
        crate::inbound::http::leaderboards::get_leaderboard_position,
        crate::inbound::http::progress::get_progress,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        SessionOutcomePayload,
        SessionConfigPayload,
        SettlementResponse,
        RewardBreakdown,
        Bonuses,
        EnergyReading,
        GameMode,
        UnlockState,
        UnlockTrees,
        LeaderboardKind,
        LeaderboardScope,
        LeaderboardEntry,
        LeaderboardView,
        ViewerPosition,
        ProgressView,
    )),
    tags(
        (name = "sessions", description = "Settling finished game sessions"),
        (name = "leaderboards", description = "Cached rankings and viewer positions"),
        (name = "progress", description = "Energy, rewards and unlock progression"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated document's shape.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    fn error_schema_has_code_and_message() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get("Error").expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }

    #[rstest]
    #[case("/api/v1/sessions")]
    #[case("/api/v1/leaderboards/{kind}")]
    #[case("/api/v1/leaderboards/{kind}/me")]
    #[case("/api/v1/progress")]
    #[case("/health/ready")]
    #[case("/health/live")]
    fn every_endpoint_is_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    fn session_cookie_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }
}
