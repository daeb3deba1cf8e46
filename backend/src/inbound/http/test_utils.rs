//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{HttpResponse, test, web};

use crate::domain::{AccountId, Error};
use crate::inbound::http::session::SessionContext;

/// Path of the test-only route that signs a caller in.
pub const SIGN_IN_PATH: &str = "/test/sign-in/{account_id}";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Stand-in for the account service: stores the path id in the session.
pub async fn sign_in(
    session: SessionContext,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let account_id = AccountId::new(path.into_inner())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    session.persist_account(&account_id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Sign in as `account_id` and return the session cookie.
pub async fn session_cookie<S>(app: &S, account_id: &AccountId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = test::TestRequest::post()
        .uri(&format!("/test/sign-in/{account_id}"))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "sign-in route failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}
