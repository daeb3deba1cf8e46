//! Cookie-session identity for HTTP handlers.
//!
//! The private session cookie is minted by the account service with the
//! shared key and carries the caller's account id. Handlers ask
//! [`SessionContext::require_account_id`] for it and never touch the
//! underlying Actix session.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{AccountId, Error};

pub(crate) const ACCOUNT_ID_KEY: &str = "account_id";

/// Extractor exposing the caller identity stored in the session.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Wrap an extracted actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store the caller's account id in the session cookie.
    pub fn persist_account(&self, account_id: &AccountId) -> Result<(), Error> {
        self.0
            .insert(ACCOUNT_ID_KEY, account_id.as_ref())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Account id from the cookie; a malformed value counts as absent.
    pub fn account_id(&self) -> Result<Option<AccountId>, Error> {
        let raw = self
            .0
            .get::<String>(ACCOUNT_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        Ok(raw.and_then(|value| {
            AccountId::new(&value)
                .inspect_err(|error| warn!(%error, "ignoring malformed account id in session"))
                .ok()
        }))
    }

    /// Caller identity, or `unauthorized` when nobody is signed in.
    pub fn require_account_id(&self) -> Result<AccountId, Error> {
        self.account_id()?
            .ok_or_else(|| Error::unauthorized("a signed-in account is required"))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = Session::from_request(req, payload);
        Box::pin(async move { session.await.map(Self::new) })
    }
}
