//! Session settlement and ranking engine for the cognitive-training games.
//!
//! The crate follows a hexagonal layout: [`domain`] holds the pure rules and
//! services, [`inbound`] the HTTP adapters, [`outbound`] the Postgres and
//! in-memory stores, and [`middleware`] the request tracing layer.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
/// Request tracing middleware attached to every response.
pub use middleware::Trace;
/// Per-request correlation identifier.
///
/// # Examples
/// ```
/// use cogtrain::TraceId;
///
/// let id = TraceId::generate();
/// assert!(TraceId::from_header_value(&id.to_string()).is_some());
/// ```
pub use domain::TraceId;
