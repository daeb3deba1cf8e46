//! Shared Diesel error mapping for the repositories in this module.
//!
//! Every port error exposes `connection` and `query` constructors, so the
//! adapters only pass those in and keep their own mapping one line long.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map Diesel errors into query/connection constructors.
///
/// Database messages are logged at debug level and never forwarded, except
/// for payload (de)serialisation failures raised by the adapters themselves.
pub fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
{
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(%error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
        DieselError::SerializationError(err) => {
            query(format!("failed to encode stored payload: {err}"))
        }
        DieselError::DeserializationError(err) => {
            query(format!("failed to decode stored payload: {err}"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            query("transaction serialisation failure".to_owned())
        }
        _ => query("database error".to_owned()),
    }
}

/// Wrap a JSON encoding failure so it can leave a Diesel transaction.
pub fn encode_failure(error: serde_json::Error) -> DieselError {
    DieselError::SerializationError(Box::new(error))
}

/// Wrap a stored-payload decoding failure so it can leave a Diesel
/// transaction.
pub fn decode_failure<E>(error: E) -> DieselError
where
    E: std::error::Error + Send + Sync + 'static,
{
    DieselError::DeserializationError(Box::new(error))
}
