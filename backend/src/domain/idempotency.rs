//! Idempotency primitives for safe settlement retries.
//!
//! - [`IdempotencyKey`]: validated UUID sent by clients in the
//!   `Idempotency-Key` header.
//! - [`PayloadHash`]: SHA-256 of the canonicalised request body, used to tell
//!   a genuine retry from a different request reusing the same key.
//!
//! Canonicalisation sorts object keys recursively, keeps array order and
//! serialises compactly before hashing, so whitespace and key order never
//! change the hash.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Validation errors for [`IdempotencyKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdempotencyKeyValidationError {
    /// Key was empty or whitespace.
    #[error("idempotency key must not be empty")]
    EmptyKey,
    /// Key is not a UUID.
    #[error("idempotency key must be a valid UUID")]
    InvalidKey,
}

/// Client-provided idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(Uuid, String);

impl IdempotencyKey {
    /// Validate and construct a key.
    ///
    /// # Examples
    /// ```
    /// use cogtrain::domain::idempotency::IdempotencyKey;
    ///
    /// let key = IdempotencyKey::new("550e8400-e29b-41d4-a716-446655440000")
    ///     .expect("valid UUID");
    /// assert_eq!(key.as_ref(), "550e8400-e29b-41d4-a716-446655440000");
    /// assert!(IdempotencyKey::new(" 550e8400-e29b-41d4-a716-446655440000").is_err());
    /// ```
    pub fn new(key: impl AsRef<str>) -> Result<Self, IdempotencyKeyValidationError> {
        Self::from_owned(key.as_ref().to_owned())
    }

    /// Wrap an already validated UUID, such as one loaded from storage.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, uuid.to_string())
    }

    /// Generate a random key.
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    fn from_owned(key: String) -> Result<Self, IdempotencyKeyValidationError> {
        if key.is_empty() {
            return Err(IdempotencyKeyValidationError::EmptyKey);
        }
        if key.trim() != key {
            return Err(IdempotencyKeyValidationError::InvalidKey);
        }
        let parsed =
            Uuid::parse_str(&key).map_err(|_| IdempotencyKeyValidationError::InvalidKey)?;
        Ok(Self(parsed, key))
    }

    /// Parsed UUID form of the key.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.1
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = IdempotencyKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Errors raised while building a [`PayloadHash`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadHashError {
    /// Stored digest has the wrong length.
    #[error("payload hash must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    /// Payload could not be serialised.
    #[error("failed to serialise canonical JSON payload: {message}")]
    Serialization { message: String },
}

/// SHA-256 of a canonicalised request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadHash([u8; 32]);

impl PayloadHash {
    /// Wrap a digest computed elsewhere.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Construct a hash from a stored byte slice.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, PayloadHashError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PayloadHashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Raw digest bytes, as stored.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Canonicalise a JSON value and hash it.
///
/// # Examples
/// ```
/// use cogtrain::domain::idempotency::canonicalize_and_hash;
/// use serde_json::json;
///
/// let a = canonicalize_and_hash(&json!({"b": 2, "a": 1})).expect("hash");
/// let b = canonicalize_and_hash(&json!({"a": 1, "b": 2})).expect("hash");
/// assert_eq!(a, b);
/// ```
pub fn canonicalize_and_hash(value: &Value) -> Result<PayloadHash, PayloadHashError> {
    let bytes =
        serde_json::to_vec(&canonicalize(value)).map_err(|err| PayloadHashError::Serialization {
            message: err.to_string(),
        })?;
    Ok(PayloadHash::from_bytes(Sha256::digest(&bytes).into()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by_key(|(key, _)| key.as_str());
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(key, nested)| (key.clone(), canonicalize(nested)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn empty_keys_are_rejected() {
        assert_eq!(
            IdempotencyKey::new(""),
            Err(IdempotencyKeyValidationError::EmptyKey)
        );
    }

    #[rstest]
    #[case("not-a-uuid")]
    #[case("550e8400-e29b-41d4-a716")]
    #[case("550e8400-e29b-41d4-a716-446655440000 ")]
    fn malformed_keys_are_rejected(#[case] raw: &str) {
        assert_eq!(
            IdempotencyKey::new(raw),
            Err(IdempotencyKeyValidationError::InvalidKey)
        );
    }

    #[rstest]
    fn stored_hashes_must_be_full_length() {
        let hash = canonicalize_and_hash(&json!({"accuracy": 90})).expect("hash");
        assert_eq!(PayloadHash::try_from_bytes(hash.as_bytes()), Ok(hash));
        assert_eq!(hash.to_string().len(), 64);
        assert_eq!(
            PayloadHash::try_from_bytes(&[0xab, 0xcd]),
            Err(PayloadHashError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[rstest]
    #[case(json!({"outer": {"z": 1, "a": 2}}), json!({"outer": {"a": 2, "z": 1}}), true)]
    #[case(json!({"rounds": [1, 2]}), json!({"rounds": [2, 1]}), false)]
    #[case(json!({"accuracy": 90}), json!({"accuracy": 91}), false)]
    #[case(json!(null), json!(false), false)]
    fn hashing_ignores_only_key_order(
        #[case] left: Value,
        #[case] right: Value,
        #[case] equal: bool,
    ) {
        let left_hash = canonicalize_and_hash(&left).expect("hash left");
        let right_hash = canonicalize_and_hash(&right).expect("hash right");
        assert_eq!(left_hash == right_hash, equal);
    }
}
