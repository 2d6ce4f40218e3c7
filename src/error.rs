//! Error types for the shardcache library.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods on the heap, shards and store).
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. a zero TTL).
//!
//! Errors produced by user-supplied key functions and getters are never
//! wrapped: the cache hands them back to callers verbatim.
//!
//! ## Example Usage
//!
//! ```
//! use std::time::Duration;
//!
//! use shardcache::builder::CacheBuilder;
//! use shardcache::error::ConfigError;
//!
//! let ok = CacheBuilder::new()
//!     .ttl(Duration::from_secs(30))
//!     .try_build_store::<String, u32>();
//! assert!(ok.is_ok());
//!
//! // A zero TTL would expire every entry on insert
//! let bad: Result<_, ConfigError> = CacheBuilder::new()
//!     .ttl(Duration::ZERO)
//!     .try_build_store::<String, u32>();
//! assert!(bad.is_err());
//! ```

use std::fmt;

/// Error returned when internal cache invariants are violated.
///
/// Produced by `check_invariants` methods (e.g.
/// [`RecencyHeap::check_invariants`](crate::ds::RecencyHeap::check_invariants)).
/// These are programming errors; tests treat them as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invariant violated: {}", self.0)
    }
}

impl std::error::Error for InvariantError {}

/// Rejected configuration parameter.
///
/// Produced by [`CacheConfig::validate`](crate::builder::CacheConfig::validate)
/// and the builder's `try_*` constructors. Names the offending field so
/// config-file loaders can point at it.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use shardcache::builder::CacheConfig;
///
/// let config = CacheConfig {
///     ttl: Duration::ZERO,
///     ..CacheConfig::default()
/// };
/// let err = config.validate().unwrap_err();
/// assert_eq!(err.field(), "ttl");
/// assert_eq!(err.to_string(), "invalid ttl: must be > 0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    field: &'static str,
    reason: String,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the rejected `CacheConfig` field.
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_display_prefixes_message() {
        let err = InvariantError::new("heap index out of sync");
        assert_eq!(err.to_string(), "invariant violated: heap index out of sync");
        assert_eq!(err.message(), "heap index out of sync");
    }

    #[test]
    fn config_error_names_field() {
        let err = ConfigError::new("ttl", "must be > 0");
        assert_eq!(err.field(), "ttl");
        assert_eq!(err.reason(), "must be > 0");
        assert_eq!(err.to_string(), "invalid ttl: must be > 0");
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<InvariantError>();
        assert_error::<ConfigError>();
    }
}
