//! HTTP method resolution.

use http::Method;
use tracing::warn;

use crate::protocol::MessageError;

/// The methods a request may carry.
pub const KNOWN_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::TRACE,
    Method::CONNECT,
];

/// What to do with a method string outside [`KNOWN_METHODS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MethodPolicy {
    /// Resolve unknown methods to `GET`.
    #[default]
    FallbackToGet,
    /// Reject unknown methods with [`MessageError::InvalidMethod`].
    Strict,
}

impl MethodPolicy {
    /// Looks `method` up case-insensitively and applies the policy when it is unknown.
    pub fn resolve(self, method: &str) -> Result<Method, MessageError> {
        if let Some(known) = KNOWN_METHODS.iter().find(|known| known.as_str().eq_ignore_ascii_case(method)) {
            return Ok(known.clone());
        }

        match self {
            MethodPolicy::FallbackToGet => {
                warn!(method, "unknown http method, fall back to GET");
                Ok(Method::GET)
            }
            MethodPolicy::Strict => Err(MessageError::invalid_method(method)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(MethodPolicy::Strict.resolve("post").unwrap(), Method::POST);
        assert_eq!(MethodPolicy::Strict.resolve("Patch").unwrap(), Method::PATCH);
        assert_eq!(MethodPolicy::Strict.resolve("CONNECT").unwrap(), Method::CONNECT);
    }

    #[test]
    fn unknown_folds_to_get() {
        assert_eq!(MethodPolicy::FallbackToGet.resolve("PURGE").unwrap(), Method::GET);
        assert_eq!(MethodPolicy::FallbackToGet.resolve("").unwrap(), Method::GET);
    }

    #[test]
    fn strict_rejects_unknown() {
        assert!(matches!(MethodPolicy::Strict.resolve("PURGE"), Err(MessageError::InvalidMethod { .. })));
        assert!(matches!(MethodPolicy::Strict.resolve(""), Err(MessageError::InvalidMethod { .. })));
    }
}
