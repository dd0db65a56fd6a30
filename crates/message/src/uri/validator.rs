//! Pre-parse screening of raw URI strings.

use crate::ensure;
use crate::protocol::UriError;

/// Default upper bound for a raw URI string, in bytes.
pub const DEFAULT_MAX_URI_LENGTH: usize = 8 * 1024;

/// Rejects raw URI strings before they reach the parser.
///
/// The default validator limits the length to [`DEFAULT_MAX_URI_LENGTH`], refuses ASCII
/// control characters, and denies the `javascript`, `vbscript` and `data` schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriValidator {
    max_length: usize,
    denied_schemes: Vec<String>,
}

impl Default for UriValidator {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_URI_LENGTH,
            denied_schemes: vec!["javascript".to_string(), "vbscript".to_string(), "data".to_string()],
        }
    }
}

impl UriValidator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    #[must_use]
    pub fn deny_scheme(mut self, scheme: &str) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        if !self.denied_schemes.contains(&scheme) {
            self.denied_schemes.push(scheme);
        }
        self
    }

    #[must_use]
    pub fn allow_scheme(mut self, scheme: &str) -> Self {
        self.denied_schemes.retain(|denied| !denied.eq_ignore_ascii_case(scheme));
        self
    }

    pub fn validate(&self, uri: &str) -> Result<(), UriError> {
        ensure!(
            uri.len() <= self.max_length,
            UriError::rejected(format!("length {} exceeds the limit {}", uri.len(), self.max_length))
        );

        if let Some(index) = uri.bytes().position(|b| b.is_ascii_control()) {
            return Err(UriError::rejected(format!("control character at offset {index}")));
        }

        if let Some((scheme, _)) = uri.split_once(':') {
            let scheme = scheme.trim();
            if self.denied_schemes.iter().any(|denied| denied.eq_ignore_ascii_case(scheme)) {
                return Err(UriError::rejected(format!("scheme {scheme:?} is not allowed")));
            }
        }

        Ok(())
    }
}
