//! URI parsing, normalization and building.
//!
//! - [`Uri`]: immutable RFC 3986 URI with percent-encoded components and default-port elision
//! - [`UriBuilder`]: explicit component construction
//! - [`UriValidator`]: screening of raw strings before parsing (length, control characters,
//!   denied schemes)
//! - [`IntoUri`]: accepts either a string to parse or an existing [`Uri`]

mod encode;
#[allow(clippy::module_inception, reason = "the value type is the module's main type")]
mod uri;
mod validator;

pub use uri::IntoUri;
pub use uri::Uri;
pub use uri::UriBuilder;
pub use uri::default_port;
pub use validator::DEFAULT_MAX_URI_LENGTH;
pub use validator::UriValidator;
