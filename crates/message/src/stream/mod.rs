//! Message body streams.
//!
//! - [`Stream`]: shared handle over a byte resource with an explicit open → detached lifecycle
//! - [`Resource`]: the raw resource a stream wraps (memory, file, or forward-only reader)
//! - [`OpenMode`]: fopen-style access flags fixed at creation time

mod mode;
#[allow(clippy::module_inception, reason = "the handle is the module's main type")]
mod stream;

pub use mode::OpenMode;
pub use stream::Resource;
pub use stream::Stream;
pub use stream::StreamMetadata;
