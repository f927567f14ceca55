//! Read the payload of a byte stream that starts with a `key:value` metadata
//! header.
//!
//! [`MetawrapStream`] decorates another [`Stream`]: it parses the header,
//! hands each line to a callback, and then exposes only the bytes after the
//! header, with offsets and sizes relative to the payload.  It works the same
//! over blocking streams and over non-blocking ones that deliver data in
//! pieces.

pub mod error;
pub mod header;
pub mod limits;
pub mod metawrap;
pub mod stream;

#[cfg(test)]
mod test;

pub use error::{Result, StreamError};
pub use header::{HeaderCallback, HeaderLine, DEFAULT_SEPARATOR};
pub use limits::HeaderLimits;
pub use metawrap::{MetawrapState, MetawrapStream};
pub use stream::{FileStream, MemoryStream, ReadOutcome, Stream, StreamReader};
