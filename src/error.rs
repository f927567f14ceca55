//! Error types for metadata-wrapped streams.

use std::{io, sync::Arc};

use thiserror::Error;

/// Errors that can occur while reading through a [`Stream`].
///
/// The type is cheap to clone so that a decorator which has entered its
/// failed state can hand out the same error on every subsequent call.
///
/// [`Stream`]: crate::stream::Stream
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// I/O error from the underlying reader.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// A header line without a key/value separator.
    #[error("malformed header line at offset {offset}: missing {separator:?} separator")]
    MalformedHeaderLine {
        /// Offset of the start of the offending line.
        offset: u64,
        /// The separator that was expected.
        separator: char,
    },

    /// End of input before the blank line that terminates the header.
    #[error("truncated header: end of input at offset {offset} before blank line")]
    TruncatedHeader {
        /// Offset at which the underlying stream ended.
        offset: u64,
    },

    /// A header line exceeds the configured maximum length.
    #[error("header line at offset {offset} exceeds limit: {len} bytes > {limit} bytes")]
    LineTooLong {
        /// Offset of the start of the offending line.
        offset: u64,
        /// Bytes buffered so far without finding a newline.
        len: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The header contains more key/value lines than allowed.
    #[error("too many header lines: {count} > {limit}")]
    TooManyHeaderLines {
        /// Number of lines seen.
        count: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A blocking stream returned without making progress.
    #[error("blocking stream reported no progress")]
    BlockingStall,

    /// The stream can't be repositioned to the requested offset.
    #[error("stream is not seekable to offset {offset}")]
    NotSeekable {
        /// Requested offset.
        offset: u64,
    },

    /// Seek to a payload offset before the header has been parsed.
    #[error("can't seek to payload offset {offset} before the header is parsed")]
    SeekBeforeHeader {
        /// Requested payload offset.
        offset: u64,
    },

    /// An exact size was requested but the header isn't complete yet.
    #[error("size not available until more data arrives")]
    WouldBlock,

    /// The underlying stream is shorter than its own header.
    #[error("underlying size {size} ends before payload start {payload_start}")]
    SizeUnderflow {
        /// Size reported by the underlying stream.
        size: u64,
        /// Offset in the underlying stream where the payload begins.
        payload_start: u64,
    },
}

impl StreamError {
    /// Whether this error leaves the stream usable for a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotSeekable { .. } | Self::SeekBeforeHeader { .. } | Self::WouldBlock
        )
    }
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io(inner) => io::Error::new(inner.kind(), StreamError::Io(inner)),
            StreamError::WouldBlock => io::ErrorKind::WouldBlock.into(),
            StreamError::NotSeekable { .. } | StreamError::SeekBeforeHeader { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_kind() {
        let err = StreamError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        let io_err = io::Error::from(err.clone());
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
        assert!(matches!(err, StreamError::Io(_)));
    }

    #[test]
    fn test_header_errors_are_invalid_data() {
        let err = StreamError::MalformedHeaderLine {
            offset: 7,
            separator: ':',
        };
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "malformed header line at offset 7: missing ':' separator"
        );
        assert_eq!(io::Error::from(err).kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_transient_errors() {
        assert!(StreamError::WouldBlock.is_transient());
        assert!(StreamError::SeekBeforeHeader { offset: 3 }.is_transient());
        assert!(!StreamError::BlockingStall.is_transient());
        assert_eq!(
            io::Error::from(StreamError::WouldBlock).kind(),
            io::ErrorKind::WouldBlock
        );
    }
}
