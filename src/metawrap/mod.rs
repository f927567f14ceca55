//! Stream decorator that strips a metadata header from the front of a stream.
//!
//! [`MetawrapStream`] wraps another [`Stream`] whose content starts with a
//! block of `key:value` lines terminated by an empty line (see
//! [`crate::header`]).  Each header line is handed to a callback; the
//! decorator itself then behaves like a stream over the remaining payload:
//! offset 0 is the first payload byte and [`Stream::stat`] reports the payload
//! size.
//!
//! The header is parsed lazily by the first [`Stream::fill`] or
//! [`Stream::stat`].  On a non-blocking underlying stream parsing may take
//! several calls, each returning [`ReadOutcome::Pending`] until enough data has
//! arrived; parse progress is kept in the underlying stream's buffer in the
//! meantime.
//!
//! # Example
//!
//! ```
//! use metawrap::{stream::read_to_end, MemoryStream, MetawrapStream, Stream};
//!
//! let mut headers = Vec::new();
//! let mut stream = MetawrapStream::new(
//!     MemoryStream::new(b"From:alice\nSubject:hi\n\nBODY".to_vec()),
//!     |key: &[u8], value: &[u8]| headers.push((key.to_vec(), value.to_vec())),
//! );
//!
//! let mut payload = Vec::new();
//! read_to_end(&mut stream, &mut payload).unwrap();
//! assert_eq!(payload, b"BODY");
//! assert_eq!(stream.stat(true).unwrap(), Some(4));
//! drop(stream);
//!
//! assert_eq!(headers[0], (b"From".to_vec(), b"alice".to_vec()));
//! assert_eq!(headers[1], (b"Subject".to_vec(), b"hi".to_vec()));
//! ```

use std::fmt;

use log::debug;

use crate::{
    error::{Result, StreamError},
    header::{HeaderCallback, HeaderParser, HeaderProgress, DEFAULT_SEPARATOR},
    limits::HeaderLimits,
    stream::{ReadOutcome, Stream},
};

/// Where a [`MetawrapStream`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetawrapState {
    /// The header hasn't been fully read yet.
    ParsingHeader,
    /// The header is done; reads go straight to the payload.
    PassThrough,
    /// Parsing failed.  Every further operation reports the same error.
    Failed,
}

enum State {
    ParsingHeader(HeaderParser),
    PassThrough,
    Failed(StreamError),
}

impl State {
    fn kind(&self) -> MetawrapState {
        match self {
            Self::ParsingHeader(_) => MetawrapState::ParsingHeader,
            Self::PassThrough => MetawrapState::PassThrough,
            Self::Failed(_) => MetawrapState::Failed,
        }
    }
}

/// A stream exposing only the payload that follows a metadata header.
///
/// The decorator owns its underlying stream.  It copies the underlying
/// stream's blocking mode but always reports itself as not seekable: seeking
/// within payload that has already been located works, but generic consumers
/// shouldn't rely on it.
pub struct MetawrapStream<S, F> {
    parent: S,
    callback: F,
    state: State,
    /// Offset in `parent` this stream was created at.
    origin: u64,
    /// Offset in `parent` up to which the header has been consumed.
    parse_offset: u64,
    /// Offset in `parent` of the first payload byte, once known.
    start_offset: Option<u64>,
    v_offset: u64,
    blocking: bool,
}

impl<S: Stream, F: HeaderCallback> MetawrapStream<S, F> {
    /// Wrap `parent`, calling `callback` for each header line.
    ///
    /// The header is expected to start at `parent`'s current offset.
    pub fn new(parent: S, callback: F) -> Self {
        let origin = parent.offset();
        let blocking = parent.is_blocking();
        Self {
            parent,
            callback,
            state: State::ParsingHeader(HeaderParser::new(
                DEFAULT_SEPARATOR,
                HeaderLimits::default(),
            )),
            origin,
            parse_offset: origin,
            start_offset: None,
            v_offset: 0,
            blocking,
        }
    }

    /// Use `separator` instead of `:` between keys and values.
    ///
    /// Has no effect once the header has been parsed.
    #[must_use]
    pub fn with_separator(mut self, separator: u8) -> Self {
        if let State::ParsingHeader(parser) = &mut self.state {
            parser.set_separator(separator);
        }
        self
    }

    /// Apply `limits` while parsing the header.
    ///
    /// Has no effect once the header has been parsed.
    #[must_use]
    pub fn with_limits(mut self, limits: HeaderLimits) -> Self {
        if let State::ParsingHeader(parser) = &mut self.state {
            parser.set_limits(limits);
        }
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MetawrapState {
        self.state.kind()
    }

    /// Length of the header in bytes, including the terminating blank line.
    ///
    /// `None` until the header has been parsed.
    pub fn header_len(&self) -> Option<u64> {
        self.start_offset.map(|start| start - self.origin)
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.parent
    }

    /// Return the underlying stream, dropping the callback.
    pub fn into_inner(self) -> S {
        self.parent
    }

    fn fail(&mut self, err: StreamError) -> StreamError {
        debug!("metadata header failed: {err}");
        self.state = State::Failed(err.clone());
        err
    }

    /// Move the parent to where our next byte comes from.
    fn reposition(&mut self) -> Result<()> {
        let target = match self.start_offset {
            Some(start) => start + self.v_offset,
            None => self.parse_offset,
        };
        match self.parent.seek(target) {
            Ok(()) => Ok(()),
            Err(err) if self.start_offset.is_none() => Err(self.fail(err)),
            Err(err) => Err(err),
        }
    }

    /// Make one attempt at parsing the rest of the header.
    ///
    /// Returns `false` if the parent ran out of data before the blank line.
    fn parse_header(&mut self) -> Result<bool> {
        let parser = match &mut self.state {
            State::ParsingHeader(parser) => parser,
            State::PassThrough => return Ok(true),
            State::Failed(err) => return Err(err.clone()),
        };
        debug_assert_eq!(self.v_offset, 0);

        let result = parser.parse(&mut self.parent, &mut self.callback);
        let lines = parser.lines();
        self.parse_offset = self.parent.offset();

        match result {
            Ok(HeaderProgress::Complete) => {
                debug!(
                    "metadata header complete: {lines} lines, payload at offset {}",
                    self.parse_offset
                );
                self.start_offset = Some(self.parse_offset);
                self.state = State::PassThrough;
                Ok(true)
            }
            Ok(HeaderProgress::Pending) if self.blocking => {
                Err(self.fail(StreamError::BlockingStall))
            }
            Ok(HeaderProgress::Pending) => Ok(false),
            Err(err) => Err(self.fail(err)),
        }
    }
}

impl<S: Stream, F: HeaderCallback> Stream for MetawrapStream<S, F> {
    fn fill(&mut self) -> Result<ReadOutcome> {
        if let State::Failed(err) = &self.state {
            return Err(err.clone());
        }
        self.reposition()?;

        if let State::ParsingHeader(_) = self.state {
            if !self.parse_header()? {
                return Ok(ReadOutcome::Pending);
            }
            // payload that came in along with the end of the header
            let available = self.parent.buffer().len();
            if available > 0 {
                return Ok(ReadOutcome::Data(available));
            }
        }

        self.parent.fill()
    }

    fn buffer(&self) -> &[u8] {
        match (&self.state, self.start_offset) {
            (State::PassThrough, Some(start)) if self.parent.offset() == start + self.v_offset => {
                self.parent.buffer()
            }
            _ => &[],
        }
    }

    fn consume(&mut self, amount: usize) {
        debug_assert!(amount <= self.buffer().len());
        self.parent.consume(amount);
        self.v_offset += amount as u64;
    }

    fn offset(&self) -> u64 {
        self.v_offset
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        match &self.state {
            State::Failed(err) => Err(err.clone()),
            State::ParsingHeader(_) if offset != 0 => Err(StreamError::SeekBeforeHeader { offset }),
            _ => {
                self.v_offset = offset;
                Ok(())
            }
        }
    }

    fn stat(&mut self, exact: bool) -> Result<Option<u64>> {
        if let State::Failed(err) = &self.state {
            return Err(err.clone());
        }
        let size = self.parent.stat(exact)?;

        if let State::ParsingHeader(_) = self.state {
            self.reposition()?;
            if !self.parse_header()? {
                return if exact {
                    Err(StreamError::WouldBlock)
                } else {
                    Ok(None)
                };
            }
        }

        let (Some(size), Some(payload_start)) = (size, self.start_offset) else {
            return Ok(None);
        };
        size.checked_sub(payload_start)
            .map(Some)
            .ok_or(StreamError::SizeUnderflow {
                size,
                payload_start,
            })
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn is_seekable(&self) -> bool {
        false
    }

    fn abs_start_offset(&self) -> u64 {
        self.parent.abs_start_offset() + self.start_offset.unwrap_or(self.origin)
    }
}

impl<S: fmt::Debug, F> fmt::Debug for MetawrapStream<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the callback is usually a closure, which doesn't impl Debug
        f.debug_struct("MetawrapStream")
            .field("parent", &self.parent)
            .field("state", &self.state.kind())
            .field("start_offset", &self.start_offset)
            .field("v_offset", &self.v_offset)
            .finish()
    }
}
