//! Incremental parser for the `key:value` metadata header.
//!
//! The header is a sequence of newline-terminated lines, each holding a key
//! and a value split at the first separator, and ends with an empty line:
//!
//! ```text
//! From:alice
//! Subject:hi
//!
//! payload...
//! ```
//!
//! Parsing works directly on the buffer of the stream being read.  When a
//! non-blocking stream runs dry in the middle of a line nothing is consumed,
//! so the next attempt rescans the same bytes plus whatever has arrived since.

use log::trace;

use crate::{
    error::{Result, StreamError},
    limits::HeaderLimits,
    stream::{ReadOutcome, Stream},
};

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: u8 = b':';

/// One `key<sep>value` line of the header.
///
/// Both halves borrow from the stream buffer and are only valid while the
/// line is being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLine<'a> {
    /// Bytes before the first separator.
    pub key: &'a [u8],
    /// Bytes after the first separator, up to the end of the line.
    pub value: &'a [u8],
}

impl<'a> HeaderLine<'a> {
    /// Split `line` at the first occurrence of `separator`.
    pub fn split(line: &'a [u8], separator: u8) -> Option<Self> {
        let idx = line.iter().position(|&b| b == separator)?;
        Some(Self {
            key: &line[..idx],
            value: &line[idx + 1..],
        })
    }
}

/// Receives each header line as it is parsed.
///
/// Implemented for every `FnMut(&[u8], &[u8])` closure, so usually a closure
/// capturing whatever state the caller needs is enough.
pub trait HeaderCallback {
    /// Called once per header line, in order.
    fn header(&mut self, key: &[u8], value: &[u8]);
}

impl<F> HeaderCallback for F
where
    F: FnMut(&[u8], &[u8]),
{
    fn header(&mut self, key: &[u8], value: &[u8]) {
        self(key, value)
    }
}

/// Result of scanning for the next line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineScan {
    /// A complete line occupies `buffer()[..len]`, followed by `\n`.
    Line(usize),
    /// No complete line yet; the stream is non-blocking and has nothing more.
    Pending,
    /// The stream ended without another complete line.
    Eof,
}

/// Look for the next complete line in `stream`'s buffer, filling as needed.
///
/// Nothing is consumed.  Blocking streams are filled until a line or the end
/// of input turns up.
pub(crate) fn scan_line<S: Stream + ?Sized>(
    stream: &mut S,
    limits: &HeaderLimits,
) -> Result<LineScan> {
    let mut searched = 0;
    loop {
        let buf = stream.buffer();
        if let Some(idx) = buf[searched..].iter().position(|&b| b == b'\n') {
            let len = searched + idx;
            let content = buf[..len].strip_suffix(b"\r").map_or(len, <[u8]>::len);
            if content > limits.max_line_len {
                return Err(StreamError::LineTooLong {
                    offset: stream.offset(),
                    len: content,
                    limit: limits.max_line_len,
                });
            }
            return Ok(LineScan::Line(len));
        }
        searched = buf.len();
        if searched > limits.max_line_len {
            return Err(StreamError::LineTooLong {
                offset: stream.offset(),
                len: searched,
                limit: limits.max_line_len,
            });
        }

        match stream.fill()? {
            ReadOutcome::Data(_) => continue,
            ReadOutcome::Pending => return Ok(LineScan::Pending),
            ReadOutcome::Eof => return Ok(LineScan::Eof),
        }
    }
}

/// Progress made by [`HeaderParser::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderProgress {
    /// The blank line was consumed; the stream is positioned at the payload.
    Complete,
    /// Waiting for more data on a non-blocking stream.
    Pending,
}

/// Parser state carried between attempts.
#[derive(Debug, Clone)]
pub(crate) struct HeaderParser {
    separator: u8,
    limits: HeaderLimits,
    lines: usize,
}

impl HeaderParser {
    pub(crate) fn new(separator: u8, limits: HeaderLimits) -> Self {
        Self {
            separator,
            limits,
            lines: 0,
        }
    }

    pub(crate) fn set_separator(&mut self, separator: u8) {
        self.separator = separator;
    }

    pub(crate) fn set_limits(&mut self, limits: HeaderLimits) {
        self.limits = limits;
    }

    /// Number of key/value lines delivered so far.
    pub(crate) fn lines(&self) -> usize {
        self.lines
    }

    /// Consume header lines from `stream`, handing each to `callback`.
    ///
    /// A line is consumed only after the callback has seen it, so a retry
    /// after [`HeaderProgress::Pending`] never repeats a line.
    pub(crate) fn parse<S, C>(&mut self, stream: &mut S, callback: &mut C) -> Result<HeaderProgress>
    where
        S: Stream + ?Sized,
        C: HeaderCallback + ?Sized,
    {
        loop {
            let len = match scan_line(stream, &self.limits)? {
                LineScan::Line(len) => len,
                LineScan::Pending => return Ok(HeaderProgress::Pending),
                LineScan::Eof => {
                    return Err(StreamError::TruncatedHeader {
                        offset: stream.offset() + stream.buffer().len() as u64,
                    })
                }
            };
            let offset = stream.offset();
            let raw = &stream.buffer()[..len];
            let line = raw.strip_suffix(b"\r").unwrap_or(raw);

            if line.is_empty() {
                stream.consume(len + 1);
                return Ok(HeaderProgress::Complete);
            }

            if self.lines >= self.limits.max_lines {
                return Err(StreamError::TooManyHeaderLines {
                    count: self.lines + 1,
                    limit: self.limits.max_lines,
                });
            }

            let Some(HeaderLine { key, value }) = HeaderLine::split(line, self.separator) else {
                return Err(StreamError::MalformedHeaderLine {
                    offset,
                    separator: char::from(self.separator),
                });
            };
            trace!(
                "header line at offset {offset}: {:?} = {:?}",
                String::from_utf8_lossy(key),
                String::from_utf8_lossy(value)
            );
            callback.header(key, value);
            self.lines += 1;
            stream.consume(len + 1);
        }
    }
}
