//! Buffered byte streams with blocking and non-blocking backings.
//!
//! A [`Stream`] owns a read buffer.  [`Stream::fill`] tries to make more bytes
//! available, [`Stream::buffer`] exposes the bytes from the current offset
//! onward and [`Stream::consume`] advances past them.  Splitting the read this
//! way lets a parser look for a delimiter in place and come back later, after
//! a non-blocking backing has received more data, without keeping a private
//! copy of the partial input.
//!
//! Three kinds of stream exist:
//!
//! - [`MemoryStream`]: bytes held in memory, optionally revealed in chunks
//! - [`FileStream`]: a file, pipe or socket, blocking or `O_NONBLOCK`
//! - [`MetawrapStream`]: a decorator around another stream
//!
//! [`MetawrapStream`]: crate::MetawrapStream

use std::io::{self, Read};

use crate::error::Result;

mod file;
mod memory;

pub use file::FileStream;
pub use memory::MemoryStream;

/// Outcome of an attempt to make more bytes available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many new bytes were made available (or copied, for
    /// [`Stream::read_into`]).
    Data(usize),
    /// A non-blocking stream has nothing more right now.  Not an error: retry
    /// once the backing has more data.
    Pending,
    /// No more data will ever arrive.
    Eof,
}

/// An ordered byte source supporting positional reads, seeks and size queries.
///
/// Offsets are absolute within the stream.  A blocking stream never returns
/// [`ReadOutcome::Pending`].
pub trait Stream {
    /// Try to make more bytes available in [`buffer`](Stream::buffer).
    ///
    /// Bytes already buffered stay buffered.  Returns [`ReadOutcome::Eof`] when
    /// nothing beyond the current buffer will ever arrive, even if the buffer
    /// itself isn't empty.
    fn fill(&mut self) -> Result<ReadOutcome>;

    /// The buffered bytes starting at the current offset.
    fn buffer(&self) -> &[u8];

    /// Advance the current offset past `amount` buffered bytes.
    fn consume(&mut self, amount: usize);

    /// Current offset.
    fn offset(&self) -> u64;

    /// Move the current offset.  The backing is repositioned lazily.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Total size of the stream if known.
    ///
    /// With `exact` false an implementation may return `None` rather than do
    /// expensive or blocking work to find out.
    fn stat(&mut self, exact: bool) -> Result<Option<u64>>;

    /// Whether reads wait for data instead of returning
    /// [`ReadOutcome::Pending`].
    fn is_blocking(&self) -> bool;

    /// Whether arbitrary seeks are supported.
    fn is_seekable(&self) -> bool;

    /// Absolute offset of this stream's offset 0 within the innermost stream.
    fn abs_start_offset(&self) -> u64 {
        0
    }

    /// Current offset within the innermost stream.
    fn abs_offset(&self) -> u64 {
        self.abs_start_offset() + self.offset()
    }

    /// Copy up to `out.len()` bytes from the current offset into `out`.
    ///
    /// Returns [`ReadOutcome::Data`] with the number of bytes copied, which
    /// is only zero when `out` is empty.
    fn read_into(&mut self, out: &mut [u8]) -> Result<ReadOutcome> {
        if out.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }
        while self.buffer().is_empty() {
            match self.fill()? {
                ReadOutcome::Data(_) => continue,
                other if self.buffer().is_empty() => return Ok(other),
                // a repositioning fill can expose bytes that were already buffered
                _ => break,
            }
        }
        let buf = self.buffer();
        let n = buf.len().min(out.len());
        out[..n].copy_from_slice(&buf[..n]);
        self.consume(n);
        Ok(ReadOutcome::Data(n))
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn fill(&mut self) -> Result<ReadOutcome> {
        (**self).fill()
    }

    fn buffer(&self) -> &[u8] {
        (**self).buffer()
    }

    fn consume(&mut self, amount: usize) {
        (**self).consume(amount)
    }

    fn offset(&self) -> u64 {
        (**self).offset()
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        (**self).seek(offset)
    }

    fn stat(&mut self, exact: bool) -> Result<Option<u64>> {
        (**self).stat(exact)
    }

    fn is_blocking(&self) -> bool {
        (**self).is_blocking()
    }

    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn abs_start_offset(&self) -> u64 {
        (**self).abs_start_offset()
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    fn fill(&mut self) -> Result<ReadOutcome> {
        (**self).fill()
    }

    fn buffer(&self) -> &[u8] {
        (**self).buffer()
    }

    fn consume(&mut self, amount: usize) {
        (**self).consume(amount)
    }

    fn offset(&self) -> u64 {
        (**self).offset()
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        (**self).seek(offset)
    }

    fn stat(&mut self, exact: bool) -> Result<Option<u64>> {
        (**self).stat(exact)
    }

    fn is_blocking(&self) -> bool {
        (**self).is_blocking()
    }

    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn abs_start_offset(&self) -> u64 {
        (**self).abs_start_offset()
    }
}

/// Adapts a [`Stream`] to [`std::io::Read`].
///
/// [`ReadOutcome::Pending`] turns into an [`io::ErrorKind::WouldBlock`] error,
/// the same way a non-blocking file descriptor behaves.
#[derive(Debug)]
pub struct StreamReader<S> {
    stream: S,
}

impl<S: Stream> StreamReader<S> {
    /// Wrap `stream`.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Get a reference to the wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Get a mutable reference to the wrapped stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Return the wrapped stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Stream> Read for StreamReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read_into(buf)? {
            ReadOutcome::Data(n) => Ok(n),
            ReadOutcome::Eof => Ok(0),
            ReadOutcome::Pending => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

/// Read from `stream` into `out` until it ends or stops making progress.
///
/// Returns [`ReadOutcome::Eof`] or [`ReadOutcome::Pending`].  On `Pending` the
/// bytes read so far are already in `out` and the call can be repeated once
/// more data has arrived.
pub fn read_to_end<S: Stream + ?Sized>(stream: &mut S, out: &mut Vec<u8>) -> Result<ReadOutcome> {
    loop {
        let buf = stream.buffer();
        if !buf.is_empty() {
            let n = buf.len();
            out.extend_from_slice(buf);
            stream.consume(n);
        }
        match stream.fill()? {
            ReadOutcome::Data(_) => continue,
            other if stream.buffer().is_empty() => return Ok(other),
            // fill() may report the end while bytes are still buffered
            _ => continue,
        }
    }
}
