//! In-memory stream.

use log::trace;

use super::{ReadOutcome, Stream};
use crate::error::Result;

/// A stream over bytes held in memory.
///
/// The bytes are revealed to the reader in chunks, which makes it possible to
/// reproduce how a socket or pipe delivers data piecemeal.  In non-blocking
/// ("trickle") mode every chunk is preceded by a fill that returns
/// [`ReadOutcome::Pending`], as if the data hadn't arrived yet.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    data: Vec<u8>,
    /// Bytes of `data` that have "arrived" so far.
    available: usize,
    pos: usize,
    chunk_size: usize,
    blocking: bool,
    /// In trickle mode, whether the next fill delivers a chunk.
    ready: bool,
}

impl MemoryStream {
    /// A blocking stream whose first fill makes all of `data` available.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::with_chunk_size(data, usize::MAX)
    }

    /// A blocking stream that makes at most `chunk_size` more bytes available
    /// per fill.
    pub fn with_chunk_size(data: impl Into<Vec<u8>>, chunk_size: usize) -> Self {
        Self {
            data: data.into(),
            available: 0,
            pos: 0,
            chunk_size: chunk_size.max(1),
            blocking: true,
            ready: true,
        }
    }

    /// A non-blocking stream that alternates between reporting
    /// [`ReadOutcome::Pending`] and delivering `chunk_size` more bytes.
    pub fn trickle(data: impl Into<Vec<u8>>, chunk_size: usize) -> Self {
        Self {
            blocking: false,
            ready: false,
            ..Self::with_chunk_size(data, chunk_size)
        }
    }

    /// The complete contents, including bytes that haven't arrived yet.
    pub fn get_ref(&self) -> &[u8] {
        &self.data
    }

    /// Return the complete contents.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Stream for MemoryStream {
    fn fill(&mut self) -> Result<ReadOutcome> {
        if self.available >= self.data.len() {
            return Ok(ReadOutcome::Eof);
        }
        if !self.blocking && !self.ready {
            self.ready = true;
            return Ok(ReadOutcome::Pending);
        }
        self.ready = false;

        let before = self.buffer().len();
        // bytes before a forward seek count as having arrived already
        let start = self.available.max(self.pos);
        self.available = start.saturating_add(self.chunk_size).min(self.data.len());
        let added = self.buffer().len() - before;
        trace!("memory stream: {added} bytes available at offset {start}");
        Ok(ReadOutcome::Data(added))
    }

    fn buffer(&self) -> &[u8] {
        if self.pos < self.available {
            &self.data[self.pos..self.available]
        } else {
            &[]
        }
    }

    fn consume(&mut self, amount: usize) {
        debug_assert!(amount <= self.buffer().len());
        self.pos += amount;
    }

    fn offset(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.pos = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(())
    }

    fn stat(&mut self, _exact: bool) -> Result<Option<u64>> {
        Ok(Some(self.data.len() as u64))
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn is_seekable(&self) -> bool {
        true
    }
}
