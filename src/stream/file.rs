//! Stream backed by a file descriptor.

use std::{
    fs::File,
    io::{ErrorKind, Read, Seek, SeekFrom},
    os::fd::OwnedFd,
    path::Path,
};

use log::trace;
use rustix::fs::{fcntl_getfl, fcntl_setfl, OFlags};

use super::{ReadOutcome, Stream};
use crate::error::{Result, StreamError};

const DEFAULT_CHUNK_SIZE: usize = 8192;

/// A stream reading from a file, pipe or socket.
///
/// Regular files are seekable and report their size from the file metadata.
/// Anything else can only be read forward: seeks are limited to the bytes
/// still held in the buffer and the size is unknown.
///
/// In non-blocking mode the descriptor has `O_NONBLOCK` set and a read that
/// fails with [`ErrorKind::WouldBlock`] is reported as
/// [`ReadOutcome::Pending`].
#[derive(Debug)]
pub struct FileStream {
    file: File,
    /// Holds the bytes from `buf_offset` onward.
    buf: Vec<u8>,
    buf_offset: u64,
    pos: u64,
    /// Offset of the kernel file position, if we know it.
    file_pos: Option<u64>,
    chunk_size: usize,
    blocking: bool,
    seekable: bool,
}

impl FileStream {
    /// Create a blocking stream reading from `file`.
    ///
    /// Regular files are read from offset 0; for pipes and sockets offset 0
    /// is wherever the descriptor currently is.
    pub fn new(file: File) -> Result<Self> {
        let seekable = file.metadata()?.is_file();
        Ok(Self {
            file,
            buf: Vec::new(),
            buf_offset: 0,
            pos: 0,
            file_pos: if seekable { None } else { Some(0) },
            chunk_size: DEFAULT_CHUNK_SIZE,
            blocking: true,
            seekable,
        })
    }

    /// Open the file at `path` for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(File::open(path)?)
    }

    /// Create a non-blocking stream, setting `O_NONBLOCK` on `fd`.
    pub fn nonblocking(fd: impl Into<OwnedFd>) -> Result<Self> {
        let fd = fd.into();
        let flags = fcntl_getfl(&fd).map_err(std::io::Error::from)?;
        fcntl_setfl(&fd, flags | OFlags::NONBLOCK).map_err(std::io::Error::from)?;
        Ok(Self {
            blocking: false,
            ..Self::new(File::from(fd))?
        })
    }

    /// Set how many bytes each fill asks the kernel for.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Get a reference to the underlying file.
    pub fn get_ref(&self) -> &File {
        &self.file
    }

    fn buf_end(&self) -> u64 {
        self.buf_offset + self.buf.len() as u64
    }

    fn in_buffer(&self, offset: u64) -> bool {
        (self.buf_offset..=self.buf_end()).contains(&offset)
    }
}

impl Stream for FileStream {
    fn fill(&mut self) -> Result<ReadOutcome> {
        if self.in_buffer(self.pos) {
            let stale = (self.pos - self.buf_offset) as usize;
            self.buf.drain(..stale);
        } else {
            self.buf.clear();
        }
        self.buf_offset = self.pos;

        let end = self.buf_end();
        if self.file_pos != Some(end) {
            self.file.seek(SeekFrom::Start(end))?;
            self.file_pos = Some(end);
        }

        let old_len = self.buf.len();
        self.buf.resize(old_len + self.chunk_size, 0);
        let result = loop {
            match self.file.read(&mut self.buf[old_len..]) {
                Ok(n) => break Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };
        let n = *result.as_ref().unwrap_or(&0);
        self.buf.truncate(old_len + n);

        match result {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => {
                self.file_pos = Some(end + n as u64);
                trace!("file stream: read {n} bytes at offset {end}");
                Ok(ReadOutcome::Data(n))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock && !self.blocking => {
                Ok(ReadOutcome::Pending)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn buffer(&self) -> &[u8] {
        if self.in_buffer(self.pos) {
            &self.buf[(self.pos - self.buf_offset) as usize..]
        } else {
            &[]
        }
    }

    fn consume(&mut self, amount: usize) {
        debug_assert!(amount <= self.buffer().len());
        self.pos += amount as u64;
    }

    fn offset(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        if !self.seekable && !self.in_buffer(offset) {
            return Err(StreamError::NotSeekable { offset });
        }
        self.pos = offset;
        Ok(())
    }

    fn stat(&mut self, _exact: bool) -> Result<Option<u64>> {
        let metadata = self.file.metadata()?;
        Ok(metadata.is_file().then(|| metadata.len()))
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn is_seekable(&self) -> bool {
        self.seekable
    }
}
