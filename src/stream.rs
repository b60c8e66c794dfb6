//! Synchronous body streams.
//!
//! [`Stream`] is a seekable byte stream over an in-memory buffer or a file.
//! [`Body`] is the handle a message holds on to: cloning a message clones the
//! handle, never the bytes behind it.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use crate::error::{Error, Result};

const CHUNK: usize = 64 * 1024;

/// How [`Stream::open`] opens a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// Existing file, read only.
    Read,
    /// Create or truncate, write only.
    Write,
    /// Create if missing, writes go to the end.
    Append,
    /// Existing file, read and write.
    ReadWrite,
    /// Create or truncate, read and write.
    Truncate,
}

impl OpenMode {
    fn readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite | Self::Truncate)
    }

    fn writable(self) -> bool {
        !matches!(self, Self::Read)
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read      => options.read(true),
            Self::Write     => options.write(true).create(true).truncate(true),
            Self::Append    => options.append(true).create(true),
            Self::ReadWrite => options.read(true).write(true),
            Self::Truncate  => options.read(true).write(true).create(true).truncate(true),
        };
        options
    }
}

// ── Stream ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Source {
    Memory(Cursor<Vec<u8>>),
    File(File),
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(c) => c.read(buf),
            Self::File(f) => f.read(buf),
        }
    }
}

impl Write for Source {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Memory(c) => c.write(buf),
            Self::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Memory(c) => c.flush(),
            Self::File(f) => f.flush(),
        }
    }
}

impl Seek for Source {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Memory(c) => c.seek(pos),
            Self::File(f) => f.seek(pos),
        }
    }
}

/// A seekable byte stream.
///
/// Once [`close`](Stream::close)d, every capability reports `false` and every
/// I/O call fails with [`Error::StreamClosed`].
#[derive(Debug)]
pub struct Stream {
    source: Option<Source>,
    readable: bool,
    writable: bool,
}

impl Stream {
    /// An empty, readable and writable in-memory stream.
    pub fn memory() -> Self {
        Self {
            source: Some(Source::Memory(Cursor::new(Vec::new()))),
            readable: true,
            writable: true,
        }
    }

    /// A read-only in-memory stream over `data`.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            source: Some(Source::Memory(Cursor::new(data.into()))),
            readable: true,
            writable: false,
        }
    }

    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let file = mode.options().open(path)?;
        Ok(Self::from_file(file, mode.readable(), mode.writable()))
    }

    /// Wraps an already opened file. The caller states how it was opened.
    pub fn from_file(file: File, readable: bool, writable: bool) -> Self {
        Self { source: Some(Source::File(file)), readable, writable }
    }

    /// Releases the underlying buffer or file handle.
    pub fn close(&mut self) {
        self.source = None;
    }

    pub fn is_closed(&self) -> bool { self.source.is_none() }
    pub fn is_readable(&self) -> bool { self.source.is_some() && self.readable }
    pub fn is_writable(&self) -> bool { self.source.is_some() && self.writable }
    pub fn is_seekable(&self) -> bool { self.source.is_some() }

    /// Total length in bytes, `None` once closed.
    pub fn size(&self) -> Option<u64> {
        match self.source.as_ref()? {
            Source::Memory(c) => Some(c.get_ref().len() as u64),
            Source::File(f) => f.metadata().ok().map(|m| m.len()),
        }
    }

    /// Current cursor position, `None` once closed.
    pub fn tell(&self) -> Option<u64> {
        match self.source.as_ref()? {
            Source::Memory(c) => Some(c.position()),
            Source::File(f) => {
                let mut f: &File = f;
                f.stream_position().ok()
            }
        }
    }

    /// `true` when the cursor is at or past the end, or the stream is closed.
    pub fn eof(&self) -> bool {
        match (self.tell(), self.size()) {
            (Some(pos), Some(size)) => pos >= size,
            _ => true,
        }
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.source_mut()?.seek(pos)?)
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Reads up to `len` bytes; fewer only at the end of the stream.
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let source = self.readable_source()?;
        let mut buf = Vec::with_capacity(len.min(CHUNK));
        source.take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Reads from the cursor to the end of the stream.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let source = self.readable_source()?;
        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Writes all of `data` at the cursor and returns its length.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.source.is_some() && !self.writable {
            return Err(Error::StreamNotWritable);
        }
        let source = self.source_mut()?;
        source.write_all(data)?;
        source.flush()?;
        Ok(data.len())
    }

    /// The whole content from the start, leaving the cursor where it was.
    pub fn contents(&mut self) -> Result<Bytes> {
        let source = self.readable_source()?;
        let pos = source.stream_position()?;
        source.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        let read = source.read_to_end(&mut buf);
        source.seek(SeekFrom::Start(pos))?;
        read?;
        Ok(Bytes::from(buf))
    }

    /// Copies everything from the cursor onwards into `target`, chunk by chunk.
    pub fn copy_to(&mut self, target: &mut Stream) -> Result<u64> {
        let mut total = 0;
        loop {
            let chunk = self.read(CHUNK)?;
            if chunk.is_empty() {
                return Ok(total);
            }
            total += target.write(&chunk)? as u64;
        }
    }

    fn source_mut(&mut self) -> Result<&mut Source> {
        self.source.as_mut().ok_or(Error::StreamClosed)
    }

    fn readable_source(&mut self) -> Result<&mut Source> {
        if self.source.is_some() && !self.readable {
            return Err(Error::StreamNotReadable);
        }
        self.source_mut()
    }
}

// ── Body ─────────────────────────────────────────────────────────────────────

/// A message body: a shared handle to one [`Stream`].
///
/// Clones refer to the same stream. Replacing a message's body drops that
/// message's handle but never closes the stream; whoever still holds a
/// handle keeps a usable stream.
#[derive(Clone)]
pub struct Body(Arc<Mutex<Stream>>);

impl Body {
    pub fn new(stream: Stream) -> Self {
        Self(Arc::new(Mutex::new(stream)))
    }

    /// Exclusive access to the stream for reads, writes and seeks.
    pub fn lock(&self) -> MutexGuard<'_, Stream> {
        self.0.lock()
    }

    /// See [`Stream::contents`].
    pub fn contents(&self) -> Result<Bytes> {
        self.lock().contents()
    }

    pub fn size(&self) -> Option<u64> {
        self.lock().size()
    }

    /// `true` when both handles refer to the same stream.
    pub fn ptr_eq(&self, other: &Body) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // formatting must not block on a guard held by the caller
        match self.0.try_lock() {
            Some(stream) => f.debug_struct("Body").field("size", &stream.size()).finish(),
            None => f.debug_struct("Body").field("size", &format_args!("<locked>")).finish(),
        }
    }
}

impl From<Stream> for Body {
    fn from(stream: Stream) -> Self { Self::new(stream) }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self { Self::new(Stream::from_bytes(data)) }
}

impl From<Bytes> for Body {
    fn from(data: Bytes) -> Self { Self::new(Stream::from_bytes(data)) }
}

impl From<String> for Body {
    fn from(data: String) -> Self { Self::new(Stream::from_bytes(data)) }
}

impl From<&str> for Body {
    fn from(data: &str) -> Self { Self::new(Stream::from_bytes(data)) }
}
