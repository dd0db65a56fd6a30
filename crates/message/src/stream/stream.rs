//! Byte stream handle used as message body.
//!
//! A [`Stream`] owns exactly one [`Resource`]: an in-memory buffer, an open file, or a
//! forward-only reader. The readable/writable/seekable flags are fixed when the stream is
//! created. Once [`Stream::detach`] or [`Stream::close`] has been called the stream is inert
//! and every operation except `detach`/`close` fails with [`StreamError::Detached`].
//!
//! Cloning a `Stream` produces a second handle to the same resource; this is how messages
//! share a body without copying it.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};
use triomphe::Arc;

use crate::ensure;
use crate::protocol::StreamError;
use crate::stream::OpenMode;

/// The raw resource behind a stream.
pub enum Resource {
    /// Growable in-memory buffer.
    Memory(Cursor<Vec<u8>>),
    /// An open file handle.
    File(File),
    /// A forward-only source, e.g. a socket or a pipe. Never writable or seekable.
    Reader(Box<dyn Read + Send>),
}

impl Resource {
    fn len(&self) -> io::Result<Option<u64>> {
        match self {
            Resource::Memory(cursor) => Ok(Some(cursor.get_ref().len() as u64)),
            Resource::File(file) => file.metadata().map(|metadata| Some(metadata.len())),
            Resource::Reader(_) => Ok(None),
        }
    }

    fn is_seekable(&self) -> bool {
        !matches!(self, Resource::Reader(_))
    }

    /// Bytes left between the cursor and the end, when the resource knows its length.
    fn remaining(&mut self) -> Option<u64> {
        match self {
            Resource::Memory(cursor) => Some((cursor.get_ref().len() as u64).saturating_sub(cursor.position())),
            Resource::File(file) => {
                let len = file.metadata().ok()?.len();
                Some(len.saturating_sub(file.stream_position().ok()?))
            }
            Resource::Reader(_) => None,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Resource::Memory(cursor) => cursor.read(buf),
            Resource::File(file) => file.read(buf),
            Resource::Reader(reader) => reader.read(buf),
        }
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self {
            Resource::Memory(cursor) => cursor.read_to_end(buf),
            Resource::File(file) => file.read_to_end(buf),
            Resource::Reader(reader) => reader.read_to_end(buf),
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self {
            Resource::Memory(cursor) => cursor.write(data),
            Resource::File(file) => file.write(data),
            Resource::Reader(_) => Err(io::Error::from(io::ErrorKind::Unsupported)),
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Resource::Memory(cursor) => cursor.seek(pos),
            Resource::File(file) => file.seek(pos),
            Resource::Reader(_) => Err(io::Error::from(io::ErrorKind::Unsupported)),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Memory(cursor) => f
                .debug_struct("Memory")
                .field("len", &cursor.get_ref().len())
                .field("position", &cursor.position())
                .finish(),
            Resource::File(file) => f.debug_tuple("File").field(file).finish(),
            Resource::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// Largest buffer a single read allocates when the resource length is unknown
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Metadata describing an open stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMetadata {
    pub mode: &'static str,
    pub seekable: bool,
    pub path: Option<PathBuf>,
}

#[derive(Debug)]
struct StreamState {
    resource: Option<Resource>,
    mode: OpenMode,
    readable: bool,
    writable: bool,
    seekable: bool,
    size: Option<u64>,
    path: Option<PathBuf>,
    ended: bool,
}

impl StreamState {
    fn resource(&mut self) -> Result<&mut Resource, StreamError> {
        self.resource.as_mut().ok_or(StreamError::Detached)
    }

    fn read(&mut self, len: usize) -> Result<Bytes, StreamError> {
        ensure!(self.resource.is_some(), StreamError::Detached);
        ensure!(self.readable, StreamError::NotReadable);

        let resource = self.resource()?;
        let capacity = match resource.remaining() {
            Some(remaining) => usize::try_from(remaining).map_or(len, |remaining| len.min(remaining)),
            None => len.min(READ_CHUNK_SIZE),
        };
        let mut buf = vec![0; capacity];
        let read = resource.read(&mut buf)?;
        if read == 0 && len > 0 {
            self.ended = true;
        }
        buf.truncate(read);
        Ok(Bytes::from(buf))
    }

    fn contents(&mut self) -> Result<Bytes, StreamError> {
        ensure!(self.resource.is_some(), StreamError::Detached);
        ensure!(self.readable, StreamError::NotReadable);

        let mut buf = Vec::new();
        self.resource()?.read_to_end(&mut buf)?;
        self.ended = true;
        Ok(Bytes::from(buf))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        ensure!(self.resource.is_some(), StreamError::Detached);
        ensure!(self.writable, StreamError::NotWritable);

        self.size = None;
        let written = self.resource()?.write(data)?;
        Ok(written)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        ensure!(self.resource.is_some(), StreamError::Detached);
        ensure!(self.seekable, StreamError::NotSeekable);

        let offset = self.resource()?.seek(pos)?;
        self.ended = false;
        Ok(offset)
    }

    fn tell(&mut self) -> Result<u64, StreamError> {
        ensure!(self.resource.is_some(), StreamError::Detached);
        ensure!(self.seekable, StreamError::NotSeekable);

        Ok(self.resource()?.seek(SeekFrom::Current(0))?)
    }

    fn size(&mut self) -> Option<u64> {
        if self.size.is_none() {
            self.size = self.resource.as_ref()?.len().ok().flatten();
        }
        self.size
    }

    fn eof(&mut self) -> bool {
        if self.resource.is_none() || self.ended {
            return true;
        }
        if !self.seekable {
            return false;
        }
        match (self.tell(), self.size()) {
            (Ok(position), Some(size)) => position >= size,
            _ => false,
        }
    }

    fn detach(&mut self) -> Option<Resource> {
        let resource = self.resource.take()?;
        self.readable = false;
        self.writable = false;
        self.seekable = false;
        self.size = None;
        self.path = None;
        Some(resource)
    }
}

/// A shared handle to a readable/writable/seekable byte resource.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<Mutex<StreamState>>,
}

impl Stream {
    /// Creates an empty in-memory stream that can be read, written and sought.
    pub fn empty() -> Self {
        Self::from_resource(Resource::Memory(Cursor::new(Vec::new())), OpenMode::READ_WRITE)
    }

    /// Creates an in-memory stream holding `bytes`, positioned at offset 0.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        let stream = Self::from_resource(Resource::Memory(Cursor::new(bytes)), OpenMode::READ_WRITE);
        stream.inner.lock().size = Some(size);
        stream
    }

    /// Adopts `resource` as-is, without moving its cursor.
    ///
    /// A [`Resource::Reader`] is never writable or seekable whatever `mode` says.
    pub fn from_resource(resource: Resource, mode: OpenMode) -> Self {
        let seekable = resource.is_seekable();
        let writable = mode.is_writable() && seekable;
        let state = StreamState {
            resource: Some(resource),
            mode,
            readable: mode.is_readable(),
            writable,
            seekable,
            size: None,
            path: None,
            ended: false,
        };
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    /// Wraps a forward-only reader.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::from_resource(Resource::Reader(Box::new(reader)), OpenMode::READ)
    }

    /// Opens the file at `path` with an fopen-style `mode` such as `"r"`, `"w+"` or `"a"`.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let open_mode: OpenMode = mode.parse()?;
        let file = open_mode.open_options().open(path)?;
        trace!(path = %path.display(), mode = open_mode.as_str(), "opened file stream");

        let stream = Self::from_resource(Resource::File(file), open_mode);
        stream.inner.lock().path = Some(path.to_path_buf());
        Ok(stream)
    }

    /// Reads up to `len` bytes from the current position.
    pub fn read(&self, len: usize) -> Result<Bytes, StreamError> {
        self.inner.lock().read(len)
    }

    /// Writes `data` at the current position, returning the number of bytes written.
    pub fn write(&self, data: &[u8]) -> Result<usize, StreamError> {
        self.inner.lock().write(data)
    }

    pub fn seek(&self, pos: SeekFrom) -> Result<u64, StreamError> {
        self.inner.lock().seek(pos)
    }

    pub fn rewind(&self) -> Result<(), StreamError> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    pub fn tell(&self) -> Result<u64, StreamError> {
        self.inner.lock().tell()
    }

    /// Size in bytes, if known. Always `None` once detached.
    pub fn size(&self) -> Option<u64> {
        self.inner.lock().size()
    }

    pub fn eof(&self) -> bool {
        self.inner.lock().eof()
    }

    pub fn is_readable(&self) -> bool {
        self.inner.lock().readable
    }

    pub fn is_writable(&self) -> bool {
        self.inner.lock().writable
    }

    pub fn is_seekable(&self) -> bool {
        self.inner.lock().seekable
    }

    /// Reads every remaining byte from the current position.
    pub fn contents(&self) -> Result<Bytes, StreamError> {
        self.inner.lock().contents()
    }

    /// Takes the resource out of the stream, leaving it inert. Returns `None` when already detached.
    pub fn detach(&self) -> Option<Resource> {
        self.inner.lock().detach()
    }

    /// Releases the resource and detaches the stream.
    pub fn close(&self) {
        if let Some(resource) = self.detach() {
            drop(resource);
        }
    }

    pub fn metadata(&self) -> Option<StreamMetadata> {
        let state = self.inner.lock();
        state.resource.as_ref()?;
        Some(StreamMetadata { mode: state.mode.as_str(), seekable: state.seekable, path: state.path.clone() })
    }

    /// Returns `true` when both handles point at the same underlying stream.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    fn read_from_start(&self) -> Result<Bytes, StreamError> {
        let mut state = self.inner.lock();
        if state.seekable {
            state.seek(SeekFrom::Start(0))?;
        }
        state.contents()
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::empty()
    }
}

/// Renders the whole stream from offset 0. Failures render as an empty string.
impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.read_from_start() {
            Ok(bytes) => f.write_str(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                debug!(cause = %e, "stream could not be rendered, yield empty string");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(state) => f
                .debug_struct("Stream")
                .field("resource", &state.resource)
                .field("readable", &state.readable)
                .field("writable", &state.writable)
                .field("seekable", &state.seekable)
                .finish(),
            None => f.write_str("Stream { <locked> }"),
        }
    }
}

impl From<&str> for Stream {
    fn from(value: &str) -> Self {
        Self::from_bytes(value)
    }
}

impl From<String> for Stream {
    fn from(value: String) -> Self {
        Self::from_bytes(value)
    }
}

impl From<Vec<u8>> for Stream {
    fn from(value: Vec<u8>) -> Self {
        Self::from_bytes(value)
    }
}

impl From<&[u8]> for Stream {
    fn from(value: &[u8]) -> Self {
        Self::from_bytes(value)
    }
}

impl From<Bytes> for Stream {
    fn from(value: Bytes) -> Self {
        Self::from_bytes(value)
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::process;

    use super::*;

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("broken pipe"))
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("micro-message-{}-{name}", process::id()))
    }

    #[test]
    fn from_string_starts_at_zero() {
        let stream = Stream::from("hello world");

        assert_eq!(stream.tell().unwrap(), 0);
        assert_eq!(stream.size(), Some(11));
        assert_eq!(stream.read(5).unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(stream.tell().unwrap(), 5);
        assert_eq!(stream.contents().unwrap(), Bytes::from_static(b" world"));
        assert!(stream.eof());
    }

    #[test]
    fn read_more_than_available() {
        let stream = Stream::from("abc");
        assert_eq!(stream.read(usize::MAX).unwrap(), Bytes::from_static(b"abc"));
        assert!(stream.eof());
        assert_eq!(stream.read(usize::MAX).unwrap(), Bytes::new());

        let reader = Stream::from_reader(Cursor::new(b"forward".to_vec()));
        assert_eq!(reader.read(usize::MAX).unwrap(), Bytes::from_static(b"forward"));
    }

    #[test]
    fn empty_is_read_write_seek() {
        let stream = Stream::empty();

        assert!(stream.is_readable());
        assert!(stream.is_writable());
        assert!(stream.is_seekable());
        assert_eq!(stream.size(), Some(0));
        assert!(stream.eof());
    }

    #[test]
    fn write_invalidates_size() {
        let stream = Stream::empty();
        assert_eq!(stream.size(), Some(0));

        assert_eq!(stream.write(b"abc").unwrap(), 3);
        assert_eq!(stream.size(), Some(3));
        assert_eq!(stream.to_string(), "abc");
    }

    #[test]
    fn write_overwrites_at_cursor() {
        let stream = Stream::from("abcdef");
        stream.seek(SeekFrom::Start(2)).unwrap();
        stream.write(b"XY").unwrap();
        assert_eq!(stream.to_string(), "abXYef");
    }

    #[test]
    fn display_rewinds() {
        let stream = Stream::from("content");
        stream.read(3).unwrap();
        assert_eq!(stream.to_string(), "content");
    }

    #[test]
    fn display_swallows_errors() {
        let stream = Stream::from_reader(BrokenReader);
        assert_eq!(stream.to_string(), "");
        assert!(matches!(stream.read(1), Err(StreamError::Io { .. })));
    }

    #[test]
    fn reader_is_forward_only() {
        let stream = Stream::from_reader(Cursor::new(b"abc".to_vec()));

        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert!(!stream.is_seekable());
        assert_eq!(stream.size(), None);
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(StreamError::NotSeekable)));
        assert!(matches!(stream.write(b"x"), Err(StreamError::NotWritable)));
        assert!(!stream.eof());
        assert_eq!(stream.contents().unwrap(), Bytes::from_static(b"abc"));
        assert!(stream.eof());
    }

    #[test]
    fn detach_is_final() {
        let stream = Stream::from("data");
        let resource = stream.detach();
        assert!(matches!(resource, Some(Resource::Memory(_))));

        assert!(matches!(stream.read(1), Err(StreamError::Detached)));
        assert!(matches!(stream.write(b"x"), Err(StreamError::Detached)));
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(StreamError::Detached)));
        assert!(matches!(stream.rewind(), Err(StreamError::Detached)));
        assert!(matches!(stream.tell(), Err(StreamError::Detached)));
        assert!(matches!(stream.contents(), Err(StreamError::Detached)));
        assert_eq!(stream.size(), None);
        assert!(stream.eof());
        assert!(!stream.is_readable());
        assert!(stream.metadata().is_none());
        assert_eq!(stream.to_string(), "");

        assert!(stream.detach().is_none());
        stream.close();
    }

    #[test]
    fn close_implies_detach() {
        let stream = Stream::from("data");
        stream.close();
        assert!(stream.detach().is_none());
        assert!(matches!(stream.read(1), Err(StreamError::Detached)));
    }

    #[test]
    fn clones_share_the_resource() {
        let stream = Stream::from("abcdef");
        let other = stream.clone();

        other.read(2).unwrap();
        assert_eq!(stream.tell().unwrap(), 2);
        assert!(Stream::ptr_eq(&stream, &other));
        assert!(!Stream::ptr_eq(&stream, &Stream::from("abcdef")));
    }

    #[test]
    fn adopted_resource_keeps_position() {
        let mut cursor = Cursor::new(b"0123456789".to_vec());
        cursor.set_position(4);
        let stream = Stream::from_resource(Resource::Memory(cursor), OpenMode::READ_WRITE);

        assert_eq!(stream.tell().unwrap(), 4);
        assert_eq!(stream.contents().unwrap(), Bytes::from_static(b"456789"));
    }

    #[test]
    fn file_stream_modes() {
        let path = temp_path("modes.txt");
        fs::write(&path, "file body").unwrap();

        let read_only = Stream::open(&path, "r").unwrap();
        assert!(read_only.is_readable());
        assert!(!read_only.is_writable());
        assert!(matches!(read_only.write(b"x"), Err(StreamError::NotWritable)));
        assert_eq!(read_only.to_string(), "file body");
        assert_eq!(read_only.size(), Some(9));

        let metadata = read_only.metadata().unwrap();
        assert_eq!(metadata.mode, "r");
        assert_eq!(metadata.path.as_deref(), Some(path.as_path()));
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["mode"], "r");
        assert_eq!(json["seekable"], true);

        let write_only = Stream::open(&path, "w").unwrap();
        assert!(!write_only.is_readable());
        assert!(matches!(write_only.read(1), Err(StreamError::NotReadable)));
        assert_eq!(write_only.to_string(), "");
        write_only.write(b"new").unwrap();
        write_only.close();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_missing_file_fails() {
        let path = temp_path("does-not-exist.txt");
        assert!(matches!(Stream::open(&path, "r"), Err(StreamError::Io { .. })));
        assert!(matches!(Stream::open(&path, "z"), Err(StreamError::InvalidMode { .. })));
    }
}
