//! Files uploaded with a server request.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use triomphe::Arc;

use crate::ensure;
use crate::protocol::{MessageError, StreamError};
use crate::stream::Stream;

/// Outcome of an upload, numbered like the `UPLOAD_ERR_*` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Ok = 0,
    IniSize = 1,
    FormSize = 2,
    Partial = 3,
    NoFile = 4,
    NoTmpDir = 6,
    CantWrite = 7,
    Extension = 8,
}

impl TryFrom<u8> for UploadStatus {
    type Error = MessageError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => UploadStatus::Ok,
            1 => UploadStatus::IniSize,
            2 => UploadStatus::FormSize,
            3 => UploadStatus::Partial,
            4 => UploadStatus::NoFile,
            6 => UploadStatus::NoTmpDir,
            7 => UploadStatus::CantWrite,
            8 => UploadStatus::Extension,
            _ => return Err(MessageError::upload(format!("invalid upload status {code}"))),
        })
    }
}

#[derive(Debug, Clone)]
enum Source {
    Stream(Stream),
    File(PathBuf),
}

/// An uploaded file, backed by a stream or by a temporary file on disk.
///
/// The content can be moved exactly once; clones share the moved state.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    source: Source,
    size: Option<u64>,
    status: UploadStatus,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    moved: Arc<AtomicBool>,
}

impl UploadedFile {
    fn new(source: Source, size: Option<u64>, status: UploadStatus) -> Self {
        Self { source, size, status, client_filename: None, client_media_type: None, moved: Arc::new(AtomicBool::new(false)) }
    }

    pub fn from_stream(stream: Stream, status: UploadStatus) -> Self {
        let size = stream.size();
        Self::new(Source::Stream(stream), size, status)
    }

    pub fn from_path(path: impl Into<PathBuf>, size: Option<u64>, status: UploadStatus) -> Self {
        Self::new(Source::File(path.into()), size, status)
    }

    #[must_use]
    pub fn with_client_filename(mut self, filename: &str) -> Self {
        self.client_filename = Some(filename.to_string());
        self
    }

    #[must_use]
    pub fn with_client_media_type(mut self, media_type: &str) -> Self {
        self.client_media_type = Some(media_type.to_string());
        self
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    pub fn is_moved(&self) -> bool {
        self.moved.load(Ordering::Acquire)
    }

    fn check_available(&self) -> Result<(), MessageError> {
        ensure!(
            self.status == UploadStatus::Ok,
            MessageError::upload(format!("upload failed with status {:?}", self.status))
        );
        ensure!(!self.is_moved(), MessageError::upload("uploaded file has already been moved"));
        Ok(())
    }

    /// A stream over the uploaded content.
    pub fn stream(&self) -> Result<Stream, MessageError> {
        self.check_available()?;
        match &self.source {
            Source::Stream(stream) => Ok(stream.clone()),
            Source::File(path) => Ok(Stream::open(path, "r")?),
        }
    }

    /// Moves the content to `target`. Only the first successful call does anything; later
    /// calls fail.
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<(), MessageError> {
        let target = target.as_ref();
        self.check_available()?;
        ensure!(!target.as_os_str().is_empty(), MessageError::upload("target path is empty"));

        match &self.source {
            Source::File(path) => {
                if fs::rename(path, target).is_err() {
                    fs::copy(path, target).map_err(StreamError::io)?;
                    fs::remove_file(path).map_err(StreamError::io)?;
                }
            }
            Source::Stream(stream) => {
                if stream.is_seekable() {
                    stream.rewind()?;
                }
                let contents = stream.contents()?;
                fs::write(target, &contents).map_err(StreamError::io)?;
            }
        }

        let first = self.moved.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok();
        ensure!(first, MessageError::upload("uploaded file has already been moved"));
        Ok(())
    }
}

impl PartialEq for UploadedFile {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.moved, &other.moved)
    }
}
