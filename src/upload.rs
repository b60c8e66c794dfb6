//! Files received through a multipart form upload.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::stream::{Body, OpenMode, Stream};

/// Outcome reported by the server for one uploaded file.
///
/// The numeric codes follow the CGI upload convention; `5` is unassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UploadErrorCode {
    Ok = 0,
    IniSize = 1,
    FormSize = 2,
    Partial = 3,
    NoFile = 4,
    NoTmpDir = 6,
    CantWrite = 7,
    Extension = 8,
}

impl UploadErrorCode {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Ok        => "no error",
            Self::IniSize   => "file exceeds the server size limit",
            Self::FormSize  => "file exceeds the form size limit",
            Self::Partial   => "file was only partially uploaded",
            Self::NoFile    => "no file was uploaded",
            Self::NoTmpDir  => "missing temporary directory",
            Self::CantWrite => "failed to write file to disk",
            Self::Extension => "upload stopped by an extension",
        }
    }
}

impl fmt::Display for UploadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.code())
    }
}

#[derive(Debug)]
enum Source {
    Path(PathBuf),
    Stream(Body),
}

/// One uploaded file and the client's description of it.
///
/// Moving takes `&self`: the file can be moved exactly once even when the
/// value is shared between several request copies.
#[derive(Debug)]
pub struct UploadedFile {
    source: Source,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    size: Option<u64>,
    error: UploadErrorCode,
    moved: Mutex<bool>,
}

impl UploadedFile {
    fn with_source(source: Source, size: Option<u64>) -> Self {
        Self {
            source,
            client_filename: None,
            client_media_type: None,
            size,
            error: UploadErrorCode::Ok,
            moved: Mutex::new(false),
        }
    }

    /// A file already stored on disk, typically in the server's temp dir.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size = fs::metadata(&path).ok().map(|m| m.len());
        Self::with_source(Source::Path(path), size)
    }

    pub fn from_stream(stream: Stream) -> Self {
        let size = stream.size();
        Self::with_source(Source::Stream(Body::new(stream)), size)
    }

    /// Builds from the per-file field map a server produces: `tmp_name`,
    /// `name`, `type`, `size` and `error`.
    ///
    /// A missing `error` means success. An unknown error code is reported as
    /// [`UploadErrorCode::NoFile`]. An unparsable `size` is treated as unknown.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut file = Self::with_source(Source::Path(PathBuf::new()), None);
        for (key, value) in fields {
            let value = value.into();
            match key.as_ref() {
                "tmp_name" => file.source = Source::Path(PathBuf::from(value)),
                "name" => file.client_filename = Some(value),
                "type" => file.client_media_type = Some(value),
                "size" => file.size = value.trim().parse().ok(),
                "error" => {
                    file.error = value
                        .trim()
                        .parse()
                        .ok()
                        .and_then(UploadErrorCode::from_code)
                        .unwrap_or(UploadErrorCode::NoFile);
                }
                _ => {}
            }
        }
        file
    }

    #[must_use]
    pub fn with_client_filename(mut self, name: impl Into<String>) -> Self {
        self.client_filename = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_client_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.client_media_type = Some(media_type.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: UploadErrorCode) -> Self {
        self.error = error;
        self
    }

    pub fn client_filename(&self) -> Option<&str> { self.client_filename.as_deref() }
    pub fn client_media_type(&self) -> Option<&str> { self.client_media_type.as_deref() }
    pub fn size(&self) -> Option<u64> { self.size }
    pub fn error(&self) -> UploadErrorCode { self.error }

    pub fn was_moved(&self) -> bool {
        *self.moved.lock()
    }

    /// A readable stream over the upload's content.
    pub fn stream(&self) -> Result<Body> {
        self.check_ok()?;
        if *self.moved.lock() {
            return Err(Error::UploadAlreadyMoved);
        }
        match &self.source {
            Source::Path(path) => Ok(Body::new(Stream::open(path, OpenMode::Read)?)),
            Source::Stream(body) => Ok(body.clone()),
        }
    }

    /// Moves the upload to `destination`, replacing any file there.
    pub fn move_to_file(&self, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        self.move_with(|source| match source {
            Source::Path(path) => {
                // rename fails across filesystems; fall back to copy + remove
                if fs::rename(path, destination).is_err() {
                    fs::copy(path, destination)?;
                    fs::remove_file(path)?;
                }
                Ok(())
            }
            Source::Stream(body) => {
                let mut target = Stream::open(destination, OpenMode::Write)?;
                copy_from_start(&mut body.lock(), &mut target)
            }
        })?;
        debug!(destination = %destination.display(), "moved upload");
        Ok(())
    }

    /// Copies the upload's content into `target` at its current position.
    pub fn move_to_stream(&self, target: &mut Stream) -> Result<()> {
        self.move_with(|source| match source {
            Source::Path(path) => copy_from_start(&mut Stream::open(path, OpenMode::Read)?, target),
            Source::Stream(body) => copy_from_start(&mut body.lock(), target),
        })
    }

    fn move_with(&self, op: impl FnOnce(&Source) -> Result<()>) -> Result<()> {
        self.check_ok()?;
        let mut moved = self.moved.lock();
        if *moved {
            return Err(Error::UploadAlreadyMoved);
        }
        op(&self.source)?;
        *moved = true;
        Ok(())
    }

    fn check_ok(&self) -> Result<()> {
        match self.error {
            UploadErrorCode::Ok => Ok(()),
            code => Err(Error::UploadFailed(code)),
        }
    }
}

fn copy_from_start(source: &mut Stream, target: &mut Stream) -> Result<()> {
    source.rewind()?;
    source.copy_to(target)?;
    Ok(())
}
