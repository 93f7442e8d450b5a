//! Staging: write uploaded bytes to a local temporary file.
//!
//! The provider's upload call reads from a path, so the bytes have to land
//! on disk first. The file name is `temp_<random>.<ext>`: the client's
//! filename only contributes its (validated) extension, so a name like
//! `../../etc/passwd.png` cannot steer where the bytes are written, and two
//! uploads of `scan.png` never collide.
//!
//! [`StagedFile`] owns the file. [`StagedFile::cleanup`] removes it and
//! reports the outcome; if the guard is dropped instead (early return,
//! `?`, panic) the underlying [`tempfile::NamedTempFile`] removes it.

use crate::error::AnalysisError;
use crate::output::UploadedImage;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Prefix of every staged file name.
pub const STAGED_PREFIX: &str = "temp_";

/// A staged upload. The file exists until [`cleanup`](Self::cleanup) or drop.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    len: usize,
}

impl StagedFile {
    /// Write `upload` into a fresh file inside `dir`.
    ///
    /// # Errors
    /// - [`AnalysisError::UnsupportedImageType`] if the filename does not end
    ///   in `.png`, `.jpg` or `.jpeg`; nothing is written in that case.
    /// - [`AnalysisError::StagingFailed`] on any I/O failure.
    pub fn create(dir: &Path, upload: &UploadedImage) -> Result<Self, AnalysisError> {
        let kind = upload
            .kind()
            .ok_or_else(|| AnalysisError::UnsupportedImageType {
                filename: upload.filename.clone(),
            })?;

        let staging_failed = |source: io::Error| AnalysisError::StagingFailed {
            path: dir.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(staging_failed)?;

        let suffix = format!(".{}", kind.extension());
        let mut file = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(&suffix)
            .rand_bytes(16)
            .tempfile_in(dir)
            .map_err(staging_failed)?;

        file.write_all(&upload.bytes).map_err(staging_failed)?;
        file.flush().map_err(staging_failed)?;

        debug!(
            "Staged {} ({} bytes) at {}",
            upload.filename,
            upload.bytes.len(),
            file.path().display()
        );

        Ok(Self {
            file,
            len: upload.bytes.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Delete the staged file, returning the path it had.
    ///
    /// A file that is already gone counts as cleaned.
    pub fn cleanup(self) -> Result<PathBuf, (PathBuf, io::Error)> {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path),
            Err(e) => Err((path, e)),
        }
    }
}
