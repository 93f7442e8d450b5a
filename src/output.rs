//! Data types that flow in and out of an analysis run.
//!
//! [`UploadedImage`] is what a presentation layer hands in; an
//! [`AnalysisOutcome`] is what it gets back. Everything here is
//! request-scoped: nothing is persisted between runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Raw bytes of an image chosen by the user, as received by the front end.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Filename as declared by the client. Never used as an on-disk path.
    pub filename: String,
    /// MIME type declared by the client, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The accepted image kind implied by the filename extension.
    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::from_filename(&self.filename)
    }
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Image formats the upload form accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Classify by extension (case-insensitive). `jpg` and `jpeg` are both JPEG.
    ///
    /// The text after the last dot counts as the extension even when the
    /// name starts with it, so `.png` is a PNG.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let name = Path::new(filename).file_name()?.to_str()?;
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    /// Extension used for the staged file.
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// Opaque reference to a file held by the inference provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// Provider resource name, e.g. `files/abc123`.
    pub name: String,
    pub display_name: String,
    pub uri: String,
    /// MIME type the file was registered with.
    pub mime_type: String,
}

/// Severity of a user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The rendered answer of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub heading: String,
    pub text: String,
}

/// Timing and token counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Bytes written to the staging file (0 when nothing was staged).
    pub staged_bytes: usize,
    pub upload_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
}

/// Everything a front end needs to display after a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Messages in the order they were raised.
    pub notices: Vec<Notice>,
    pub file: Option<FileHandle>,
    pub report: Option<AnalysisReport>,
    pub stats: AnalysisStats,
}

impl AnalysisOutcome {
    /// The model's text, if the run got that far.
    pub fn report_text(&self) -> Option<&str> {
        self.report.as_ref().map(|r| r.text.as_str())
    }

    pub fn has_errors(&self) -> bool {
        self.notices.iter().any(|n| n.level == NoticeLevel::Error)
    }
}
