//! Fixed prompt and user-facing strings.
//!
//! Both presentation layers (web page and CLI) and the pipeline read their
//! wording from here, so a notice looks the same wherever it is shown.

/// The single prompt sent after the image has been placed in the chat history.
///
/// Used when `AnalysisConfig::prompt` is left at its default.
pub const ANALYSIS_PROMPT: &str = "Analyze this medical image and provide a detailed report.";

/// Heading rendered above the model's answer.
pub const REPORT_HEADING: &str = "📋 Analysis Result:";

/// Warning shown when the user submits without choosing a file.
pub const NO_FILE_SELECTED: &str = "⚠️ Please upload an image before submitting.";

/// Error shown when the staged file is missing at upload time.
pub const STAGED_FILE_MISSING: &str = "⚠️ File not found. Please upload a valid image.";

/// Page title.
pub const APP_TITLE: &str = "SwastiCare: SympSolver 🩺";

/// Page subtitle.
pub const APP_SUBTITLE: &str = "An application that helps users identify medical images";

/// Label of the submit button.
pub const SUBMIT_LABEL: &str = "🩺 Generate Analysis";

/// Success notice after the remote service accepted the file.
pub fn uploaded_notice(display_name: &str, uri: &str) -> String {
    format!("✅ Uploaded file '{display_name}' as: {uri}")
}
