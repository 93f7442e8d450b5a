//! Rendering: turn the model's answer into a report section.
//!
//! The text is shown as returned. No cleanup rules are applied: what the
//! model says is what the user reads.

use crate::output::{AnalysisReport, Notice, NoticeLevel};
use crate::prompts::REPORT_HEADING;

/// Wrap `text` in a report with the standard heading.
pub fn build_report(text: &str) -> AnalysisReport {
    AnalysisReport {
        heading: REPORT_HEADING.to_string(),
        text: text.to_string(),
    }
}

impl AnalysisReport {
    /// Markdown section: `### <heading>`, a blank line, then the text.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("### {}\n\n{}", self.heading, self.text);
        if !md.ends_with('\n') {
            md.push('\n');
        }
        md
    }

    /// HTML section. The text is escaped and keeps its line breaks.
    pub fn to_html(&self) -> String {
        format!(
            "<section class=\"report\">\n<h3>{}</h3>\n<div class=\"report-text\">{}</div>\n</section>\n",
            escape_html(&self.heading),
            escape_html(&self.text)
        )
    }
}

impl Notice {
    /// Single-line plain-text form used by the CLI.
    pub fn to_line(&self) -> String {
        let tag = match self.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        format!("[{tag}] {}", self.message)
    }

    pub fn to_html(&self) -> String {
        let class = match self.level {
            NoticeLevel::Success => "notice success",
            NoticeLevel::Warning => "notice warning",
            NoticeLevel::Error => "notice error",
        };
        format!(
            "<div class=\"{class}\" role=\"status\">{}</div>\n",
            escape_html(&self.message)
        )
    }
}

/// Minimal HTML escaping for text content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
