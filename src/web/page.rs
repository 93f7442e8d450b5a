//! The single HTML page.
//!
//! Server-rendered, no JavaScript: the form posts to `/analyze` and the
//! response is the same page with notices and the report filled in.

use crate::output::{AnalysisReport, Notice};
use crate::pipeline::render::escape_html;
use crate::prompts::{APP_SUBTITLE, APP_TITLE, SUBMIT_LABEL};

const STYLE: &str = r#"
body { font-family: system-ui, -apple-system, "Segoe UI", sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { margin-bottom: 0.2rem; }
h2.subtitle { font-weight: 400; color: #555; margin-top: 0; }
form { margin: 1.5rem 0; }
label { display: block; margin-bottom: 0.5rem; }
button {
    background-color: #FFD700;
    color: black;
    font-weight: bold;
    border-radius: 8px;
    padding: 12px;
    font-size: 16px;
    transition: 0.3s;
    border: none;
    cursor: pointer;
    margin-top: 1rem;
}
button:hover {
    background-color: #FFAA00;
    transform: scale(1.08);
}
.notice { padding: 0.75rem 1rem; border-radius: 6px; margin: 0.5rem 0; }
.notice.success { background: #e6f4ea; color: #1e4620; }
.notice.warning { background: #fff8e1; color: #5f4b00; }
.notice.error { background: #fdecea; color: #611a15; }
.report-text { white-space: pre-wrap; line-height: 1.5; }
"#;

/// Inline SVG icon so the browser tab does not request `/favicon.ico`.
const FAVICON: &str = "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 100'><text y='.9em' font-size='90'>🩺</text></svg>";

/// Render the page with whatever the last run produced.
pub fn render_page(notices: &[Notice], report: Option<&AnalysisReport>) -> String {
    let mut body = String::new();
    for notice in notices {
        body.push_str(&notice.to_html());
    }
    if let Some(report) = report {
        body.push_str(&report.to_html());
    }
    layout(&body)
}

/// Render the page with a single error message.
pub fn render_error_page(message: &str) -> String {
    render_failure_page(&[], message)
}

/// Render a failed run: the notices it raised before the fault, then the error.
pub fn render_failure_page(notices: &[Notice], message: &str) -> String {
    let mut shown = notices.to_vec();
    shown.push(Notice::error(message));
    render_page(&shown, None)
}

fn layout(results: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>SwastiCare</title>
<link rel="icon" href="{favicon}">
<style>{style}</style>
</head>
<body>
<h1>{title}</h1>
<h2 class="subtitle">{subtitle}</h2>
<form action="/analyze" method="post" enctype="multipart/form-data">
<label for="image">Upload the medical image for analysis</label>
<input type="file" id="image" name="image" accept=".png,.jpg,.jpeg,image/png,image/jpeg">
<div><button type="submit">{submit}</button></div>
</form>
{results}</body>
</html>
"#,
        style = STYLE,
        favicon = FAVICON,
        title = escape_html(APP_TITLE),
        subtitle = escape_html(APP_SUBTITLE),
        submit = escape_html(SUBMIT_LABEL),
        results = results,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::build_report;

    #[test]
    fn empty_page_has_form_and_title() {
        let html = render_page(&[], None);
        assert!(html.contains("SwastiCare: SympSolver 🩺"));
        assert!(html.contains(r#"name="image""#));
        assert!(html.contains("🩺 Generate Analysis"));
        assert!(!html.contains("Analysis Result"));
    }

    #[test]
    fn notices_come_before_report() {
        let report = build_report("All clear.");
        let html = render_page(&[Notice::success("uploaded")], Some(&report));
        let notice_at = html.find("uploaded").unwrap();
        let report_at = html.find("Analysis Result").unwrap();
        assert!(notice_at < report_at);
        assert!(html.contains("All clear."));
    }

    #[test]
    fn failure_page_keeps_earlier_notices() {
        let html = render_failure_page(&[Notice::success("uploaded")], "HTTP 500");
        let success_at = html.find("notice success").unwrap();
        let error_at = html.find("notice error").unwrap();
        assert!(success_at < error_at);
        assert!(html.contains("HTTP 500"));
    }

    #[test]
    fn page_declares_inline_icon() {
        let html = render_page(&[], None);
        assert!(html.contains(r#"<link rel="icon" href="data:image/svg+xml,"#));
    }
}
