use std::path::Path;

use stepshot_application::{
    ApplicationError, ReportExporter, ReportFormat, ReportOptions, ReportSummary,
};
use stepshot_domain::{format_duration, Session};

use super::{or_none, write_report, ImagePlacer, StepImage};

#[derive(Debug, Default)]
pub struct HtmlReportExporter;

impl ReportExporter for HtmlReportExporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn export(
        &self,
        session: &Session,
        destination: &Path,
        options: &ReportOptions,
    ) -> Result<ReportSummary, ApplicationError> {
        let placer = ImagePlacer::new(destination, options.relative_images);
        let name = escape(session.name());
        let mut missing_images = 0;
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>Session report: {name}</title>\n"));
        html.push_str(
            "<style>body{font-family:sans-serif;max-width:960px;margin:auto}\
             img{max-width:100%;border:1px solid #ccc}\
             .missing{color:#a00;font-style:italic}</style>\n</head>\n<body>\n",
        );
        html.push_str(&format!("<h1>Session report: {name}</h1>\n"));
        html.push_str(&format!(
            "<p>Generated at {}</p>\n",
            escape(&options.generated_at)
        ));
        html.push_str("<h2>Overview</h2>\n<ul>\n");
        for (label, value) in [
            ("Name", session.name().to_string()),
            ("Description", or_none(session.description()).to_string()),
            ("Started", session.start_time().to_string()),
            ("Ended", session.end_time().to_string()),
            ("Duration", format_duration(session.duration_secs())),
            ("Captures", session.captures().len().to_string()),
        ] {
            html.push_str(&format!("<li>{label}: {}</li>\n", escape(&value)));
        }
        html.push_str("</ul>\n<h2>Steps</h2>\n");

        for (index, capture) in session.captures().iter().enumerate() {
            let step = index + 1;
            html.push_str(&format!("<h3>Step {step}</h3>\n<ul>\n"));
            html.push_str(&format!(
                "<li>Description: {}</li>\n<li>Captured at: {}</li>\n</ul>\n",
                escape(&capture.description),
                escape(&capture.time)
            ));
            match placer.place(capture) {
                StepImage::Linked(link) => html.push_str(&format!(
                    "<img src=\"{}\" alt=\"Step {step}\">\n",
                    escape(&link)
                )),
                other => {
                    missing_images += 1;
                    let notice = other.notice().unwrap_or_default();
                    html.push_str(&format!("<p class=\"missing\">{}</p>\n", escape(&notice)));
                }
            }
        }
        html.push_str("</body>\n</html>\n");

        write_report(destination, &html)?;
        Ok(ReportSummary {
            path: destination.to_path_buf(),
            steps: session.captures().len(),
            missing_images,
        })
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::export::test_support::session_with_one_missing_image;

    #[test]
    fn escapes_text_and_marks_missing_images() {
        let dir = TempDir::new().expect("temp dir");
        let session = session_with_one_missing_image(dir.path(), "<b>Login</b> & co");
        let destination = dir.path().join("report.html");

        let summary = HtmlReportExporter
            .export(
                &session,
                &destination,
                &ReportOptions {
                    relative_images: false,
                    generated_at: "now".to_string(),
                },
            )
            .expect("export");
        assert_eq!(summary.missing_images, 1);

        let html = fs::read_to_string(&destination).expect("read");
        assert!(html.contains("&lt;b&gt;Login&lt;/b&gt; &amp; co"));
        assert!(!html.contains("<b>Login"));
        assert!(html.contains("<img src=\""));
        assert!(html.contains("class=\"missing\""));
    }
}
