use std::path::Path;

use stepshot_application::{
    ApplicationError, ReportExporter, ReportFormat, ReportOptions, ReportSummary,
};
use stepshot_domain::{format_duration, Session};

use super::{or_none, write_report, ImagePlacer, StepImage};

#[derive(Debug, Default)]
pub struct MarkdownReportExporter;

impl ReportExporter for MarkdownReportExporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Markdown
    }

    fn export(
        &self,
        session: &Session,
        destination: &Path,
        options: &ReportOptions,
    ) -> Result<ReportSummary, ApplicationError> {
        let placer = ImagePlacer::new(destination, options.relative_images);
        let mut missing_images = 0;
        let mut lines = vec![
            format!("# Session report: {}", session.name()),
            format!("> Generated at {}", options.generated_at),
            String::new(),
            "## Overview".to_string(),
            format!("- Name: {}", session.name()),
            format!("- Description: {}", or_none(session.description())),
            format!("- Started: {}", session.start_time()),
            format!("- Ended: {}", session.end_time()),
            format!("- Duration: {}", format_duration(session.duration_secs())),
            format!("- Captures: {}", session.captures().len()),
            String::new(),
            "## Steps".to_string(),
        ];

        for (index, capture) in session.captures().iter().enumerate() {
            let step = index + 1;
            lines.push(format!("### Step {step}"));
            lines.push(format!("- Description: {}", capture.description));
            lines.push(format!("- Captured at: {}", capture.time));
            match placer.place(capture) {
                StepImage::Linked(link) => lines.push(format!("![Step {step}](<{link}>)")),
                other => {
                    missing_images += 1;
                    lines.push(format!("> {}", other.notice().unwrap_or_default()));
                }
            }
            lines.push(String::new());
        }

        write_report(destination, &lines.join("\n"))?;
        Ok(ReportSummary {
            path: destination.to_path_buf(),
            steps: session.captures().len(),
            missing_images,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::export::test_support::session_with_one_missing_image;

    fn options(relative_images: bool) -> ReportOptions {
        ReportOptions {
            relative_images,
            generated_at: "2026-10-16 10:00:00".to_string(),
        }
    }

    #[test]
    fn missing_image_becomes_notice() {
        let dir = TempDir::new().expect("temp dir");
        let session = session_with_one_missing_image(dir.path(), "Demo");
        let destination = dir.path().join("out").join("report.md");

        let summary = MarkdownReportExporter
            .export(&session, &destination, &options(false))
            .expect("export");
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.missing_images, 1);

        let text = fs::read_to_string(&destination).expect("read");
        assert!(text.starts_with("# Session report: Demo"));
        assert!(text.contains("- Duration: 2m5s"));
        assert!(text.contains("- Description: none"));
        assert!(text.contains("### Step 2"));
        assert!(text.contains("- Description: record 2"));
        assert!(text.contains("![Step 1](<"));
        assert!(text.contains("> Image missing:"));
    }

    #[test]
    fn relative_links_copy_images_beside_report() {
        let dir = TempDir::new().expect("temp dir");
        let session = session_with_one_missing_image(dir.path(), "Demo");
        let destination = dir.path().join("report").join("steps.md");

        MarkdownReportExporter
            .export(&session, &destination, &options(true))
            .expect("export");
        let text = fs::read_to_string(&destination).expect("read");
        assert!(text.contains("![Step 1](<images/capture_1.png>)"));
        assert!(dir.path().join("report/images/capture_1.png").is_file());
    }
}
