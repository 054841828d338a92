use stepshot_application::{CaptureExportReport, ReportSummary, SkippedRecord, StopReport};
use stepshot_domain::{format_duration, Session};

pub fn present_session_row(session: &Session) -> String {
    let status = if session.is_active() { "active" } else { "done" };
    format!(
        "{}\t{}\t{}\t{}\t{} captures\t{}",
        session.id(),
        session.start_time(),
        format_duration(session.duration_secs()),
        status,
        session.captures().len(),
        session.name()
    )
}

pub fn present_session_detail(session: &Session) -> String {
    let mut lines = vec![
        format!("session {}", session.id()),
        format!("  name: {}", session.name()),
        format!("  description: {}", session.description()),
        format!("  started: {}", session.start_time()),
        format!("  ended: {}", session.end_time()),
        format!("  duration: {}", format_duration(session.duration_secs())),
    ];
    for capture in session.captures() {
        lines.push(format!(
            "  [{}] {}  {}\n      {}",
            capture.id, capture.time, capture.description, capture.image_path
        ));
    }
    lines.join("\n")
}

pub fn present_skipped(skipped: &SkippedRecord) -> String {
    format!("skipped {}: {}", skipped.path.display(), skipped.reason)
}

pub fn present_stop_report(report: &StopReport) -> String {
    let mut text = if report.persisted {
        format!(
            "saved session {} with {} captures ({})",
            report.session.id(),
            report.session.captures().len(),
            format_duration(report.session.duration_secs())
        )
    } else {
        format!("session {} had no captures and was discarded", report.session.id())
    };
    if report.dropped_triggers > 0 {
        text.push_str(&format!(
            "\n{} hotkey presses were ignored while a capture was in progress",
            report.dropped_triggers
        ));
    }
    for warning in &report.warnings {
        text.push_str(&format!("\nwarning: {warning}"));
    }
    text
}

pub fn present_report_summary(summary: &ReportSummary) -> String {
    let mut text = format!(
        "wrote {} ({} steps)",
        summary.path.display(),
        summary.steps
    );
    if summary.missing_images > 0 {
        text.push_str(&format!(", {} images missing", summary.missing_images));
    }
    text
}

pub fn present_capture_export(report: &CaptureExportReport) -> String {
    let mut lines = vec![format!(
        "exported {} captures, {} failed",
        report.exported.len(),
        report.failures.len()
    )];
    for failure in &report.failures {
        lines.push(format!("  step {}: {}", failure.capture_id, failure.reason));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use stepshot_domain::SessionId;

    use super::*;

    fn session() -> Session {
        let mut session = Session::new(
            SessionId::new("abc").expect("id"),
            "Demo",
            "",
            "2026-10-16 09:00:00",
        )
        .expect("session");
        session.append_capture("2026-10-16 09:00:05", "", "/tmp/a.png");
        session.finish("2026-10-16 09:01:05", 65);
        session
    }

    #[test]
    fn row_lists_key_fields() {
        let row = present_session_row(&session());
        assert_eq!(
            row,
            "abc\t2026-10-16 09:00:00\t1m5s\tdone\t1 captures\tDemo"
        );
    }

    #[test]
    fn stop_report_mentions_warnings_and_drops() {
        let report = StopReport {
            session: session(),
            persisted: true,
            dropped_triggers: 2,
            warnings: vec!["hotkey not released: gone".to_string()],
        };
        let text = present_stop_report(&report);
        assert!(text.starts_with("saved session abc with 1 captures (1m5s)"));
        assert!(text.contains("2 hotkey presses"));
        assert!(text.contains("warning: hotkey not released"));
    }
}
