use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use stepshot_adapters::{GlobalHotkeyRegistrar, XcapScreenGrabber};
use stepshot_application::{
    ApplicationError, ApplicationService, CaptureSessionController, StartCaptureCommand,
    StopReport, TriggerOutcome,
};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::overlay::MinifbOverlay;

const LOOP_INTERVAL: Duration = Duration::from_millis(30);

/// Arms a session and captures on every hotkey press until Enter is pressed
/// on stdin (or stdin closes).
pub fn record(
    service: &ApplicationService,
    config: &AppConfig,
    command: StartCaptureCommand,
) -> Result<StopReport, ApplicationError> {
    let mut controller = CaptureSessionController::new(
        service,
        Box::new(XcapScreenGrabber),
        Box::new(MinifbOverlay::new(config.overlay_width, config.overlay_height)),
        Box::new(GlobalHotkeyRegistrar::new()),
    );

    let hotkey = command.hotkey.clone();
    let session = controller.start(command)?;
    println!(
        "recording \"{}\" ({}); press {} to capture, Enter here to stop",
        session.name(),
        session.id(),
        hotkey
    );

    let stop_requests = spawn_stdin_watcher();
    loop {
        if let Some(outcome) = controller.pump()? {
            if let TriggerOutcome::Stopped { cause, report } = outcome {
                eprintln!("{}", describe_failure(&cause));
                return Ok(report);
            }
            match describe_outcome(&outcome) {
                Some(line) if matches!(outcome, TriggerOutcome::Failed(_)) => eprintln!("{line}"),
                Some(line) => println!("{line}"),
                None => {}
            }
        }
        if stop_requested(&stop_requests) {
            break;
        }
        thread::sleep(LOOP_INTERVAL);
    }

    info!("stop requested from terminal");
    controller.stop()
}

fn spawn_stdin_watcher() -> Receiver<()> {
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stepshot-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            let _ = sender.send(());
        });
    if let Err(error) = spawned {
        debug!(error = %error, "stdin watcher unavailable, stopping immediately");
    }
    receiver
}

fn stop_requested(requests: &Receiver<()>) -> bool {
    match requests.try_recv() {
        Ok(()) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

fn describe_outcome(outcome: &TriggerOutcome) -> Option<String> {
    match outcome {
        TriggerOutcome::Ignored => None,
        TriggerOutcome::Captured(id) => Some(format!("captured step {id}")),
        TriggerOutcome::Cancelled => Some("capture cancelled".to_string()),
        TriggerOutcome::Failed(error) => Some(describe_failure(error)),
        TriggerOutcome::Stopped { cause, .. } => Some(describe_failure(cause)),
    }
}

pub fn describe_failure(error: &ApplicationError) -> String {
    match error.remediation() {
        Some(hint) => format!("{error}\nhint: {hint}"),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use stepshot_domain::CaptureId;

    use super::*;

    #[test]
    fn outcomes_are_described_for_the_terminal() {
        let id = CaptureId::new(3).expect("id");
        assert_eq!(
            describe_outcome(&TriggerOutcome::Captured(id)).as_deref(),
            Some("captured step 3")
        );
        assert_eq!(
            describe_outcome(&TriggerOutcome::Cancelled).as_deref(),
            Some("capture cancelled")
        );
        assert_eq!(describe_outcome(&TriggerOutcome::Ignored), None);
        let failed = TriggerOutcome::Failed(ApplicationError::Capture("busy".to_string()));
        assert!(describe_outcome(&failed)
            .expect("line")
            .contains("busy"));
    }

    #[test]
    fn permission_failures_carry_a_hint() {
        let text = describe_failure(&ApplicationError::Permission("denied".to_string()));
        assert!(text.contains("denied"));
        assert!(text.contains("hint: "));
        assert!(!describe_failure(&ApplicationError::Io("x".to_string())).contains("hint"));
    }

    #[test]
    fn closed_stop_channel_counts_as_stop() {
        let (sender, receiver) = mpsc::channel::<()>();
        assert!(!stop_requested(&receiver));
        drop(sender);
        assert!(stop_requested(&receiver));
    }
}
