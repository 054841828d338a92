use stepshot_domain::{CaptureId, DomainError, HotkeyCombo, Session};
use tracing::{info, warn};

use crate::{
    trigger_channel, AnnotationOverlay, ApplicationError, ApplicationService, HotkeyHandle,
    HotkeyRegistrar, ScreenGrabber, StartCaptureCommand, TriggerReceiver,
};

/// A session that is listening for its hotkey.
pub struct ArmedSession {
    session: Session,
    started_epoch: u64,
    hotkey: HotkeyCombo,
    handle: HotkeyHandle,
    triggers: TriggerReceiver,
}

impl ArmedSession {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn hotkey(&self) -> &HotkeyCombo {
        &self.hotkey
    }
}

pub enum ControllerState {
    Idle,
    Armed(ArmedSession),
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Ignored,
    Captured(CaptureId),
    Cancelled,
    /// This trigger failed; the session stays armed.
    Failed(ApplicationError),
    /// The platform cannot capture at all, so the session was closed.
    Stopped {
        cause: ApplicationError,
        report: StopReport,
    },
}

#[derive(Debug, Clone)]
pub struct StopReport {
    pub session: Session,
    pub persisted: bool,
    pub dropped_triggers: u64,
    pub warnings: Vec<String>,
}

/// Owns the Idle/Armed lifecycle of a recording. Everything runs on the
/// caller's thread; the hotkey thread only feeds the trigger queue.
pub struct CaptureSessionController<'a> {
    service: &'a ApplicationService,
    grabber: Box<dyn ScreenGrabber>,
    overlay: Box<dyn AnnotationOverlay>,
    registrar: Box<dyn HotkeyRegistrar>,
    state: ControllerState,
}

impl<'a> CaptureSessionController<'a> {
    pub fn new(
        service: &'a ApplicationService,
        grabber: Box<dyn ScreenGrabber>,
        overlay: Box<dyn AnnotationOverlay>,
        registrar: Box<dyn HotkeyRegistrar>,
    ) -> Self {
        Self {
            service,
            grabber,
            overlay,
            registrar,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, ControllerState::Armed(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            ControllerState::Armed(armed) => Some(&armed.session),
            ControllerState::Idle => None,
        }
    }

    pub fn start(&mut self, command: StartCaptureCommand) -> Result<&Session, ApplicationError> {
        if self.is_armed() {
            return Err(ApplicationError::InvalidState(
                "a capture session is already running".to_string(),
            ));
        }
        if command.name.trim().is_empty() {
            return Err(DomainError::EmptySessionName.into());
        }

        let session = self
            .service
            .create_session(&command.name, &command.description)?;
        let started_epoch = self.service.now_epoch_seconds();
        let (sender, triggers) = trigger_channel();
        let handle = match self.registrar.register(&command.hotkey, sender) {
            Ok(handle) => handle,
            Err(error) => {
                warn!(hotkey = %command.hotkey, error = %error, "hotkey registration failed");
                self.service.abandon_session(session.id());
                return Err(error);
            }
        };

        info!(session = %session.id(), hotkey = %command.hotkey, "capture session armed");
        self.state = ControllerState::Armed(ArmedSession {
            session,
            started_epoch,
            hotkey: command.hotkey,
            handle,
            triggers,
        });
        match &self.state {
            ControllerState::Armed(armed) => Ok(&armed.session),
            ControllerState::Idle => Err(ApplicationError::InvalidState(
                "session was not armed".to_string(),
            )),
        }
    }

    /// Handles at most one queued trigger.
    pub fn pump(&mut self) -> Result<Option<TriggerOutcome>, ApplicationError> {
        let pending = match &self.state {
            ControllerState::Armed(armed) => armed.triggers.next().is_some(),
            ControllerState::Idle => false,
        };
        if !pending {
            return Ok(None);
        }
        self.on_trigger().map(Some)
    }

    /// Grab, annotate, compose and store one capture. Triggers that queued up
    /// meanwhile are discarded afterwards.
    pub fn on_trigger(&mut self) -> Result<TriggerOutcome, ApplicationError> {
        if !self.is_armed() {
            return Ok(TriggerOutcome::Ignored);
        }

        let raw = match self.grabber.grab() {
            Ok(raw) => raw,
            Err(cause @ ApplicationError::Capability(_)) => {
                warn!(error = %cause, "screen capture unsupported, stopping session");
                let report = self.stop()?;
                return Ok(TriggerOutcome::Stopped { cause, report });
            }
            Err(error) => {
                warn!(error = %error, "screen grab failed");
                self.discard_pending();
                return Ok(TriggerOutcome::Failed(error));
            }
        };

        let outcome = self.annotate_and_store(&raw);
        self.discard_pending();
        Ok(outcome)
    }

    pub fn stop(&mut self) -> Result<StopReport, ApplicationError> {
        let mut armed = match std::mem::replace(&mut self.state, ControllerState::Idle) {
            ControllerState::Armed(armed) => armed,
            ControllerState::Idle => {
                return Err(ApplicationError::InvalidState(
                    "no capture session is running".to_string(),
                ))
            }
        };

        let mut warnings = Vec::new();
        if let Err(error) = self.registrar.unregister(armed.handle) {
            warn!(error = %error, "hotkey unregistration failed");
            warnings.push(format!("hotkey not released: {error}"));
        }
        let dropped_triggers = armed.triggers.dropped_count();

        let outcome = self
            .service
            .finish_session(&mut armed.session, armed.started_epoch)?;
        warnings.extend(outcome.warnings);
        info!(
            session = %armed.session.id(),
            persisted = outcome.persisted,
            dropped_triggers,
            "capture session stopped"
        );
        Ok(StopReport {
            session: armed.session,
            persisted: outcome.persisted,
            dropped_triggers,
            warnings,
        })
    }

    fn annotate_and_store(&mut self, raw: &stepshot_domain::RasterImage) -> TriggerOutcome {
        let ControllerState::Armed(armed) = &mut self.state else {
            return TriggerOutcome::Ignored;
        };
        match self.overlay.annotate(raw, "") {
            Ok(None) => TriggerOutcome::Cancelled,
            Ok(Some(result)) => {
                match self
                    .service
                    .record_annotated(&mut armed.session, raw, &result)
                {
                    Ok(id) => TriggerOutcome::Captured(id),
                    Err(error) => {
                        warn!(error = %error, "capture could not be stored");
                        TriggerOutcome::Failed(error)
                    }
                }
            }
            Err(error) => {
                warn!(error = %error, "annotation overlay failed");
                TriggerOutcome::Failed(error)
            }
        }
    }

    fn discard_pending(&self) {
        if let ControllerState::Armed(armed) = &self.state {
            let discarded = armed.triggers.drain();
            if discarded > 0 {
                warn!(discarded, "dropped hotkey presses received during capture");
            }
        }
    }
}
