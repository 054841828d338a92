use std::path::{Path, PathBuf};

use stepshot_domain::{Capture, CaptureId, DomainError, RasterImage, Session, SessionId};
use tracing::{debug, info, warn};

use crate::{
    AnnotationOverlay, ApplicationError, Clock, Compositor, DeleteSessionCommand,
    DescribeSessionCommand, EditCaptureCommand, ExportCapturesCommand, ExportReportCommand,
    ListSessionsCommand, OpenSessionCommand, OverlayResult, ReannotateCaptureCommand,
    RemoveCaptureCommand, RenameSessionCommand, ReportExporter, ReportFormat, ReportOptions,
    ReportSummary, SessionCatalog, SessionStore,
};

/// What happened to a session's files when it was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishOutcome {
    pub persisted: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureExportFailure {
    pub capture_id: CaptureId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureExportReport {
    pub exported: Vec<PathBuf>,
    pub failures: Vec<CaptureExportFailure>,
}

pub struct ApplicationService {
    store: Box<dyn SessionStore>,
    compositor: Box<dyn Compositor>,
    clock: Box<dyn Clock>,
    exporters: Vec<Box<dyn ReportExporter>>,
}

impl ApplicationService {
    pub fn new(
        store: Box<dyn SessionStore>,
        compositor: Box<dyn Compositor>,
        clock: Box<dyn Clock>,
        exporters: Vec<Box<dyn ReportExporter>>,
    ) -> Self {
        Self {
            store,
            compositor,
            clock,
            exporters,
        }
    }

    pub fn now_epoch_seconds(&self) -> u64 {
        self.clock.now_epoch_seconds()
    }

    pub fn create_session(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Session, ApplicationError> {
        if name.trim().is_empty() {
            return Err(DomainError::EmptySessionName.into());
        }
        let now = self.clock.now_timestamp_string();
        let session = self.store.create(name, description, &now)?;
        info!(session = %session.id(), name = session.name(), "session created");
        Ok(session)
    }

    pub fn list_sessions(
        &self,
        _command: ListSessionsCommand,
    ) -> Result<SessionCatalog, ApplicationError> {
        self.store.load_all()
    }

    pub fn open_session(&self, command: OpenSessionCommand) -> Result<Session, ApplicationError> {
        self.require(&command.session_id)
    }

    pub fn rename_session(
        &self,
        command: RenameSessionCommand,
    ) -> Result<Session, ApplicationError> {
        let mut session = self.require(&command.session_id)?;
        session.rename(&command.name)?;
        self.store.save(&session)?;
        Ok(session)
    }

    pub fn describe_session(
        &self,
        command: DescribeSessionCommand,
    ) -> Result<Session, ApplicationError> {
        let mut session = self.require(&command.session_id)?;
        session.set_description(&command.description);
        self.store.save(&session)?;
        Ok(session)
    }

    pub fn delete_session(&self, command: DeleteSessionCommand) -> Result<(), ApplicationError> {
        self.store.delete(&command.session_id)?;
        info!(session = %command.session_id, "session deleted");
        Ok(())
    }

    /// Stores `image` as the next capture of `session` and persists the
    /// session. If persisting fails, the record and the file are rolled back.
    pub fn append_capture(
        &self,
        session: &mut Session,
        image: &RasterImage,
        description: &str,
    ) -> Result<CaptureId, ApplicationError> {
        let time = self.clock.now_timestamp_string();
        let stem = format!("capture_{}", self.clock.now_file_stamp());
        let path = self.store.write_capture_image(session.id(), &stem, image)?;
        let id = session.append_capture(time, description, path.clone()).id;

        if let Err(error) = self.store.save(session) {
            session.remove_capture(id)?;
            if let Err(cleanup) = self.store.remove_image(&path) {
                warn!(path = %path, error = %cleanup, "could not roll back capture image");
            }
            return Err(error);
        }
        debug!(session = %session.id(), capture = %id, path = %path, "capture stored");
        Ok(id)
    }

    /// Burns the overlay result into `raw` and appends it.
    pub fn record_annotated(
        &self,
        session: &mut Session,
        raw: &RasterImage,
        result: &OverlayResult,
    ) -> Result<CaptureId, ApplicationError> {
        let composed = self.compositor.compose(raw, &result.plan)?;
        self.append_capture(session, &composed, &result.description)
    }

    /// Moves the capture's image aside, drops the record and saves. A failed
    /// save puts the image back and leaves `session` as it was; the staged
    /// file is only deleted once the save went through.
    pub fn remove_capture_from(
        &self,
        session: &mut Session,
        capture_id: CaptureId,
    ) -> Result<Capture, ApplicationError> {
        let path = session
            .capture(capture_id)
            .map(|capture| capture.image_path.clone())
            .ok_or_else(|| {
                ApplicationError::NotFound(format!(
                    "capture {capture_id} in session {}",
                    session.id()
                ))
            })?;
        let staged = self.store.stage_image_removal(&path)?;
        if staged.is_none() {
            warn!(path = %path, "capture image was already missing");
        }

        let mut updated = session.clone();
        let removed = updated.remove_capture(capture_id)?;
        if let Err(error) = self.store.save(&updated) {
            if let Some(staged) = &staged {
                if let Err(restore) = self.store.restore_staged_image(staged, &path) {
                    warn!(path = %path, staged = %staged, error = %restore, "could not restore capture image");
                }
            }
            return Err(error);
        }

        if let Some(staged) = &staged {
            if let Err(error) = self.store.remove_image(staged) {
                warn!(path = %staged, error = %error, "could not delete removed capture image");
            }
        }
        *session = updated;
        Ok(removed)
    }

    pub fn remove_capture(
        &self,
        command: RemoveCaptureCommand,
    ) -> Result<Session, ApplicationError> {
        let mut session = self.require(&command.session_id)?;
        self.remove_capture_from(&mut session, command.capture_id)?;
        Ok(session)
    }

    pub fn edit_capture(&self, command: EditCaptureCommand) -> Result<Session, ApplicationError> {
        let mut session = self.require(&command.session_id)?;
        session.set_capture_description(command.capture_id, &command.description)?;
        self.store.save(&session)?;
        Ok(session)
    }

    /// Reopens the overlay on a stored capture. Returns `None` if the user
    /// cancelled; otherwise the image is overwritten in place.
    pub fn reannotate_capture(
        &self,
        command: ReannotateCaptureCommand,
        overlay: &mut dyn AnnotationOverlay,
    ) -> Result<Option<Session>, ApplicationError> {
        let mut session = self.require(&command.session_id)?;
        let capture = session
            .capture(command.capture_id)
            .cloned()
            .ok_or_else(|| {
                ApplicationError::NotFound(format!(
                    "capture {} in session {}",
                    command.capture_id,
                    session.id()
                ))
            })?;
        let image = self.store.read_image(&capture.image_path)?;
        let Some(result) = overlay.annotate(&image, &capture.description)? else {
            return Ok(None);
        };

        if !result.plan.is_identity() {
            let composed = self.compositor.compose(&image, &result.plan)?;
            self.store.overwrite_image(&capture.image_path, &composed)?;
        }
        if result.description.trim() != capture.description {
            session.set_capture_description(capture.id, &result.description)?;
            self.store.save(&session)?;
        }
        Ok(Some(session))
    }

    /// Stamps the end of `session`. Sessions with captures are saved; empty
    /// ones only lose their image directory.
    pub fn finish_session(
        &self,
        session: &mut Session,
        started_epoch: u64,
    ) -> Result<FinishOutcome, ApplicationError> {
        let duration = self.clock.now_epoch_seconds().saturating_sub(started_epoch);
        session.finish(self.clock.now_timestamp_string(), duration);

        if session.captures().is_empty() {
            let mut warnings = Vec::new();
            if let Err(error) = self.store.discard_images_dir(session.id()) {
                warn!(session = %session.id(), error = %error, "could not discard image directory");
                warnings.push(format!("image directory not removed: {error}"));
            }
            info!(session = %session.id(), "empty session discarded");
            return Ok(FinishOutcome {
                persisted: false,
                warnings,
            });
        }

        self.store.save(session)?;
        info!(
            session = %session.id(),
            captures = session.captures().len(),
            duration_secs = duration,
            "session saved"
        );
        Ok(FinishOutcome {
            persisted: true,
            warnings: Vec::new(),
        })
    }

    /// Drops the image directory of a session that was never armed.
    pub fn abandon_session(&self, id: &SessionId) {
        if let Err(error) = self.store.discard_images_dir(id) {
            warn!(session = %id, error = %error, "could not discard image directory");
        }
    }

    pub fn export_report(
        &self,
        command: ExportReportCommand,
    ) -> Result<ReportSummary, ApplicationError> {
        let format = ReportFormat::from_path(&command.destination).ok_or_else(|| {
            ApplicationError::InvalidInput(format!(
                "unsupported report type for {}; use .md or .html",
                command.destination.display()
            ))
        })?;
        let exporter = self
            .exporters
            .iter()
            .find(|exporter| exporter.format() == format)
            .ok_or_else(|| {
                ApplicationError::InvalidInput(format!("no exporter for {format:?} reports"))
            })?;
        let session = self.require(&command.session_id)?;
        let options = ReportOptions {
            relative_images: command.relative_images,
            generated_at: self.clock.now_timestamp_string(),
        };
        let summary = exporter.export(&session, &command.destination, &options)?;
        info!(
            session = %session.id(),
            path = %summary.path.display(),
            missing_images = summary.missing_images,
            "report exported"
        );
        Ok(summary)
    }

    /// Copies capture images into a directory. Each failing capture is
    /// reported and the rest still go through.
    pub fn export_captures(
        &self,
        command: ExportCapturesCommand,
    ) -> Result<CaptureExportReport, ApplicationError> {
        let session = self.require(&command.session_id)?;
        let selected: Vec<&Capture> = if command.capture_ids.is_empty() {
            session.captures().iter().collect()
        } else {
            command
                .capture_ids
                .iter()
                .map(|id| {
                    session.capture(*id).ok_or_else(|| {
                        ApplicationError::NotFound(format!(
                            "capture {id} in session {}",
                            session.id()
                        ))
                    })
                })
                .collect::<Result<_, _>>()?
        };

        let mut report = CaptureExportReport::default();
        for capture in selected {
            match self.export_one(capture, &command.destination_dir) {
                Ok(path) => report.exported.push(path),
                Err(error) => {
                    warn!(capture = %capture.id, error = %error, "capture export failed");
                    report.failures.push(CaptureExportFailure {
                        capture_id: capture.id,
                        reason: error.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    fn export_one(&self, capture: &Capture, directory: &Path) -> Result<PathBuf, ApplicationError> {
        let file_name = Path::new(&capture.image_path)
            .file_name()
            .ok_or_else(|| {
                ApplicationError::Export(format!("no file name in {}", capture.image_path))
            })?;
        let destination = directory.join(file_name);
        self.store.copy_image(&capture.image_path, &destination)?;
        Ok(destination)
    }

    fn require(&self, id: &SessionId) -> Result<Session, ApplicationError> {
        self.store
            .load(id)?
            .ok_or_else(|| ApplicationError::NotFound(format!("session {id}")))
    }
}
