mod controller;
mod error;
#[cfg(test)]
mod fakes;
mod ports;
mod service;
mod triggers;
mod use_cases;

pub use controller::{
    ArmedSession, CaptureSessionController, ControllerState, StopReport, TriggerOutcome,
};
pub use error::ApplicationError;
pub use ports::{
    AnnotationOverlay, Clock, Compositor, HotkeyHandle, HotkeyRegistrar, OverlayResult,
    ReportExporter, ReportFormat, ReportOptions, ReportSummary, ScreenGrabber, SessionCatalog,
    SessionStore, SkippedRecord,
};
pub use service::{
    ApplicationService, CaptureExportFailure, CaptureExportReport, FinishOutcome,
};
pub use triggers::{trigger_channel, Trigger, TriggerReceiver, TriggerSender, TRIGGER_QUEUE_CAPACITY};
pub use use_cases::{
    DeleteSessionCommand, DescribeSessionCommand, EditCaptureCommand, ExportCapturesCommand,
    ExportReportCommand, ListSessionsCommand, OpenSessionCommand, ReannotateCaptureCommand,
    RemoveCaptureCommand, RenameSessionCommand, StartCaptureCommand,
};
