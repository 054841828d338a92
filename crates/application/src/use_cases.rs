use std::path::PathBuf;

use stepshot_domain::{CaptureId, HotkeyCombo, SessionId};

#[derive(Debug, Clone)]
pub struct StartCaptureCommand {
    pub name: String,
    pub description: String,
    pub hotkey: HotkeyCombo,
}

#[derive(Debug, Clone, Default)]
pub struct ListSessionsCommand;

#[derive(Debug, Clone)]
pub struct OpenSessionCommand {
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct RenameSessionCommand {
    pub session_id: SessionId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DescribeSessionCommand {
    pub session_id: SessionId,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionCommand {
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct EditCaptureCommand {
    pub session_id: SessionId,
    pub capture_id: CaptureId,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct RemoveCaptureCommand {
    pub session_id: SessionId,
    pub capture_id: CaptureId,
}

#[derive(Debug, Clone)]
pub struct ReannotateCaptureCommand {
    pub session_id: SessionId,
    pub capture_id: CaptureId,
}

#[derive(Debug, Clone)]
pub struct ExportReportCommand {
    pub session_id: SessionId,
    pub destination: PathBuf,
    pub relative_images: bool,
}

#[derive(Debug, Clone)]
pub struct ExportCapturesCommand {
    pub session_id: SessionId,
    /// Empty means every capture.
    pub capture_ids: Vec<CaptureId>,
    pub destination_dir: PathBuf,
}
