use std::path::{Path, PathBuf};

use stepshot_domain::{AnnotationPlan, HotkeyCombo, RasterImage, Session, SessionId};

use crate::{ApplicationError, TriggerSender};

/// A record file that `load_all` could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SessionCatalog {
    pub sessions: Vec<Session>,
    pub skipped: Vec<SkippedRecord>,
}

pub trait SessionStore {
    /// Allocates a fresh session and its image directory. Nothing is persisted.
    fn create(
        &self,
        name: &str,
        description: &str,
        start_time: &str,
    ) -> Result<Session, ApplicationError>;

    fn load_all(&self) -> Result<SessionCatalog, ApplicationError>;

    fn load(&self, id: &SessionId) -> Result<Option<Session>, ApplicationError>;

    fn save(&self, session: &Session) -> Result<(), ApplicationError>;

    fn delete(&self, id: &SessionId) -> Result<(), ApplicationError>;

    /// Encodes `image` as PNG under the session's image directory and returns its path.
    fn write_capture_image(
        &self,
        id: &SessionId,
        file_stem: &str,
        image: &RasterImage,
    ) -> Result<String, ApplicationError>;

    fn overwrite_image(&self, path: &str, image: &RasterImage) -> Result<(), ApplicationError>;

    fn read_image(&self, path: &str) -> Result<RasterImage, ApplicationError>;

    /// Returns `false` when the file was already gone.
    fn remove_image(&self, path: &str) -> Result<bool, ApplicationError>;

    /// Moves an image aside so that it can still be put back. Returns the
    /// staged path, or `None` when the file was already gone.
    fn stage_image_removal(&self, path: &str) -> Result<Option<String>, ApplicationError>;

    fn restore_staged_image(&self, staged: &str, path: &str) -> Result<(), ApplicationError>;

    fn copy_image(&self, path: &str, destination: &Path) -> Result<(), ApplicationError>;

    fn discard_images_dir(&self, id: &SessionId) -> Result<(), ApplicationError>;
}

pub trait Clock {
    /// Local time as `YYYY-MM-DD HH:MM:SS`.
    fn now_timestamp_string(&self) -> String;

    /// Local time as `YYYYMMDD_HHMMSS`, for file names.
    fn now_file_stamp(&self) -> String;

    fn now_epoch_seconds(&self) -> u64;
}

pub trait ScreenGrabber {
    fn grab(&self) -> Result<RasterImage, ApplicationError>;
}

pub trait Compositor {
    fn compose(
        &self,
        base: &RasterImage,
        plan: &AnnotationPlan,
    ) -> Result<RasterImage, ApplicationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayResult {
    pub plan: AnnotationPlan,
    pub description: String,
}

pub trait AnnotationOverlay {
    /// Shows `image` modally. `None` means the user cancelled.
    fn annotate(
        &mut self,
        image: &RasterImage,
        description: &str,
    ) -> Result<Option<OverlayResult>, ApplicationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyHandle(pub u32);

pub trait HotkeyRegistrar {
    fn register(
        &mut self,
        combo: &HotkeyCombo,
        triggers: TriggerSender,
    ) -> Result<HotkeyHandle, ApplicationError>;

    /// Unregistering a handle that is no longer registered is a no-op.
    fn unregister(&mut self, handle: HotkeyHandle) -> Result<(), ApplicationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl ReportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Copy images next to the report and link them relatively.
    pub relative_images: bool,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub steps: usize,
    pub missing_images: usize,
}

pub trait ReportExporter {
    fn format(&self) -> ReportFormat;

    fn export(
        &self,
        session: &Session,
        destination: &Path,
        options: &ReportOptions,
    ) -> Result<ReportSummary, ApplicationError>;
}
