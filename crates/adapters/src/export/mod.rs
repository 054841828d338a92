mod docx;
mod html;
mod markdown;
mod pdf;

use std::fs;
use std::path::{Path, PathBuf};

use stepshot_application::ApplicationError;
use stepshot_domain::{Capture, RasterImage};
use tracing::warn;

use crate::raster::read_png;

pub use docx::DocxReportExporter;
pub use html::HtmlReportExporter;
pub use markdown::MarkdownReportExporter;
pub use pdf::{find_report_font, PdfReportExporter};

pub const IMAGES_DIR_NAME: &str = "images";

/// How one step's screenshot ends up in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StepImage {
    Linked(String),
    Missing(String),
    CopyFailed(String),
    Unreadable(String),
}

impl StepImage {
    fn notice(&self) -> Option<String> {
        match self {
            Self::Linked(_) => None,
            Self::Missing(path) => Some(format!("Image missing: {path}")),
            Self::CopyFailed(reason) => Some(format!("Image could not be copied: {reason}")),
            Self::Unreadable(reason) => Some(format!("Image could not be loaded: {reason}")),
        }
    }
}

/// Resolves capture images to report links, copying them beside the report
/// when relative links were asked for.
struct ImagePlacer {
    images_dir: Option<PathBuf>,
}

impl ImagePlacer {
    fn new(destination: &Path, relative: bool) -> Self {
        if !relative {
            return Self { images_dir: None };
        }
        let dir = destination
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(IMAGES_DIR_NAME);
        match fs::create_dir_all(&dir) {
            Ok(()) => Self {
                images_dir: Some(dir),
            },
            Err(error) => {
                warn!(path = %dir.display(), error = %error, "falling back to absolute image links");
                Self { images_dir: None }
            }
        }
    }

    fn place(&self, capture: &Capture) -> StepImage {
        let source = Path::new(&capture.image_path);
        if !source.is_file() {
            return StepImage::Missing(capture.image_path.clone());
        }
        let Some(dir) = &self.images_dir else {
            return StepImage::Linked(capture.image_path.clone());
        };
        let Some(name) = source.file_name() else {
            return StepImage::CopyFailed(format!("no file name in {}", capture.image_path));
        };
        match fs::copy(source, dir.join(name)) {
            Ok(_) => StepImage::Linked(format!("{IMAGES_DIR_NAME}/{}", name.to_string_lossy())),
            Err(error) => StepImage::CopyFailed(error.to_string()),
        }
    }
}

/// Decodes a capture image for embedding into a document.
fn load_embedded(capture: &Capture) -> Result<RasterImage, StepImage> {
    let path = Path::new(&capture.image_path);
    if !path.is_file() {
        return Err(StepImage::Missing(capture.image_path.clone()));
    }
    read_png(path).map_err(|error| StepImage::Unreadable(error.to_string()))
}

fn write_report(destination: &Path, content: impl AsRef<[u8]>) -> Result<(), ApplicationError> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|error| {
                ApplicationError::Export(format!("{}: {error}", parent.display()))
            })?;
        }
    }
    fs::write(destination, content)
        .map_err(|error| ApplicationError::Export(format!("{}: {error}", destination.display())))
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "none"
    } else {
        text
    }
}
