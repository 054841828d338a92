mod annotation;
mod annotation_session;
mod error;
mod hotkey;
mod raster;
mod session;
mod transform;

pub use annotation::{
    validate_font_size, AnnotationPlan, Color, CropRegion, Stroke, TextLabel,
    DEFAULT_FONT_SIZE, DEFAULT_STROKE_WIDTH, MAX_FONT_SIZE, MAX_STROKE_WIDTH, MIN_FONT_SIZE,
    PALETTE,
};
pub use annotation_session::{AnnotationSession, PointerOutcome, Tool};
pub use error::DomainError;
pub use hotkey::{BaseKey, HotkeyCombo, Modifier, DEFAULT_HOTKEY};
pub use raster::RasterImage;
pub use session::{
    default_capture_description, format_duration, Capture, CaptureId, Session, SessionId,
};
pub use transform::{
    CanvasPoint, ImagePoint, PixelPoint, ViewTransform, MAX_SCALE, MIN_SCALE, MIN_SELECTION_PX,
    ZOOM_STEP,
};
