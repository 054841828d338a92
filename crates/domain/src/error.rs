use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    InvalidSessionId(String),
    EmptySessionName,
    InvalidCaptureId(u32),
    CaptureNotFound(u32),
    CaptureIdsNotContiguous { position: usize, found: u32 },
    InvalidHotkey(String),
    SelectionTooSmall { width: f64, height: f64 },
    EmptyCropRegion { x1: u32, y1: u32, x2: u32, y2: u32 },
    InvalidFontSize(u32),
    InvalidStrokeWidth(u32),
    UnknownColor(String),
    RasterSizeMismatch { expected: usize, actual: usize },
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSessionId(value) => write!(f, "invalid session id: {value:?}"),
            Self::EmptySessionName => write!(f, "session name must not be empty"),
            Self::InvalidCaptureId(value) => {
                write!(f, "capture id must be positive, got {value}")
            }
            Self::CaptureNotFound(value) => write!(f, "capture {value} does not exist"),
            Self::CaptureIdsNotContiguous { position, found } => write!(
                f,
                "capture at position {position} has id {found}, expected {}",
                position + 1
            ),
            Self::InvalidHotkey(msg) => write!(f, "invalid hotkey: {msg}"),
            Self::SelectionTooSmall { width, height } => write!(
                f,
                "selection of {width:.0}x{height:.0} canvas pixels is too small"
            ),
            Self::EmptyCropRegion { x1, y1, x2, y2 } => {
                write!(f, "crop region ({x1},{y1})-({x2},{y2}) is empty")
            }
            Self::InvalidFontSize(value) => {
                write!(f, "font size must be between 1 and 99, got {value}")
            }
            Self::InvalidStrokeWidth(value) => {
                write!(f, "stroke width must be between 1 and 64, got {value}")
            }
            Self::UnknownColor(value) => write!(f, "unknown color: {value}"),
            Self::RasterSizeMismatch { expected, actual } => write!(
                f,
                "raster buffer holds {actual} bytes, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for DomainError {}
