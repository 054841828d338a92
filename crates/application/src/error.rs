use std::fmt::{Display, Formatter};

use stepshot_domain::DomainError;

#[derive(Debug)]
pub enum ApplicationError {
    Domain(DomainError),
    InvalidInput(String),
    NotFound(String),
    Conflict(String),
    Io(String),
    Persistence(String),
    Decode(String),
    Permission(String),
    Hotkey(String),
    Capability(String),
    Capture(String),
    InvalidState(String),
    Export(String),
}

impl ApplicationError {
    /// Operator guidance for failures the user has to fix outside the program.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Permission(_) => Some(permission_remediation()),
            Self::Capability(_) => Some(
                "no capturable display was found; run inside a graphical session \
                 (X11, Wayland with a screencast portal, Windows or macOS)",
            ),
            _ => None,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Domain(_) | Self::InvalidInput(_))
    }
}

#[cfg(target_os = "macos")]
fn permission_remediation() -> &'static str {
    "grant Screen Recording and Accessibility access to your terminal in \
     System Settings > Privacy & Security, then restart it"
}

#[cfg(target_os = "windows")]
fn permission_remediation() -> &'static str {
    "the shortcut is owned by another program or blocked by policy; \
     choose another one with `stepshot hotkey <combo>`"
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn permission_remediation() -> &'static str {
    "global shortcuts need an X11 session with access to the display; \
     check DISPLAY and that the shortcut is not grabbed by another program"
}

impl Display for ApplicationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain(error) => write!(f, "{error}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Permission(msg) => write!(f, "permission denied: {msg}"),
            Self::Hotkey(msg) => write!(f, "hotkey error: {msg}"),
            Self::Capability(msg) => write!(f, "unsupported platform capability: {msg}"),
            Self::Capture(msg) => write!(f, "capture failed: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::Export(msg) => write!(f, "export failed: {msg}"),
        }
    }
}

impl std::error::Error for ApplicationError {}

impl From<DomainError> for ApplicationError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}
