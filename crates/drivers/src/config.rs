use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stepshot_domain::HotkeyCombo;
use tracing::warn;

pub const CONFIG_ENV: &str = "STEPSHOT_CONFIG";
const DEFAULT_OVERLAY_WIDTH: u32 = 1280;
const DEFAULT_OVERLAY_HEIGHT: u32 = 800;

/// `~/.stepshot`, or `./.stepshot` when no home directory is known.
pub fn stepshot_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".stepshot"))
        .unwrap_or_else(|| PathBuf::from(".stepshot"))
}

fn default_sessions_dir() -> PathBuf {
    stepshot_dir().join("sessions")
}

fn default_overlay_width() -> u32 {
    DEFAULT_OVERLAY_WIDTH
}

fn default_overlay_height() -> u32 {
    DEFAULT_OVERLAY_HEIGHT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
    #[serde(default)]
    pub hotkey: HotkeyCombo,
    #[serde(default = "default_overlay_width")]
    pub overlay_width: u32,
    #[serde(default = "default_overlay_height")]
    pub overlay_height: u32,
    /// TrueType font for PDF reports; a system font is searched when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_font: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            hotkey: HotkeyCombo::default(),
            overlay_width: DEFAULT_OVERLAY_WIDTH,
            overlay_height: DEFAULT_OVERLAY_HEIGHT,
            report_font: None,
        }
    }
}

pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| stepshot_dir().join("config.toml"))
}

/// A missing file means defaults. So does an unreadable one, after a warning.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return AppConfig::default(),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "config unreadable, using defaults");
            return AppConfig::default();
        }
    };
    match toml::from_str::<AppConfig>(&contents) {
        Ok(config) if config.overlay_width == 0 || config.overlay_height == 0 => {
            warn!(path = %path.display(), "overlay size must be positive, using defaults");
            AppConfig {
                overlay_width: DEFAULT_OVERLAY_WIDTH,
                overlay_height: DEFAULT_OVERLAY_HEIGHT,
                ..config
            }
        }
        Ok(config) => config,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "config invalid, using defaults");
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create {}: {error}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config)
        .map_err(|error| format!("failed to encode config: {error}"))?;
    fs::write(path, text).map_err(|error| format!("failed to write {}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let config = load_config(&dir.path().join("absent.toml"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.hotkey.to_string(), "ctrl+alt+o");
        assert_eq!((config.overlay_width, config.overlay_height), (1280, 800));
        assert!(config.sessions_dir.ends_with("sessions"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "hotkey = \"Shift + F5\"\noverlay_width = 900\n").expect("write");

        let config = load_config(&path);
        assert_eq!(config.hotkey.to_string(), "shift+f5");
        assert_eq!(config.overlay_width, 900);
        assert_eq!(config.overlay_height, 800);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "hotkey = \"ctrl+ctrl+x\"\n").expect("write");
        assert_eq!(load_config(&path), AppConfig::default());

        fs::write(&path, "this is not toml = = =").expect("write");
        assert_eq!(load_config(&path), AppConfig::default());
    }

    #[test]
    fn zero_overlay_size_is_replaced() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "overlay_width = 0\nhotkey = \"alt+q\"\n").expect("write");

        let config = load_config(&path);
        assert_eq!(config.overlay_width, 1280);
        assert_eq!(config.hotkey.to_string(), "alt+q");
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig {
            sessions_dir: dir.path().join("sessions"),
            hotkey: "ctrl+shift+9".parse().expect("combo"),
            overlay_width: 1024,
            overlay_height: 640,
            report_font: Some(dir.path().join("fonts").join("report.ttf")),
        };
        save_config(&path, &config).expect("save");
        assert_eq!(load_config(&path), config);
    }
}
