//! Runtime configuration.
//!
//! Layered: built-in defaults, then `~/.config/areacast/areacast.env`,
//! then a local `.env`, then the real environment (which always wins,
//! since dotenvy never overrides variables that are already set).

use crate::capture::{FfmpegToolchain, MonitorOptions, ProcessOptions, DEFAULT_STOP_GRACE};
use crate::geometry::Size;
use crate::preview::FALLBACK_PLAYERS;
use crate::selection::SelectionMode;
use crate::session::SessionPaths;
use regex::Regex;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_COUNTDOWN_SECS: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },

    #[error("Invalid failure marker pattern '{value}': {source}")]
    Pattern {
        value: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Parent of `screenshots/` and `videos/`.
    pub output_dir: PathBuf,
    /// Where segment files and the concat manifest live while recording.
    pub work_dir: PathBuf,
    pub ffmpeg: String,
    pub import: String,
    pub convert: String,
    /// Desktop opener for play / open folder.
    pub opener: String,
    /// X display the recorder grabs from.
    pub display: String,
    pub countdown_secs: u32,
    pub stop_grace: Duration,
    pub monitor_lines: usize,
    pub failure_marker: Regex,
    pub selection_mode: SelectionMode,
    pub screen: Size,
}

impl Default for AppConfig {
    fn default() -> Self {
        let monitor = MonitorOptions::default();
        Self {
            output_dir: PathBuf::from("."),
            work_dir: PathBuf::from("."),
            ffmpeg: "ffmpeg".to_string(),
            import: "import".to_string(),
            convert: "convert".to_string(),
            opener: "xdg-open".to_string(),
            display: ":1".to_string(),
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            stop_grace: DEFAULT_STOP_GRACE,
            monitor_lines: monitor.max_lines,
            failure_marker: monitor.failure_marker,
            selection_mode: SelectionMode::Drag,
            screen: Size::new(1920, 1080),
        }
    }
}

/// Location of the per-user env file.
pub fn user_env_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("areacast").join("areacast.env"))
}

fn load_env_files() {
    if let Some(path) = user_env_file().filter(|p| p.exists()) {
        match dotenvy::from_path(&path) {
            Ok(()) => log::info!("[CONFIG] Loaded {}", path.display()),
            Err(e) => log::warn!("[CONFIG] Could not read {}: {}", path.display(), e),
        }
    }
    if let Ok(path) = dotenvy::dotenv() {
        log::info!("[CONFIG] Loaded {}", path.display());
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub fn parse_selection_mode(value: &str) -> Option<SelectionMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "drag" => Some(SelectionMode::Drag),
        "two-click" | "two_click" | "twoclick" | "click" => Some(SelectionMode::TwoClick),
        _ => None,
    }
}

/// `WIDTHxHEIGHT`, e.g. `2560x1440`.
pub fn parse_screen(value: &str) -> Option<Size> {
    let (w, h) = value.trim().split_once(['x', 'X'])?;
    let size = Size::new(w.trim().parse().ok()?, h.trim().parse().ok()?);
    (size.width > 0 && size.height > 0).then_some(size)
}

impl AppConfig {
    /// Loads env files, then reads the environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_env_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for unset
    /// keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("AREACAST_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("AREACAST_WORK_DIR") {
            config.work_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("AREACAST_FFMPEG") {
            config.ffmpeg = v;
        }
        if let Some(v) = lookup("AREACAST_IMPORT") {
            config.import = v;
        }
        if let Some(v) = lookup("AREACAST_CONVERT") {
            config.convert = v;
        }
        if let Some(v) = lookup("AREACAST_OPENER") {
            config.opener = v;
        }
        if let Some(v) = lookup("DISPLAY").filter(|v| !v.is_empty()) {
            config.display = v;
        }
        if let Some(v) = lookup("AREACAST_COUNTDOWN_SECS") {
            config.countdown_secs = parse("AREACAST_COUNTDOWN_SECS", &v)?;
        }
        if let Some(v) = lookup("AREACAST_STOP_GRACE_MS") {
            config.stop_grace =
                Duration::from_millis(parse("AREACAST_STOP_GRACE_MS", &v)?);
        }
        if let Some(v) = lookup("AREACAST_MONITOR_LINES") {
            config.monitor_lines = parse("AREACAST_MONITOR_LINES", &v)?;
        }
        if let Some(v) = lookup("AREACAST_FAILURE_MARKER") {
            config.failure_marker =
                Regex::new(&v).map_err(|source| ConfigError::Pattern { value: v, source })?;
        }
        if let Some(v) = lookup("AREACAST_SELECTION_MODE") {
            config.selection_mode =
                parse_selection_mode(&v).ok_or_else(|| ConfigError::Invalid {
                    key: "AREACAST_SELECTION_MODE".to_string(),
                    value: v.clone(),
                })?;
        }
        if let Some(v) = lookup("AREACAST_SCREEN") {
            config.screen = parse_screen(&v).ok_or_else(|| ConfigError::Invalid {
                key: "AREACAST_SCREEN".to_string(),
                value: v.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.output_dir.join("videos")
    }

    pub fn session_paths(&self) -> SessionPaths {
        SessionPaths::new(&self.work_dir, self.videos_dir())
    }

    pub fn toolchain(&self) -> FfmpegToolchain {
        FfmpegToolchain {
            ffmpeg: self.ffmpeg.clone(),
            import: self.import.clone(),
            convert: self.convert.clone(),
            display: self.display.clone(),
        }
    }

    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            monitor: MonitorOptions {
                max_lines: self.monitor_lines,
                failure_marker: self.failure_marker.clone(),
            },
            stop_grace: self.stop_grace,
        }
    }

    /// Logs a warning for each required tool that is not on `PATH` and
    /// returns their names. The app still starts; the missing tool fails
    /// when it is first used.
    pub fn check_tools(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for tool in [&self.ffmpeg, &self.import, &self.convert, &self.opener] {
            if which::which(tool).is_err() {
                log::warn!("[CONFIG] '{}' not found on PATH", tool);
                missing.push(tool.clone());
            }
        }
        if !FALLBACK_PLAYERS.iter().any(|p| which::which(p).is_ok()) {
            log::debug!("[CONFIG] No fallback video player installed");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.countdown_secs, 2);
        assert_eq!(config.stop_grace, Duration::from_secs(3));
        assert_eq!(config.monitor_lines, 10);
        assert_eq!(config.selection_mode, SelectionMode::Drag);
        assert_eq!(config.screen, Size::new(1920, 1080));
        assert_eq!(config.toolchain().display, ":1");
        assert_eq!(config.videos_dir(), PathBuf::from("./videos"));
        assert!(config.failure_marker.is_match("Error opening input"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AREACAST_OUTPUT_DIR", "/tmp/out"),
            ("AREACAST_COUNTDOWN_SECS", "0"),
            ("AREACAST_STOP_GRACE_MS", "250"),
            ("AREACAST_SELECTION_MODE", "two-click"),
            ("AREACAST_SCREEN", "2560x1440"),
            ("AREACAST_FAILURE_MARKER", "(?i)error|denied"),
            ("DISPLAY", ":2"),
        ]))
        .unwrap();
        assert_eq!(config.screenshots_dir(), PathBuf::from("/tmp/out/screenshots"));
        assert_eq!(config.countdown_secs, 0);
        assert_eq!(config.process_options().stop_grace, Duration::from_millis(250));
        assert_eq!(config.selection_mode, SelectionMode::TwoClick);
        assert_eq!(config.screen, Size::new(2560, 1440));
        assert_eq!(config.toolchain().display, ":2");
        assert!(config.failure_marker.is_match("Permission DENIED"));
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = AppConfig::from_lookup(lookup(&[("AREACAST_COUNTDOWN_SECS", "soon")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, .. } if key == "AREACAST_COUNTDOWN_SECS")
        );

        let err =
            AppConfig::from_lookup(lookup(&[("AREACAST_SCREEN", "wide")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = AppConfig::from_lookup(lookup(&[("AREACAST_FAILURE_MARKER", "(")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { .. }));
    }

    #[test]
    fn screen_parsing() {
        assert_eq!(parse_screen("800X600"), Some(Size::new(800, 600)));
        assert_eq!(parse_screen("0x600"), None);
        assert_eq!(parse_screen("800"), None);
    }
}
