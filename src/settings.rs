use std::path::{Path, PathBuf};

use crate::ops::compositor::{self, MAX_THRESHOLD, Margins};
use crate::session::SliceSettings;

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Grid, key and margin values restored into the next session
    pub slice: SliceSettings,
    /// Folder the open/save dialogs start in (empty = dialog default)
    pub last_dir: String,
    /// Whether the cell preview window opens at fit zoom
    pub preview_fit: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            slice: SliceSettings::default(),
            last_dir: String::new(),
            preview_fit: false,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/spriteslicer/spriteslicer_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\SpriteSlicer\spriteslicer_settings.cfg
    /// On macOS:   ~/Library/Application Support/SpriteSlicer/spriteslicer_settings.cfg
    /// Fallback:   same directory as the executable.
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("spriteslicer");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("spriteslicer_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_default();
            let config_dir = PathBuf::from(appdata).join("SpriteSlicer");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("spriteslicer_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("SpriteSlicer");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("spriteslicer_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("spriteslicer_settings.cfg")))
        }
    }

    /// Serialize as `key=value` lines.
    pub fn to_config_string(&self) -> String {
        let s = &self.slice;
        let m = s.margins;
        format!(
            "rows={}\n\
             cols={}\n\
             remove_background={}\n\
             key_color={}\n\
             threshold={}\n\
             margins={},{},{},{}\n\
             show_grid={}\n\
             show_mask={}\n\
             last_dir={}\n\
             preview_fit={}\n",
            s.rows,
            s.cols,
            s.remove_background,
            compositor::format_hex_color(s.key_color),
            s.threshold,
            m.top,
            m.bottom,
            m.left,
            m.right,
            s.show_grid,
            s.show_mask,
            self.last_dir,
            self.preview_fit,
        )
    }

    /// Parse `key=value` lines.  Unknown keys are ignored and malformed values
    /// keep their defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        let defaults = SliceSettings::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "rows" => {
                    s.slice.rows = val.parse().ok().filter(|&n| n >= 1).unwrap_or(defaults.rows);
                }
                "cols" => {
                    s.slice.cols = val.parse().ok().filter(|&n| n >= 1).unwrap_or(defaults.cols);
                }
                "remove_background" => {
                    s.slice.remove_background = val == "true";
                }
                "key_color" => {
                    if let Some(rgb) = compositor::parse_hex_color(val) {
                        s.slice.key_color = rgb;
                    }
                }
                "threshold" => {
                    s.slice.threshold = val
                        .parse::<f32>()
                        .ok()
                        .filter(|t| t.is_finite())
                        .map(|t| t.clamp(0.0, MAX_THRESHOLD))
                        .unwrap_or(defaults.threshold);
                }
                "margins" => {
                    if let Some(m) = parse_margins(val) {
                        s.slice.margins = m;
                    }
                }
                "show_grid" => {
                    s.slice.show_grid = val != "false";
                }
                "show_mask" => {
                    s.slice.show_mask = val != "false";
                }
                "last_dir" => {
                    s.last_dir = val.to_string();
                }
                "preview_fit" => {
                    s.preview_fit = val == "true";
                }
                _ => {}
            }
        }
        s
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_config_string())
    }

    /// Missing or unreadable file gives defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            log::warn!("could not save settings to {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    /// Starting folder for native dialogs, if one is remembered and still
    /// exists.
    pub fn dialog_dir(&self) -> Option<PathBuf> {
        let dir = PathBuf::from(&self.last_dir);
        (!self.last_dir.is_empty() && dir.is_dir()).then_some(dir)
    }

    pub fn remember_dir(&mut self, file: &Path) {
        if let Some(parent) = file.parent().and_then(|p| p.to_str()) {
            self.last_dir = parent.to_string();
        }
    }
}

/// Parse `T,B,L,R` pixel insets.
pub fn parse_margins(s: &str) -> Option<Margins> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        &[top, bottom, left, right] => Some(Margins::new(top, bottom, left, right)),
        _ => None,
    }
}
