use std::path::PathBuf;

use crate::canvas::{MAX_DIMENSION, clamp_dimension};
use crate::components::tools::{DEFAULT_TOOL_INDEX, MAX_BRUSH_SIZE, ToolOptions};

// ============================================================================
// APP SETTINGS - persisted as key=value lines
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppSettings {
    pub max_undo_steps: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub default_color: String,
    pub brush_size: u32,
    pub default_tool: i64,
    pub autosave_delay_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: 50,
            canvas_width: 32,
            canvas_height: 32,
            default_color: "#000000".to_string(),
            brush_size: 1,
            default_tool: DEFAULT_TOOL_INDEX,
            autosave_delay_ms: 500,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/logopaint/logopaint_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\LogoPaint\logopaint_settings.cfg
    /// On macOS:   ~/Library/Application Support/LogoPaint/logopaint_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("LogoPaint");
            return Some(config_dir.join("logopaint_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("LogoPaint");
            return Some(config_dir.join("logopaint_settings.cfg"));
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?
                .join("logopaint");
            Some(config_dir.join("logopaint_settings.cfg"))
        }
    }

    /// Parse config text. Unknown keys and bad values fall back per key.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse::<usize>().unwrap_or(50).max(1);
                }
                "canvas_width" => {
                    if let Ok(v) = val.parse::<f64>() {
                        s.canvas_width = clamp_dimension(v);
                    }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<f64>() {
                        s.canvas_height = clamp_dimension(v);
                    }
                }
                "default_color" => {
                    if val.parse::<crate::canvas::Color>().is_ok() {
                        s.default_color = val.to_string();
                    } else {
                        log_warn!("Ignoring unparseable default_color '{}'", val);
                    }
                }
                "brush_size" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.brush_size = v.clamp(1, MAX_BRUSH_SIZE);
                    }
                }
                "default_tool" => {
                    s.default_tool = val.parse().unwrap_or(DEFAULT_TOOL_INDEX);
                }
                "autosave_delay_ms" => {
                    s.autosave_delay_ms = val.parse().unwrap_or(500);
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             canvas_width={}\n\
             canvas_height={}\n\
             default_color={}\n\
             brush_size={}\n\
             default_tool={}\n\
             autosave_delay_ms={}\n",
            self.max_undo_steps,
            self.canvas_width.min(MAX_DIMENSION),
            self.canvas_height.min(MAX_DIMENSION),
            self.default_color,
            self.brush_size,
            self.default_tool,
            self.autosave_delay_ms,
        )
    }

    /// Save settings to disk
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::settings_path() else { return Ok(()) };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_config_string())?;
        log_info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::parse(&content)
    }

    pub fn tool_options(&self) -> ToolOptions {
        ToolOptions::new(self.default_color.clone(), self.brush_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = AppSettings::default();
        assert_eq!(s.max_undo_steps, 50);
        assert_eq!((s.canvas_width, s.canvas_height), (32, 32));
        assert_eq!(s.default_tool, 3);
        assert_eq!(s.tool_options(), ToolOptions::default());
    }

    #[test]
    fn parse_roundtrips_config_string() {
        let s = AppSettings {
            max_undo_steps: 7,
            canvas_width: 64,
            canvas_height: 16,
            default_color: "#ff8800".to_string(),
            brush_size: 5,
            default_tool: 0,
            autosave_delay_ms: 250,
        };
        assert_eq!(AppSettings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_fall_back_per_key() {
        let s = AppSettings::parse(
            "# comment\n\
             max_undo_steps=0\n\
             canvas_width=99999\n\
             canvas_height=-4\n\
             default_color=not-a-color\n\
             brush_size=500\n\
             default_tool=oops\n\
             unknown_key=1\n\
             garbage line\n",
        );
        assert_eq!(s.max_undo_steps, 1);
        assert_eq!(s.canvas_width, 4096);
        assert_eq!(s.canvas_height, 1);
        assert_eq!(s.default_color, "#000000");
        assert_eq!(s.brush_size, MAX_BRUSH_SIZE);
        assert_eq!(s.default_tool, 3);
        assert_eq!(s.autosave_delay_ms, 500);
    }
}
