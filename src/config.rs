use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::DEFAULT_FFT_SIZE;
use crate::layout::{BarMode, BarStyle};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub bars: BarsConfig,
}

#[derive(Debug, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct BarsConfig {
    #[serde(default)]
    pub mode: BarMode,
    #[serde(default = "default_base_height")]
    pub base_height: f32,
    #[serde(default = "default_gain")]
    pub gain: f32,
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default = "default_depth")]
    pub depth: f32,
    #[serde(default = "default_color")]
    pub color: [f32; 4],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
        }
    }
}

impl Default for BarsConfig {
    fn default() -> Self {
        Self {
            mode: BarMode::default(),
            base_height: default_base_height(),
            gain: default_gain(),
            margin: default_margin(),
            depth: default_depth(),
            color: default_color(),
        }
    }
}

impl BarsConfig {
    pub fn style(&self) -> BarStyle {
        BarStyle {
            mode: self.mode,
            base_height: self.base_height,
            gain: self.gain,
            margin: self.margin,
            depth: self.depth,
            color: self.color,
        }
    }
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title() -> String { "barscope".into() }
fn default_fft_size() -> usize { DEFAULT_FFT_SIZE }
fn default_base_height() -> f32 { BarStyle::default().base_height }
fn default_gain() -> f32 { BarStyle::default().gain }
fn default_margin() -> f32 { BarStyle::default().margin }
fn default_depth() -> f32 { BarStyle::default().depth }
fn default_color() -> [f32; 4] { BarStyle::default().color }

/// Settings the run is started with, once the CLI and config file are merged.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub fft_size: usize,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub style: BarStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            width: default_width(),
            height: default_height(),
            title: default_title(),
            style: BarStyle::default(),
        }
    }
}

impl Config {
    /// Applies file values under the CLI: a field the CLI left at its default takes
    /// the file's value. Fields with no CLI flag always come from the file.
    pub fn merge_into(&self, settings: &mut Settings) {
        let defaults = Settings::default();
        let from_file = self.bars.style();

        if settings.fft_size == defaults.fft_size { settings.fft_size = self.analysis.fft_size; }
        if settings.width == defaults.width { settings.width = self.window.width; }
        if settings.height == defaults.height { settings.height = self.window.height; }
        if settings.style.mode == defaults.style.mode { settings.style.mode = from_file.mode; }
        if settings.style.gain == defaults.style.gain { settings.style.gain = from_file.gain; }

        settings.title = self.window.title.clone();
        settings.style.base_height = from_file.base_height;
        settings.style.margin = from_file.margin;
        settings.style.depth = from_file.depth;
        settings.style.color = from_file.color;
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Ignoring config {}: {}", path.display(), e);
            return None;
        }
    };
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Ignoring malformed config {}: {}", path.display(), e);
            None
        }
    }
}

/// Explicit path, else `barscope.toml` in the working directory, else the user config dir.
pub fn find_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("barscope.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("barscope").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("barscope").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}
