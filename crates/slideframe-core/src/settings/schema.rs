//! The settings record shared by every component of a frame.
//!
//! [`Settings`] is persisted as TOML by the host crate.  Every field carries a
//! `#[serde(default = "...")]` so a file written by an older release, or no
//! file at all, still yields a complete record.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::fields::FIELDS;

/// Named configuration fields driving slideshow and display behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Cross-fade duration between slides, in milliseconds.
    #[serde(default = "default_fade_transition_time")]
    pub fade_transition_time: f64,
    /// Time each slide stays on screen, in milliseconds.
    #[serde(default = "default_slideshow_transition_time")]
    pub slideshow_transition_time: i32,
    /// Font size of the date/time info bar.
    #[serde(default = "default_info_bar_font_size")]
    pub info_bar_font_size: i32,
    #[serde(default = "default_date_time_font_family")]
    pub date_time_font_family: String,
    #[serde(default = "default_date_time_format")]
    pub date_time_format: String,
    /// Screen rotation in degrees.
    #[serde(default)]
    pub rotation: i32,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_image_stretch")]
    pub image_stretch: String,
    #[serde(default = "default_video_stretch")]
    pub video_stretch: String,
    /// Video volume in `[0.0, 1.0]`.
    #[serde(default)]
    pub video_volume: f32,
    #[serde(default)]
    pub show_info_date_time: bool,
    /// When set, changes made on this frame are pushed to `remote_clients`.
    #[serde(default)]
    pub is_sync_enabled: bool,
    /// Addresses (`host` or `host:port`) of the secondary frames kept in sync.
    #[serde(default)]
    pub remote_clients: Vec<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_fade_transition_time() -> f64 {
    1200.0
}
fn default_slideshow_transition_time() -> i32 {
    30_000
}
fn default_info_bar_font_size() -> i32 {
    30
}
fn default_date_time_font_family() -> String {
    "Ubuntu".to_string()
}
fn default_date_time_format() -> String {
    "H:mm tt".to_string()
}
fn default_image_stretch() -> String {
    "Uniform".to_string()
}
fn default_video_stretch() -> String {
    "Fill".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fade_transition_time: default_fade_transition_time(),
            slideshow_transition_time: default_slideshow_transition_time(),
            info_bar_font_size: default_info_bar_font_size(),
            date_time_font_family: default_date_time_font_family(),
            date_time_format: default_date_time_format(),
            rotation: 0,
            shuffle: false,
            image_stretch: default_image_stretch(),
            video_stretch: default_video_stretch(),
            video_volume: 0.0,
            show_info_date_time: false,
            is_sync_enabled: false,
            remote_clients: Vec::new(),
        }
    }
}

impl Settings {
    /// Writes the current values to the log, one line per field.
    pub fn log_summary(&self) {
        info!("current settings:");
        for line in self.summary_lines() {
            info!("  {line}");
        }
    }

    /// `name: value` for every settable field, in table order, followed by
    /// the remote client count.
    pub fn summary_lines(&self) -> Vec<String> {
        FIELDS
            .iter()
            .map(|field| format!("{}: {}", field.name, field.read(self).to_wire()))
            .chain(std::iter::once(format!(
                "remote clients: {}",
                self.remote_clients.len()
            )))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
