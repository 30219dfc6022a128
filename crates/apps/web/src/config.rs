use serde::{Deserialize, Serialize};

use crate::render::Theme;

/// Viewer configuration. Every field has a default; `configure` from JS
/// overrides only the fields it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConfig {
    // ── Data sources ─────────────────────────────────────────
    pub topology_url: String,
    /// Object collection to read from the topology; falls back to the first.
    pub topology_object: String,
    pub store_url: String,
    pub write_url: String,
    pub encyclopedia_url: String,
    pub summary_timeout_ms: u32,

    // ── Layout ───────────────────────────────────────────────
    pub resize_debounce_ms: u32,
    pub handle_width: f64,
    /// Initial panel width, clamped to the layout's panel bounds.
    pub panel_width: f64,

    // ── Zoom ─────────────────────────────────────────────────
    pub scale_extent: [f64; 2],
    pub reset_duration_ms: u32,

    pub theme: Theme,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            topology_url: "/assets/countries-110m.json".to_string(),
            topology_object: formats::DEFAULT_OBJECT.to_string(),
            store_url: "/data/regions.json".to_string(),
            write_url: "/api/regions".to_string(),
            encyclopedia_url: catalog::encyclopedia::DEFAULT_ENDPOINT.to_string(),
            summary_timeout_ms: catalog::encyclopedia::DEFAULT_TIMEOUT_MS,
            resize_debounce_ms: 150,
            handle_width: scene::layout::DEFAULT_HANDLE_WIDTH,
            panel_width: scene::layout::DEFAULT_PANEL_WIDTH,
            scale_extent: crate::zoom_controller::DEFAULT_SCALE_EXTENT,
            reset_duration_ms: 500,
            theme: Theme::default(),
        }
    }
}

impl ViewConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn resize_debounce_s(&self) -> f64 {
        f64::from(self.resize_debounce_ms) / 1000.0
    }

    pub fn reset_duration_s(&self) -> f64 {
        f64::from(self.reset_duration_ms) / 1000.0
    }
}
