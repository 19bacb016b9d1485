use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ViewportSettings;

/// Unit suffixes that are already absolute (or relative to something other than the viewport)
/// and pass through size conversion untouched.
const PASSTHROUGH_UNITS: &[&str] = &["px", "%", "em", "rem", "pt"];

/// Which viewport axis a style key is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

/// The rendering surface a page is laid out on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        ViewportSettings::default().into()
    }
}

impl From<ViewportSettings> for Viewport {
    fn from(settings: ViewportSettings) -> Self {
        Viewport::new(settings.width, settings.height)
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Size of the given axis in pixels
    pub fn dimension(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Width => self.width,
            Dimension::Height => self.height,
        }
    }

    /// Convert a declarative size into a pixel string.
    ///
    /// - `"0"` → `"0px"`, `"1"` → the whole `dimension`
    /// - any other number (or numeric string) is a fraction of `dimension`
    /// - `"50vw"` / `"50vh"` are percentages of this viewport's width / height
    /// - strings already carrying a unit (`px`, `%`, `em`, ...) are returned unchanged
    pub fn get_size(&self, value: &Value, dimension: f64) -> Option<String> {
        match value {
            Value::String(s) if has_passthrough_unit(s.trim()) => Some(s.trim().to_string()),
            _ => self.to_pixels(value, dimension).map(format_px),
        }
    }

    /// Numeric form of [`get_size`](Self::get_size), in pixels.
    pub fn to_pixels(&self, value: &Value, dimension: f64) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64().map(|v| v * dimension),
            Value::String(s) => {
                let s = s.trim();
                if let Some(n) = s.strip_suffix("vw") {
                    return n.trim().parse::<f64>().ok().map(|v| v / 100.0 * self.width);
                }
                if let Some(n) = s.strip_suffix("vh") {
                    return n.trim().parse::<f64>().ok().map(|v| v / 100.0 * self.height);
                }
                if let Some(n) = s.strip_suffix("px") {
                    return n.trim().parse::<f64>().ok();
                }
                match s {
                    "0" => Some(0.0),
                    "1" => Some(dimension),
                    _ => s.parse::<f64>().ok().map(|v| v * dimension),
                }
            }
            _ => None,
        }
    }
}

fn has_passthrough_unit(s: &str) -> bool {
    PASSTHROUGH_UNITS.iter().any(|unit| {
        s.strip_suffix(unit)
            .map(|n| n.trim().parse::<f64>().is_ok())
            .unwrap_or(false)
    })
}

/// Format a pixel amount, dropping floating-point noise and a trailing `.0`.
pub fn format_px(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    format!("{}px", rounded)
}
