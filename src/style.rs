//! Style normalization.
//!
//! Turns a resolved NOODL `style` object into presentation values: viewport-relative sizes
//! become pixels, layout vocabulary (`axis`, `align`, `textAlign`) becomes flex CSS,
//! numbered border presets become concrete borders and `0x` colors become `#` colors.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

use crate::blueprint::Blueprint;
use crate::node::ComponentId;
use crate::resolver::{Resolver, Scopes};
use crate::viewport::{format_px, Dimension, Viewport};

/// Style keys that are not presentation attributes and are dropped after use
pub const NOODL_STYLE_KEYS: &[&str] = &["axis", "align", "border", "isHidden", "shadow", "textColor"];

const WIDTH_KEYS: &[&str] = &[
    "width",
    "left",
    "right",
    "marginLeft",
    "marginRight",
    "paddingLeft",
    "paddingRight",
    "minWidth",
    "maxWidth",
];

const HEIGHT_KEYS: &[&str] = &[
    "height",
    "top",
    "bottom",
    "marginTop",
    "marginBottom",
    "paddingTop",
    "paddingBottom",
    "minHeight",
    "maxHeight",
];

const SHADOW_PRESET: &str = "5px 5px 10px 3px rgba(0, 0, 0, 0.015)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Align {
    CenterX,
    CenterY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
    CenterX,
    CenterY,
}

/// `textAlign: { x: centerX, y: centerY }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextAlignXY {
    pub x: Option<TextAlign>,
    pub y: Option<TextAlign>,
}

/// Numbered border style, given as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BorderPreset {
    Number(u8),
    Text(String),
}

impl BorderPreset {
    pub fn number(&self) -> Option<u8> {
        match self {
            BorderPreset::Number(n) => Some(*n),
            BorderPreset::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// `border: 2` or `border: { style: 2, width: 1, color: 0x... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Border {
    Preset(BorderPreset),
    Detailed {
        #[serde(default)]
        style: Option<BorderPreset>,
        #[serde(default)]
        width: Option<Value>,
        #[serde(default)]
        color: Option<String>,
    },
}

/// CSS declarations for each numbered border preset
fn border_preset(preset: u8) -> &'static [(&'static str, &'static str)] {
    match preset {
        1 => &[("borderStyle", "none"), ("borderRadius", "0px")],
        2 => &[
            ("borderRadius", "0px"),
            ("borderStyle", "none"),
            ("borderBottomStyle", "solid"),
        ],
        3 => &[("borderStyle", "solid")],
        4 => &[("borderStyle", "dashed"), ("borderRadius", "0px")],
        5 => &[("borderStyle", "none")],
        6 => &[("borderStyle", "solid"), ("borderRadius", "0px")],
        7 => &[
            ("borderRadius", "0px"),
            ("borderStyle", "none"),
            ("borderTopStyle", "solid"),
            ("borderBottomStyle", "solid"),
        ],
        _ => &[],
    }
}

fn noodl_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0[xX]([0-9a-fA-F]{3,8})$").unwrap())
}

/// `0xRRGGBB[AA]` → `#RRGGBB[AA]`; anything else is returned unchanged.
pub fn format_color(value: &str) -> String {
    match noodl_color_regex().captures(value.trim()) {
        Some(caps) => format!("#{}", &caps[1]),
        None => value.to_string(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// A bare number (or numeric string) gets a `px` suffix; strings with units pass through.
fn with_px(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| Value::String(format_px(v))),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) => Some(Value::String(format_px(v))),
            Err(_) => None,
        },
        _ => None,
    }
}

fn set(style: &mut Map<String, Value>, key: &str, value: &str) {
    style.insert(key.to_string(), Value::String(value.to_string()));
}

pub struct StyleNormalizer<'a> {
    viewport: &'a Viewport,
    remove_noodl_keys: bool,
}

impl<'a> StyleNormalizer<'a> {
    pub fn new(viewport: &'a Viewport) -> Self {
        Self {
            viewport,
            remove_noodl_keys: true,
        }
    }

    pub fn keep_noodl_keys(mut self, keep: bool) -> Self {
        self.remove_noodl_keys = !keep;
        self
    }

    /// Normalize an already-resolved style object.
    pub fn normalize(&self, style: &Map<String, Value>) -> Map<String, Value> {
        let mut out = style.clone();

        self.apply_colors(&mut out);
        self.apply_layout(&mut out);
        self.apply_text_align(&mut out);
        self.apply_border(&mut out);
        self.apply_flags(&mut out);
        self.apply_font(&mut out);
        self.apply_sizes(&mut out);

        if self.remove_noodl_keys {
            for key in NOODL_STYLE_KEYS {
                out.remove(*key);
            }
        }
        out
    }

    fn apply_colors(&self, style: &mut Map<String, Value>) {
        for (key, value) in style.iter_mut() {
            if key != "color" && !key.ends_with("Color") {
                continue;
            }
            if let Value::String(s) = value {
                *s = format_color(s);
            }
        }
        if !style.contains_key("color") {
            if let Some(color) = style.get("textColor").cloned() {
                style.insert("color".to_string(), color);
            }
        }
    }

    fn apply_layout(&self, style: &mut Map<String, Value>) {
        let axis = style
            .get("axis")
            .and_then(|v| serde_json::from_value::<Axis>(v.clone()).ok());
        match axis {
            Some(Axis::Horizontal) => {
                set(style, "display", "flex");
                set(style, "flexWrap", "nowrap");
            }
            Some(Axis::Vertical) => {
                set(style, "display", "flex");
                set(style, "flexDirection", "column");
            }
            None => {}
        }

        let align = style
            .get("align")
            .and_then(|v| serde_json::from_value::<Align>(v.clone()).ok());
        let vertical = axis == Some(Axis::Vertical);
        match align {
            Some(Align::CenterX) => {
                set(style, "display", "flex");
                set(style, if vertical { "alignItems" } else { "justifyContent" }, "center");
            }
            Some(Align::CenterY) => {
                set(style, "display", "flex");
                set(style, if vertical { "justifyContent" } else { "alignItems" }, "center");
            }
            None => {}
        }
    }

    fn apply_text_align(&self, style: &mut Map<String, Value>) {
        let Some(value) = style.get("textAlign").cloned() else {
            return;
        };
        let (x, y) = match &value {
            Value::Object(_) => match serde_json::from_value::<TextAlignXY>(value.clone()) {
                Ok(xy) => (xy.x, xy.y),
                Err(_) => {
                    debug!("Unrecognized textAlign object: {}", value);
                    return;
                }
            },
            _ => match serde_json::from_value::<TextAlign>(value.clone()) {
                Ok(TextAlign::CenterY) => (None, Some(TextAlign::CenterY)),
                Ok(align) => (Some(align), None),
                Err(_) => return,
            },
        };

        style.remove("textAlign");
        match x {
            Some(TextAlign::CenterX) | Some(TextAlign::Center) => set(style, "textAlign", "center"),
            Some(TextAlign::Left) => set(style, "textAlign", "left"),
            Some(TextAlign::Right) => set(style, "textAlign", "right"),
            Some(TextAlign::Justify) => set(style, "textAlign", "justify"),
            Some(TextAlign::CenterY) | None => {}
        }
        if let Some(TextAlign::CenterY) = y {
            set(style, "display", "flex");
            set(style, "alignItems", "center");
        }
    }

    fn apply_border(&self, style: &mut Map<String, Value>) {
        if let Some(border) = style
            .get("border")
            .and_then(|v| serde_json::from_value::<Border>(v.clone()).ok())
        {
            let (preset, width, color) = match border {
                Border::Preset(preset) => (Some(preset), None, None),
                Border::Detailed {
                    style: preset,
                    width,
                    color,
                } => (preset, width, color),
            };
            if let Some(n) = preset.as_ref().and_then(BorderPreset::number) {
                for (key, value) in border_preset(n) {
                    set(style, key, value);
                }
            }
            if let Some(width) = width.as_ref().and_then(with_px) {
                style.insert("borderWidth".to_string(), width);
            }
            if let Some(color) = color {
                style.insert("borderColor".to_string(), Value::String(format_color(&color)));
            }
        }

        for key in ["borderWidth", "borderRadius"] {
            if let Some(px) = style.get(key).and_then(with_px) {
                style.insert(key.to_string(), px);
            }
        }
    }

    fn apply_flags(&self, style: &mut Map<String, Value>) {
        if is_truthy(style.get("isHidden")) {
            set(style, "visibility", "hidden");
        }
        if is_truthy(style.get("shadow")) {
            set(style, "boxShadow", SHADOW_PRESET);
        }
        if let Some(Value::String(z)) = style.get("zIndex") {
            if let Ok(z) = z.trim().parse::<i64>() {
                style.insert("zIndex".to_string(), Value::from(z));
            }
        }
    }

    fn apply_font(&self, style: &mut Map<String, Value>) {
        if let Some(px) = style.get("fontSize").and_then(with_px) {
            style.insert("fontSize".to_string(), px);
        }
        if style.get("fontStyle").and_then(Value::as_str) == Some("bold") {
            style.remove("fontStyle");
            set(style, "fontWeight", "bold");
        }
    }

    fn apply_sizes(&self, style: &mut Map<String, Value>) {
        for (keys, dimension) in [(WIDTH_KEYS, Dimension::Width), (HEIGHT_KEYS, Dimension::Height)] {
            let total = self.viewport.dimension(dimension);
            for key in keys {
                let Some(value) = style.get(*key) else {
                    continue;
                };
                if let Some(size) = self.viewport.get_size(value, total) {
                    style.insert(key.to_string(), Value::String(size));
                }
            }
        }
    }
}

/// Normalize with default settings (NOODL-only keys removed).
pub fn normalize_style(style: &Map<String, Value>, viewport: &Viewport) -> Map<String, Value> {
    StyleNormalizer::new(viewport).normalize(style)
}

/// Derive the `data-*` presentation attributes of a node.
///
/// `data-value` is the current value behind `dataKey`; it is left unset when the key does
/// not resolve.
pub fn data_attributes(
    blueprint: &Blueprint,
    props: &Map<String, Value>,
    list_id: Option<&ComponentId>,
    resolver: &Resolver,
    scopes: &Scopes,
) -> Map<String, Value> {
    let mut attrs = Map::new();

    if let Some(data_key) = blueprint.get_str("dataKey").filter(|k| !k.is_empty()) {
        attrs.insert("data-key".to_string(), Value::String(data_key.to_string()));
        if let Some(name) = data_key.rsplit('.').next() {
            attrs.insert("data-name".to_string(), Value::String(name.to_string()));
        }
        match resolver.resolve_data_key(data_key, scopes) {
            Some(Value::Null) | None => debug!("dataKey '{}' did not resolve", data_key),
            Some(value) => {
                attrs.insert("data-value".to_string(), value);
            }
        }
    }

    if let Some(list_id) = list_id {
        attrs.insert(
            "data-listid".to_string(),
            Value::String(list_id.to_string()),
        );
    }

    if let Some(view_tag) = blueprint.get_str("viewTag") {
        attrs.insert("data-viewtag".to_string(), Value::String(view_tag.to_string()));
    }

    match props.get("placeholder") {
        Some(placeholder @ (Value::String(_) | Value::Number(_))) => {
            attrs.insert("data-placeholder".to_string(), placeholder.clone());
        }
        _ => {}
    }

    attrs
}
