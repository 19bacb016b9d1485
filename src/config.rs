//! Resolver configuration
//!
//! The host hands over configuration text; nothing here touches the filesystem.

use serde::{Deserialize, Serialize};

use crate::error::NoodlResult;

/// Settings shared by every resolution pass of a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Consecutive encounters of the same raw reference before the branch is abandoned
    pub cycle_limit: usize,

    /// Longest reference chain followed in a single resolution
    pub max_reference_hops: usize,

    /// Treat an uppercase first path segment of a `..` reference as a root (page) key
    pub uppercase_root_keys: bool,

    /// Viewport given to pages created without an explicit size
    pub viewport: ViewportSettings,

    /// Delete NOODL-only style keys (`axis`, `align`, `border`, ...) after normalizing
    pub remove_noodl_style_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle_limit: default_cycle_limit(),
            max_reference_hops: default_max_reference_hops(),
            uppercase_root_keys: true,
            viewport: ViewportSettings::default(),
            remove_noodl_style_keys: true,
        }
    }
}

fn default_cycle_limit() -> usize {
    3
}

fn default_max_reference_hops() -> usize {
    32
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            width: 375.0,
            height: 667.0,
        }
    }
}

impl Config {
    /// Parse configuration from YAML text. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> NoodlResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        tracing::debug!("Loaded resolver config: {:?}", config);
        Ok(config)
    }
}
