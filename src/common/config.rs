use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wm-layout")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub split: SplitSettings,
    #[serde(default)]
    pub hot_zone: HotZoneSettings,
    #[serde(default)]
    pub zoom: ZoomSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Default for windows that do not say whether they want a title bar and frame.
    #[serde(default = "yes")]
    pub decor_enable: bool,
    /// On desktop class devices a freshly placed floating window whose bottom edge
    /// would reach this line (in dp) is moved to the top of the limit rect. 0 disables it.
    #[serde(default)]
    pub floating_bottom_pos_y: u32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings { decor_enable: true, floating_bottom_pos_y: 0 }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SplitSettings {
    /// Positions the divider snaps to when a drag ends, as a fraction of the display.
    #[serde(default = "default_split_ratios")]
    pub split_ratios: Vec<f32>,
    #[serde(default = "default_exit_split_start_ratio")]
    pub exit_split_start_ratio: f32,
    #[serde(default = "default_exit_split_end_ratio")]
    pub exit_split_end_ratio: f32,
}

impl Default for SplitSettings {
    fn default() -> Self {
        SplitSettings {
            split_ratios: default_split_ratios(),
            exit_split_start_ratio: default_exit_split_start_ratio(),
            exit_split_end_ratio: default_exit_split_end_ratio(),
        }
    }
}

/// Margins, in dp, that hit testing adds around a window.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct HotZoneSettings {
    #[serde(default = "default_touch_hot_zone")]
    pub touch: u32,
    #[serde(default = "default_pointer_hot_zone")]
    pub pointer: u32,
}

impl Default for HotZoneSettings {
    fn default() -> Self {
        HotZoneSettings {
            touch: default_touch_hot_zone(),
            pointer: default_pointer_hot_zone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct ZoomSettings {
    #[serde(default = "default_zoom_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_zoom_max_scale")]
    pub max_scale: f32,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        ZoomSettings {
            min_scale: default_zoom_min_scale(),
            max_scale: default_zoom_max_scale(),
        }
    }
}

fn yes() -> bool { true }

fn default_split_ratios() -> Vec<f32> { vec![0.5] }

fn default_exit_split_start_ratio() -> f32 { 0.1 }

fn default_exit_split_end_ratio() -> f32 { 0.9 }

fn default_touch_hot_zone() -> u32 { 20 }

fn default_pointer_hot_zone() -> u32 { 4 }

fn default_zoom_min_scale() -> f32 { 2.0 }

fn default_zoom_max_scale() -> f32 { 8.0 }

impl SplitSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for ratio in &self.split_ratios {
            if !(*ratio > 0.0 && *ratio < 1.0) {
                issues.push(format!("split.split_ratios entries must be in (0, 1), got {ratio}"));
            }
        }

        if !(0.0..=1.0).contains(&self.exit_split_start_ratio) {
            issues.push(format!(
                "split.exit_split_start_ratio must be in [0, 1], got {}",
                self.exit_split_start_ratio
            ));
        }

        if !(0.0..=1.0).contains(&self.exit_split_end_ratio) {
            issues.push(format!(
                "split.exit_split_end_ratio must be in [0, 1], got {}",
                self.exit_split_end_ratio
            ));
        }

        if self.exit_split_start_ratio >= self.exit_split_end_ratio {
            issues.push(format!(
                "split.exit_split_start_ratio ({}) must be below exit_split_end_ratio ({})",
                self.exit_split_start_ratio, self.exit_split_end_ratio
            ));
        }

        issues
    }
}

impl HotZoneSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.pointer > self.touch {
            issues.push(format!(
                "hot_zone.pointer ({}) should not exceed hot_zone.touch ({})",
                self.pointer, self.touch
            ));
        }

        issues
    }
}

impl ZoomSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.min_scale < 1.0 {
            issues.push(format!("zoom.min_scale must be at least 1.0, got {}", self.min_scale));
        }

        if self.max_scale < self.min_scale {
            issues.push(format!(
                "zoom.max_scale ({}) must not be below zoom.min_scale ({})",
                self.max_scale, self.min_scale
            ));
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        let issues = config.validate();
        if !issues.is_empty() {
            bail!("invalid config:\n  {}", issues.join("\n  "));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.split.validate());
        issues.extend(self.hot_zone.validate());
        issues.extend(self.zoom.validate());

        issues
    }
}
