// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion configuration.

use crate::error::Result;
use dxf_lite_core::{aci_to_rgb, Rgb};
use dxf_lite_geometry::{GeneratorOptions, PrunePolicy, RebaseConfig, TessellationConfig};
use serde::{Deserialize, Serialize};

/// Settings of one conversion
///
/// The four switches each gate one pipeline stage; the rest are tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Skip paper-space layouts entirely
    pub ignore_paper_space: bool,
    /// Run the prune/batch pass
    pub enable_merge: bool,
    /// Force this color on every node
    pub override_color: Option<Rgb>,
    /// Force this line weight on every hatch
    pub override_hatch_line_thickness: Option<f64>,
    pub rebase: RebaseConfig,
    pub tessellation: TessellationConfig,
    /// Entities between progress callbacks
    pub progress_interval: usize,
    /// Also prune hidden (layer off / invisible) nodes when merging
    pub prune_hidden: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            ignore_paper_space: false,
            enable_merge: true,
            override_color: None,
            override_hatch_line_thickness: None,
            rebase: RebaseConfig::default(),
            tessellation: TessellationConfig::default(),
            progress_interval: 256,
            prune_hidden: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// "#RRGGBB", "RRGGBB" or an ACI index
pub fn parse_color(value: &str) -> Option<Rgb> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return u32::from_str_radix(hex, 16).ok().map(Rgb::from_u32);
    }
    if value.len() == 6 {
        if let Ok(packed) = u32::from_str_radix(value, 16) {
            return Some(Rgb::from_u32(packed));
        }
    }
    value.parse::<u8>().ok().filter(|i| *i > 0).map(aci_to_rgb)
}

impl ConversionConfig {
    /// Defaults overlaid with `DXF_LITE_*` environment variables
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ignore_paper_space: env_flag("DXF_LITE_IGNORE_PAPER_SPACE")
                .unwrap_or(defaults.ignore_paper_space),
            enable_merge: env_flag("DXF_LITE_ENABLE_MERGE").unwrap_or(defaults.enable_merge),
            override_color: std::env::var("DXF_LITE_OVERRIDE_COLOR")
                .ok()
                .and_then(|v| parse_color(&v))
                .or(defaults.override_color),
            override_hatch_line_thickness: env_parse("DXF_LITE_OVERRIDE_HATCH_LINE_THICKNESS")
                .or(defaults.override_hatch_line_thickness),
            rebase: RebaseConfig {
                threshold_factor: env_parse("DXF_LITE_REBASE_THRESHOLD_FACTOR")
                    .unwrap_or(defaults.rebase.threshold_factor),
                min_magnitude: env_parse("DXF_LITE_REBASE_MIN_MAGNITUDE")
                    .unwrap_or(defaults.rebase.min_magnitude),
                ..defaults.rebase
            },
            tessellation: TessellationConfig {
                arc_tessellation_angle: env_parse::<f64>("DXF_LITE_ARC_TESSELLATION_ANGLE")
                    .map(f64::to_radians)
                    .unwrap_or(defaults.tessellation.arc_tessellation_angle),
                max_arc_segments: env_parse("DXF_LITE_MAX_ARC_SEGMENTS")
                    .unwrap_or(defaults.tessellation.max_arc_segments),
                ..defaults.tessellation
            },
            progress_interval: env_parse("DXF_LITE_PROGRESS_INTERVAL")
                .unwrap_or(defaults.progress_interval),
            prune_hidden: env_flag("DXF_LITE_PRUNE_HIDDEN").unwrap_or(defaults.prune_hidden),
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            override_color: self.override_color,
            override_hatch_line_thickness: self.override_hatch_line_thickness,
            rebase: self.rebase,
            tessellation: self.tessellation,
        }
    }

    pub fn prune_policy(&self) -> PrunePolicy {
        if self.prune_hidden {
            PrunePolicy::EmptyOrHidden
        } else {
            PrunePolicy::Empty
        }
    }
}
