//! Machine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::symbols::MAX_CATALOG_SIZE;
use crate::timing::{TimingConfig, TimingProfile};

/// Number of rows the win evaluator scans on every reel
pub const VISIBLE_ROWS: usize = 3;

/// Display geometry of one reel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReelGeometry {
    /// Height of the whole reel window
    pub total_height: f64,
    /// Height of one symbol cell
    pub cell_height: f64,
    /// Cells in the reel's ring
    pub cells_per_reel: usize,
}

impl ReelGeometry {
    /// Classic three-row reel
    pub fn classic() -> Self {
        Self {
            total_height: 600.0,
            cell_height: 150.0,
            cells_per_reel: 3,
        }
    }

    /// Validate and derive cell spacing
    pub fn layout(&self) -> Result<ReelLayout, ConfigError> {
        if self.cells_per_reel < VISIBLE_ROWS {
            return Err(ConfigError::TooFewCells {
                cells: self.cells_per_reel,
                min: VISIBLE_ROWS,
            });
        }
        if !self.cell_height.is_finite() || self.cell_height <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "cell_height must be positive, got {}",
                self.cell_height
            )));
        }
        if !self.total_height.is_finite() || self.total_height <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "total_height must be positive, got {}",
                self.total_height
            )));
        }

        let cells = self.cells_per_reel as f64;
        let free_space = self.total_height - self.cell_height * cells;
        if free_space < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "{} cells of height {} do not fit in {}",
                self.cells_per_reel, self.cell_height, self.total_height
            )));
        }

        let spacing = free_space / (cells + 1.0);
        Ok(ReelLayout {
            cell_height: self.cell_height,
            spacing,
            recycle_threshold: 2.0 * (self.cell_height + spacing),
        })
    }
}

impl Default for ReelGeometry {
    fn default() -> Self {
        Self::classic()
    }
}

/// Spacing derived from `ReelGeometry`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReelLayout {
    pub cell_height: f64,
    /// Gap between neighbouring cells
    pub spacing: f64,
    /// Cells scrolled below `-recycle_threshold` jump back to the top
    pub recycle_threshold: f64,
}

impl ReelLayout {
    /// Distance between the origins of neighbouring cells
    #[inline]
    pub fn step(&self) -> f64 {
        self.cell_height + self.spacing
    }
}

/// Scroll speed parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Cruising speed (units per second)
    pub max_speed: f64,
    /// Time to ramp from standstill to `max_speed`
    pub ramp_duration_secs: f64,
    /// Minimum speed while stopping, as a fraction of `max_speed`
    pub stop_speed_floor: f64,
}

impl MotionConfig {
    pub fn classic() -> Self {
        Self {
            max_speed: 2400.0,
            ramp_duration_secs: 0.5,
            stop_speed_floor: 0.25,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_speed.is_finite() || self.max_speed <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "max_speed must be positive, got {}",
                self.max_speed
            )));
        }
        if !self.ramp_duration_secs.is_finite() || self.ramp_duration_secs < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "ramp_duration_secs must be non-negative, got {}",
                self.ramp_duration_secs
            )));
        }
        if !(self.stop_speed_floor > 0.0 && self.stop_speed_floor <= 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "stop_speed_floor must be in (0, 1], got {}",
                self.stop_speed_floor
            )));
        }
        Ok(())
    }

    /// Slowest speed a stopping reel may scroll at
    #[inline]
    pub fn min_stop_speed(&self) -> f64 {
        self.max_speed * self.stop_speed_floor
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::classic()
    }
}

/// Complete machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of reels, left to right
    pub reel_count: usize,
    /// Distinct symbol types; must equal `geometry.cells_per_reel`
    pub catalog_size: usize,
    pub geometry: ReelGeometry,
    pub motion: MotionConfig,
    pub timing: TimingConfig,
    /// Seed for reproducible shuffles (`None` = OS entropy)
    pub seed: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            reel_count: 5,
            catalog_size: 3,
            geometry: ReelGeometry::classic(),
            motion: MotionConfig::classic(),
            timing: TimingConfig::normal(),
            seed: None,
        }
    }
}

impl MachineConfig {
    /// Fast config for tests and headless runs
    pub fn studio() -> Self {
        Self {
            timing: TimingConfig::studio(),
            ..Default::default()
        }
    }

    /// Replace the timing with a named profile
    pub fn with_timing_profile(mut self, profile: TimingProfile) -> Self {
        self.timing = TimingConfig::from_profile(profile);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every constraint the machine relies on
    pub fn validate(&self) -> Result<ReelLayout, ConfigError> {
        if self.reel_count == 0 {
            return Err(ConfigError::NoReels);
        }
        let layout = self.geometry.layout()?;
        if self.catalog_size > MAX_CATALOG_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "catalog_size {} exceeds {}",
                self.catalog_size, MAX_CATALOG_SIZE
            )));
        }
        if self.catalog_size != self.geometry.cells_per_reel {
            return Err(ConfigError::CatalogMismatch {
                catalog: self.catalog_size,
                cells: self.geometry.cells_per_reel,
            });
        }
        self.motion.validate()?;
        self.timing.validate()?;
        Ok(layout)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    /// Export as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
