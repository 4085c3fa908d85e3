//! Atlas and layout configuration
//!
//! Defaults suit a desktop UI: four 1024x1024 slices of 8-bit coverage.
//! Every field can be overridden from the environment at startup:
//!
//! ```bash
//! TYPEATLAS_ATLAS_WIDTH=2048 TYPEATLAS_MAX_SLICES=2 ./my_app
//! ```
//!
//! | Variable                 | Field          |
//! |--------------------------|----------------|
//! | `TYPEATLAS_ATLAS_WIDTH`  | `atlas_width`  |
//! | `TYPEATLAS_ATLAS_HEIGHT` | `atlas_height` |
//! | `TYPEATLAS_MAX_SLICES`   | `max_slices`   |
//! | `TYPEATLAS_LINE_HEIGHT`  | `line_height`  |
//! | `TYPEATLAS_MAX_TEXTURES` | `max_textures` |

use std::str::FromStr;

use crate::error::{AtlasError, Result};

pub const DEFAULT_ATLAS_WIDTH: u32 = 1024;
pub const DEFAULT_ATLAS_HEIGHT: u32 = 1024;
pub const DEFAULT_MAX_SLICES: usize = 4;
pub const DEFAULT_LINE_HEIGHT: f32 = 1.2;
pub const DEFAULT_MAX_TEXTURES: usize = 64;

/// Sizing for the glyph atlas and defaults for layout
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasConfig {
    /// Width of every atlas slice in pixels
    pub atlas_width: u32,
    /// Height of every atlas slice in pixels
    pub atlas_height: u32,
    /// Upper bound on slices the cache may allocate
    pub max_slices: usize,
    /// Line advance as a multiple of the font size
    pub line_height: f32,
    /// Standalone textures kept by `get_texture` before the oldest is dropped
    pub max_textures: usize,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            atlas_width: DEFAULT_ATLAS_WIDTH,
            atlas_height: DEFAULT_ATLAS_HEIGHT,
            max_slices: DEFAULT_MAX_SLICES,
            line_height: DEFAULT_LINE_HEIGHT,
            max_textures: DEFAULT_MAX_TEXTURES,
        }
    }
}

impl AtlasConfig {
    /// Atlas of `max_slices` slices sized `width` x `height`
    pub fn with_atlas(width: u32, height: u32, max_slices: usize) -> Self {
        Self {
            atlas_width: width,
            atlas_height: height,
            max_slices,
            ..Self::default()
        }
    }

    /// Defaults overridden by `TYPEATLAS_*` environment variables
    ///
    /// Unparsable or out-of-range values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(width) = env_value("TYPEATLAS_ATLAS_WIDTH") {
            config.atlas_width = width;
        }
        if let Some(height) = env_value("TYPEATLAS_ATLAS_HEIGHT") {
            config.atlas_height = height;
        }
        if let Some(slices) = env_value("TYPEATLAS_MAX_SLICES") {
            config.max_slices = slices;
        }
        if let Some(line_height) = env_value("TYPEATLAS_LINE_HEIGHT") {
            config.line_height = line_height;
        }
        if let Some(textures) = env_value("TYPEATLAS_MAX_TEXTURES") {
            config.max_textures = textures;
        }

        if let Err(err) = config.validate() {
            log::warn!("Ignoring TYPEATLAS_* overrides: {}", err);
            return Self::default();
        }
        config
    }

    /// Reject configurations the cache cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.atlas_width == 0 || self.atlas_height == 0 {
            return Err(AtlasError::Config(format!(
                "atlas size must be non-zero, got {}x{}",
                self.atlas_width, self.atlas_height
            )));
        }
        if self.max_slices == 0 {
            return Err(AtlasError::Config("max_slices must be at least 1".into()));
        }
        if !(self.line_height.is_finite() && self.line_height > 0.0) {
            return Err(AtlasError::Config(format!(
                "line_height must be positive, got {}",
                self.line_height
            )));
        }
        if self.max_textures == 0 {
            return Err(AtlasError::Config("max_textures must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => {
            log::info!("Typeatlas {} set to {} via environment", name, raw.trim());
            Some(value)
        },
        Err(_) => {
            log::warn!("Ignoring unparsable {}={:?}", name, raw);
            None
        },
    }
}
