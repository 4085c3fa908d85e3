//! Error types for typeatlas

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for typeatlas
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Font loading failed: {0}")]
    FontLoad(#[from] FontLoadError),

    #[error("Shaping failed: {0}")]
    ShapingFailed(#[from] ShapingError),

    #[error("Rasterization failed: {0}")]
    RasterFailed(#[from] RasterError),

    /// The glyph cache could not admit a glyph even after a full flush.
    #[error("Glyph cache exhausted: {0}")]
    CacheExhausted(String),

    #[error("Glyph {glyph_id} is missing from font {font_id:#018x}")]
    GlyphMissing { font_id: u64, glyph_id: u32 },

    #[error("Unknown font: {0}")]
    UnknownFont(String),

    #[error("No font selected")]
    NoFontSelected,

    #[error("Invalid buffer release: {0}")]
    InvalidRelease(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Font loading errors
#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("Font file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid font data")]
    InvalidData,

    #[error("Font not supported: {0}")]
    NotSupported(String),
}

/// Shaping errors
#[derive(Debug, Error)]
pub enum ShapingError {
    #[error("Invalid text input")]
    InvalidText,

    #[error("No font faces to shape with")]
    NoFaces,

    #[error("Script not supported: {0}")]
    ScriptNotSupported(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Rasterization errors
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid font")]
    InvalidFont,

    #[error("Glyph not found: {0}")]
    GlyphNotFound(u32),

    #[error("Outline extraction failed")]
    OutlineExtractionFailed,

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Backend error: {0}")]
    BackendError(String),
}
