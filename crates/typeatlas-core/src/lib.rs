//! Typeatlas Core: text to GPU vertex buffers through a shared glyph atlas
//!
//! An immediate-mode UI asks for the same labels every frame. This crate turns
//! a string plus layout parameters into a [`FontBuffer`]: quads with UVs into
//! a multi-slice texture atlas, one index list per slice, caret positions and
//! line metrics. Buffers and glyph bitmaps are both cached across frames.
//!
//! ## The Moving Parts
//!
//! 1. **Glyph cache** - [`GlyphCache`] packs coverage bitmaps into rows of
//!    atlas slices and evicts the least recently used rows under pressure
//! 2. **Word enumeration** - [`WordEnumerator`] walks line-break codes
//! 3. **Layout** - the manager shapes each word, wraps lines, aligns and
//!    justifies them, and emits quads
//! 4. **Buffer cache** - [`BufferCache`] keys finished buffers by
//!    [`FontBufferParameters`] and reference counts them
//! 5. **Pass sync** - [`FontManager::start_layout_pass`] and
//!    [`FontManager::update_pass`] push dirty atlas rows to the GPU once per
//!    frame
//!
//! ## Frame Loop
//!
//! ```ignore
//! use typeatlas_core::{FontBufferParameters, FontManager, TextAlignment};
//!
//! let mut manager = FontManager::builder()
//!     .shaper(shaper)
//!     .rasterizer(rasterizer)
//!     .line_breaker(line_breaker)
//!     .font_loader(loader)
//!     .build()?;
//! manager.open("fonts/NotoSans-Regular.ttf")?;
//!
//! loop {
//!     manager.start_layout_pass();
//!     let params = manager.parameters("Hello", 24.0).size(200, 0).build();
//!     let id = manager.get_buffer("Hello", &params)?;
//!     manager.update_pass(false);
//!     draw(manager.buffer(id));
//! }
//! ```
//!
//! Everything that is not layout or caching lives behind the traits in
//! [`traits`]: shaping, rasterizing, line breaking, font loading, locale
//! lookup and texture upload.

pub mod buffer_cache;
pub mod config;
pub mod error;
pub mod font_buffer;
pub mod glyph_cache;
pub mod glyph_entry;
mod layout;
pub mod manager;
pub mod metrics;
pub mod sdf;
pub mod texture;
pub mod traits;
pub mod word_enum;

pub use buffer_cache::{BufferCache, FontBufferParameters, ParametersBuilder, TextAlignment};
pub use config::AtlasConfig;
pub use error::{AtlasError, Result};
pub use font_buffer::{BufferId, FontBuffer, FontVertex};
pub use glyph_cache::GlyphCache;
pub use glyph_entry::{CacheRow, GlyphCacheEntry, GlyphFlags, GlyphKey, RowId};
pub use manager::{FontManager, FontManagerBuilder, SizeSelector};
pub use metrics::FontMetrics;
pub use texture::FontTexture;
pub use traits::{
    AtlasTexture, FontFace, FontLoader, LineBreaker, LocaleTable, Rasterizer, Shaper,
    TextureFactory,
};
pub use word_enum::WordEnumerator;

/// The data structures that cross the trait boundaries
pub mod types {
    /// Unique identifier for a glyph within a font
    pub type GlyphId = u32;

    /// Identity of a face or of a fallback chain of faces
    pub type FontId = u64;

    /// Which way the text flows
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum Direction {
        #[default]
        LeftToRight,
        RightToLeft,
    }

    impl Direction {
        /// +1 for left-to-right, -1 for right-to-left
        pub fn sign(self) -> f32 {
            match self {
                Direction::LeftToRight => 1.0,
                Direction::RightToLeft => -1.0,
            }
        }
    }

    /// One glyph as the shaper emits it
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ShapedGlyph {
        /// Glyph index in its face. Zero marks shaper-internal glyphs.
        pub glyph_id: GlyphId,
        /// Byte offset of the glyph's cluster in the shaped span
        pub cluster: u32,
        /// Advances in pixels at the shaped size
        pub x_advance: f32,
        pub y_advance: f32,
        /// Index of the face in the fallback chain
        pub face: usize,
    }

    /// Coverage bitmap for one glyph, tightly packed rows of `width` bytes
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct GlyphBitmap {
        pub width: u32,
        pub height: u32,
        /// Offset from the pen position to the left edge
        pub bearing_x: i32,
        /// Distance from the baseline up to the top edge
        pub bearing_y: i32,
        pub data: Vec<u8>,
    }

    impl GlyphBitmap {
        /// Bitmaps without ink occupy no atlas space
        pub fn is_empty(&self) -> bool {
            self.width == 0 || self.height == 0
        }

        pub fn pixel(&self, x: u32, y: u32) -> u8 {
            self.data
                .get((y * self.width + x) as usize)
                .copied()
                .unwrap_or(0)
        }
    }

    /// Line-break opportunity after a byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum BreakCode {
        /// A line must end after this byte
        MustBreak,
        /// A line may end after this byte
        AllowBreak,
        /// No break after this byte
        NoBreak,
        /// Not the last byte of a character
        InsideChar,
    }

    /// How pixels are arranged in atlas and texture uploads
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum BitmapFormat {
        /// One byte of coverage per texel
        Gray8,
    }

    /// Script and direction a locale lays text out with
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LocaleInfo {
        /// ISO 15924 script tag, e.g. "Latn" or "Arab"
        pub script: String,
        pub direction: Direction,
    }
}

/// How shaping should behave
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingParams {
    /// Pixel size glyphs are shaped at
    pub size: f32,
    pub direction: types::Direction,
    /// ISO 15924 script tag
    pub script: String,
    /// BCP 47 language, e.g. "en"
    pub language: String,
}

impl Default for ShapingParams {
    fn default() -> Self {
        Self {
            size: 16.0,
            direction: types::Direction::LeftToRight,
            script: DEFAULT_SCRIPT.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Script used until a locale says otherwise
pub const DEFAULT_SCRIPT: &str = "Latn";

/// Line-break language used until a locale says otherwise
pub const DEFAULT_LANGUAGE: &str = "en";
