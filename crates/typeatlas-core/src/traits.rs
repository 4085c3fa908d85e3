//! The contracts between the layout core and its collaborators
//!
//! The core never parses fonts, shapes text, rasterizes outlines or talks to
//! a GPU itself. Each of those jobs sits behind one of these traits so the
//! backends can be swapped without touching the cache or layout code.
//!
//! - [`FontFace`] - Your window into font data and metrics
//! - [`FontLoader`] - Where face names become faces
//! - [`Shaper`] - Where characters become glyphs
//! - [`Rasterizer`] - Where glyphs become coverage bitmaps
//! - [`LineBreaker`] - Where bytes learn where lines may end
//! - [`LocaleTable`] - Where locales pick a script and a direction
//! - [`AtlasTexture`] / [`TextureFactory`] - Where pixels reach the GPU

use crate::{
    error::Result,
    types::{BitmapFormat, BreakCode, GlyphBitmap, GlyphId, LocaleInfo, ShapedGlyph},
    ShapingParams,
};
use std::sync::Arc;

/// Your key to unlocking font secrets
///
/// ```ignore
/// struct MyFont {
///     data: Vec<u8>,
/// }
///
/// impl FontFace for MyFont {
///     fn data(&self) -> &[u8] {
///         &self.data
///     }
///
///     fn units_per_em(&self) -> u16 {
///         1000
///     }
///
///     fn glyph_id(&self, ch: char) -> Option<GlyphId> {
///         Some(42)
///     }
///
///     fn advance_width(&self, glyph_id: GlyphId) -> f32 {
///         500.0
///     }
///
///     fn ascender(&self) -> f32 {
///         800.0
///     }
///
///     fn descender(&self) -> f32 {
///         -200.0
///     }
/// }
/// ```
pub trait FontFace: Send + Sync {
    /// Raw font bytes as they live in the file
    fn data(&self) -> &[u8];

    /// Face inside a collection file, 0 for single-face files
    fn face_index(&self) -> u32 {
        0
    }

    /// The font's internal coordinate system scale
    fn units_per_em(&self) -> u16;

    /// Find the glyph that represents this character
    ///
    /// Returns None when the font doesn't contain this character.
    fn glyph_id(&self, ch: char) -> Option<GlyphId>;

    /// Horizontal advance of a glyph in font units
    fn advance_width(&self, glyph_id: GlyphId) -> f32;

    /// Distance from the baseline to the top of the em box, in font units
    fn ascender(&self) -> f32;

    /// Distance from the baseline to the bottom of the em box, in font units.
    /// Negative for fonts that descend below the baseline.
    fn descender(&self) -> f32;

    /// Baseline offset from the top of a line at the given pixel size
    fn baseline(&self, pixel_size: u32) -> i32 {
        let upem = f32::from(self.units_per_em().max(1));
        (self.ascender() * pixel_size as f32 / upem).round() as i32
    }
}

/// Opens font faces by name
pub trait FontLoader: Send + Sync {
    /// Load a face. Failures map to [`crate::error::FontLoadError`].
    fn load(&self, name: &str) -> Result<Arc<dyn FontFace>>;
}

/// Where characters learn their positions
///
/// The shaper receives one span of text and the active fallback chain. Each
/// returned glyph names the face of the chain it came from, carries the byte
/// offset of its cluster relative to `text`, and its advance in pixels at
/// `params.size`. Right-to-left runs come back in visual order, like
/// HarfBuzz output.
pub trait Shaper: Send + Sync {
    /// Identify yourself in logs and error messages
    fn name(&self) -> &'static str;

    /// Transform characters into positioned glyphs
    fn shape(
        &self,
        text: &str,
        fonts: &[Arc<dyn FontFace>],
        params: &ShapingParams,
    ) -> Result<Vec<ShapedGlyph>>;
}

/// Turns a glyph into an 8-bit coverage bitmap
pub trait Rasterizer: Send + Sync {
    /// Your rasterizer's signature
    fn name(&self) -> &'static str;

    /// Rasterize `glyph_id` at `pixel_size`.
    ///
    /// Glyphs without ink (spaces) return an empty bitmap, not an error.
    fn rasterize(&self, face: &dyn FontFace, glyph_id: GlyphId, pixel_size: u32)
        -> Result<GlyphBitmap>;
}

/// Classifies every byte of a UTF-8 buffer
///
/// The returned vector has one code per byte. Bytes that are not the last byte
/// of a character are [`BreakCode::InsideChar`]; the last byte of the text is
/// always [`BreakCode::MustBreak`].
pub trait LineBreaker: Send + Sync {
    fn classify(&self, text: &str, language: &str) -> Vec<BreakCode>;

    /// Whether the classifier has tailored rules for this language
    fn supports_language(&self, _language: &str) -> bool {
        true
    }
}

/// Maps a locale or language tag to a script and a layout direction
pub trait LocaleTable: Send + Sync {
    fn lookup(&self, locale: &str) -> Option<LocaleInfo>;
}

/// One GPU texture backing an atlas slice or a standalone text texture
pub trait AtlasTexture {
    /// Replace the rows `y_offset..y_offset + height` of the texture.
    ///
    /// `pixels` holds `width * height` tightly packed texels.
    fn upload_sub_rect(
        &mut self,
        format: BitmapFormat,
        y_offset: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    );
}

/// Creates GPU textures on demand
pub trait TextureFactory {
    fn create_texture(
        &mut self,
        format: BitmapFormat,
        width: u32,
        height: u32,
    ) -> Box<dyn AtlasTexture>;
}
