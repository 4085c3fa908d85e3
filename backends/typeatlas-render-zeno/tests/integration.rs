//! Integration tests for the zeno rasterizer

use std::path::PathBuf;

use typeatlas_core::{
    traits::{FontFace, Rasterizer},
    types::GlyphId,
};
use typeatlas_fontdb::Font;
use typeatlas_render_zeno::ZenoRasterizer;

/// Stub font for testing
struct StubFont {
    data: Vec<u8>,
}

impl FontFace for StubFont {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn units_per_em(&self) -> u16 {
        1000
    }

    fn glyph_id(&self, _ch: char) -> Option<GlyphId> {
        Some(0)
    }

    fn advance_width(&self, _glyph_id: GlyphId) -> f32 {
        500.0
    }

    fn ascender(&self) -> f32 {
        800.0
    }

    fn descender(&self) -> f32 {
        -200.0
    }
}

fn dejavu() -> Font {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-fonts/DejaVuSans.ttf");
    Font::from_file(path).expect("load test font")
}

#[test]
fn test_rasterizer_creation() {
    assert_eq!(ZenoRasterizer::new().name(), "zeno");
    assert_eq!(ZenoRasterizer::default().name(), "zeno");
}

#[test]
fn test_garbage_font_data_is_an_error() {
    let rasterizer = ZenoRasterizer::new();
    let font = StubFont { data: vec![0; 16] };
    assert!(rasterizer.rasterize(&font, 0, 16).is_err());
}

#[test]
fn test_letter_has_ink_above_the_baseline() {
    let _ = env_logger::builder().is_test(true).try_init();
    let font = dejavu();
    let rasterizer = ZenoRasterizer::new();
    let glyph = font.glyph_id('H').expect("font covers H");

    let bitmap = rasterizer.rasterize(&font, glyph, 32).expect("rasterize H");
    assert!(!bitmap.is_empty());
    assert_eq!(bitmap.data.len(), (bitmap.width * bitmap.height) as usize);
    // H sits on the baseline and stays inside the ascender
    assert!(bitmap.bearing_y > 0);
    assert!(bitmap.bearing_y <= font.baseline(32));
    assert!(bitmap.height as i32 <= bitmap.bearing_y + 1);
    assert!(bitmap.data.iter().any(|&texel| texel > 200));
}

#[test]
fn test_descender_goes_below_the_baseline() {
    let font = dejavu();
    let rasterizer = ZenoRasterizer::new();
    let glyph = font.glyph_id('p').expect("font covers p");

    let bitmap = rasterizer.rasterize(&font, glyph, 32).expect("rasterize p");
    assert!((bitmap.height as i32) > bitmap.bearing_y);
}

#[test]
fn test_rows_run_top_to_bottom() {
    let font = dejavu();
    let rasterizer = ZenoRasterizer::new();
    // T has its bar at the top
    let glyph = font.glyph_id('T').expect("font covers T");
    let bitmap = rasterizer.rasterize(&font, glyph, 48).expect("rasterize T");

    let width = bitmap.width as usize;
    let row_ink = |y: usize| -> u32 {
        bitmap.data[y * width..(y + 1) * width]
            .iter()
            .map(|&texel| u32::from(texel))
            .sum()
    };
    let top = row_ink(1);
    let bottom = row_ink(bitmap.height as usize - 2);
    assert!(top > bottom * 3);
}

#[test]
fn test_space_is_empty() {
    let font = dejavu();
    let rasterizer = ZenoRasterizer::new();
    let glyph = font.glyph_id(' ').expect("font has a space");
    let bitmap = rasterizer.rasterize(&font, glyph, 32).expect("rasterize space");
    assert!(bitmap.is_empty());
    assert!(bitmap.data.is_empty());
}

#[test]
fn test_bigger_sizes_give_bigger_bitmaps() {
    let font = dejavu();
    let rasterizer = ZenoRasterizer::new();
    let glyph = font.glyph_id('o').expect("font covers o");
    let small = rasterizer.rasterize(&font, glyph, 12).expect("rasterize at 12");
    let large = rasterizer.rasterize(&font, glyph, 48).expect("rasterize at 48");
    assert!(large.width > small.width);
    assert!(large.height > small.height);
}

#[test]
fn test_oversized_glyphs_are_rejected() {
    let font = dejavu();
    let rasterizer = ZenoRasterizer::with_max_size(8);
    let glyph = font.glyph_id('H').expect("font covers H");
    assert!(rasterizer.rasterize(&font, glyph, 64).is_err());
}

#[test]
fn test_out_of_range_glyph_is_an_error() {
    let font = dejavu();
    let rasterizer = ZenoRasterizer::new();
    assert!(rasterizer.rasterize(&font, 60_000, 16).is_err());
}
