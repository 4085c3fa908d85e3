//! None Shaper - one glyph per character, advanced by its hmtx width
//!
//! No ligatures, no kerning, no mark positioning. Good enough for Latin,
//! Cyrillic and Greek UI labels and for tests; anything that needs real
//! shaping should sit behind a HarfBuzz-backed [`Shaper`].
//!
//! Characters fall back through the chain: each one is taken from the first
//! face that maps it.

use std::sync::Arc;
use typeatlas_core::{
    error::{Result, ShapingError},
    traits::{FontFace, Shaper},
    types::{Direction, ShapedGlyph},
    ShapingParams,
};

/// A minimal shaper that maps characters straight to glyphs
pub struct NoneShaper;

impl NoneShaper {
    /// Create a new NoneShaper
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoneShaper {
    fn default() -> Self {
        Self::new()
    }
}

/// First face of the chain that maps `ch`, or .notdef of the primary face
fn pick_face(fonts: &[Arc<dyn FontFace>], ch: char) -> (usize, u32) {
    fonts
        .iter()
        .enumerate()
        .find_map(|(index, face)| face.glyph_id(ch).map(|gid| (index, gid)))
        .unwrap_or((0, 0))
}

impl Shaper for NoneShaper {
    fn name(&self) -> &'static str {
        "none"
    }

    fn shape(
        &self,
        text: &str,
        fonts: &[Arc<dyn FontFace>],
        params: &ShapingParams,
    ) -> Result<Vec<ShapedGlyph>> {
        if fonts.is_empty() {
            return Err(ShapingError::NoFaces.into());
        }
        log::trace!("NoneShaper: Shaping {} chars", text.chars().count());

        let mut glyphs: Vec<ShapedGlyph> = text
            .char_indices()
            .map(|(cluster, ch)| {
                let (face, glyph_id) = pick_face(fonts, ch);
                let font = &fonts[face];
                let scale = params.size / f32::from(font.units_per_em().max(1));
                ShapedGlyph {
                    glyph_id,
                    cluster: cluster as u32,
                    x_advance: font.advance_width(glyph_id) * scale,
                    y_advance: 0.0,
                    face,
                }
            })
            .collect();

        // Visual order, the way a real shaper hands RTL runs back
        if params.direction == Direction::RightToLeft {
            glyphs.reverse();
        }
        Ok(glyphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock font for testing
    struct MockFont {
        // Characters this face maps
        covers: fn(char) -> bool,
        advance: f32,
    }

    impl FontFace for MockFont {
        fn data(&self) -> &[u8] {
            &[]
        }

        fn units_per_em(&self) -> u16 {
            1000
        }

        fn glyph_id(&self, ch: char) -> Option<u32> {
            (self.covers)(ch).then_some(ch as u32)
        }

        fn advance_width(&self, _glyph_id: u32) -> f32 {
            self.advance
        }

        fn ascender(&self) -> f32 {
            800.0
        }

        fn descender(&self) -> f32 {
            -200.0
        }
    }

    fn ascii() -> Arc<dyn FontFace> {
        Arc::new(MockFont {
            covers: |ch| ch.is_ascii(),
            advance: 500.0,
        })
    }

    fn everything() -> Arc<dyn FontFace> {
        Arc::new(MockFont {
            covers: |_| true,
            advance: 1000.0,
        })
    }

    fn params(direction: Direction) -> ShapingParams {
        ShapingParams {
            size: 16.0,
            direction,
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_shaping() {
        let shaper = NoneShaper::new();
        let glyphs = shaper
            .shape("Hello", &[ascii()], &params(Direction::LeftToRight))
            .unwrap();

        assert_eq!(glyphs.len(), 5);
        assert!(glyphs.iter().all(|g| g.x_advance == 8.0 && g.face == 0));
        let clusters: Vec<u32> = glyphs.iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![0, 1, 2, 3, 4]);
        assert_eq!(glyphs[0].glyph_id, 'H' as u32);
    }

    #[test]
    fn test_clusters_are_byte_offsets() {
        let shaper = NoneShaper::new();
        let glyphs = shaper
            .shape("éa", &[everything()], &params(Direction::LeftToRight))
            .unwrap();
        let clusters: Vec<u32> = glyphs.iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![0, 2]);
    }

    #[test]
    fn test_fallback_picks_the_first_covering_face() {
        let shaper = NoneShaper::new();
        let glyphs = shaper
            .shape("aж", &[ascii(), everything()], &params(Direction::LeftToRight))
            .unwrap();

        assert_eq!(glyphs[0].face, 0);
        assert_eq!(glyphs[0].x_advance, 8.0);
        assert_eq!(glyphs[1].face, 1);
        assert_eq!(glyphs[1].glyph_id, 'ж' as u32);
        assert_eq!(glyphs[1].x_advance, 16.0);
    }

    #[test]
    fn test_uncovered_characters_become_notdef() {
        let shaper = NoneShaper::new();
        let glyphs = shaper
            .shape("ж", &[ascii()], &params(Direction::LeftToRight))
            .unwrap();
        assert_eq!(glyphs[0].glyph_id, 0);
        assert_eq!(glyphs[0].face, 0);
    }

    #[test]
    fn test_rtl_comes_back_in_visual_order() {
        let shaper = NoneShaper::new();
        let glyphs = shaper
            .shape("abc", &[ascii()], &params(Direction::RightToLeft))
            .unwrap();
        let clusters: Vec<u32> = glyphs.iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![2, 1, 0]);
    }

    #[test]
    fn test_empty_text() {
        let shaper = NoneShaper::new();
        let glyphs = shaper
            .shape("", &[ascii()], &ShapingParams::default())
            .unwrap();
        assert!(glyphs.is_empty());
    }

    #[test]
    fn test_no_faces_is_an_error() {
        let shaper = NoneShaper::new();
        assert!(shaper.shape("a", &[], &ShapingParams::default()).is_err());
    }
}
