//! Signed distance fields from coverage bitmaps
//!
//! The field is written into a region `2 * SDF_PADDING` pixels larger than
//! the coverage bitmap in each dimension. Texels encode distance to the
//! outline: 128 sits on the edge, higher values lie inside the glyph.

use crate::glyph_cache::AtlasRegion;
use crate::glyph_entry::GlyphFlags;
use crate::types::GlyphBitmap;

/// Border added on every side of an SDF glyph, and the search radius
pub const SDF_PADDING: u32 = 8;

/// Coverage at or above this value counts as inside
const INSIDE_THRESHOLD: u8 = 128;

/// Write the distance field of `src` into `dest`
///
/// `dest` is expected to be `src` grown by `padding` on every side. With only
/// [`GlyphFlags::OUTER_SDF`] the glyph body stays solid and the field fades
/// outwards; with only [`GlyphFlags::INNER_SDF`] the outside stays empty and
/// the field grows towards the glyph's center.
pub fn compute(src: &GlyphBitmap, padding: u32, flags: GlyphFlags, dest: &mut AtlasRegion<'_>) {
    let radius = padding.max(1) as i64;
    let outer = flags.contains(GlyphFlags::OUTER_SDF);
    let inner = flags.contains(GlyphFlags::INNER_SDF);

    let inside = |x: i64, y: i64| -> bool {
        if x < 0 || y < 0 || x >= i64::from(src.width) || y >= i64::from(src.height) {
            return false;
        }
        src.pixel(x as u32, y as u32) >= INSIDE_THRESHOLD
    };

    for dy in 0..dest.height() {
        for dx in 0..dest.width() {
            let sx = i64::from(dx) - i64::from(padding);
            let sy = i64::from(dy) - i64::from(padding);
            let here = inside(sx, sy);

            let mut nearest = radius * radius;
            for oy in -radius..=radius {
                for ox in -radius..=radius {
                    let d2 = ox * ox + oy * oy;
                    if d2 < nearest && inside(sx + ox, sy + oy) != here {
                        nearest = d2;
                    }
                }
            }
            let distance = (nearest as f32).sqrt().min(radius as f32) / radius as f32;

            let value = match (here, outer, inner) {
                (true, true, true) | (true, false, true) => 128.0 + 127.0 * distance,
                (true, true, false) => 255.0,
                (false, true, _) => 128.0 * (1.0 - distance),
                (false, false, _) => 0.0,
                (true, false, false) => 255.0,
            };
            dest.put(dx, dy, value.round().clamp(0.0, 255.0) as u8);
        }
    }
}
