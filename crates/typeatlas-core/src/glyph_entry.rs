//! Identity and placement of glyphs inside the atlas

use std::collections::BTreeSet;

use crate::font_buffer::BufferId;
use crate::types::{FontId, GlyphId};

/// How a glyph is stored in the atlas
///
/// Plain coverage is the default. The SDF bits ask for a signed distance
/// transform of the coverage bitmap, outside the outline, inside it, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct GlyphFlags(u8);

impl GlyphFlags {
    pub const NONE: GlyphFlags = GlyphFlags(0);
    pub const OUTER_SDF: GlyphFlags = GlyphFlags(1);
    pub const INNER_SDF: GlyphFlags = GlyphFlags(2);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: GlyphFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any distance field requested
    pub const fn is_sdf(self) -> bool {
        self.0 & (Self::OUTER_SDF.0 | Self::INNER_SDF.0) != 0
    }
}

impl std::ops::BitOr for GlyphFlags {
    type Output = GlyphFlags;

    fn bitor(self, rhs: GlyphFlags) -> GlyphFlags {
        GlyphFlags(self.0 | rhs.0)
    }
}

/// Cache identity of one glyph bitmap
///
/// Every field takes part in equality: the same glyph at another size or with
/// other flags is a different entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphKey {
    pub font_id: FontId,
    /// Glyph index as produced by the shaper
    pub code_point: GlyphId,
    /// Bucketed pixel size
    pub size: u32,
    pub flags: GlyphFlags,
}

impl GlyphKey {
    pub fn new(font_id: FontId, code_point: GlyphId, size: u32, flags: GlyphFlags) -> Self {
        Self {
            font_id,
            code_point,
            size,
            flags,
        }
    }
}

/// Handle of a cache row
///
/// The generation changes whenever the row is flushed or relabelled by
/// eviction, so handles held by buffers go stale instead of aliasing the
/// row's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId {
    pub index: usize,
    pub generation: u32,
}

/// One glyph's place in the atlas
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphCacheEntry {
    /// Top-left corner in the slice, in pixels
    pub x: u32,
    pub y: u32,
    /// Atlas slice holding the bitmap
    pub slice: usize,
    /// Bitmap extent in pixels, SDF padding included
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the bitmap's left edge
    pub bearing_x: i32,
    /// Distance from the baseline up to the bitmap's top edge
    pub bearing_y: i32,
    /// Normalized `[u0, v0, u1, v1]`
    pub uv: [f32; 4],
    /// Row the bitmap lives in, `None` for glyphs without ink
    pub row: Option<RowId>,
}

impl GlyphCacheEntry {
    /// Unplaced entry describing a bitmap of the given extent
    pub fn template(width: u32, height: u32, bearing_x: i32, bearing_y: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            slice: 0,
            width,
            height,
            bearing_x,
            bearing_y,
            uv: [0.0; 4],
            row: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub(crate) fn place(&mut self, x: u32, y: u32, slice: usize, atlas: (u32, u32)) {
        let (atlas_width, atlas_height) = (atlas.0 as f32, atlas.1 as f32);
        self.x = x;
        self.y = y;
        self.slice = slice;
        self.uv = [
            x as f32 / atlas_width,
            y as f32 / atlas_height,
            (x + self.width) as f32 / atlas_width,
            (y + self.height) as f32 / atlas_height,
        ];
    }
}

/// A horizontal band of one slice
///
/// Entries of one height class are packed left to right. The band keeps its
/// height for the session; eviction may relabel it with a smaller class.
#[derive(Debug, Clone)]
pub struct CacheRow {
    pub(crate) slice: usize,
    pub(crate) y: u32,
    /// Pixel rows owned by the band
    pub(crate) band_height: u32,
    /// Rounded height of the entries currently stored
    pub(crate) height_class: u32,
    /// Next free column
    pub(crate) cursor_x: u32,
    /// Frame counter value of the last lookup that hit this row
    pub(crate) last_used: u32,
    pub(crate) generation: u32,
    pub(crate) keys: Vec<GlyphKey>,
    /// Buffers whose quads sample this row
    pub(crate) refs: BTreeSet<BufferId>,
}

impl CacheRow {
    pub fn slice(&self) -> usize {
        self.slice
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn band_height(&self) -> u32 {
        self.band_height
    }

    pub fn height_class(&self) -> u32 {
        self.height_class
    }

    pub fn last_used(&self) -> u32 {
        self.last_used
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Buffers registered as depending on this row
    pub fn referencing_buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.refs.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdf_flags_combine() {
        let both = GlyphFlags::OUTER_SDF | GlyphFlags::INNER_SDF;
        assert!(both.contains(GlyphFlags::OUTER_SDF));
        assert!(both.contains(GlyphFlags::INNER_SDF));
        assert!(both.is_sdf());
        assert!(!GlyphFlags::NONE.is_sdf());
    }

    #[test]
    fn placing_an_entry_derives_uvs() {
        let mut entry = GlyphCacheEntry::template(16, 32, 1, 30);
        entry.place(64, 128, 2, (256, 256));
        assert_eq!(entry.slice, 2);
        assert_eq!(entry.uv, [0.25, 0.5, 80.0 / 256.0, 160.0 / 256.0]);
    }

    #[test]
    fn keys_with_different_flags_differ() {
        let plain = GlyphKey::new(1, 65, 24, GlyphFlags::NONE);
        let sdf = GlyphKey::new(1, 65, 24, GlyphFlags::OUTER_SDF);
        assert_ne!(plain, sdf);
    }
}
