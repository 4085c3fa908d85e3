//! Multi-slice glyph atlas with row-granular LRU eviction
//!
//! Every slice is an 8-bit pixel buffer of the configured size. Glyphs are
//! packed into horizontal rows of one height class (the glyph height rounded
//! up to a multiple of [`ROW_HEIGHT_ROUNDING`]). Admitting a glyph tries, in
//! order: a row of its class with room, a new row in the newest slice, a new
//! slice, and finally the least recently used row that was not touched in the
//! current frame and whose band is tall enough.
//!
//! The cache revision counts structural changes. It grows on every eviction,
//! slice growth and flush, and buffers compare their stamp against it to
//! learn that their UVs may point at someone else's pixels.

use std::collections::HashMap;

use crate::config::AtlasConfig;
use crate::font_buffer::BufferId;
use crate::glyph_entry::{CacheRow, GlyphCacheEntry, GlyphKey, RowId};
use crate::types::GlyphBitmap;

/// Row heights are rounded up to a multiple of this many pixels
pub const ROW_HEIGHT_ROUNDING: u32 = 4;

/// Empty pixels kept to the right of each glyph and below each row
pub const GLYPH_PADDING: u32 = 1;

fn height_class(height: u32) -> u32 {
    height.div_ceil(ROW_HEIGHT_ROUNDING) * ROW_HEIGHT_ROUNDING
}

struct Slice {
    pixels: Vec<u8>,
    /// First pixel row not yet claimed by a band
    next_row_y: u32,
    /// Half-open vertical range written since the last upload
    dirty: Option<(u32, u32)>,
}

impl Slice {
    fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; width as usize * height as usize],
            next_row_y: 0,
            dirty: None,
        }
    }

    fn mark_dirty(&mut self, start: u32, end: u32) {
        self.dirty = Some(match self.dirty {
            Some((lo, hi)) => (lo.min(start), hi.max(end)),
            None => (start, end),
        });
    }
}

/// Mutable window onto the atlas pixels of one entry
pub struct AtlasRegion<'a> {
    pixels: &'a mut [u8],
    stride: usize,
    x: usize,
    y: usize,
    width: u32,
    height: u32,
}

impl AtlasRegion<'_> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Write one texel, relative to the region's top-left corner
    pub fn put(&mut self, x: u32, y: u32, value: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (self.y + y as usize) * self.stride + self.x + x as usize;
        if let Some(texel) = self.pixels.get_mut(offset) {
            *texel = value;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let offset = (self.y + y as usize) * self.stride + self.x + x as usize;
        self.pixels.get(offset).copied().unwrap_or(0)
    }
}

/// The shared glyph atlas
pub struct GlyphCache {
    width: u32,
    height: u32,
    max_slices: usize,
    slices: Vec<Slice>,
    rows: Vec<CacheRow>,
    entries: HashMap<GlyphKey, GlyphCacheEntry>,
    /// Frame counter for LRU decisions
    counter: u32,
    revision: u32,
    next_generation: u32,
    dirty: bool,
    invalidated: Vec<BufferId>,
}

impl GlyphCache {
    /// Cache with one slice allocated up front
    pub fn new(width: u32, height: u32, max_slices: usize) -> Self {
        Self {
            width,
            height,
            max_slices: max_slices.max(1),
            slices: vec![Slice::new(width, height)],
            rows: Vec::new(),
            entries: HashMap::new(),
            counter: 0,
            revision: 0,
            next_generation: 0,
            dirty: false,
            invalidated: Vec::new(),
        }
    }

    pub fn from_config(config: &AtlasConfig) -> Self {
        Self::new(config.atlas_width, config.atlas_height, config.max_slices)
    }

    /// Look up a glyph, marking its row as used in the current frame
    pub fn find(&mut self, key: &GlyphKey) -> Option<&GlyphCacheEntry> {
        let entry = self.entries.get(key)?;
        if let Some(row) = entry.row.and_then(|id| self.rows.get_mut(id.index)) {
            row.last_used = self.counter;
        }
        log::trace!("Glyph cache hit for {:?}", key);
        Some(entry)
    }

    /// Look up a glyph without touching its row
    pub fn peek(&self, key: &GlyphKey) -> Option<&GlyphCacheEntry> {
        self.entries.get(key)
    }

    /// Admit a glyph
    ///
    /// `template` supplies the bitmap extent and bearings. With a bitmap its
    /// pixels are copied into the atlas; without one the slot is only
    /// reserved and the caller fills it through [`GlyphCache::region_mut`].
    /// Returns `None` when nothing can make room; the caller should flush and
    /// retry once.
    pub fn set(
        &mut self,
        bitmap: Option<&GlyphBitmap>,
        key: GlyphKey,
        template: &GlyphCacheEntry,
    ) -> Option<&GlyphCacheEntry> {
        let mut entry = template.clone();
        entry.row = None;
        self.detach(&key);

        if entry.is_empty() {
            entry.uv = [0.0; 4];
            return Some(&*self.entries.entry(key).or_insert(entry));
        }

        let class = height_class(entry.height);
        if entry.width > self.width || class + GLYPH_PADDING > self.height {
            log::warn!(
                "Glyph {:?} of {}x{} can never fit a {}x{} atlas",
                key,
                entry.width,
                entry.height,
                self.width,
                self.height
            );
            return None;
        }

        let row_index = self.find_row(class, entry.width)?;
        let generation = {
            let row = &mut self.rows[row_index];
            let (x, y, slice) = (row.cursor_x, row.y, row.slice);
            entry.place(x, y, slice, (self.width, self.height));
            row.cursor_x += entry.width + GLYPH_PADDING;
            row.last_used = self.counter;
            row.keys.push(key);
            row.generation
        };
        entry.row = Some(RowId {
            index: row_index,
            generation,
        });

        if let Some(bitmap) = bitmap {
            self.blit(&entry, bitmap);
        }
        let slice = &mut self.slices[entry.slice];
        slice.mark_dirty(entry.y, entry.y + entry.height);
        self.dirty = true;

        log::debug!(
            "Admitted glyph {:?} at ({}, {}) in slice {}",
            key,
            entry.x,
            entry.y,
            entry.slice
        );
        self.entries.insert(key, entry);
        self.entries.get(&key)
    }

    /// Forget an existing entry for `key`, including its row's claim on it
    fn detach(&mut self, key: &GlyphKey) {
        let Some(stale) = self.entries.remove(key) else {
            return;
        };
        if let Some(row) = stale.row.and_then(|id| {
            self.rows
                .get_mut(id.index)
                .filter(|row| row.generation == id.generation)
        }) {
            row.keys.retain(|k| k != key);
        }
        log::debug!("Replacing entry for {:?} from row {:?}", key, stale.row);
    }

    /// Pixels of an admitted entry, for callers that reserved a slot
    pub fn region_mut(&mut self, key: &GlyphKey) -> Option<AtlasRegion<'_>> {
        let entry = self.entries.get(key)?;
        if entry.is_empty() {
            return None;
        }
        let (x, y, width, height) = (entry.x, entry.y, entry.width, entry.height);
        let slice = self.slices.get_mut(entry.slice)?;
        Some(AtlasRegion {
            pixels: &mut slice.pixels,
            stride: self.width as usize,
            x: x as usize,
            y: y as usize,
            width,
            height,
        })
    }

    /// Drop every entry and row
    ///
    /// Slices stay allocated and their claimed bands are cleared to zero and
    /// marked dirty. Every buffer registered with a row is queued as
    /// invalidated.
    pub fn flush(&mut self) {
        for row in self.rows.drain(..) {
            self.invalidated.extend(row.refs);
        }
        self.entries.clear();
        let stride = self.width as usize;
        for slice in &mut self.slices {
            let claimed = slice.next_row_y;
            if claimed == 0 {
                continue;
            }
            if let Some(pixels) = slice.pixels.get_mut(..claimed as usize * stride) {
                pixels.fill(0);
            }
            slice.mark_dirty(0, claimed);
            slice.next_row_y = 0;
            self.dirty = true;
        }
        self.revision += 1;
        log::debug!("Glyph cache flushed, revision {}", self.revision);
    }

    /// Advance the frame counter
    pub fn update(&mut self) {
        self.counter = self.counter.wrapping_add(1);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Vertical pixel range of `slice` written since the last upload
    pub fn dirty_range(&self, slice: usize) -> Option<(u32, u32)> {
        self.slices.get(slice).and_then(|s| s.dirty)
    }

    /// Forget dirty ranges once the caller has uploaded them
    pub fn clear_dirty(&mut self) {
        for slice in &mut self.slices {
            slice.dirty = None;
        }
        self.dirty = false;
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    pub fn max_slices(&self) -> usize {
        self.max_slices
    }

    /// Slice dimensions in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn slice_pixels(&self, slice: usize) -> Option<&[u8]> {
        self.slices.get(slice).map(|s| s.pixels.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row behind a handle, if the handle is still current
    pub fn row(&self, id: RowId) -> Option<&CacheRow> {
        self.rows
            .get(id.index)
            .filter(|row| row.generation == id.generation)
    }

    /// Register `buffer` as sampling the given row
    ///
    /// Returns false when the handle is stale.
    pub fn add_row_ref(&mut self, id: RowId, buffer: BufferId) -> bool {
        match self.rows.get_mut(id.index) {
            Some(row) if row.generation == id.generation => {
                row.refs.insert(buffer);
                true
            },
            _ => false,
        }
    }

    pub fn remove_row_ref(&mut self, id: RowId, buffer: BufferId) {
        if let Some(row) = self.rows.get_mut(id.index) {
            if row.generation == id.generation {
                row.refs.remove(&buffer);
            }
        }
    }

    /// Buffers invalidated by eviction or flush since the last call
    pub fn take_invalidated(&mut self) -> Vec<BufferId> {
        let mut buffers = std::mem::take(&mut self.invalidated);
        buffers.sort_unstable();
        buffers.dedup();
        buffers
    }

    fn find_row(&mut self, class: u32, width: u32) -> Option<usize> {
        let fits = |row: &CacheRow| row.height_class == class && row.cursor_x + width <= self.width;
        if let Some(index) = self.rows.iter().position(fits) {
            return Some(index);
        }

        let band = class + GLYPH_PADDING;
        let newest = self.slices.len() - 1;
        if self.slices[newest].next_row_y + band <= self.height {
            return Some(self.push_row(newest, class, band));
        }

        if self.slices.len() < self.max_slices {
            self.slices.push(Slice::new(self.width, self.height));
            self.revision += 1;
            log::debug!(
                "Glyph atlas grew to {} slices, revision {}",
                self.slices.len(),
                self.revision
            );
            return Some(self.push_row(self.slices.len() - 1, class, band));
        }

        // Reuse a band another slice has left unclaimed before evicting.
        if let Some(slice) = self
            .slices
            .iter()
            .position(|s| s.next_row_y + band <= self.height)
        {
            return Some(self.push_row(slice, class, band));
        }

        self.evict_row(class, band)
    }

    fn push_row(&mut self, slice: usize, class: u32, band: u32) -> usize {
        let y = self.slices[slice].next_row_y;
        self.slices[slice].next_row_y += band;
        let generation = self.fresh_generation();
        self.rows.push(CacheRow {
            slice,
            y,
            band_height: band,
            height_class: class,
            cursor_x: 0,
            last_used: self.counter,
            generation,
            keys: Vec::new(),
            refs: Default::default(),
        });
        self.rows.len() - 1
    }

    fn evict_row(&mut self, class: u32, band: u32) -> Option<usize> {
        let counter = self.counter;
        let index = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.last_used != counter && row.band_height >= band)
            .max_by_key(|(_, row)| counter.wrapping_sub(row.last_used))
            .map(|(index, _)| index)?;

        let generation = self.fresh_generation();
        let row = &mut self.rows[index];
        for key in row.keys.drain(..) {
            self.entries.remove(&key);
        }
        self.invalidated.extend(std::mem::take(&mut row.refs));
        row.height_class = class;
        row.cursor_x = 0;
        row.last_used = counter;
        row.generation = generation;

        let (slice, y, band_height) = (row.slice, row.y, row.band_height);
        let stride = self.width as usize;
        let start = y as usize * stride;
        let end = start + band_height as usize * stride;
        if let Some(pixels) = self.slices[slice].pixels.get_mut(start..end) {
            pixels.fill(0);
        }
        self.slices[slice].mark_dirty(y, y + band_height);
        self.dirty = true;

        self.revision += 1;
        log::debug!(
            "Evicted row {} of slice {} for height class {}, revision {}",
            index,
            slice,
            class,
            self.revision
        );
        Some(index)
    }

    fn fresh_generation(&mut self) -> u32 {
        self.next_generation += 1;
        self.next_generation
    }

    fn blit(&mut self, entry: &GlyphCacheEntry, bitmap: &GlyphBitmap) {
        let stride = self.width as usize;
        let Some(slice) = self.slices.get_mut(entry.slice) else {
            return;
        };
        let width = entry.width.min(bitmap.width) as usize;
        let rows = entry.height.min(bitmap.height) as usize;
        for y in 0..rows {
            let src_start = y * bitmap.width as usize;
            let dst_start = (entry.y as usize + y) * stride + entry.x as usize;
            let (Some(src), Some(dst)) = (
                bitmap.data.get(src_start..src_start + width),
                slice.pixels.get_mut(dst_start..dst_start + width),
            ) else {
                break;
            };
            dst.copy_from_slice(src);
        }
    }
}
