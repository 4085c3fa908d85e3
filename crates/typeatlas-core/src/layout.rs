//! Turning shaped words into a [`FontBuffer`]
//!
//! The engine walks the text word by word, shapes each word, wraps greedily,
//! resolves every glyph through the atlas and emits quads and carets. Glyph
//! positions are computed at the bucketed size and scaled to the requested
//! one.

use std::collections::HashMap;
use std::sync::Arc;

use crate::buffer_cache::FontBufferParameters;
use crate::error::Result;
use crate::font_buffer::FontBuffer;
use crate::glyph_cache::GlyphCache;
use crate::glyph_entry::{GlyphCacheEntry, GlyphKey};
use crate::metrics::FontMetrics;
use crate::sdf::{self, SDF_PADDING};
use crate::texture::{round_up_to_power_of_2, FontTexture};
use crate::traits::{FontFace, LineBreaker, Rasterizer, Shaper};
use crate::types::{BreakCode, Direction, FontId, ShapedGlyph};
use crate::word_enum::WordEnumerator;
use crate::ShapingParams;

/// What looking up a glyph produced
pub(crate) enum Resolved {
    Entry(GlyphCacheEntry),
    /// The rasterizer could not produce the glyph
    Missing,
    /// The atlas has no room left this frame
    Full,
}

/// Finds glyphs in the atlas, rasterizing and admitting them on a miss
pub(crate) struct GlyphResolver<'a> {
    pub cache: &'a mut GlyphCache,
    pub rasterizer: &'a dyn Rasterizer,
    pub faces: &'a HashMap<FontId, Arc<dyn FontFace>>,
}

impl GlyphResolver<'_> {
    pub fn resolve(&mut self, key: GlyphKey) -> Resolved {
        if let Some(entry) = self.cache.find(&key) {
            return Resolved::Entry(entry.clone());
        }

        let Some(face) = self.faces.get(&key.font_id) else {
            log::warn!("No open face with id {:#018x}", key.font_id);
            return Resolved::Missing;
        };
        let bitmap = match self.rasterizer.rasterize(face.as_ref(), key.code_point, key.size) {
            Ok(bitmap) => bitmap,
            Err(err) => {
                log::warn!(
                    "{} could not rasterize glyph {} at {}px: {}",
                    self.rasterizer.name(),
                    key.code_point,
                    key.size,
                    err
                );
                return Resolved::Missing;
            },
        };

        let admitted = if key.flags.is_sdf() && !bitmap.is_empty() {
            let padding = SDF_PADDING as i32;
            let template = GlyphCacheEntry::template(
                bitmap.width + 2 * SDF_PADDING,
                bitmap.height + 2 * SDF_PADDING,
                bitmap.bearing_x - padding,
                bitmap.bearing_y + padding,
            );
            let entry = self.cache.set(None, key, &template).cloned();
            if entry.is_some() {
                if let Some(mut region) = self.cache.region_mut(&key) {
                    sdf::compute(&bitmap, SDF_PADDING, key.flags, &mut region);
                }
            }
            entry
        } else {
            let template = GlyphCacheEntry::template(
                bitmap.width,
                bitmap.height,
                bitmap.bearing_x,
                bitmap.bearing_y,
            );
            self.cache.set(Some(&bitmap), key, &template).cloned()
        };

        match admitted {
            Some(entry) => Resolved::Entry(entry),
            None => {
                log::info!("Glyph cache is full, {:?} needs a flush", key);
                Resolved::Full
            },
        }
    }
}

/// Vertical extent of an entry around the baseline, SDF padding removed
fn glyph_extent(entry: &GlyphCacheEntry, key: &GlyphKey) -> (i32, i32) {
    let (top, height) = if key.flags.is_sdf() {
        let padding = SDF_PADDING as i32;
        (entry.bearing_y - padding, entry.height as i32 - 2 * padding)
    } else {
        (entry.bearing_y, entry.height as i32)
    };
    (top, top - height)
}

/// Number of characters covered by the glyph at `index`
///
/// The glyph's byte range runs from its cluster to the cluster of the next
/// glyph in logical order, or to the end of the word. Glyphs sharing a
/// cluster with their successor cover nothing.
fn caret_count(
    glyphs: &[ShapedGlyph],
    index: usize,
    direction: Direction,
    words: &WordEnumerator<'_>,
) -> usize {
    let start = glyphs[index].cluster as usize;
    let next = match direction {
        Direction::LeftToRight => glyphs.get(index + 1),
        Direction::RightToLeft => index.checked_sub(1).and_then(|i| glyphs.get(i)),
    };
    let end = next.map_or(words.word_length(), |glyph| glyph.cluster as usize);
    let base = words.word_index();
    words
        .codes()
        .get(base + start..base + end.max(start))
        .map_or(0, |codes| {
            codes
                .iter()
                .filter(|&&code| code != BreakCode::InsideChar)
                .count()
        })
}

/// Everything a buffer build needs besides the atlas
pub(crate) struct LayoutEngine<'a> {
    pub shaper: &'a dyn Shaper,
    pub line_breaker: &'a dyn LineBreaker,
    /// The selected fallback chain
    pub faces: &'a [Arc<dyn FontFace>],
    pub face_ids: &'a [FontId],
    pub shaping: ShapingParams,
    /// Line advance as a multiple of the font size
    pub line_height: f32,
}

/// Sizes of one build
pub(crate) struct Sizing {
    /// Requested pixel size
    pub requested: f32,
    /// Size glyphs are shaped and rasterized at
    pub bucketed: u32,
}

impl LayoutEngine<'_> {
    /// Lay out `text` into `buffer`
    ///
    /// Returns `Ok(false)` when the atlas ran out of room; the buffer is then
    /// incomplete and must be dropped.
    pub fn build(
        &self,
        text: &str,
        params: &FontBufferParameters,
        sizing: &Sizing,
        resolver: &mut GlyphResolver<'_>,
        buffer: &mut FontBuffer,
    ) -> Result<bool> {
        let direction = self.shaping.direction;
        let rtl = direction == Direction::RightToLeft;
        let multi_line = params.multi_line();
        let caret_info = params.caret_info();
        let flags = params.glyph_flags();
        let scale = sizing.requested / sizing.bucketed as f32;
        let box_width = params.width() as f32;
        let box_height = params.height() as f32;

        let primary = self.faces.first();
        let base_line = primary.map_or(sizing.bucketed as i32, |face| face.baseline(sizing.bucketed));
        let scaled_base_line = base_line as f32 * scale;
        let mut metrics = FontMetrics::nominal(base_line, sizing.bucketed as i32);

        let codes = if text.is_empty() {
            Vec::new()
        } else {
            self.line_breaker.classify(text, &self.shaping.language)
        };
        let mut words = WordEnumerator::new(&codes, !multi_line);

        let pos_start = if rtl { box_width } else { 0.0 };
        let mut pos = [pos_start, 0.0_f32];
        let line_advance = sizing.requested * self.line_height;
        let mut total_height = sizing.requested;
        let mut line_width = 0.0_f32;
        let mut max_line_width = 0.0_f32;
        let mut line_empty = true;
        let mut last_must_break = false;
        let mut first_character = true;
        let mut truncated = false;

        while words.advance() {
            let span = text.get(words.current_word()).unwrap_or_default();
            let glyphs = self.shaper.shape(span, self.faces, &self.shaping)?;
            let word_width = glyphs.iter().map(|g| g.x_advance).sum::<f32>() * scale;

            if !multi_line {
                line_width = word_width;
                max_line_width = word_width;
                if rtl && params.width() == 0 {
                    pos[0] = word_width;
                }
            } else {
                if last_must_break || (!line_empty && line_width + word_width > box_width) {
                    buffer.update_line(direction, line_width, last_must_break);
                    pos = [pos_start, pos[1] + line_advance];
                    total_height += line_advance;
                    first_character = last_must_break;
                    if params.height() > 0 && total_height > box_height && !caret_info {
                        log::debug!("Text exceeds the {}px box height, dropping the rest", params.height());
                        total_height -= line_advance;
                        truncated = true;
                        break;
                    }
                    line_width = word_width;
                } else {
                    line_width += word_width;
                }
                if line_width > box_width && word_width == line_width {
                    log::info!(
                        "Word {:?} is wider than the {}px line, laying it out unbroken",
                        span,
                        params.width()
                    );
                }
                line_empty = false;
                max_line_width = max_line_width.max(line_width);
                last_must_break = words.current_word_must_break();
            }

            // An empty span only gets the caret that closes the text.
            if caret_info && first_character && !span.is_empty() {
                buffer.add_caret([pos[0], pos[1] + scaled_base_line]);
                first_character = false;
            }

            let count = glyphs.len();
            for i in 0..count {
                let index = if rtl { count - 1 - i } else { i };
                let glyph = glyphs[index];
                if glyph.glyph_id == 0 {
                    continue;
                }
                let Some(&font_id) = self.face_ids.get(glyph.face) else {
                    log::warn!("Shaper {} used unknown face {}", self.shaper.name(), glyph.face);
                    continue;
                };
                let key = GlyphKey::new(font_id, glyph.glyph_id, sizing.bucketed, flags);
                let entry = match resolver.resolve(key) {
                    Resolved::Entry(entry) => Some(entry),
                    Resolved::Missing => None,
                    Resolved::Full => return Ok(false),
                };

                let advance = [glyph.x_advance * scale, -glyph.y_advance * scale];
                let pen = pos[0];
                if rtl {
                    pos[0] -= advance[0];
                    pos[1] -= advance[1];
                }

                if let Some(entry) = entry.as_ref().filter(|e| !e.is_empty()) {
                    let (top, bottom) = glyph_extent(entry, &key);
                    if let Some(grown) = metrics.expanded(top, bottom) {
                        metrics = grown;
                    }
                    buffer.add_quad(pos, base_line, scale, entry, key);
                    if params.ref_count() {
                        if let Some(row) = entry.row {
                            if resolver.cache.add_row_ref(row, buffer.id()) {
                                buffer.add_row(row);
                            }
                        }
                    }
                }

                if !rtl {
                    pos[0] += advance[0];
                    pos[1] += advance[1];
                }

                if caret_info {
                    let carets = caret_count(&glyphs, index, direction, &words);
                    let line_end = (last_must_break || !multi_line) && i == count - 1;
                    let sign = direction.sign();
                    for caret in 1..=carets {
                        if line_end && caret == carets {
                            continue;
                        }
                        let x = pen + sign * caret as f32 * advance[0] / carets as f32;
                        buffer.add_caret([x, pos[1] + scaled_base_line]);
                    }
                }
            }

            buffer.add_word_boundary();
        }

        if caret_info {
            buffer.add_caret([pos[0], pos[1] + scaled_base_line]);
        }
        if !truncated {
            buffer.update_line(direction, line_width, true);
        }

        buffer.set_size(max_line_width.round() as u32, total_height.round() as u32);
        buffer.set_metrics(metrics);
        buffer.set_revision(resolver.cache.revision());
        if !buffer.verify() {
            log::error!("Buffer {:?} failed its consistency check", buffer.id());
        }
        Ok(true)
    }

    /// Rasterize `text` into a standalone power-of-two texture
    pub fn render_texture(&self, text: &str, size: u32, rasterizer: &dyn Rasterizer) -> Result<FontTexture> {
        let glyphs = self.shaper.shape(text, self.faces, &self.shaping)?;
        let string_width: f32 = glyphs.iter().map(|g| g.x_advance).sum();
        let base_line = self.faces.first().map_or(size as i32, |face| face.baseline(size));

        let mut texture = FontTexture::new(
            round_up_to_power_of_2(string_width.ceil() as u32),
            round_up_to_power_of_2(size),
            FontMetrics::nominal(base_line, size as i32),
        );

        let mut pen = 0.0_f32;
        for (i, glyph) in glyphs.iter().enumerate() {
            if glyph.glyph_id == 0 {
                continue;
            }
            let Some(face) = self.faces.get(glyph.face) else {
                continue;
            };
            let bitmap = match rasterizer.rasterize(face.as_ref(), glyph.glyph_id, size) {
                Ok(bitmap) => bitmap,
                Err(err) => {
                    log::warn!("Skipping glyph {} in texture: {}", glyph.glyph_id, err);
                    pen += glyph.x_advance;
                    continue;
                },
            };

            if !bitmap.is_empty() {
                let top = bitmap.bearing_y;
                let bottom = top - bitmap.height as i32;
                if let Some(grown) = texture.metrics().expanded(top, bottom) {
                    texture.expand(grown);
                }
            }
            if i == 0 && bitmap.bearing_x < 0 {
                pen = -bitmap.bearing_x as f32;
            }

            let y = texture.metrics().base_line - bitmap.bearing_y;
            let x = pen as i32 + bitmap.bearing_x;
            texture.blit(x, y, bitmap.width, bitmap.height, &bitmap.data);
            pen += glyph.x_advance;
        }
        Ok(texture)
    }
}

/// Re-resolve the UVs of every quad against the current atlas
///
/// Geometry is left untouched. Quads whose glyph moved to another slice are
/// moved to that slice's index list. Returns false when some glyph could not
/// be resolved; the buffer is then unusable.
pub(crate) fn refresh_uv(buffer: &mut FontBuffer, resolver: &mut GlyphResolver<'_>) -> bool {
    let id = buffer.id();
    for row in buffer.take_rows() {
        resolver.cache.remove_row_ref(row, id);
    }
    let ref_counted = buffer.parameters().ref_count();

    let keys = buffer.glyph_keys().to_vec();
    for (quad, key) in keys.into_iter().enumerate() {
        let entry = match resolver.resolve(key) {
            Resolved::Entry(entry) => entry,
            Resolved::Missing | Resolved::Full => {
                log::debug!("Refreshing buffer {:?} failed at {:?}", id, key);
                return false;
            },
        };
        buffer.update_uv(quad, entry.uv);
        buffer.move_quad(quad, entry.slice);
        if ref_counted {
            if let Some(row) = entry.row {
                if resolver.cache.add_row_ref(row, id) {
                    buffer.add_row(row);
                }
            }
        }
    }
    buffer.set_revision(resolver.cache.revision());
    true
}
