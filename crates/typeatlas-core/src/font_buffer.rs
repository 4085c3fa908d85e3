//! Laid out text, ready for the GPU
//!
//! A [`FontBuffer`] holds four [`FontVertex`] values per glyph quad and one
//! index list per atlas slice the quads sample from. Alongside the geometry
//! it remembers which glyph each quad shows, so the UVs can be re-resolved
//! after the atlas changed without shaping the text again.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::buffer_cache::{FontBufferParameters, TextAlignment};
use crate::glyph_entry::{GlyphCacheEntry, GlyphKey, RowId};
use crate::metrics::FontMetrics;
use crate::types::Direction;

/// Vertices emitted per glyph quad
pub const VERTICES_PER_QUAD: usize = 4;

/// Two triangles over the quad's corners: top-left, bottom-left, top-right,
/// bottom-right
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 1, 3, 2];

/// One corner of a glyph quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct FontVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl FontVertex {
    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, 0.0],
            uv: [u, v],
        }
    }
}

/// Handle of a buffer held by the buffer cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u64);

impl BufferId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Vertices, indices and carets of one laid out string
#[derive(Debug, Clone)]
pub struct FontBuffer {
    id: BufferId,
    params: FontBufferParameters,
    vertices: Vec<FontVertex>,
    /// Index lists, one per entry of `slices`
    indices: Vec<Vec<u32>>,
    /// Atlas slice sampled by each index list
    slices: Vec<usize>,
    /// Glyph shown by each quad
    keys: Vec<GlyphKey>,
    /// Atlas slice of each quad
    quad_slices: Vec<usize>,
    carets: Option<Vec<[i32; 2]>>,
    word_boundaries: Vec<usize>,
    word_boundary_carets: Vec<usize>,
    line_start: usize,
    line_start_caret: usize,
    lines: u32,
    revision: Option<u32>,
    pass: Option<i32>,
    size: (u32, u32),
    metrics: FontMetrics,
    ref_count: u32,
    rows: Vec<RowId>,
}

impl FontBuffer {
    pub fn new(id: BufferId, params: FontBufferParameters) -> Self {
        let carets = params.caret_info().then(Vec::new);
        Self {
            id,
            params,
            vertices: Vec::new(),
            indices: Vec::new(),
            slices: Vec::new(),
            keys: Vec::new(),
            quad_slices: Vec::new(),
            carets,
            word_boundaries: Vec::new(),
            word_boundary_carets: Vec::new(),
            line_start: 0,
            line_start_caret: 0,
            lines: 0,
            revision: None,
            pass: None,
            size: (0, 0),
            metrics: FontMetrics::default(),
            ref_count: 0,
            rows: Vec::new(),
        }
    }

    /// Append the quad of a cached glyph
    ///
    /// `pos` is the pen position at the top of the line; the quad hangs from
    /// the baseline by the entry's bearings, scaled from the bucketed size to
    /// the requested one.
    pub fn add_quad(
        &mut self,
        pos: [f32; 2],
        base_line: i32,
        scale: f32,
        entry: &GlyphCacheEntry,
        key: GlyphKey,
    ) {
        let quad = self.keys.len() as u32;
        let list = self.index_list_for(entry.slice);
        self.indices[list].extend(QUAD_INDICES.iter().map(|i| i + quad * 4));

        let x = pos[0].round() + entry.bearing_x as f32 * scale;
        let y = pos[1].round() + (base_line - entry.bearing_y) as f32 * scale;
        let (w, h) = (entry.width as f32 * scale, entry.height as f32 * scale);
        let [u0, v0, u1, v1] = entry.uv;
        self.vertices.extend([
            FontVertex::new(x, y, u0, v0),
            FontVertex::new(x, y + h, u0, v1),
            FontVertex::new(x + w, y, u1, v0),
            FontVertex::new(x + w, y + h, u1, v1),
        ]);
        self.keys.push(key);
        self.quad_slices.push(entry.slice);
    }

    /// Record a caret; ignored unless carets were requested
    pub fn add_caret(&mut self, pos: [f32; 2]) {
        if let Some(carets) = &mut self.carets {
            carets.push([pos[0].round() as i32, pos[1].round() as i32]);
        }
    }

    /// Mark the end of a word for justification
    pub fn add_word_boundary(&mut self) {
        if self.params.alignment().is_justify() {
            self.word_boundaries.push(self.keys.len());
            self.word_boundary_carets.push(self.caret_count());
        }
    }

    /// Close the current line and align it
    ///
    /// The final line is never justified; it falls back to the alignment's
    /// base variant. Offsets are mirrored for right-to-left text. Nothing
    /// moves when the box has no width.
    pub fn update_line(&mut self, direction: Direction, line_width: f32, last_line: bool) {
        let alignment = self.params.alignment();
        let box_width = self.params.width() as f32;
        let quads = self.line_start..self.keys.len();
        let carets = self.line_start_caret..self.caret_count();
        let sign = direction.sign();

        if box_width > 0.0 {
            let justify = alignment.is_justify() && !last_line && self.word_boundaries.len() > 1;
            if justify {
                let change = (box_width - line_width) / (self.word_boundaries.len() - 1) as f32;
                self.justify_line(quads, carets, change * sign);
            } else {
                let slack = box_width - line_width;
                let offset = match alignment.base() {
                    TextAlignment::Center => slack / 2.0,
                    TextAlignment::Right => slack,
                    _ => 0.0,
                };
                if offset != 0.0 {
                    self.offset_range(quads, carets, offset * sign);
                }
            }
        }

        self.line_start = self.keys.len();
        self.line_start_caret = self.caret_count();
        self.word_boundaries.clear();
        self.word_boundary_carets.clear();
        self.lines += 1;
    }

    /// Shift quads and carets of one index range horizontally
    pub fn offset_range(&mut self, quads: Range<usize>, carets: Range<usize>, dx: f32) {
        let vertices = quads.start * VERTICES_PER_QUAD..quads.end * VERTICES_PER_QUAD;
        if let Some(vertices) = self.vertices.get_mut(vertices) {
            for vertex in vertices {
                vertex.position[0] += dx;
            }
        }
        if let Some(carets) = self.carets.as_mut().and_then(|c| c.get_mut(carets)) {
            let dx = dx.round() as i32;
            for caret in carets {
                caret[0] += dx;
            }
        }
    }

    /// Spread `change` over the word segments of the current line: the k-th
    /// word moves by k times `change`
    fn justify_line(&mut self, quads: Range<usize>, carets: Range<usize>, change: f32) {
        let quad_ends = std::mem::take(&mut self.word_boundaries);
        let caret_ends = std::mem::take(&mut self.word_boundary_carets);
        let (mut quad_start, mut caret_start) = (quads.start, carets.start);
        for (k, (&quad_end, &caret_end)) in quad_ends.iter().zip(&caret_ends).enumerate() {
            if k > 0 {
                self.offset_range(quad_start..quad_end, caret_start..caret_end, change * k as f32);
            }
            quad_start = quad_end;
            caret_start = caret_end;
        }
        // Carets placed after the final word of the line ride with it.
        let last = quad_ends.len().saturating_sub(1);
        if last > 0 && caret_start < carets.end {
            self.offset_range(quad_start..quad_start, caret_start..carets.end, change * last as f32);
        }
    }

    /// Overwrite the four UVs of one quad
    pub fn update_uv(&mut self, quad: usize, uv: [f32; 4]) {
        let start = quad * VERTICES_PER_QUAD;
        if let Some(corners) = self.vertices.get_mut(start..start + VERTICES_PER_QUAD) {
            let [u0, v0, u1, v1] = uv;
            corners[0].uv = [u0, v0];
            corners[1].uv = [u0, v1];
            corners[2].uv = [u1, v0];
            corners[3].uv = [u1, v1];
        }
    }

    /// Move a quad's indices to the list of another atlas slice
    pub fn move_quad(&mut self, quad: usize, slice: usize) {
        let Some(&current) = self.quad_slices.get(quad) else {
            return;
        };
        if current == slice {
            return;
        }
        let first = quad as u32 * 4;
        if let Some(list) = self.slices.iter().position(|&s| s == current) {
            let indices = &mut self.indices[list];
            if let Some(at) = indices
                .chunks(QUAD_INDICES.len())
                .position(|chunk| chunk.first() == Some(&first))
            {
                let start = at * QUAD_INDICES.len();
                indices.drain(start..start + QUAD_INDICES.len());
            }
        }
        let list = self.index_list_for(slice);
        self.indices[list].extend(QUAD_INDICES.iter().map(|i| i + first));
        self.quad_slices[quad] = slice;
    }

    /// Internal consistency of the geometry
    pub fn verify(&self) -> bool {
        let quads = self.keys.len();
        let indexed: usize = self.indices.iter().map(Vec::len).sum();
        self.vertices.len() == quads * VERTICES_PER_QUAD
            && self.quad_slices.len() == quads
            && indexed == quads * QUAD_INDICES.len()
            && self.indices.len() == self.slices.len()
            && self.indices.iter().flatten().all(|&i| (i as usize) < self.vertices.len())
    }

    fn index_list_for(&mut self, slice: usize) -> usize {
        match self.slices.iter().position(|&s| s == slice) {
            Some(list) => list,
            None => {
                self.slices.push(slice);
                self.indices.push(Vec::new());
                self.slices.len() - 1
            },
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn parameters(&self) -> &FontBufferParameters {
        &self.params
    }

    pub fn vertices(&self) -> &[FontVertex] {
        &self.vertices
    }

    /// Raw vertex bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index list of the `list`-th slice the buffer samples
    pub fn indices(&self, list: usize) -> Option<&[u32]> {
        self.indices.get(list).map(Vec::as_slice)
    }

    /// Atlas slices in the order of the index lists
    pub fn slices(&self) -> &[usize] {
        &self.slices
    }

    pub fn glyph_keys(&self) -> &[GlyphKey] {
        &self.keys
    }

    pub fn quad_count(&self) -> usize {
        self.keys.len()
    }

    pub fn quad_slice(&self, quad: usize) -> Option<usize> {
        self.quad_slices.get(quad).copied()
    }

    /// Caret positions, when they were requested
    pub fn caret_positions(&self) -> Option<&[[i32; 2]]> {
        self.carets.as_deref()
    }

    pub fn caret_count(&self) -> usize {
        self.carets.as_ref().map_or(0, Vec::len)
    }

    pub fn line_count(&self) -> u32 {
        self.lines
    }

    /// Cache revision the UVs were resolved against; `None` once invalidated
    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    pub fn set_revision(&mut self, revision: u32) {
        self.revision = Some(revision);
    }

    /// Forget the revision stamp so the next fetch re-resolves every UV
    pub fn invalidate(&mut self) {
        self.revision = None;
    }

    pub fn is_stale(&self, revision: u32) -> bool {
        self.revision != Some(revision)
    }

    /// Layout pass the buffer was last created or fetched in
    pub fn pass(&self) -> Option<i32> {
        self.pass
    }

    pub fn set_pass(&mut self, pass: i32) {
        self.pass = Some(pass);
    }

    /// Measured width and height in pixels
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn set_metrics(&mut self, metrics: FontMetrics) {
        self.metrics = metrics;
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn set_ref_count(&mut self, count: u32) {
        self.ref_count = count;
    }

    /// Rows this buffer registered with
    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    pub fn add_row(&mut self, row: RowId) {
        if !self.rows.contains(&row) {
            self.rows.push(row);
        }
    }

    pub fn take_rows(&mut self) -> Vec<RowId> {
        std::mem::take(&mut self.rows)
    }
}
