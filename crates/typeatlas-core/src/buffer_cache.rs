//! Finished buffers keyed by the request that produced them
//!
//! Two requests with equal [`FontBufferParameters`] get the same buffer. Font
//! sizes are compared as fixed point hundredths so that float noise below
//! 0.01px never splits the cache.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::font_buffer::{BufferId, FontBuffer};
use crate::glyph_entry::GlyphFlags;
use crate::types::FontId;

/// Horizontal alignment of each line inside the box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    /// Justified lines, the last line left aligned
    Justify,
    /// Justified lines, the last line centered
    JustifyCenter,
    /// Justified lines, the last line right aligned
    JustifyRight,
}

impl TextAlignment {
    pub fn is_justify(self) -> bool {
        matches!(
            self,
            TextAlignment::Justify | TextAlignment::JustifyCenter | TextAlignment::JustifyRight
        )
    }

    /// Alignment used for lines that are not justified
    pub fn base(self) -> TextAlignment {
        match self {
            TextAlignment::Justify => TextAlignment::Left,
            TextAlignment::JustifyCenter => TextAlignment::Center,
            TextAlignment::JustifyRight => TextAlignment::Right,
            other => other,
        }
    }
}

/// Stable hash of a string for cache keys
pub fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Everything that decides what a buffer looks like
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontBufferParameters {
    font_id: FontId,
    text_hash: u64,
    /// Requested pixel size times 100
    font_size: u32,
    width: u32,
    height: u32,
    alignment: TextAlignment,
    flags: GlyphFlags,
    multi_line: bool,
    caret_info: bool,
    ref_count: bool,
}

impl FontBufferParameters {
    /// Start describing a buffer for `text` at `size` pixels
    pub fn builder(font_id: FontId, text: &str, size: f32) -> ParametersBuilder {
        ParametersBuilder {
            params: FontBufferParameters {
                font_id,
                text_hash: hash_text(text),
                font_size: (size.max(0.0) * 100.0).round() as u32,
                width: 0,
                height: 0,
                alignment: TextAlignment::Left,
                flags: GlyphFlags::NONE,
                multi_line: false,
                caret_info: false,
                ref_count: false,
            },
        }
    }

    pub fn font_id(&self) -> FontId {
        self.font_id
    }

    pub fn text_hash(&self) -> u64 {
        self.text_hash
    }

    /// Requested pixel size
    pub fn font_size(&self) -> f32 {
        self.font_size as f32 / 100.0
    }

    /// Box width, zero when unbounded
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Box height, zero when unbounded
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn alignment(&self) -> TextAlignment {
        self.alignment
    }

    pub fn glyph_flags(&self) -> GlyphFlags {
        self.flags
    }

    pub fn multi_line(&self) -> bool {
        self.multi_line
    }

    pub fn caret_info(&self) -> bool {
        self.caret_info
    }

    /// Whether fetches and releases are counted
    pub fn ref_count(&self) -> bool {
        self.ref_count
    }
}

/// Builder for [`FontBufferParameters`]
#[derive(Debug, Clone)]
pub struct ParametersBuilder {
    params: FontBufferParameters,
}

impl ParametersBuilder {
    /// Box size in pixels; zero leaves a dimension unbounded
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.params.width = width;
        self.params.height = height;
        self
    }

    pub fn alignment(mut self, alignment: TextAlignment) -> Self {
        self.params.alignment = alignment;
        self
    }

    pub fn glyph_flags(mut self, flags: GlyphFlags) -> Self {
        self.params.flags = flags;
        self
    }

    pub fn multi_line(mut self, multi_line: bool) -> Self {
        self.params.multi_line = multi_line;
        self
    }

    pub fn caret_info(mut self, caret_info: bool) -> Self {
        self.params.caret_info = caret_info;
        self
    }

    pub fn ref_count(mut self, ref_count: bool) -> Self {
        self.params.ref_count = ref_count;
        self
    }

    pub fn build(self) -> FontBufferParameters {
        self.params
    }
}

/// Buffers owned by the manager, reachable by parameters or by id
#[derive(Debug, Default)]
pub struct BufferCache {
    by_params: HashMap<FontBufferParameters, BufferId>,
    buffers: HashMap<BufferId, FontBuffer>,
    next_id: u64,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for a buffer under construction
    pub fn next_id(&mut self) -> BufferId {
        self.next_id += 1;
        BufferId(self.next_id)
    }

    pub fn lookup(&self, params: &FontBufferParameters) -> Option<BufferId> {
        self.by_params.get(params).copied()
    }

    pub fn insert(&mut self, buffer: FontBuffer) -> BufferId {
        let id = buffer.id();
        if let Some(replaced) = self.by_params.insert(buffer.parameters().clone(), id) {
            self.buffers.remove(&replaced);
        }
        self.buffers.insert(id, buffer);
        id
    }

    pub fn get(&self, id: BufferId) -> Option<&FontBuffer> {
        self.buffers.get(&id)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut FontBuffer> {
        self.buffers.get_mut(&id)
    }

    pub fn remove(&mut self, id: BufferId) -> Option<FontBuffer> {
        let buffer = self.buffers.remove(&id)?;
        self.by_params.remove(buffer.parameters());
        Some(buffer)
    }

    /// Ids of every held buffer, oldest first
    pub fn ids(&self) -> Vec<BufferId> {
        let mut ids: Vec<BufferId> = self.buffers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&mut self) {
        self.by_params.clear();
        self.buffers.clear();
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
