//! The font manager: one owner for faces, atlas, buffers and pass state
//!
//! A frame drives the manager like this:
//!
//! 1. [`FontManager::start_layout_pass`]
//! 2. any number of [`FontManager::get_buffer`] / [`FontManager::get_texture`]
//! 3. [`FontManager::update_pass`], which uploads the atlas rows written
//!    during the frame
//!
//! Buffers fetched again in a later frame are checked against the atlas
//! revision. When rows they sampled were evicted, only their UVs are
//! re-resolved; the layout is kept.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::buffer_cache::{hash_text, BufferCache, FontBufferParameters, ParametersBuilder};
use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::font_buffer::{BufferId, FontBuffer};
use crate::glyph_cache::GlyphCache;
use crate::layout::{refresh_uv, GlyphResolver, LayoutEngine, Sizing};
use crate::texture::FontTexture;
use crate::traits::{
    AtlasTexture, FontFace, FontLoader, LineBreaker, LocaleTable, Rasterizer, Shaper,
    TextureFactory,
};
use crate::types::{BitmapFormat, Direction, FontId};
use crate::{ShapingParams, DEFAULT_LANGUAGE, DEFAULT_SCRIPT};

/// Pass counter value outside of layout passes
pub const RENDER_PASS: i32 = -1;

/// Maps a requested pixel size to the size glyphs are rasterized at
pub type SizeSelector = Box<dyn Fn(u32) -> u32 + Send + Sync>;

struct OpenFace {
    id: FontId,
    face: Arc<dyn FontFace>,
}

/// The active single face or fallback chain
#[derive(Clone)]
struct Selection {
    id: FontId,
    names: Vec<String>,
    faces: Vec<Arc<dyn FontFace>>,
    face_ids: Vec<FontId>,
}

fn hash_names(names: &[&str]) -> FontId {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for name in names {
        name.hash(&mut hasher);
    }
    hasher.finish()
}

/// Lays out text into atlas-backed buffers and keeps them across frames
pub struct FontManager {
    config: AtlasConfig,
    cache: GlyphCache,
    buffers: BufferCache,
    textures: LruCache<FontBufferParameters, FontTexture>,
    faces: HashMap<String, OpenFace>,
    faces_by_id: HashMap<FontId, Arc<dyn FontFace>>,
    selection: Option<Selection>,

    shaper: Arc<dyn Shaper>,
    rasterizer: Arc<dyn Rasterizer>,
    line_breaker: Arc<dyn LineBreaker>,
    loader: Arc<dyn FontLoader>,
    locale_table: Option<Arc<dyn LocaleTable>>,
    texture_factory: Option<Box<dyn TextureFactory>>,
    atlas_textures: Vec<Box<dyn AtlasTexture>>,
    size_selector: Option<SizeSelector>,

    locale: String,
    language: String,
    script: String,
    direction: Direction,
    line_height: f32,

    pass: i32,
    uploaded_revision: u32,
}

impl FontManager {
    pub fn builder() -> FontManagerBuilder {
        FontManagerBuilder::new()
    }

    /// Open a face and make it the selection if nothing is selected yet
    ///
    /// Opening an already open face is a no-op.
    pub fn open(&mut self, name: &str) -> Result<()> {
        if self.faces.contains_key(name) {
            log::debug!("Font {} is already open", name);
            return Ok(());
        }
        let face = self.loader.load(name).map_err(|err| {
            log::warn!("Can't load font resource {}: {}", name, err);
            err
        })?;

        let id = hash_text(name);
        self.faces_by_id.insert(id, face.clone());
        self.faces.insert(name.to_string(), OpenFace { id, face });
        log::info!("Opened font {} as {:#018x}", name, id);

        if self.selection.is_none() {
            self.select_font(name)?;
        }
        Ok(())
    }

    /// Close a face
    ///
    /// Every cached buffer and texture is dropped. When the face was part of
    /// the selection, nothing is selected afterwards.
    pub fn close(&mut self, name: &str) -> Result<()> {
        let face = self
            .faces
            .remove(name)
            .ok_or_else(|| AtlasError::UnknownFont(name.to_string()))?;
        self.faces_by_id.remove(&face.id);

        for id in self.buffers.ids() {
            self.drop_buffer(id);
        }
        self.textures.clear();

        if self
            .selection
            .as_ref()
            .is_some_and(|s| s.names.iter().any(|n| n == name))
        {
            self.selection = None;
        }
        log::info!("Closed font {}", name);
        Ok(())
    }

    /// Lay out with a single face
    pub fn select_font(&mut self, name: &str) -> Result<()> {
        let face = self
            .faces
            .get(name)
            .ok_or_else(|| AtlasError::UnknownFont(name.to_string()))?;
        self.selection = Some(Selection {
            id: face.id,
            names: vec![name.to_string()],
            faces: vec![face.face.clone()],
            face_ids: vec![face.id],
        });
        Ok(())
    }

    /// Lay out with a fallback chain; the first face is the primary one
    pub fn select_fonts(&mut self, names: &[&str]) -> Result<()> {
        match names {
            [] => Err(AtlasError::UnknownFont(String::new())),
            [name] => self.select_font(name),
            _ => {
                let mut faces = Vec::with_capacity(names.len());
                let mut face_ids = Vec::with_capacity(names.len());
                for name in names {
                    let face = self
                        .faces
                        .get(*name)
                        .ok_or_else(|| AtlasError::UnknownFont(name.to_string()))?;
                    faces.push(face.face.clone());
                    face_ids.push(face.id);
                }
                self.selection = Some(Selection {
                    id: hash_names(names),
                    names: names.iter().map(|n| n.to_string()).collect(),
                    faces,
                    face_ids,
                });
                Ok(())
            },
        }
    }

    /// Identity of the current selection, used in buffer parameters
    pub fn current_font_id(&self) -> Option<FontId> {
        self.selection.as_ref().map(|s| s.id)
    }

    /// Parameters builder for `text` with the current selection
    pub fn parameters(&self, text: &str, size: f32) -> ParametersBuilder {
        FontBufferParameters::builder(self.current_font_id().unwrap_or_default(), text, size)
    }

    /// Derive line-break language, script and direction from a locale
    /// such as "ar-EG"
    pub fn set_locale(&mut self, locale: &str) {
        if self.locale == locale {
            return;
        }
        let language = locale.split(['-', '_']).next().unwrap_or(locale);
        self.language = if self.line_breaker.supports_language(language) {
            language.to_string()
        } else {
            DEFAULT_LANGUAGE.to_string()
        };

        if let Some(table) = &self.locale_table {
            if let Some(info) = table.lookup(locale).or_else(|| table.lookup(language)) {
                self.direction = info.direction;
                self.script = info.script;
            }
        }
        self.locale = locale.to_string();
        log::debug!(
            "Locale {}: language {}, script {}, {:?}",
            locale,
            self.language,
            self.script,
            self.direction
        );
    }

    /// ISO 15924 script tag passed to the shaper
    pub fn set_script(&mut self, script: &str) {
        self.script = script.to_string();
    }

    pub fn set_layout_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Line advance as a multiple of the font size
    pub fn set_line_height(&mut self, line_height: f32) {
        self.line_height = line_height;
    }

    /// Bucket requested sizes so nearby sizes share atlas entries
    pub fn set_size_selector(&mut self, selector: impl Fn(u32) -> u32 + Send + Sync + 'static) {
        self.size_selector = Some(Box::new(selector));
    }

    pub fn clear_size_selector(&mut self) {
        self.size_selector = None;
    }

    /// Supply the GPU side; atlas slice textures are created on demand
    pub fn set_texture_factory(&mut self, factory: Box<dyn TextureFactory>) {
        self.texture_factory = Some(factory);
        self.atlas_textures.clear();
    }

    /// A buffer for `text`, built or fetched from the cache
    ///
    /// When the atlas runs out of room the cache is flushed and the build is
    /// retried once. A second failure is reported as
    /// [`AtlasError::CacheExhausted`].
    pub fn get_buffer(&mut self, text: &str, params: &FontBufferParameters) -> Result<BufferId> {
        if let Some(id) = self.create_buffer(text, params)? {
            return Ok(id);
        }

        self.flush_and_update();
        match self.create_buffer(text, params)? {
            Some(id) => Ok(id),
            None => {
                log::error!(
                    "Text {:?} at {}px does not fit the glyph cache; grow the atlas or use get_texture",
                    text,
                    params.font_size()
                );
                Err(AtlasError::CacheExhausted(format!(
                    "{:?} at {}px",
                    text,
                    params.font_size()
                )))
            },
        }
    }

    /// One build attempt; `Ok(None)` when the atlas is full
    pub fn create_buffer(
        &mut self,
        text: &str,
        params: &FontBufferParameters,
    ) -> Result<Option<BufferId>> {
        let selection = self.selection.clone().ok_or(AtlasError::NoFontSelected)?;
        let sizing = self.sizing(params.font_size());

        if let Some(id) = self.buffers.lookup(params) {
            return Ok(self.fetch_cached(id, params).then_some(id));
        }

        let id = self.buffers.next_id();
        let mut buffer = FontBuffer::new(id, params.clone());
        let engine = LayoutEngine {
            shaper: self.shaper.as_ref(),
            line_breaker: self.line_breaker.as_ref(),
            faces: &selection.faces,
            face_ids: &selection.face_ids,
            shaping: self.shaping_params(sizing.bucketed),
            line_height: self.line_height,
        };
        let mut resolver = GlyphResolver {
            cache: &mut self.cache,
            rasterizer: self.rasterizer.as_ref(),
            faces: &self.faces_by_id,
        };

        let built = engine.build(text, params, &sizing, &mut resolver, &mut buffer);
        self.ensure_atlas_textures();
        self.apply_invalidations();
        let built = match built {
            Ok(built) => built,
            Err(err) => {
                self.release_rows(&mut buffer);
                return Err(err);
            },
        };
        if !built {
            self.release_rows(&mut buffer);
            return Ok(None);
        }

        buffer.set_ref_count(1);
        if self.pass != RENDER_PASS {
            buffer.set_pass(self.pass);
        }
        log::debug!(
            "Built buffer {:?}: {} quads, {} lines",
            id,
            buffer.quad_count(),
            buffer.line_count()
        );
        Ok(Some(self.buffers.insert(buffer)))
    }

    fn fetch_cached(&mut self, id: BufferId, params: &FontBufferParameters) -> bool {
        let revision = self.cache.revision();
        let Some(buffer) = self.buffers.get_mut(id) else {
            return false;
        };
        if self.pass != RENDER_PASS {
            buffer.set_pass(self.pass);
        }

        if buffer.is_stale(revision) {
            log::debug!("Refreshing UVs of buffer {:?}", id);
            let mut resolver = GlyphResolver {
                cache: &mut self.cache,
                rasterizer: self.rasterizer.as_ref(),
                faces: &self.faces_by_id,
            };
            let refreshed = refresh_uv(buffer, &mut resolver);
            self.ensure_atlas_textures();
            self.apply_invalidations();
            if !refreshed {
                return false;
            }
        }

        if params.ref_count() {
            if let Some(buffer) = self.buffers.get_mut(id) {
                buffer.set_ref_count(buffer.ref_count() + 1);
            }
        }
        true
    }

    /// Drop one reference; the buffer is removed at zero
    pub fn release_buffer(&mut self, id: BufferId) -> Result<()> {
        let buffer = self
            .buffers
            .get_mut(id)
            .ok_or_else(|| AtlasError::InvalidRelease(format!("unknown buffer {:?}", id)))?;
        if buffer.ref_count() == 0 {
            return Err(AtlasError::InvalidRelease(format!(
                "buffer {:?} has no references left",
                id
            )));
        }
        buffer.set_ref_count(buffer.ref_count() - 1);
        if buffer.ref_count() == 0 {
            self.drop_buffer(id);
        }
        Ok(())
    }

    /// `text` rasterized into its own texture, bypassing the atlas
    pub fn get_texture(&mut self, text: &str, size: f32) -> Result<&FontTexture> {
        let selection = self.selection.clone().ok_or(AtlasError::NoFontSelected)?;
        let sizing = self.sizing(size);
        let key = FontBufferParameters::builder(selection.id, text, sizing.bucketed as f32).build();

        if !self.textures.contains(&key) {
            let engine = LayoutEngine {
                shaper: self.shaper.as_ref(),
                line_breaker: self.line_breaker.as_ref(),
                faces: &selection.faces,
                face_ids: &selection.face_ids,
                shaping: self.shaping_params(sizing.bucketed),
                line_height: self.line_height,
            };
            let mut texture = engine.render_texture(text, sizing.bucketed, self.rasterizer.as_ref())?;
            if let Some(factory) = self.texture_factory.as_mut() {
                let mut gpu = factory.create_texture(BitmapFormat::Gray8, texture.width(), texture.height());
                gpu.upload_sub_rect(
                    BitmapFormat::Gray8,
                    0,
                    texture.width(),
                    texture.height(),
                    texture.pixels(),
                );
                texture.set_gpu_texture(gpu);
            }
            if let Some((evicted, _)) = self.textures.push(key.clone(), texture) {
                if evicted != key {
                    log::debug!("Dropped least recently used text texture");
                }
            }
        }

        self.textures
            .get(&key)
            .ok_or_else(|| AtlasError::Config("text texture cache has no capacity".into()))
    }

    /// Begin laying out a frame
    pub fn start_layout_pass(&mut self) {
        self.pass = 0;
    }

    /// Finish a pass: upload dirty atlas rows and optionally start a subpass
    ///
    /// A subpass flushes the whole atlas so the rest of the frame can use a
    /// fresh generation of glyphs.
    pub fn update_pass(&mut self, start_subpass: bool) {
        self.cache.update();

        if self.cache.is_dirty() && self.pass <= 0 {
            self.upload_dirty();
            self.uploaded_revision = self.cache.revision();
            self.cache.clear_dirty();
        }

        if start_subpass {
            if self.pass > 0 {
                log::info!(
                    "Multiple subpasses in one rendering pass; grow the glyph cache to avoid \
                     flushing the atlas more than once per frame"
                );
            }
            self.cache.flush();
            self.apply_invalidations();
            self.uploaded_revision = self.cache.revision();
            self.pass += 1;
        } else {
            self.pass = RENDER_PASS;
        }
    }

    /// Flush the atlas and push its state to the GPU
    pub fn flush_and_update(&mut self) {
        self.cache.flush();
        self.apply_invalidations();
        self.upload_dirty();
        self.cache.clear_dirty();
        self.uploaded_revision = self.cache.revision();
    }

    pub fn buffer(&self, id: BufferId) -> Option<&FontBuffer> {
        self.buffers.get(id)
    }

    /// Whether a buffer's UVs match the atlas revision last uploaded
    pub fn is_buffer_up_to_date(&self, id: BufferId) -> bool {
        self.buffers
            .get(id)
            .is_some_and(|b| b.revision() == Some(self.uploaded_revision))
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn glyph_cache(&self) -> &GlyphCache {
        &self.cache
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Current pass index, [`RENDER_PASS`] outside layout passes
    pub fn current_pass(&self) -> i32 {
        self.pass
    }

    /// Atlas revision at the last upload
    pub fn uploaded_revision(&self) -> u32 {
        self.uploaded_revision
    }

    pub fn atlas_texture(&self, slice: usize) -> Option<&dyn AtlasTexture> {
        self.atlas_textures.get(slice).map(|t| t.as_ref())
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn layout_direction(&self) -> Direction {
        self.direction
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.faces.contains_key(name)
    }

    fn sizing(&self, requested: f32) -> Sizing {
        let size = requested.round().max(1.0) as u32;
        let bucketed = self
            .size_selector
            .as_ref()
            .map_or(size, |select| select(size))
            .max(1);
        Sizing {
            requested,
            bucketed,
        }
    }

    fn shaping_params(&self, size: u32) -> ShapingParams {
        ShapingParams {
            size: size as f32,
            direction: self.direction,
            script: self.script.clone(),
            language: self.language.clone(),
        }
    }

    fn drop_buffer(&mut self, id: BufferId) {
        if let Some(mut buffer) = self.buffers.remove(id) {
            self.release_rows(&mut buffer);
        }
    }

    fn release_rows(&mut self, buffer: &mut FontBuffer) {
        let id = buffer.id();
        for row in buffer.take_rows() {
            self.cache.remove_row_ref(row, id);
        }
    }

    /// Stale-mark buffers whose rows were evicted or flushed
    fn apply_invalidations(&mut self) {
        for id in self.cache.take_invalidated() {
            if let Some(buffer) = self.buffers.get_mut(id) {
                buffer.invalidate();
            }
        }
    }

    fn ensure_atlas_textures(&mut self) {
        let Some(factory) = self.texture_factory.as_mut() else {
            return;
        };
        let (width, height) = self.cache.size();
        while self.atlas_textures.len() < self.cache.num_slices() {
            log::debug!("Creating atlas texture for slice {}", self.atlas_textures.len());
            self.atlas_textures
                .push(factory.create_texture(BitmapFormat::Gray8, width, height));
        }
    }

    fn upload_dirty(&mut self) {
        if self.texture_factory.is_none() {
            log::debug!("No texture factory set, skipping atlas upload");
            return;
        }
        self.ensure_atlas_textures();
        let (width, _) = self.cache.size();
        for slice in 0..self.cache.num_slices() {
            let Some((start, end)) = self.cache.dirty_range(slice) else {
                continue;
            };
            let (Some(pixels), Some(texture)) =
                (self.cache.slice_pixels(slice), self.atlas_textures.get_mut(slice))
            else {
                continue;
            };
            let rows = start as usize * width as usize..end as usize * width as usize;
            if let Some(rows) = pixels.get(rows) {
                texture.upload_sub_rect(BitmapFormat::Gray8, start, width, end - start, rows);
            }
        }
    }
}

/// Collects the collaborators of a [`FontManager`]
pub struct FontManagerBuilder {
    config: AtlasConfig,
    shaper: Option<Arc<dyn Shaper>>,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    line_breaker: Option<Arc<dyn LineBreaker>>,
    loader: Option<Arc<dyn FontLoader>>,
    locale_table: Option<Arc<dyn LocaleTable>>,
    texture_factory: Option<Box<dyn TextureFactory>>,
}

impl FontManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: AtlasConfig::default(),
            shaper: None,
            rasterizer: None,
            line_breaker: None,
            loader: None,
            locale_table: None,
            texture_factory: None,
        }
    }

    pub fn config(mut self, config: AtlasConfig) -> Self {
        self.config = config;
        self
    }

    /// Choose who turns characters into glyphs
    pub fn shaper(mut self, shaper: Arc<dyn Shaper>) -> Self {
        self.shaper = Some(shaper);
        self
    }

    /// Choose who turns glyphs into coverage bitmaps
    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn line_breaker(mut self, line_breaker: Arc<dyn LineBreaker>) -> Self {
        self.line_breaker = Some(line_breaker);
        self
    }

    pub fn font_loader(mut self, loader: Arc<dyn FontLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn locale_table(mut self, table: Arc<dyn LocaleTable>) -> Self {
        self.locale_table = Some(table);
        self
    }

    pub fn texture_factory(mut self, factory: Box<dyn TextureFactory>) -> Self {
        self.texture_factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<FontManager> {
        self.config.validate()?;
        let missing = |what: &str| AtlasError::Config(format!("font manager needs a {}", what));
        let shaper = self.shaper.ok_or_else(|| missing("shaper"))?;
        let rasterizer = self.rasterizer.ok_or_else(|| missing("rasterizer"))?;
        let line_breaker = self.line_breaker.ok_or_else(|| missing("line breaker"))?;
        let loader = self.loader.ok_or_else(|| missing("font loader"))?;
        let capacity = NonZeroUsize::new(self.config.max_textures)
            .ok_or_else(|| AtlasError::Config("max_textures must be at least 1".into()))?;

        log::debug!(
            "Font manager with {}x{} atlas, up to {} slices, shaper {}, rasterizer {}",
            self.config.atlas_width,
            self.config.atlas_height,
            self.config.max_slices,
            shaper.name(),
            rasterizer.name()
        );

        let mut manager = FontManager {
            cache: GlyphCache::from_config(&self.config),
            buffers: BufferCache::new(),
            textures: LruCache::new(capacity),
            faces: HashMap::new(),
            faces_by_id: HashMap::new(),
            selection: None,
            shaper,
            rasterizer,
            line_breaker,
            loader,
            locale_table: self.locale_table,
            texture_factory: self.texture_factory,
            atlas_textures: Vec::new(),
            size_selector: None,
            locale: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            script: DEFAULT_SCRIPT.to_string(),
            direction: Direction::LeftToRight,
            line_height: self.config.line_height,
            pass: RENDER_PASS,
            uploaded_revision: 0,
            config: self.config,
        };
        manager.ensure_atlas_textures();
        Ok(manager)
    }
}

impl Default for FontManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
