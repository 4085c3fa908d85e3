//! In-memory collaborators for driving the font manager in tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use typeatlas_core::error::{FontLoadError, RasterError, Result, ShapingError};
use typeatlas_core::traits::{
    AtlasTexture, FontFace, FontLoader, LineBreaker, LocaleTable, Rasterizer, Shaper,
    TextureFactory,
};
use typeatlas_core::types::{
    BitmapFormat, BreakCode, Direction, GlyphBitmap, GlyphId, LocaleInfo, ShapedGlyph,
};
use typeatlas_core::{AtlasConfig, FontManager, ShapingParams};

/// Glyph drawn taller than the em box by [`TALL_EXTRA`] pixels
pub const TALL: char = 'T';
pub const TALL_EXTRA: u32 = 4;

/// Glyph the rasterizer refuses to draw
pub const BROKEN: char = 'x';

/// A face with 1000 units per em that maps characters to their scalar value
pub struct FakeFace {
    missing: HashSet<char>,
}

impl FakeFace {
    pub fn new() -> Self {
        Self {
            missing: HashSet::new(),
        }
    }

    pub fn without(chars: &str) -> Self {
        Self {
            missing: chars.chars().collect(),
        }
    }
}

impl FontFace for FakeFace {
    fn data(&self) -> &[u8] {
        b"fake"
    }

    fn units_per_em(&self) -> u16 {
        1000
    }

    fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        (!self.missing.contains(&ch)).then_some(ch as u32)
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

/// Every letter advances by `em_advance` ems, spaces by `space_advance`
/// ems, control characters not at all
pub struct FixedShaper {
    pub em_advance: f32,
    pub space_advance: f32,
}

impl FixedShaper {
    pub fn new(em_advance: f32) -> Self {
        Self {
            em_advance,
            space_advance: 0.0,
        }
    }
}

impl Shaper for FixedShaper {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn shape(
        &self,
        text: &str,
        fonts: &[Arc<dyn FontFace>],
        params: &ShapingParams,
    ) -> Result<Vec<ShapedGlyph>> {
        let mut glyphs: Vec<ShapedGlyph> = text
            .char_indices()
            .map(|(cluster, ch)| {
                let face = fonts
                    .iter()
                    .position(|f| f.glyph_id(ch).is_some())
                    .unwrap_or(0);
                let em = if ch == ' ' {
                    self.space_advance
                } else if ch.is_control() {
                    0.0
                } else {
                    self.em_advance
                };
                ShapedGlyph {
                    glyph_id: ch as u32,
                    cluster: cluster as u32,
                    x_advance: em * params.size,
                    y_advance: 0.0,
                    face,
                }
            })
            .collect();
        if params.direction == Direction::RightToLeft {
            glyphs.reverse();
        }
        Ok(glyphs)
    }
}

/// Refuses any span containing `reject` and shapes the rest like [`FixedShaper`]
pub struct RejectingShaper {
    pub inner: FixedShaper,
    pub reject: char,
}

impl Shaper for RejectingShaper {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn shape(
        &self,
        text: &str,
        fonts: &[Arc<dyn FontFace>],
        params: &ShapingParams,
    ) -> Result<Vec<ShapedGlyph>> {
        if text.contains(self.reject) {
            return Err(ShapingError::InvalidText.into());
        }
        self.inner.shape(text, fonts, params)
    }
}

/// Draws every glyph as a solid box half the size wide and the size tall,
/// sitting on the baseline and reaching up to the ascender
#[derive(Default)]
pub struct BoxRasterizer {
    pub calls: AtomicUsize,
}

impl BoxRasterizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Rasterizer for BoxRasterizer {
    fn name(&self) -> &'static str {
        "box"
    }

    fn rasterize(&self, face: &dyn FontFace, glyph_id: GlyphId, pixel_size: u32) -> Result<GlyphBitmap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ch = char::from_u32(glyph_id).ok_or(RasterError::GlyphNotFound(glyph_id))?;
        if ch == BROKEN {
            return Err(RasterError::GlyphNotFound(glyph_id).into());
        }
        if ch == ' ' || ch.is_control() {
            return Ok(GlyphBitmap::default());
        }

        let base_line = face.baseline(pixel_size);
        let extra = if ch == TALL { TALL_EXTRA } else { 0 };
        let width = (pixel_size / 2).max(1);
        let height = pixel_size + extra;
        Ok(GlyphBitmap {
            width,
            height,
            bearing_x: 0,
            bearing_y: base_line + extra as i32,
            data: vec![255; (width * height) as usize],
        })
    }
}

/// Break opportunities after spaces, forced breaks after newlines and at
/// the end of the text
pub struct SpaceBreaker;

impl LineBreaker for SpaceBreaker {
    fn classify(&self, text: &str, _language: &str) -> Vec<BreakCode> {
        let mut codes = vec![BreakCode::InsideChar; text.len()];
        for (offset, ch) in text.char_indices() {
            let last = offset + ch.len_utf8() - 1;
            codes[last] = match ch {
                '\n' => BreakCode::MustBreak,
                ' ' => BreakCode::AllowBreak,
                _ => BreakCode::NoBreak,
            };
        }
        if let Some(last) = codes.last_mut() {
            *last = BreakCode::MustBreak;
        }
        codes
    }

    fn supports_language(&self, language: &str) -> bool {
        matches!(language, "en" | "ar" | "ja")
    }
}

/// Opens [`FakeFace`]s; names containing "missing" fail to load and names
/// starting with "cyrillic" lack Latin letters
pub struct FakeLoader;

impl FontLoader for FakeLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn FontFace>> {
        if name.contains("missing") {
            return Err(FontLoadError::FileNotFound(name.to_string()).into());
        }
        if name.starts_with("cyrillic") {
            return Ok(Arc::new(FakeFace::without("abcdefghijklmnopqrstuvwxyz")));
        }
        if name.starts_with("latin") {
            return Ok(Arc::new(FakeFace::without("жзи")));
        }
        Ok(Arc::new(FakeFace::new()))
    }
}

pub struct FakeLocales;

impl LocaleTable for FakeLocales {
    fn lookup(&self, locale: &str) -> Option<LocaleInfo> {
        match locale {
            "ar" => Some(LocaleInfo {
                script: "Arab".into(),
                direction: Direction::RightToLeft,
            }),
            "en" | "en-US" => Some(LocaleInfo {
                script: "Latn".into(),
                direction: Direction::LeftToRight,
            }),
            _ => None,
        }
    }
}

/// One recorded `upload_sub_rect` call
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub texture: usize,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

#[derive(Default)]
pub struct UploadLog {
    pub created: Mutex<Vec<(u32, u32)>>,
    pub uploads: Mutex<Vec<Upload>>,
}

struct RecordingTexture {
    index: usize,
    log: Arc<UploadLog>,
}

impl AtlasTexture for RecordingTexture {
    fn upload_sub_rect(
        &mut self,
        _format: BitmapFormat,
        y_offset: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        self.log.uploads.lock().push(Upload {
            texture: self.index,
            y_offset,
            width,
            height,
            bytes: pixels.len(),
        });
    }
}

pub struct RecordingFactory {
    pub log: Arc<UploadLog>,
}

impl TextureFactory for RecordingFactory {
    fn create_texture(&mut self, _format: BitmapFormat, width: u32, height: u32) -> Box<dyn AtlasTexture> {
        let mut created = self.log.created.lock();
        created.push((width, height));
        Box::new(RecordingTexture {
            index: created.len() - 1,
            log: self.log.clone(),
        })
    }
}

/// Handles kept by a test to observe the manager's collaborators
pub struct Harness {
    pub manager: FontManager,
    pub rasterizer: Arc<BoxRasterizer>,
    pub uploads: Arc<UploadLog>,
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A manager with one open face "regular.ttf" and letters half an em wide
pub fn harness(config: AtlasConfig) -> Harness {
    harness_with_shaper(config, FixedShaper::new(0.5))
}

pub fn harness_with_shaper(config: AtlasConfig, shaper: FixedShaper) -> Harness {
    harness_with(config, Arc::new(shaper))
}

pub fn harness_with(config: AtlasConfig, shaper: Arc<dyn Shaper>) -> Harness {
    init_logging();
    let rasterizer = Arc::new(BoxRasterizer::default());
    let uploads = Arc::new(UploadLog::default());
    let mut manager = FontManager::builder()
        .config(config)
        .shaper(shaper)
        .rasterizer(rasterizer.clone())
        .line_breaker(Arc::new(SpaceBreaker))
        .font_loader(Arc::new(FakeLoader))
        .locale_table(Arc::new(FakeLocales))
        .texture_factory(Box::new(RecordingFactory {
            log: uploads.clone(),
        }))
        .build()
        .expect("manager builds");
    manager.open("regular.ttf").expect("face opens");
    Harness {
        manager,
        rasterizer,
        uploads,
    }
}

/// x of the top-left corner of every quad, in buffer order
pub fn quad_xs(manager: &FontManager, id: typeatlas_core::BufferId) -> Vec<f32> {
    manager
        .buffer(id)
        .map(|b| b.vertices().iter().step_by(4).map(|v| v.position[0]).collect())
        .unwrap_or_default()
}

/// y of the top-left corner of every quad, in buffer order
pub fn quad_ys(manager: &FontManager, id: typeatlas_core::BufferId) -> Vec<f32> {
    manager
        .buffer(id)
        .map(|b| b.vertices().iter().step_by(4).map(|v| v.position[1]).collect())
        .unwrap_or_default()
}

pub fn positions(manager: &FontManager, id: typeatlas_core::BufferId) -> Vec<[f32; 3]> {
    manager
        .buffer(id)
        .map(|b| b.vertices().iter().map(|v| v.position).collect())
        .unwrap_or_default()
}

pub fn counts(uploads: &UploadLog) -> HashMap<usize, usize> {
    let mut counts = HashMap::new();
    for upload in uploads.uploads.lock().iter() {
        *counts.entry(upload.texture).or_insert(0) += 1;
    }
    counts
}
