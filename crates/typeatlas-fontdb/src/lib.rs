//! Where font files become faces
//!
//! [`Font`] keeps the raw bytes of one face and parses tables on demand with
//! read-fonts. [`FileFontLoader`] resolves the names handed to
//! `FontManager::open` against a list of directories and shares faces that
//! were already loaded.
//!
//! ## Memory Management
//!
//! Fonts store their raw data and create a table reader on demand. Only the
//! handful of metrics every layout needs are copied out at load time.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use read_fonts::{types::GlyphId as ReadGlyphId, FontRef as ReadFontRef, TableProvider};

use typeatlas_core::{
    error::{FontLoadError, Result},
    traits::{FontFace, FontLoader},
    types::GlyphId,
};

/// A font that's been brought into memory, ready to shape text
///
/// For TTC collections, `face_index` selects the face.
pub struct Font {
    data: Vec<u8>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("bytes", &self.data.len())
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl Font {
    /// Opens a font file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_index(path, 0)
    }

    /// Opens a specific face from a font file (for TTC collections)
    pub fn from_file_index(path: impl AsRef<Path>, face_index: u32) -> Result<Self> {
        let data = fs::read(path.as_ref())
            .map_err(|_| FontLoadError::FileNotFound(path.as_ref().display().to_string()))?;

        Self::from_data_index(data, face_index)
    }

    /// Turns raw font bytes into a face
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        Self::from_data_index(data, 0)
    }

    /// Turns raw font bytes into a specific face (for TTC collections)
    pub fn from_data_index(data: Vec<u8>, face_index: u32) -> Result<Self> {
        let font_ref =
            ReadFontRef::from_index(&data, face_index).map_err(|_| FontLoadError::InvalidData)?;

        let units_per_em = font_ref
            .head()
            .map(|head| head.units_per_em())
            .unwrap_or(1000);

        // hhea drives line layout; OS/2 typo metrics cover fonts without it
        let (ascender, descender) = font_ref
            .hhea()
            .ok()
            .map(|hhea| (hhea.ascender().to_i16(), hhea.descender().to_i16()))
            .or_else(|| {
                font_ref
                    .os2()
                    .ok()
                    .map(|os2| (os2.s_typo_ascender(), os2.s_typo_descender()))
            })
            .unwrap_or_else(|| {
                let upem = units_per_em as f32;
                ((upem * 0.8) as i16, -(upem * 0.2) as i16)
            });

        Ok(Font {
            data,
            face_index,
            units_per_em,
            ascender,
            descender,
        })
    }

    fn font_ref(&self) -> Option<ReadFontRef<'_>> {
        ReadFontRef::from_index(&self.data, self.face_index).ok()
    }

    /// Counts how many glyphs this font contains
    pub fn glyph_count(&self) -> Option<u32> {
        self.font_ref()
            .and_then(|font| font.maxp().ok().map(|maxp| u32::from(maxp.num_glyphs())))
    }
}

impl FontFace for Font {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn face_index(&self) -> u32 {
        self.face_index
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        self.font_ref()
            .and_then(|font| font.cmap().ok()?.map_codepoint(ch).map(|gid| gid.to_u32()))
            .filter(|&gid| gid != 0)
    }

    fn advance_width(&self, glyph_id: GlyphId) -> f32 {
        self.font_ref()
            .and_then(|font| font.hmtx().ok()?.advance(ReadGlyphId::new(glyph_id)))
            .map_or(0.0, f32::from)
    }

    fn ascender(&self) -> f32 {
        f32::from(self.ascender)
    }

    fn descender(&self) -> f32 {
        f32::from(self.descender)
    }
}

/// Opens faces by file name, searching a list of directories
///
/// Absolute paths and paths that exist relative to the working directory are
/// used as they are. Every file is read once; later loads of the same file
/// share the face.
#[derive(Default)]
pub struct FileFontLoader {
    search_dirs: Vec<PathBuf>,
    cache: Mutex<HashMap<PathBuf, Arc<Font>>>,
}

impl FileFontLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also look for fonts in `dir`
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn add_search_dir(&mut self, dir: impl Into<PathBuf>) {
        self.search_dirs.push(dir.into());
    }

    /// Where `name` would be loaded from
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        if direct.is_absolute() {
            return None;
        }
        self.search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Number of distinct files loaded so far
    pub fn loaded_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Forget every loaded face; faces still held elsewhere stay alive
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl FontLoader for FileFontLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn FontFace>> {
        let path = self
            .resolve(name)
            .ok_or_else(|| FontLoadError::FileNotFound(name.to_string()))?;
        // Canonical paths deduplicate "./a.ttf" and "a.ttf"
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());

        if let Some(font) = self.cache.lock().get(&key) {
            log::debug!("Reusing loaded font {}", key.display());
            return Ok(font.clone());
        }

        let font = Arc::new(Font::from_file(&path)?);
        log::debug!(
            "Loaded {} ({} bytes, {} units per em)",
            path.display(),
            font.data.len(),
            font.units_per_em
        );
        self.cache.lock().insert(key, font.clone());
        Ok(font)
    }
}
