//! Typeatlas - GPU text through a shared glyph atlas
//!
//! The layout and caching engine lives in [`typeatlas_core`]; the pieces it
//! needs from the outside world come from backend crates re-exported here
//! behind feature flags:
//!
//! - `fontdb`: font files through read-fonts
//! - `unicode`: ICU4X line breaking and the locale table
//! - `shaping-none`: one glyph per character
//! - `render-zeno`: outline rasterization with zeno
//! - `minimal`: `shaping-none` and `render-zeno`
//! - `full`: everything
//!
//! # Example
//!
//! ```ignore
//! use typeatlas::prelude::*;
//!
//! let mut manager = typeatlas::builder(["/usr/share/fonts/truetype"]).build()?;
//! manager.open("dejavu/DejaVuSans.ttf")?;
//!
//! manager.start_layout_pass();
//! let params = manager.parameters("Hello", 24.0).build();
//! let id = manager.get_buffer("Hello", &params)?;
//! manager.update_pass(false);
//! ```

pub use typeatlas_core::{
    error, traits, types, AtlasConfig, BufferId, FontBuffer, FontBufferParameters, FontManager,
    FontManagerBuilder, FontMetrics, FontTexture, FontVertex, GlyphFlags, ShapingParams,
    TextAlignment,
};

#[cfg(feature = "unicode")]
pub use typeatlas_unicode as unicode;

#[cfg(feature = "fontdb")]
pub use typeatlas_fontdb as fontdb;

#[cfg(feature = "shaping-none")]
pub use typeatlas_shape_none as shape_none;

#[cfg(feature = "render-zeno")]
pub use typeatlas_render_zeno as render_zeno;

/// A builder wired with the bundled backends
///
/// Fonts are looked up in `search_dirs` and the atlas is configured from the
/// `TYPEATLAS_*` environment variables. A texture factory can still be added
/// before `build()`.
#[cfg(all(
    feature = "fontdb",
    feature = "unicode",
    feature = "shaping-none",
    feature = "render-zeno"
))]
pub fn builder<I, P>(search_dirs: I) -> FontManagerBuilder
where
    I: IntoIterator<Item = P>,
    P: Into<std::path::PathBuf>,
{
    use std::sync::Arc;

    let loader = search_dirs
        .into_iter()
        .fold(fontdb::FileFontLoader::new(), |loader, dir| {
            loader.with_search_dir(dir)
        });
    log::debug!("Building a font manager with the bundled backends");

    FontManager::builder()
        .config(AtlasConfig::from_env())
        .shaper(Arc::new(shape_none::NoneShaper::new()))
        .rasterizer(Arc::new(render_zeno::ZenoRasterizer::new()))
        .line_breaker(Arc::new(unicode::IcuLineBreaker::new()))
        .locale_table(Arc::new(unicode::StaticLocaleTable::new()))
        .font_loader(Arc::new(loader))
}

/// Common imports for typical usage
pub mod prelude {
    pub use typeatlas_core::{
        error::{AtlasError, Result},
        traits::{AtlasTexture, FontFace, LineBreaker, Rasterizer, Shaper, TextureFactory},
        types::{BitmapFormat, Direction},
        BufferId, FontBufferParameters, FontManager, GlyphFlags, TextAlignment,
    };
}
