//! Zeno Rasterizer - glyph outlines to 8-bit coverage, in pure Rust
//!
//! skrifa walks the outline at the requested pixel size and feeds it to a
//! pen that builds two paths at once:
//!
//! 1. **SVG path data** for zeno's mask rasterizer
//! 2. **a kurbo path** for the bounding box
//!
//! The bitmap covers exactly the pixel-aligned bounding box of the outline,
//! with rows top to bottom, which is what the atlas packs.

use kurbo::Shape;
use skrifa::MetadataProvider;
use typeatlas_core::{
    error::{RasterError, Result},
    traits::{FontFace, Rasterizer},
    types::{GlyphBitmap, GlyphId},
};

/// Outline rasterizer backed by zeno
pub struct ZenoRasterizer {
    /// Largest bitmap edge we agree to allocate
    max_size: u32,
}

impl ZenoRasterizer {
    pub fn new() -> Self {
        Self { max_size: 4096 }
    }

    /// Reject glyphs whose bitmap would be wider or taller than `max_size`
    pub fn with_max_size(max_size: u32) -> Self {
        Self { max_size }
    }
}

impl Default for ZenoRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ZenoRasterizer {
    fn name(&self) -> &'static str {
        "zeno"
    }

    fn rasterize(
        &self,
        face: &dyn FontFace,
        glyph_id: GlyphId,
        pixel_size: u32,
    ) -> Result<GlyphBitmap> {
        use zeno::Mask;

        let font_ref = skrifa::FontRef::from_index(face.data(), face.face_index())
            .map_err(|_| RasterError::InvalidFont)?;

        let outlines = font_ref.outline_glyphs();
        let glyph = outlines
            .get(skrifa::GlyphId::new(glyph_id))
            .ok_or(RasterError::GlyphNotFound(glyph_id))?;

        let mut builder = ZenoPathBuilder::new();
        let size = skrifa::instance::Size::new(pixel_size as f32);
        let settings = skrifa::outline::DrawSettings::unhinted(
            size,
            skrifa::instance::LocationRef::default(),
        );
        glyph
            .draw(settings, &mut builder)
            .map_err(|_| RasterError::OutlineExtractionFailed)?;

        let (path_data, kurbo_path) = builder.finish();
        let bbox = kurbo_path.bounding_box();

        // Spaces have no contours, so the box never left infinity
        if !bbox.is_finite() || bbox.area() <= 0.0 {
            return Ok(GlyphBitmap::default());
        }

        // Snap outward to whole pixels
        let min_x = bbox.x0.floor() as i32;
        let min_y = bbox.y0.floor() as i32;
        let max_x = bbox.x1.ceil() as i32;
        let max_y = bbox.y1.ceil() as i32;
        let width = (max_x - min_x).max(1) as u32;
        let height = (max_y - min_y).max(1) as u32;

        if width > self.max_size || height > self.max_size {
            return Err(RasterError::InvalidDimensions { width, height }.into());
        }

        let mut mask = vec![0u8; (width * height) as usize];
        Mask::new(path_data.as_str())
            .size(width, height)
            .offset((-min_x, -min_y))
            .render_into(&mut mask, None);

        // Font coordinates are y-up, atlas rows are y-down
        let row = width as usize;
        for y in 0..(height as usize / 2) {
            let bottom = height as usize - 1 - y;
            let (upper, lower) = mask.split_at_mut(bottom * row);
            upper[y * row..(y + 1) * row].swap_with_slice(&mut lower[..row]);
        }

        log::trace!(
            "Rasterized glyph {} at {}px into {}x{}",
            glyph_id,
            pixel_size,
            width,
            height
        );

        Ok(GlyphBitmap {
            width,
            height,
            bearing_x: min_x,
            bearing_y: max_y,
            data: mask,
        })
    }
}

/// Pen that records an outline for zeno and for kurbo in one pass
struct ZenoPathBuilder {
    commands: Vec<String>,
    kurbo_path: kurbo::BezPath,
}

impl ZenoPathBuilder {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
            kurbo_path: kurbo::BezPath::new(),
        }
    }

    fn finish(self) -> (String, kurbo::BezPath) {
        (self.commands.join(" "), self.kurbo_path)
    }
}

impl skrifa::outline::OutlinePen for ZenoPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(format!("M {:.2},{:.2}", x, y));
        self.kurbo_path.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(format!("L {:.2},{:.2}", x, y));
        self.kurbo_path.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.commands
            .push(format!("Q {:.2},{:.2} {:.2},{:.2}", cx, cy, x, y));
        self.kurbo_path
            .quad_to((cx as f64, cy as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.commands.push(format!(
            "C {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
            cx0, cy0, cx1, cy1, x, y
        ));
        self.kurbo_path.curve_to(
            (cx0 as f64, cy0 as f64),
            (cx1 as f64, cy1 as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.commands.push("Z".to_string());
        self.kurbo_path.close_path();
    }
}
