//! Vertical metrics of laid out text

/// Vertical extent of a run of glyphs, in pixels
///
/// Starts from the font's nominal ascender and descender and grows as glyphs
/// reaching above or below them are seen. Internal leading only increases,
/// external leading only decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontMetrics {
    /// Distance from the top of the box to the baseline
    pub base_line: i32,
    /// Extra space needed above the ascender
    pub internal_leading: i32,
    pub ascender: i32,
    /// Negative when the font descends below the baseline
    pub descender: i32,
    /// Extra space needed below the descender, zero or negative
    pub external_leading: i32,
}

impl FontMetrics {
    /// Nominal metrics for text of `size` pixels with the baseline at `base_line`
    pub fn nominal(base_line: i32, size: i32) -> Self {
        Self {
            base_line,
            internal_leading: 0,
            ascender: base_line,
            descender: base_line - size,
            external_leading: 0,
        }
    }

    /// Full height including both leadings
    pub fn total(&self) -> i32 {
        self.internal_leading + self.ascender - self.descender - self.external_leading
    }

    /// Metrics grown to hold a glyph spanning `bottom..top` around the baseline
    ///
    /// Returns `None` when the glyph already fits.
    pub fn expanded(&self, top: i32, bottom: i32) -> Option<FontMetrics> {
        if top <= self.ascender && bottom >= self.descender {
            return None;
        }
        let internal_leading = self.internal_leading.max(top - self.ascender);
        let external_leading = self.external_leading.min(bottom - self.descender);
        Some(FontMetrics {
            base_line: internal_leading + self.ascender,
            internal_leading,
            ascender: self.ascender,
            descender: self.descender,
            external_leading,
        })
    }
}
