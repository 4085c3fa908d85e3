//! Standalone text textures that bypass the atlas
//!
//! Short strings drawn once, or too large for the atlas, can be rasterized
//! into their own power-of-two image. The image grows vertically when a
//! glyph taller than the nominal ascender pushes the baseline down.

use crate::metrics::FontMetrics;
use crate::traits::AtlasTexture;

/// Smallest power of two at or above `value`, at least 1
pub fn round_up_to_power_of_2(value: u32) -> u32 {
    value.max(1).checked_next_power_of_two().unwrap_or(1 << 31)
}

/// A rasterized string and its GPU copy
pub struct FontTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    metrics: FontMetrics,
    gpu: Option<Box<dyn AtlasTexture>>,
}

impl std::fmt::Debug for FontTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("metrics", &self.metrics)
            .field("uploaded", &self.gpu.is_some())
            .finish()
    }
}

impl FontTexture {
    /// Cleared image of the given size
    pub fn new(width: u32, height: u32, metrics: FontMetrics) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            metrics,
            gpu: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// The GPU texture, once uploaded
    pub fn gpu_texture(&self) -> Option<&dyn AtlasTexture> {
        self.gpu.as_deref()
    }

    pub(crate) fn set_gpu_texture(&mut self, texture: Box<dyn AtlasTexture>) {
        self.gpu = Some(texture);
    }

    /// Grow the metrics, shifting existing rows down by the added internal
    /// leading and reallocating when the power-of-two height changes
    pub fn expand(&mut self, metrics: FontMetrics) {
        let shift = (metrics.internal_leading - self.metrics.internal_leading).max(0) as usize;
        let new_height = round_up_to_power_of_2(metrics.total().max(0) as u32);
        let stride = self.width as usize;

        if new_height != self.height {
            let mut image = vec![0; stride * new_height as usize];
            let keep = self.pixels.len().min(image.len().saturating_sub(shift * stride));
            image[shift * stride..shift * stride + keep].copy_from_slice(&self.pixels[..keep]);
            self.pixels = image;
            self.height = new_height;
        } else if shift > 0 {
            let len = self.pixels.len();
            let moved = len.saturating_sub(shift * stride);
            self.pixels.copy_within(..moved, shift * stride);
            self.pixels[..(shift * stride).min(len)].fill(0);
        }
        self.metrics = metrics;
    }

    /// Copy a coverage bitmap with its top-left corner at (`x`, `y`)
    ///
    /// Pixels outside the image are dropped.
    pub fn blit(&mut self, x: i32, y: i32, width: u32, height: u32, data: &[u8]) {
        for row in 0..height as i32 {
            let ty = y + row;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            for col in 0..width as i32 {
                let tx = x + col;
                if tx < 0 || tx >= self.width as i32 {
                    continue;
                }
                let src = (row as usize) * width as usize + col as usize;
                let dst = ty as usize * self.width as usize + tx as usize;
                if let (Some(&value), Some(texel)) = (data.get(src), self.pixels.get_mut(dst)) {
                    *texel = value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_of_two_round_up() {
        assert_eq!(round_up_to_power_of_2(0), 1);
        assert_eq!(round_up_to_power_of_2(1), 1);
        assert_eq!(round_up_to_power_of_2(24), 32);
        assert_eq!(round_up_to_power_of_2(64), 64);
    }

    #[test]
    fn blit_clips_at_the_edges() {
        let mut texture = FontTexture::new(4, 4, FontMetrics::nominal(3, 4));
        texture.blit(-1, 2, 3, 3, &[9; 9]);
        assert_eq!(&texture.pixels()[8..12], &[9, 9, 0, 0]);
        assert_eq!(&texture.pixels()[12..16], &[9, 9, 0, 0]);
        assert_eq!(&texture.pixels()[0..8], &[0; 8]);
    }

    #[test]
    fn growing_internal_leading_shifts_rows_down() {
        let metrics = FontMetrics::nominal(12, 16);
        let mut texture = FontTexture::new(2, 16, metrics);
        texture.blit(0, 0, 2, 1, &[7, 7]);

        texture.expand(metrics.expanded(14, 0).unwrap());
        assert_eq!(texture.height(), 32);
        assert_eq!(&texture.pixels()[0..4], &[0, 0, 0, 0]);
        assert_eq!(&texture.pixels()[4..6], &[7, 7]);
    }

    #[test]
    fn growth_within_the_same_height_shifts_in_place() {
        let metrics = FontMetrics::nominal(10, 12);
        let mut texture = FontTexture::new(2, 16, metrics);
        texture.blit(0, 0, 2, 1, &[5, 5]);

        texture.expand(metrics.expanded(11, -2).unwrap());
        assert_eq!(texture.height(), 16);
        assert_eq!(&texture.pixels()[0..2], &[0, 0]);
        assert_eq!(&texture.pixels()[2..4], &[5, 5]);
    }
}
