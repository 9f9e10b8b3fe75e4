//! Ordered (Bayer) dithering with block pixelation.
//!
//! [`DitherPass`] is the CPU twin of `DITHER_FRAGMENT_GLSL`. The operation
//! order in [`DitherPass::quantize`] (threshold, bias, clamp, round) is part of
//! the look; reordering it changes which levels boundary values land on.

use glam::{Vec2, Vec3};
use image::{Rgb, Rgb32FImage};

/// Side length of the threshold matrix.
pub const BAYER_SIZE: usize = 8;

/// Amount subtracted from every threshold to centre it on a quantization step.
pub const THRESHOLD_OFFSET: f32 = 0.25;

/// Fixed darkening applied before clamping.
pub const DITHER_BIAS: f32 = 0.2;

/// 8×8 Bayer thresholds in `[0, 1)`, row-major, indexed `y * 8 + x`.
#[rustfmt::skip]
pub static BAYER_8X8: [f32; BAYER_SIZE * BAYER_SIZE] = [
    0.0 / 64.0, 48.0 / 64.0, 12.0 / 64.0, 60.0 / 64.0, 3.0 / 64.0, 51.0 / 64.0, 15.0 / 64.0, 63.0 / 64.0,
    32.0 / 64.0, 16.0 / 64.0, 44.0 / 64.0, 28.0 / 64.0, 35.0 / 64.0, 19.0 / 64.0, 47.0 / 64.0, 31.0 / 64.0,
    8.0 / 64.0, 56.0 / 64.0, 4.0 / 64.0, 52.0 / 64.0, 11.0 / 64.0, 59.0 / 64.0, 7.0 / 64.0, 55.0 / 64.0,
    40.0 / 64.0, 24.0 / 64.0, 36.0 / 64.0, 20.0 / 64.0, 43.0 / 64.0, 27.0 / 64.0, 39.0 / 64.0, 23.0 / 64.0,
    2.0 / 64.0, 50.0 / 64.0, 14.0 / 64.0, 62.0 / 64.0, 1.0 / 64.0, 49.0 / 64.0, 13.0 / 64.0, 61.0 / 64.0,
    34.0 / 64.0, 18.0 / 64.0, 46.0 / 64.0, 30.0 / 64.0, 33.0 / 64.0, 17.0 / 64.0, 45.0 / 64.0, 29.0 / 64.0,
    10.0 / 64.0, 58.0 / 64.0, 6.0 / 64.0, 54.0 / 64.0, 9.0 / 64.0, 57.0 / 64.0, 5.0 / 64.0, 53.0 / 64.0,
    42.0 / 64.0, 26.0 / 64.0, 38.0 / 64.0, 22.0 / 64.0, 41.0 / 64.0, 25.0 / 64.0, 37.0 / 64.0, 21.0 / 64.0,
];

/// Raw matrix entry for a block cell; coordinates wrap every 8 cells.
pub fn bayer_threshold(x: i64, y: i64) -> f32 {
    let size = BAYER_SIZE as i64;
    let column = x.rem_euclid(size) as usize;
    let row = y.rem_euclid(size) as usize;
    BAYER_8X8[row * BAYER_SIZE + column]
}

/// Bottom-left-origin uv of the centre of stored pixel `(x, y)`.
pub fn pixel_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (height as f32 - (y as f32 + 0.5)) / height as f32,
    )
}

/// Stateless post-process stage: configuration plus the target resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DitherPass {
    color_num: f32,
    pixel_size: f32,
    resolution: Vec2,
}

impl DitherPass {
    /// `color_num` must be at least 2; [`crate::EffectConfig::validate`]
    /// enforces this before a pass is built.
    pub fn new(color_num: f32, pixel_size: f32) -> Self {
        Self {
            color_num,
            pixel_size,
            resolution: Vec2::ONE,
        }
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.resolution = Vec2::new(width, height);
    }

    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }

    pub fn color_num(&self) -> f32 {
        self.color_num
    }

    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    /// Sampling coordinate snapped down to the enclosing `pixel_size` block.
    pub fn block_uv(&self, uv: Vec2) -> Vec2 {
        let normalized = Vec2::splat(self.pixel_size) / self.resolution;
        normalized * (uv / normalized).floor()
    }

    /// Source texel read for `uv`: the first pixel of its block, counted
    /// from the bottom-left.
    ///
    /// Equivalent to `block_uv(uv) * resolution`, computed without the round
    /// trip through normalized space so exact block edges do not drift.
    pub fn block_texel(&self, uv: Vec2) -> (u32, u32) {
        let texel = (self.block_cell(uv) * self.pixel_size).floor();
        let max = (self.resolution - Vec2::ONE).max(Vec2::ZERO);
        let texel = texel.clamp(Vec2::ZERO, max);
        (texel.x as u32, texel.y as u32)
    }

    fn block_cell(&self, uv: Vec2) -> Vec2 {
        (uv * self.resolution / self.pixel_size).floor()
    }

    /// Re-centred threshold for the block containing `uv`.
    pub fn threshold(&self, uv: Vec2) -> f32 {
        let cell = self.block_cell(uv);
        bayer_threshold(cell.x as i64, cell.y as i64) - THRESHOLD_OFFSET
    }

    /// Dithers and posterizes one colour sampled for `uv`.
    pub fn quantize(&self, uv: Vec2, color: Vec3) -> Vec3 {
        let levels = self.color_num - 1.0;
        let step = 1.0 / levels;
        let color = color + Vec3::splat(self.threshold(uv) * step);
        let color = (color - Vec3::splat(DITHER_BIAS)).clamp(Vec3::ZERO, Vec3::ONE);
        (color * levels + Vec3::splat(0.5)).floor() / levels
    }

    /// Runs the pass over a whole frame. `source` is stored with row 0 at the
    /// top and must match the pass resolution; `uv` and block cells count
    /// from the bottom-left.
    pub fn apply(&self, source: &Rgb32FImage) -> Rgb32FImage {
        let (width, height) = source.dimensions();
        Rgb32FImage::from_fn(width, height, |x, y| {
            let uv = pixel_uv(x, y, width, height);
            let (sx, sy) = self.block_texel(uv);
            let row = (height - 1).saturating_sub(sy);
            let Rgb(sample) = *source.get_pixel(sx.min(width - 1), row);
            Rgb(self.quantize(uv, Vec3::from_array(sample)).to_array())
        })
    }
}
