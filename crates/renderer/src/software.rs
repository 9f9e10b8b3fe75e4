//! CPU rendition of the two passes, used for headless export and tests.

use std::convert::Infallible;

use glam::{Vec2, Vec3};
use image::{Rgb, Rgb32FImage, RgbImage};
use winit::dpi::PhysicalSize;

use crate::effect::{FrameBackend, FrameInputs};

/// [`FrameBackend`] that renders into float image buffers.
///
/// The offscreen target stores the field clamped to `[0, 1]`, as the GPU's
/// unorm target does; the output holds the dithered frame with row 0 at the top.
#[derive(Debug, Clone)]
pub struct SoftwareBackend {
    target: Rgb32FImage,
    output: Rgb32FImage,
}

impl SoftwareBackend {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        let (width, height) = (size.width.max(1), size.height.max(1));
        Self {
            target: Rgb32FImage::new(width, height),
            output: Rgb32FImage::new(width, height),
        }
    }

    pub fn target(&self) -> &Rgb32FImage {
        &self.target
    }

    pub fn output(&self) -> &Rgb32FImage {
        &self.output
    }

    /// Output quantized to 8 bits per channel.
    pub fn to_rgb8(&self) -> RgbImage {
        let (width, height) = self.output.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            let Rgb([r, g, b]) = *self.output.get_pixel(x, y);
            Rgb([to_byte(r), to_byte(g), to_byte(b)])
        })
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl FrameBackend for SoftwareBackend {
    type Error = Infallible;

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if self.target.dimensions() == (size.width, size.height) {
            return;
        }
        *self = Self::new(size);
    }

    fn draw(&mut self, frame: &FrameInputs) -> Result<(), Self::Error> {
        let (width, height) = self.target.dimensions();
        let resolution = Vec2::new(width as f32, height as f32);
        for (x, y, pixel) in self.target.enumerate_pixels_mut() {
            // Fragment coordinates count rows from the bottom edge.
            let frag = Vec2::new(x as f32 + 0.5, height as f32 - (y as f32 + 0.5));
            let color = frame.field.shade(frag, resolution, frame.time);
            *pixel = Rgb(color.clamp(Vec3::ZERO, Vec3::ONE).to_array());
        }
        self.output = frame.dither.apply(&self.target);
        Ok(())
    }

    fn release(self) {}
}
