use bytemuck::{Pod, Zeroable};

use crate::effect::FrameInputs;

/// std140 mirror of the `WaveParams` block in `compile.rs`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct WaveUniforms {
    pub transform: [[f32; 4]; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    pub wave_speed: f32,
    pub wave_frequency: f32,
    pub wave_amplitude: f32,
    pub padding0: [f32; 2],
    pub wave_color: [f32; 3],
    pub padding1: f32,
}

unsafe impl Zeroable for WaveUniforms {}
unsafe impl Pod for WaveUniforms {}

impl WaveUniforms {
    pub fn from_frame(frame: &FrameInputs) -> Self {
        Self {
            transform: frame.transform.to_cols_array_2d(),
            resolution: frame.resolution.to_array(),
            time: frame.time,
            wave_speed: frame.field.speed,
            wave_frequency: frame.field.frequency,
            wave_amplitude: frame.field.amplitude,
            padding0: [0.0; 2],
            wave_color: frame.field.color.to_array(),
            padding1: 0.0,
        }
    }
}

/// std140 mirror of the `DitherParams` block.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DitherUniforms {
    pub resolution: [f32; 2],
    pub color_num: f32,
    pub pixel_size: f32,
}

unsafe impl Zeroable for DitherUniforms {}
unsafe impl Pod for DitherUniforms {}

impl DitherUniforms {
    pub fn from_frame(frame: &FrameInputs) -> Self {
        Self {
            resolution: frame.dither.resolution().to_array(),
            color_num: frame.dither.color_num(),
            pixel_size: frame.dither.pixel_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use glam::{Mat4, Vec2, Vec3};

    use super::*;
    use crate::dither::DitherPass;
    use crate::field::NoiseField;

    fn frame() -> FrameInputs {
        let mut dither = DitherPass::new(4.0, 2.0);
        dither.set_size(640.0, 360.0);
        FrameInputs {
            transform: Mat4::from_scale(Vec3::new(2.0, 3.0, 1.0)),
            resolution: Vec2::new(640.0, 360.0),
            time: 7.5,
            field: NoiseField {
                speed: 0.05,
                frequency: 3.0,
                amplitude: 0.3,
                color: Vec3::new(0.51, 0.93, 0.99),
            },
            dither,
        }
    }

    #[test]
    fn wave_block_follows_std140() {
        assert_eq!(size_of::<WaveUniforms>(), 112);
        assert_eq!(offset_of!(WaveUniforms, resolution), 64);
        assert_eq!(offset_of!(WaveUniforms, time), 72);
        assert_eq!(offset_of!(WaveUniforms, wave_amplitude), 84);
        assert_eq!(offset_of!(WaveUniforms, wave_color), 96);
    }

    #[test]
    fn dither_block_is_sixteen_bytes() {
        assert_eq!(size_of::<DitherUniforms>(), 16);
        assert_eq!(offset_of!(DitherUniforms, pixel_size), 12);
    }

    #[test]
    fn uniforms_copy_frame_values() {
        let frame = frame();
        let wave = WaveUniforms::from_frame(&frame);
        assert_eq!(wave.transform[0][0], 2.0);
        assert_eq!(wave.transform[1][1], 3.0);
        assert_eq!(wave.resolution, [640.0, 360.0]);
        assert_eq!(wave.time, 7.5);
        assert_eq!(wave.wave_color, [0.51, 0.93, 0.99]);

        let dither = DitherUniforms::from_frame(&frame);
        assert_eq!(
            dither,
            DitherUniforms {
                resolution: [640.0, 360.0],
                color_num: 4.0,
                pixel_size: 2.0,
            }
        );
        assert_eq!(bytemuck::bytes_of(&dither).len(), 16);
    }
}
