//! CPU evaluation of the flowing noise field.
//!
//! These functions mirror `WAVE_FRAGMENT_GLSL` in `compile.rs` line for line so
//! the software backend and the GPU path render the same image. Keep the two in
//! sync when either changes.

use glam::{Vec2, Vec3, Vec4};

use crate::types::EffectConfig;

/// Number of turbulence octaves summed by [`fbm`].
pub const OCTAVES: usize = 4;

/// Scale that brings the classic gradient noise to roughly `[-1, 1]`.
const NOISE_SCALE: f32 = 2.3;

fn mod289(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: Vec4) -> Vec4 {
    mod289((x * 34.0 + Vec4::ONE) * x)
}

fn taylor_inv_sqrt(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - r * 0.853_734_7
}

fn fade(t: Vec2) -> Vec2 {
    t * t * t * (t * (t * 6.0 - Vec2::splat(15.0)) + Vec2::splat(10.0))
}

fn fract(x: Vec4) -> Vec4 {
    x - x.floor()
}

/// Classic 2D gradient noise with a quintic fade.
///
/// Output is continuous, zero on every integer lattice point, and stays within
/// about `[-1, 1]`.
pub fn gradient_noise(p: Vec2) -> f32 {
    let pp = Vec4::new(p.x, p.y, p.x, p.y);
    let pi = mod289(pp.floor() + Vec4::new(0.0, 0.0, 1.0, 1.0));
    let pf = fract(pp) - Vec4::new(0.0, 0.0, 1.0, 1.0);

    let ix = Vec4::new(pi.x, pi.z, pi.x, pi.z);
    let iy = Vec4::new(pi.y, pi.y, pi.w, pi.w);
    let fx = Vec4::new(pf.x, pf.z, pf.x, pf.z);
    let fy = Vec4::new(pf.y, pf.y, pf.w, pf.w);

    let i = permute(permute(ix) + iy);
    let mut gx = fract(i * (1.0 / 41.0)) * 2.0 - Vec4::ONE;
    let gy = gx.abs() - Vec4::splat(0.5);
    let tx = (gx + Vec4::splat(0.5)).floor();
    gx -= tx;

    let g00 = Vec2::new(gx.x, gy.x);
    let g10 = Vec2::new(gx.y, gy.y);
    let g01 = Vec2::new(gx.z, gy.z);
    let g11 = Vec2::new(gx.w, gy.w);

    let norm = taylor_inv_sqrt(Vec4::new(
        g00.dot(g00),
        g01.dot(g01),
        g10.dot(g10),
        g11.dot(g11),
    ));
    let g00 = g00 * norm.x;
    let g01 = g01 * norm.y;
    let g10 = g10 * norm.z;
    let g11 = g11 * norm.w;

    let n00 = g00.dot(Vec2::new(fx.x, fy.x));
    let n10 = g10.dot(Vec2::new(fx.y, fy.y));
    let n01 = g01.dot(Vec2::new(fx.z, fy.z));
    let n11 = g11.dot(Vec2::new(fx.w, fy.w));

    let fade_xy = fade(Vec2::new(pf.x, pf.y));
    let n_x = Vec2::new(n00, n01).lerp(Vec2::new(n10, n11), fade_xy.x);
    NOISE_SCALE * (n_x.x + (n_x.y - n_x.x) * fade_xy.y)
}

/// Turbulence sum: `|noise|` over [`OCTAVES`] octaves.
///
/// After every octave the sample point is multiplied by `frequency` and the
/// weight by `amplitude`, so `amplitude == 0` leaves only the first octave.
pub fn fbm(p: Vec2, frequency: f32, amplitude: f32) -> f32 {
    let mut p = p;
    let mut value = 0.0;
    let mut weight = 1.0;
    for _ in 0..OCTAVES {
        value += weight * gradient_noise(p).abs();
        p *= frequency;
        weight *= amplitude;
    }
    value
}

/// Maps a bottom-left-origin pixel coordinate to the aspect-corrected field
/// space centred on the surface.
pub fn field_coord(frag_coord: Vec2, resolution: Vec2) -> Vec2 {
    let mut uv = frag_coord / resolution - Vec2::splat(0.5);
    uv.x *= resolution.x / resolution.y;
    uv
}

/// The four wave parameters plus tint, as consumed by the field shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseField {
    pub speed: f32,
    pub frequency: f32,
    pub amplitude: f32,
    pub color: Vec3,
}

impl NoiseField {
    pub fn from_config(config: &EffectConfig) -> Self {
        Self {
            speed: config.wave_speed,
            frequency: config.wave_frequency,
            amplitude: config.wave_amplitude,
            color: Vec3::from_array(config.wave_color),
        }
    }

    /// Domain-warped turbulence: `fbm(p + fbm(p - time * speed))`.
    pub fn pattern(&self, p: Vec2, time: f32) -> f32 {
        let shifted = p - Vec2::splat(time * self.speed);
        let warp = fbm(shifted, self.frequency, self.amplitude);
        fbm(p + Vec2::splat(warp), self.frequency, self.amplitude)
    }

    /// Colour of one pixel. Not clamped: values past 1 over-saturate the tint.
    pub fn shade(&self, frag_coord: Vec2, resolution: Vec2, time: f32) -> Vec3 {
        let f = self.pattern(field_coord(frag_coord, resolution), time);
        Vec3::ZERO.lerp(self.color, f)
    }
}
