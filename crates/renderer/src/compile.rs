use std::borrow::Cow;

use anyhow::{Context, Result};
use wgpu::naga::ShaderStage;

/// Compiles one of the embedded GLSL programs, turning validation failures
/// into errors instead of device-lost panics.
fn compile_glsl(
    device: &wgpu::Device,
    label: &'static str,
    source: &'static str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow::anyhow!("{err}")).with_context(|| format!("failed to compile {label}"));
    }
    Ok(module)
}

/// Vertex stage of the field pass: the transformed unit plane.
pub(crate) fn compile_wave_vertex(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(device, "wave vertex", WAVE_VERTEX_GLSL, ShaderStage::Vertex)
}

pub(crate) fn compile_wave_fragment(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(device, "wave fragment", WAVE_FRAGMENT_GLSL, ShaderStage::Fragment)
}

/// Vertex stage of the dither pass: a full-screen triangle.
pub(crate) fn compile_dither_vertex(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(device, "dither vertex", DITHER_VERTEX_GLSL, ShaderStage::Vertex)
}

pub(crate) fn compile_dither_fragment(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "dither fragment",
        DITHER_FRAGMENT_GLSL,
        ShaderStage::Fragment,
    )
}

/// Uniform block shared by both wave stages.
///
/// The layout must match [`WaveUniforms`](crate::gpu::uniforms::WaveUniforms)
/// (std140, 112 bytes).
macro_rules! wave_params_glsl {
    () => {
        r"layout(std140, set = 0, binding = 0) uniform WaveParams {
    mat4 u_transform;
    vec2 u_resolution;
    float u_time;
    float u_wave_speed;
    float u_wave_frequency;
    float u_wave_amplitude;
    vec2 _padding0;
    vec3 u_wave_color;
    float _padding1;
} params;
"
    };
}

/// Six vertices of the unit plane, scaled onto the frustum by `u_transform`.
pub(crate) const WAVE_VERTEX_GLSL: &str = concat!(
    "#version 450\n",
    wave_params_glsl!(),
    r"
const vec2 corners[6] = vec2[6](
    vec2(-0.5, -0.5),
    vec2(0.5, -0.5),
    vec2(0.5, 0.5),
    vec2(-0.5, -0.5),
    vec2(0.5, 0.5),
    vec2(-0.5, 0.5)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 corner = corners[vertex_index];
    gl_Position = params.u_transform * vec4(corner, 0.0, 1.0);
}
"
);

/// Domain-warped turbulence tinted by `u_wave_color`.
///
/// Mirrors `crate::field`; fragment coordinates are flipped to a bottom-left
/// origin before use.
pub(crate) const WAVE_FRAGMENT_GLSL: &str = concat!(
    "#version 450\n",
    wave_params_glsl!(),
    r"
layout(location = 0) out vec4 outColor;

vec4 mod289(vec4 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 permute(vec4 x) { return mod289(((x * 34.0) + vec4(1.0)) * x); }
vec4 taylorInvSqrt(vec4 r) { return vec4(1.79284291400159) - 0.85373472095314 * r; }
vec2 fade(vec2 t) { return t * t * t * (t * (t * 6.0 - vec2(15.0)) + vec2(10.0)); }

float cnoise(vec2 P) {
    vec4 Pi = floor(P.xyxy) + vec4(0.0, 0.0, 1.0, 1.0);
    vec4 Pf = fract(P.xyxy) - vec4(0.0, 0.0, 1.0, 1.0);
    Pi = mod289(Pi);
    vec4 ix = Pi.xzxz;
    vec4 iy = Pi.yyww;
    vec4 fx = Pf.xzxz;
    vec4 fy = Pf.yyww;
    vec4 i = permute(permute(ix) + iy);
    vec4 gx = fract(i * (1.0 / 41.0)) * 2.0 - vec4(1.0);
    vec4 gy = abs(gx) - vec4(0.5);
    vec4 tx = floor(gx + vec4(0.5));
    gx = gx - tx;
    vec2 g00 = vec2(gx.x, gy.x);
    vec2 g10 = vec2(gx.y, gy.y);
    vec2 g01 = vec2(gx.z, gy.z);
    vec2 g11 = vec2(gx.w, gy.w);
    vec4 norm = taylorInvSqrt(vec4(dot(g00, g00), dot(g01, g01), dot(g10, g10), dot(g11, g11)));
    g00 *= norm.x;
    g01 *= norm.y;
    g10 *= norm.z;
    g11 *= norm.w;
    float n00 = dot(g00, vec2(fx.x, fy.x));
    float n10 = dot(g10, vec2(fx.y, fy.y));
    float n01 = dot(g01, vec2(fx.z, fy.z));
    float n11 = dot(g11, vec2(fx.w, fy.w));
    vec2 fade_xy = fade(Pf.xy);
    vec2 n_x = mix(vec2(n00, n01), vec2(n10, n11), vec2(fade_xy.x));
    return 2.3 * mix(n_x.x, n_x.y, fade_xy.y);
}

const int OCTAVES = 4;

float fbm(vec2 p) {
    float value = 0.0;
    float amp = 1.0;
    for (int i = 0; i < OCTAVES; i++) {
        value += amp * abs(cnoise(p));
        p *= params.u_wave_frequency;
        amp *= params.u_wave_amplitude;
    }
    return value;
}

float pattern(vec2 p) {
    vec2 shifted = p - vec2(params.u_time * params.u_wave_speed);
    return fbm(p + vec2(fbm(shifted)));
}

void main() {
    vec2 resolution = params.u_resolution;
    vec2 fragCoord = vec2(gl_FragCoord.x, resolution.y - gl_FragCoord.y);
    vec2 uv = fragCoord / resolution - vec2(0.5);
    uv.x *= resolution.x / resolution.y;
    float f = pattern(uv);
    vec3 col = mix(vec3(0.0), params.u_wave_color, vec3(f));
    outColor = vec4(col, 1.0);
}
"
);

/// Minimal full-screen triangle; the dither pass only reads `gl_FragCoord`.
pub(crate) const DITHER_VERTEX_GLSL: &str = r"#version 450
const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    gl_Position = vec4(positions[vertex_index], 0.0, 1.0);
}
";

/// Ordered dither over the offscreen target. Mirrors `crate::dither`; cells
/// count from the bottom-left like the field.
pub(crate) const DITHER_FRAGMENT_GLSL: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform DitherParams {
    vec2 u_resolution;
    float u_color_num;
    float u_pixel_size;
} params;

layout(set = 1, binding = 0) uniform texture2D u_source_texture;
layout(set = 1, binding = 1) uniform sampler u_source_sampler;

layout(location = 0) out vec4 outColor;

const float bayer8x8[64] = float[64](
    0.0, 48.0, 12.0, 60.0, 3.0, 51.0, 15.0, 63.0,
    32.0, 16.0, 44.0, 28.0, 35.0, 19.0, 47.0, 31.0,
    8.0, 56.0, 4.0, 52.0, 11.0, 59.0, 7.0, 55.0,
    40.0, 24.0, 36.0, 20.0, 43.0, 27.0, 39.0, 23.0,
    2.0, 50.0, 14.0, 62.0, 1.0, 49.0, 13.0, 61.0,
    34.0, 18.0, 46.0, 30.0, 33.0, 17.0, 45.0, 29.0,
    10.0, 58.0, 6.0, 54.0, 9.0, 57.0, 5.0, 53.0,
    42.0, 26.0, 38.0, 22.0, 41.0, 25.0, 37.0, 21.0
);

vec3 dither(vec2 cell, vec3 color) {
    int x = int(mod(cell.x, 8.0));
    int y = int(mod(cell.y, 8.0));
    float threshold = bayer8x8[y * 8 + x] / 64.0 - 0.25;
    float levels = params.u_color_num - 1.0;
    float stepSize = 1.0 / levels;
    color += vec3(threshold * stepSize);
    color = clamp(color - vec3(0.2), vec3(0.0), vec3(1.0));
    return floor(color * levels + vec3(0.5)) / levels;
}

void main() {
    vec2 resolution = params.u_resolution;
    vec2 fragCoord = vec2(gl_FragCoord.x, resolution.y - gl_FragCoord.y);
    vec2 uv = fragCoord / resolution;
    vec2 cell = floor(uv * resolution / params.u_pixel_size);
    vec2 texel = min(floor(cell * params.u_pixel_size), resolution - vec2(1.0));
    vec2 sampleUv = vec2(texel.x + 0.5, resolution.y - texel.y - 0.5) / resolution;
    vec3 color = texture(sampler2D(u_source_texture, u_source_sampler), sampleUv).rgb;
    outColor = vec4(dither(cell, color), 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dither::BAYER_8X8;

    fn bayer_entries(source: &str) -> Vec<f32> {
        let start = source.find("float[64](").expect("bayer table") + "float[64](".len();
        let end = start + source[start..].find(')').expect("table end");
        source[start..end]
            .split(',')
            .map(|entry| entry.trim().parse::<f32>().expect("number"))
            .collect()
    }

    #[test]
    fn dither_table_matches_cpu_matrix() {
        let entries = bayer_entries(DITHER_FRAGMENT_GLSL);
        let scaled: Vec<f32> = BAYER_8X8.iter().map(|value| value * 64.0).collect();
        assert_eq!(entries, scaled);
    }

    #[test]
    fn wave_stages_share_the_uniform_block() {
        for source in [WAVE_VERTEX_GLSL, WAVE_FRAGMENT_GLSL] {
            assert_eq!(source.matches("uniform WaveParams").count(), 1);
            assert!(source.contains(wave_params_glsl!()));
        }
    }

    #[test]
    fn shaders_declare_glsl_450() {
        for source in [
            WAVE_VERTEX_GLSL,
            WAVE_FRAGMENT_GLSL,
            DITHER_VERTEX_GLSL,
            DITHER_FRAGMENT_GLSL,
        ] {
            assert!(source.starts_with("#version 450\n"));
        }
    }

    #[test]
    fn fragment_constants_match_cpu_reference() {
        assert!(WAVE_FRAGMENT_GLSL.contains(&format!(
            "const int OCTAVES = {};",
            crate::field::OCTAVES
        )));
        assert!(DITHER_FRAGMENT_GLSL.contains("- 0.25;"));
        assert!(DITHER_FRAGMENT_GLSL.contains("vec3(0.2)"));
    }
}
