use serde::{Deserialize, Serialize};

use crate::runtime::RenderPolicy;

/// Rejected effect parameters.
///
/// Every variant is detected when an [`EffectConfig`] is validated, before any
/// device resource exists, so a bad value never reaches the shaders as NaN.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("color_num must be at least 2 (got {0})")]
    TooFewColors(f32),
    #[error("color_num must be a whole number of levels (got {0})")]
    FractionalColors(f32),
    #[error("pixel_size must be greater than zero (got {0})")]
    NonPositivePixelSize(f32),
    #[error("{field} must be a finite number (got {value})")]
    NonFinite { field: &'static str, value: f32 },
}

/// Parameters of the noise field and the dithering stage.
///
/// The configuration is fixed once an effect has been constructed; call
/// [`EffectConfig::validate`] (the effect does so on construction) to enforce
/// the invariants the quantizer relies on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectConfig {
    /// Temporal scroll rate of the domain warp.
    pub wave_speed: f32,
    /// Spatial frequency multiplier applied between noise octaves.
    pub wave_frequency: f32,
    /// Amplitude factor applied between noise octaves.
    pub wave_amplitude: f32,
    /// Normalized RGB tint mixed with black by the field.
    pub wave_color: [f32; 3],
    /// Number of quantization levels per channel.
    pub color_num: f32,
    /// Dithering block size in device pixels.
    pub pixel_size: f32,
    /// Freeze the field's time input.
    pub disable_animation: bool,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            wave_speed: 0.05,
            wave_frequency: 3.0,
            wave_amplitude: 0.3,
            wave_color: [0.5, 0.5, 0.5],
            color_num: 4.0,
            pixel_size: 2.0,
            disable_animation: false,
        }
    }
}

impl EffectConfig {
    /// Cyan preset used by the site background.
    pub fn site_preset() -> Self {
        Self {
            wave_speed: 0.01,
            wave_frequency: 4.0,
            wave_amplitude: 0.3,
            wave_color: [0.51, 0.93, 0.99],
            color_num: 4.0,
            pixel_size: 2.0,
            disable_animation: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("wave_speed", self.wave_speed),
            ("wave_frequency", self.wave_frequency),
            ("wave_amplitude", self.wave_amplitude),
            ("wave_color[0]", self.wave_color[0]),
            ("wave_color[1]", self.wave_color[1]),
            ("wave_color[2]", self.wave_color[2]),
            ("color_num", self.color_num),
            ("pixel_size", self.pixel_size),
        ];
        for (field, value) in scalars {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        if self.color_num < 2.0 {
            return Err(ConfigError::TooFewColors(self.color_num));
        }
        if self.color_num.fract() != 0.0 {
            return Err(ConfigError::FractionalColors(self.color_num));
        }
        if self.pixel_size <= 0.0 {
            return Err(ConfigError::NonPositivePixelSize(self.pixel_size));
        }
        Ok(())
    }
}

/// How the renderer should present frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Decorated desktop window at the requested size.
    #[default]
    Windowed,
    /// Borderless fullscreen on the current monitor.
    Fullscreen,
}

/// Adapter power preference forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Presentation pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VsyncMode {
    /// Present with Fifo (tear free).
    #[default]
    On,
    /// Prefer Immediate, then Mailbox, falling back to Fifo.
    Off,
}

/// Summary of the adapter wgpu picked, kept for logging and FPS policy.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
            || self.name.to_ascii_lowercase().contains("llvmpipe")
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Windowed or fullscreen presentation.
    pub mode: RenderMode,
    /// Window title.
    pub title: String,
    /// Effect parameters.
    pub effect: EffectConfig,
    /// Frame pacing and time source selection.
    pub policy: RenderPolicy,
    pub gpu_power: GpuPowerPreference,
    pub vsync: VsyncMode,
}

impl Default for RendererConfig {
    /// Provides a 1080p windowed configuration with the default effect.
    fn default() -> Self {
        Self {
            surface_size: (1920, 1080),
            mode: RenderMode::default(),
            title: "ditherwall".to_string(),
            effect: EffectConfig::default(),
            policy: RenderPolicy::default(),
            gpu_power: GpuPowerPreference::default(),
            vsync: VsyncMode::default(),
        }
    }
}
