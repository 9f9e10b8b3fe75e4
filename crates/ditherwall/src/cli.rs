use std::path::PathBuf;

use clap::Parser;
use renderer::{GpuPowerPreference, VsyncMode};

use crate::config::{EffectOverrides, Preset};

#[derive(Parser, Debug)]
#[command(
    name = "ditherwall",
    author,
    version,
    about = "Animated noise field with an ordered dithering pass"
)]
pub struct Cli {
    /// TOML configuration file (defaults to `<config dir>/ditherwall/config.toml`).
    #[arg(long, value_name = "FILE", env = "DITHERWALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Start from a bundled parameter set: `default` or `site`.
    #[arg(long, value_name = "NAME", value_parser = parse_preset)]
    pub preset: Option<Preset>,

    /// Temporal scroll rate of the noise warp.
    #[arg(long, value_name = "SPEED", allow_negative_numbers = true)]
    pub wave_speed: Option<f32>,

    /// Frequency multiplier between noise octaves.
    #[arg(long, value_name = "FREQ")]
    pub wave_frequency: Option<f32>,

    /// Amplitude factor between noise octaves.
    #[arg(long, value_name = "AMP")]
    pub wave_amplitude: Option<f32>,

    /// Field tint as `R,G,B` in 0..1 or `#rrggbb`.
    #[arg(long, value_name = "COLOR", value_parser = parse_color)]
    pub wave_color: Option<[f32; 3]>,

    /// Quantization levels per channel (at least 2).
    #[arg(long, value_name = "N")]
    pub color_num: Option<f32>,

    /// Dither block size in device pixels.
    #[arg(long, value_name = "PIXELS")]
    pub pixel_size: Option<f32>,

    /// Freeze the field at its initial time.
    #[arg(long)]
    pub disable_animation: bool,

    /// Window (or export) size, e.g. `1280x720`.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Open a borderless fullscreen window.
    #[arg(long)]
    pub fullscreen: bool,

    /// Optional FPS cap (0 = uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Render a single still frame and only redraw on resize.
    #[arg(long)]
    pub still: bool,

    /// Timestamp in seconds for still frames and exports.
    #[arg(long, value_name = "SECONDS")]
    pub time: Option<f32>,

    /// Render one frame headlessly to this PNG path, then exit.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// GPU adapter preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_gpu_power)]
    pub gpu_power: Option<GpuPowerPreference>,

    /// Presentation pacing: `on` (Fifo) or `off` (Immediate/Mailbox).
    #[arg(long, value_name = "MODE", value_parser = parse_vsync)]
    pub vsync: Option<VsyncMode>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    pub fn effect_overrides(&self) -> EffectOverrides {
        EffectOverrides {
            wave_speed: self.wave_speed,
            wave_frequency: self.wave_frequency,
            wave_amplitude: self.wave_amplitude,
            wave_color: self.wave_color,
            color_num: self.color_num,
            pixel_size: self.pixel_size,
            disable_animation: self.disable_animation.then_some(true),
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{trimmed}' must be non-zero"));
    }
    Ok((width, height))
}

pub fn parse_color(value: &str) -> Result<[f32; 3], String> {
    let trimmed = value.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid hex colour '{trimmed}'; expected #rrggbb"));
        }
        let channel = |index: usize| -> Result<f32, String> {
            u8::from_str_radix(&hex[index..index + 2], 16)
                .map(|byte| byte as f32 / 255.0)
                .map_err(|err| err.to_string())
        };
        return Ok([channel(0)?, channel(2)?, channel(4)?]);
    }

    let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("invalid colour '{trimmed}'; expected R,G,B or #rrggbb"));
    };
    let parse = |part: &str| -> Result<f32, String> {
        part.parse::<f32>()
            .map_err(|_| format!("invalid colour component '{part}'"))
    };
    Ok([parse(*r)?, parse(*g)?, parse(*b)?])
}

pub fn parse_preset(value: &str) -> Result<Preset, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "default" => Ok(Preset::Default),
        "site" => Ok(Preset::Site),
        other => Err(format!("unknown preset '{other}'; expected default or site")),
    }
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" => Ok(GpuPowerPreference::High),
        other => Err(format!("unknown GPU power preference '{other}'; expected low or high")),
    }
}

pub fn parse_vsync(value: &str) -> Result<VsyncMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "fifo" => Ok(VsyncMode::On),
        "off" | "false" | "immediate" => Ok(VsyncMode::Off),
        other => Err(format!("unknown vsync mode '{other}'; expected on or off")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size(" 64X48 "), Ok((64, 48)));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("wide x tall").is_err());
    }

    #[test]
    fn parses_component_and_hex_colours() {
        assert_eq!(parse_color("0.5, 0.25,1"), Ok([0.5, 0.25, 1.0]));
        assert_eq!(parse_color("#ff0000"), Ok([1.0, 0.0, 0.0]));
        let site = parse_color("#82edfc").unwrap();
        assert!((site[0] - 130.0 / 255.0).abs() < 1e-6);
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("0.1,0.2").is_err());
        assert!(parse_color("a,b,c").is_err());
    }

    #[test]
    fn parses_named_options() {
        assert_eq!(parse_preset("Site"), Ok(Preset::Site));
        assert!(parse_preset("neon").is_err());
        assert_eq!(parse_gpu_power("high"), Ok(GpuPowerPreference::High));
        assert_eq!(parse_vsync("off"), Ok(VsyncMode::Off));
        assert!(parse_vsync("maybe").is_err());
    }

    #[test]
    fn cli_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "ditherwall",
            "--color-num",
            "8",
            "--wave-color",
            "1,0,0",
            "--disable-animation",
        ])
        .unwrap();
        let overrides = cli.effect_overrides();
        assert_eq!(overrides.color_num, Some(8.0));
        assert_eq!(overrides.wave_color, Some([1.0, 0.0, 0.0]));
        assert_eq!(overrides.disable_animation, Some(true));
        assert_eq!(overrides.pixel_size, None);
    }
}
