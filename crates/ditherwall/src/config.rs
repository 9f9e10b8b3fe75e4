use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use renderer::{EffectConfig, GpuPowerPreference, RenderMode, VsyncMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;
use crate::paths;

const DEFAULT_SIZE: (u32, u32) = (1920, 1080);

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialise effective config")]
    Serialize(#[from] toml::ser::Error),
}

/// Bundled parameter sets the `[effect]` table and CLI flags layer onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Default,
    Site,
}

impl Preset {
    pub fn effect(self) -> EffectConfig {
        match self {
            Preset::Default => EffectConfig::default(),
            Preset::Site => EffectConfig::site_preset(),
        }
    }
}

/// Sparse effect parameters; only the fields that are set replace the
/// preset's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_frequency: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_amplitude: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_color: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_num: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_animation: Option<bool>,
}

impl EffectOverrides {
    pub fn apply(&self, effect: &mut EffectConfig) {
        if let Some(value) = self.wave_speed {
            effect.wave_speed = value;
        }
        if let Some(value) = self.wave_frequency {
            effect.wave_frequency = value;
        }
        if let Some(value) = self.wave_amplitude {
            effect.wave_amplitude = value;
        }
        if let Some(value) = self.wave_color {
            effect.wave_color = value;
        }
        if let Some(value) = self.color_num {
            effect.color_num = value;
        }
        if let Some(value) = self.pixel_size {
            effect.pixel_size = value;
        }
        if let Some(value) = self.disable_animation {
            effect.disable_animation = value;
        }
    }
}

impl From<&EffectConfig> for EffectOverrides {
    fn from(effect: &EffectConfig) -> Self {
        Self {
            wave_speed: Some(effect.wave_speed),
            wave_frequency: Some(effect.wave_frequency),
            wave_amplitude: Some(effect.wave_amplitude),
            wave_color: Some(effect.wave_color),
            color_num: Some(effect.color_num),
            pixel_size: Some(effect.pixel_size),
            disable_animation: Some(effect.disable_animation),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_power: Option<GpuPowerPreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vsync: Option<VsyncMode>,
}

/// On-disk layout of `config.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    pub effect: EffectOverrides,
    pub window: WindowSection,
}

impl FileConfig {
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(contents).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigFileError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    /// Reads `explicit` (which must exist) or the default config file when
    /// one is present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading config file");
            return Ok(Self::read(path)?);
        }
        let path = match paths::default_config_path() {
            Ok(path) => path,
            Err(err) => {
                debug!(error = %err, "no default config location; using built-in defaults");
                return Ok(Self::default());
            }
        };
        if !path.is_file() {
            debug!(path = %path.display(), "no config file; using built-in defaults");
            return Ok(Self::default());
        }
        debug!(path = %path.display(), "loading default config file");
        Ok(Self::read(&path)?)
    }
}

/// Effective settings after layering defaults, preset, file and CLI flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub preset: Preset,
    pub effect: EffectConfig,
    pub size: (u32, u32),
    pub mode: RenderMode,
    pub fps: Option<f32>,
    pub gpu_power: GpuPowerPreference,
    pub vsync: VsyncMode,
}

impl Settings {
    pub fn resolve(file: &FileConfig, cli: &Cli) -> Self {
        let preset = cli.preset.or(file.preset).unwrap_or_default();
        let mut effect = preset.effect();
        file.effect.apply(&mut effect);
        cli.effect_overrides().apply(&mut effect);

        let window = &file.window;
        let size = cli
            .size
            .or(window.size.map(|[width, height]| (width, height)))
            .unwrap_or(DEFAULT_SIZE);
        let fullscreen = cli.fullscreen || window.fullscreen.unwrap_or(false);
        let fps = cli.fps.or(window.fps).filter(|fps| *fps > 0.0);

        Self {
            preset,
            effect,
            size,
            mode: if fullscreen {
                RenderMode::Fullscreen
            } else {
                RenderMode::Windowed
            },
            fps,
            gpu_power: cli.gpu_power.or(window.gpu_power).unwrap_or_default(),
            vsync: cli.vsync.or(window.vsync).unwrap_or_default(),
        }
    }

    /// Renders the settings in `config.toml` form.
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        let file = FileConfig {
            preset: Some(self.preset),
            effect: EffectOverrides::from(&self.effect),
            window: WindowSection {
                size: Some([self.size.0, self.size.1]),
                fullscreen: Some(self.mode == RenderMode::Fullscreen),
                fps: self.fps,
                gpu_power: Some(self.gpu_power),
                vsync: Some(self.vsync),
            },
        };
        Ok(toml::to_string_pretty(&file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ditherwall"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let settings = Settings::resolve(&FileConfig::default(), &cli(&[]));
        assert_eq!(settings.preset, Preset::Default);
        assert_eq!(settings.effect, EffectConfig::default());
        assert_eq!(settings.size, DEFAULT_SIZE);
        assert_eq!(settings.mode, RenderMode::Windowed);
        assert_eq!(settings.fps, None);
    }

    #[test]
    fn file_values_layer_over_preset() {
        let file = FileConfig::parse(
            Path::new("config.toml"),
            r#"
preset = "site"

[effect]
color_num = 8
wave_amplitude = 0.0

[window]
size = [800, 600]
fullscreen = true
fps = 30
vsync = "off"
"#,
        )
        .unwrap();
        let settings = Settings::resolve(&file, &cli(&[]));

        let site = EffectConfig::site_preset();
        assert_eq!(settings.preset, Preset::Site);
        assert_eq!(settings.effect.color_num, 8.0);
        assert_eq!(settings.effect.wave_amplitude, 0.0);
        assert_eq!(settings.effect.wave_color, site.wave_color);
        assert_eq!(settings.effect.wave_frequency, site.wave_frequency);
        assert_eq!(settings.size, (800, 600));
        assert_eq!(settings.mode, RenderMode::Fullscreen);
        assert_eq!(settings.fps, Some(30.0));
        assert_eq!(settings.vsync, VsyncMode::Off);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let file = FileConfig::parse(
            Path::new("config.toml"),
            "preset = \"site\"\n[effect]\npixel_size = 4\n[window]\nfps = 30\n",
        )
        .unwrap();
        let settings = Settings::resolve(
            &file,
            &cli(&[
                "--preset",
                "default",
                "--pixel-size",
                "6",
                "--fps",
                "0",
                "--size",
                "320x200",
            ]),
        );
        assert_eq!(settings.preset, Preset::Default);
        assert_eq!(settings.effect.wave_color, EffectConfig::default().wave_color);
        assert_eq!(settings.effect.pixel_size, 6.0);
        assert_eq!(settings.fps, None);
        assert_eq!(settings.size, (320, 200));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse(Path::new("bad.toml"), "[effect]\ncolour_num = 4\n")
            .unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn explicit_path_must_exist() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("missing.toml");
        let err = FileConfig::load(Some(&missing)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigFileError>(),
            Some(ConfigFileError::Read { .. })
        ));
    }

    #[test]
    fn default_file_is_read_when_present() {
        let _lock = paths::tests::env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _guard = paths::tests::EnvGuard::set(paths::ENV_CONFIG_DIR, root.path());

        assert_eq!(FileConfig::load(None).unwrap(), FileConfig::default());

        fs::write(root.path().join("config.toml"), "[effect]\ncolor_num = 16\n").unwrap();
        let file = FileConfig::load(None).unwrap();
        assert_eq!(file.effect.color_num, Some(16.0));
    }

    #[test]
    fn printed_config_round_trips() {
        let settings = Settings::resolve(
            &FileConfig::default(),
            &cli(&["--preset", "site", "--fps", "24", "--fullscreen"]),
        );
        let text = settings.to_toml().unwrap();
        assert!(text.contains("preset = \"site\""));
        assert!(text.contains("color_num"));

        let reparsed = FileConfig::parse(Path::new("printed.toml"), &text).unwrap();
        assert_eq!(Settings::resolve(&reparsed, &cli(&[])), settings);
    }
}
