use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use winit::dpi::PhysicalSize;

use crate::effect::DitherEffect;
use crate::runtime::FixedTimeSource;
use crate::software::SoftwareBackend;
use crate::types::EffectConfig;

/// Renders one frame at `time` on the CPU and writes it to `path` as PNG.
pub fn export_still(
    config: EffectConfig,
    size: (u32, u32),
    time: f32,
    path: &Path,
) -> Result<PathBuf> {
    let (width, height) = size;
    if width == 0 || height == 0 {
        anyhow::bail!("export size must be non-zero (got {width}x{height})");
    }

    let mut effect = DitherEffect::new(
        config,
        PhysicalSize::new(width, height),
        Box::new(FixedTimeSource::new(time)),
        |size| Ok(SoftwareBackend::new(size)),
    )
    .context("failed to set up still export")?;

    let Ok(_) = effect.frame();
    let image = effect
        .backend()
        .map(SoftwareBackend::to_rgb8)
        .context("export backend was released before the frame was read")?;
    effect.destroy();

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), width, height, time, "exported still frame");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_png_at_requested_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("still.png");
        let written = export_still(EffectConfig::default(), (24, 16), 3.0, &path).unwrap();
        assert_eq!(written, path);
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (24, 16));
    }

    #[test]
    fn rejects_invalid_config_and_zero_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never-written.png");
        let config = EffectConfig {
            pixel_size: 0.0,
            ..EffectConfig::default()
        };
        assert!(export_still(config, (8, 8), 0.0, &path).is_err());
        assert!(export_still(EffectConfig::default(), (0, 8), 0.0, &path).is_err());
        assert!(!path.exists());
    }
}
