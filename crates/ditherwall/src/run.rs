use anyhow::{Context, Result};
use renderer::{export_still, RenderPolicy, Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{FileConfig, Settings};

const WINDOW_TITLE: &str = "ditherwall";

pub fn run(cli: Cli) -> Result<()> {
    let file = FileConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(&file, &cli);
    tracing::debug!(?settings, "resolved ditherwall settings");

    if cli.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    settings
        .effect
        .validate()
        .context("invalid effect configuration")?;

    if let Some(path) = cli.export.as_deref() {
        let written = export_still(
            settings.effect,
            settings.size,
            cli.time.unwrap_or(0.0),
            path,
        )?;
        println!("{}", written.display());
        return Ok(());
    }

    let policy = if cli.still {
        RenderPolicy::Still { time: cli.time }
    } else {
        RenderPolicy::Animate {
            target_fps: settings.fps,
        }
    };
    if cli.time.is_some() && !cli.still {
        tracing::warn!("--time only applies to --still and --export; ignoring");
    }

    tracing::info!(
        preset = ?settings.preset,
        width = settings.size.0,
        height = settings.size.1,
        mode = ?settings.mode,
        ?policy,
        "starting ditherwall"
    );
    let config = RendererConfig {
        surface_size: settings.size,
        mode: settings.mode,
        title: WINDOW_TITLE.to_string(),
        effect: settings.effect,
        policy,
        gpu_power: settings.gpu_power,
        vsync: settings.vsync,
    };
    Renderer::new(config).run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
