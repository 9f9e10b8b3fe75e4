//! Renderer crate for ditherwall.
//!
//! A flowing noise field is rendered into an offscreen target, then an ordered
//! (Bayer) dither pass posterizes it onto the window surface:
//!
//! ```text
//!   CLI / ditherwall
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ DitherEffect::frame()
//!                                                         │
//!                          FrameBackend::draw ◀───────────┘
//!                          ├─ GpuState:        wave pass ─▶ target ─▶ dither pass ─▶ surface
//!                          └─ SoftwareBackend: field::shade ─▶ dither::apply ─▶ image buffer
//! ```
//!
//! `DitherEffect` owns camera, geometry and clock and is backend-agnostic;
//! `field` and `dither` hold CPU reference implementations of the two shader
//! programs in `compile`, which the software backend and still export use.

mod compile;
pub mod dither;
pub mod effect;
mod export;
pub mod field;
pub mod geometry;
mod gpu;
mod runtime;
pub mod software;
mod types;
mod window;

use anyhow::Result;

pub use effect::{DitherEffect, EffectError, FrameBackend, FrameInputs, FrameStatus};
pub use export::export_still;
pub use gpu::GpuState;
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, FrameScheduler, RenderPolicy,
    SystemTimeSource, TimeSample, TimeSource,
};
pub use software::SoftwareBackend;
pub use types::{
    AdapterProfile, ConfigError, EffectConfig, GpuPowerPreference, RenderMode, RendererConfig,
    VsyncMode,
};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and renders until it is closed or Escape is pressed.
    ///
    /// Invalid effect parameters are rejected before any window is created.
    pub fn run(&mut self) -> Result<()> {
        self.config.effect.validate()?;
        window::run(&self.config)
    }
}
