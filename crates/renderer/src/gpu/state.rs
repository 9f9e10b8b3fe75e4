use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::effect::{FrameBackend, FrameInputs};
use crate::types::{AdapterProfile, GpuPowerPreference, VsyncMode};

use super::context::GpuContext;
use super::pipeline::{DitherStage, WavePass};
use super::target::RenderTarget;
use super::uniforms::{DitherUniforms, WaveUniforms};

/// wgpu implementation of [`FrameBackend`]: field into an offscreen target,
/// then the dither pass onto the window surface.
pub struct GpuState {
    context: GpuContext,
    target: Option<RenderTarget>,
    wave: WavePass,
    dither: DitherStage,
    frame_count: u64,
    last_fps_update: Instant,
    frames_since_last_update: u32,
    frames_per_second: f32,
}

impl GpuState {
    pub(crate) fn new<T>(
        window: &T,
        initial_size: PhysicalSize<u32>,
        gpu_power: GpuPowerPreference,
        vsync_mode: VsyncMode,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(window, initial_size, gpu_power, vsync_mode)?;
        let target = RenderTarget::new(&context.device, context.size);
        let wave = WavePass::new(&context.device)?;
        let dither = DitherStage::new(&context.device, context.surface_format, &target.view)?;

        Ok(Self {
            context,
            target: Some(target),
            wave,
            dither,
            frame_count: 0,
            last_fps_update: Instant::now(),
            frames_since_last_update: 0,
            frames_per_second: 60.0,
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    /// Recovers from `SurfaceError::Lost` / `Outdated` at the current size.
    pub fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    fn record_frame(&mut self, time: f32) {
        self.frame_count = self.frame_count.saturating_add(1);
        self.frames_since_last_update += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
            debug!(
                fps = self.frames_per_second.round(),
                frame_count = self.frame_count,
                time,
                "render stats"
            );
        }
    }
}

impl FrameBackend for GpuState {
    type Error = wgpu::SurfaceError;

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
        if let Some(target) = self.target.as_mut() {
            if target.resize(&self.context.device, self.context.size) {
                self.dither.rebind(&self.context.device, &target.view);
            }
        }
    }

    fn draw(&mut self, frame: &FrameInputs) -> Result<(), Self::Error> {
        let Some(target) = self.target.as_ref() else {
            return Ok(());
        };

        let acquire_start = Instant::now();
        let surface_texture = self.context.surface.get_current_texture()?;
        let acquire_duration = acquire_start.elapsed();
        let frame_budget = Duration::from_secs_f32(1.0 / self.frames_per_second.max(1.0));
        if acquire_duration > frame_budget {
            warn!(
                "acquiring frame took {}ms, which is over the frame budget of {}ms (at {} FPS)",
                acquire_duration.as_millis(),
                frame_budget.as_millis(),
                self.frames_per_second.round(),
            );
        }

        // The surface may be clamped below the window size.
        let resolution = [self.context.size.width as f32, self.context.size.height as f32];
        let mut wave_uniforms = WaveUniforms::from_frame(frame);
        wave_uniforms.resolution = resolution;
        let mut dither_uniforms = DitherUniforms::from_frame(frame);
        dither_uniforms.resolution = resolution;
        self.wave.write(&self.context.queue, &wave_uniforms);
        self.dither.write(&self.context.queue, &dither_uniforms);

        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        self.wave.encode(&mut encoder, &target.view);
        self.dither.encode(&mut encoder, &surface_view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        self.record_frame(frame.time);
        Ok(())
    }

    fn release(mut self) {
        if let Some(target) = self.target.take() {
            target.destroy();
        }
        debug!(frames = self.frame_count, "released GPU resources");
    }
}
