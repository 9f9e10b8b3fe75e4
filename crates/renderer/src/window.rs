use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::effect::{DitherEffect, FrameStatus};
use crate::gpu::GpuState;
use crate::runtime::{time_source_for_policy, FrameScheduler, RenderPolicy};
use crate::types::{AdapterProfile, RenderMode, RendererConfig};

const SOFTWARE_FPS_CAP: f32 = 15.0;

/// Window plus the effect presenting into it.
///
/// Field order matters: the effect owns a surface created from the window's
/// raw handles and must be dropped before the window.
pub(crate) struct WindowState {
    effect: DitherEffect<GpuState>,
    window: Arc<Window>,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let clock = time_source_for_policy(&config.policy);
        let effect = DitherEffect::new(config.effect, size, clock, |size| {
            GpuState::new(window.as_ref(), size, config.gpu_power, config.vsync)
        })
        .context("failed to initialise window renderer")?;
        Ok(Self { effect, window })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.effect.backend().map(GpuState::adapter_profile)
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.effect.resize(new_size);
    }

    pub(crate) fn teardown(&mut self) {
        self.effect.destroy();
    }
}

/// Caps uncapped animation on software rasterizers, which cannot keep up
/// with the display rate.
fn effective_policy(policy: &RenderPolicy, profile: Option<&AdapterProfile>) -> RenderPolicy {
    match (policy, profile) {
        (RenderPolicy::Animate { target_fps: None }, Some(profile)) if profile.is_software() => {
            warn!(
                adapter = %profile.name,
                backend = ?profile.backend,
                cap = SOFTWARE_FPS_CAP,
                "software rasterizer detected; capping animation (override with --fps)"
            );
            RenderPolicy::Animate {
                target_fps: Some(SOFTWARE_FPS_CAP),
            }
        }
        _ => policy.clone(),
    }
}

fn is_escape(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed
        && matches!(event.logical_key, Key::Named(NamedKey::Escape))
}

/// Opens the window and drives the `winit` event loop until it is closed.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let mut builder = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size);
    if config.mode == RenderMode::Fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = builder
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, config)?;
    let mut scheduler = FrameScheduler::new(effective_policy(
        &config.policy,
        state.adapter_profile(),
    ));
    info!(
        width = state.effect.size().width,
        height = state.effect.size().height,
        policy = ?scheduler.policy(),
        "window renderer ready"
    );
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        state.teardown();
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } if is_escape(&event) => {
                        state.teardown();
                        elwt.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                        scheduler.invalidate();
                        state.window().request_redraw();
                    }
                    WindowEvent::RedrawRequested => match state.effect.frame() {
                        Ok(FrameStatus::Presented) => scheduler.mark_rendered(Instant::now()),
                        Ok(FrameStatus::Detached) => elwt.exit(),
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            if let Some(gpu) = state.effect.backend_mut() {
                                gpu.reconfigure();
                            }
                            state.window().request_redraw();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; exiting");
                            state.teardown();
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            warn!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            warn!(error = ?other, "surface error; retrying next frame");
                        }
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                if state.effect.is_destroyed() {
                    elwt.exit();
                } else if scheduler.ready_for_frame(now) {
                    tracing::trace!("scheduler: issuing redraw now");
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = scheduler.next_deadline() {
                    let ms = deadline.saturating_duration_since(now).as_millis();
                    tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else {
                    tracing::trace!("scheduler: idle (no redraw requested)");
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            Event::LoopExiting => state.teardown(),
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(device_type: wgpu::DeviceType, name: &str) -> AdapterProfile {
        AdapterProfile {
            name: name.to_string(),
            backend: wgpu::Backend::Vulkan,
            device_type,
        }
    }

    #[test]
    fn software_adapters_cap_uncapped_animation() {
        let software = profile(wgpu::DeviceType::Cpu, "llvmpipe (LLVM 17.0.6, 256 bits)");
        let policy = effective_policy(&RenderPolicy::default(), Some(&software));
        assert_eq!(
            policy,
            RenderPolicy::Animate {
                target_fps: Some(SOFTWARE_FPS_CAP)
            }
        );
    }

    #[test]
    fn explicit_policies_are_kept() {
        let software = profile(wgpu::DeviceType::Cpu, "llvmpipe");
        let capped = RenderPolicy::Animate {
            target_fps: Some(30.0),
        };
        assert_eq!(effective_policy(&capped, Some(&software)), capped);
        let still = RenderPolicy::Still { time: Some(1.0) };
        assert_eq!(effective_policy(&still, Some(&software)), still);

        let discrete = profile(wgpu::DeviceType::DiscreteGpu, "Radeon");
        assert_eq!(
            effective_policy(&RenderPolicy::default(), Some(&discrete)),
            RenderPolicy::default()
        );
    }
}
