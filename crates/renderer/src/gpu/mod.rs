//! wgpu backend for the dither effect.
//!
//! - `context` owns instance/device/surface wiring and reconfigures the
//!   swapchain on resize or after the surface is lost.
//! - `target` is the offscreen colour buffer the field is rendered into.
//! - `pipeline` compiles the embedded GLSL into the wave and dither passes.
//! - `uniforms` mirrors the std140 blocks declared in `compile.rs`.
//! - `state` glues everything together behind `FrameBackend`.

mod context;
mod pipeline;
mod state;
mod target;
pub(crate) mod uniforms;

pub use state::GpuState;
