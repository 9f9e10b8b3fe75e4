//! Frame orchestration shared by the GPU and software backends.
//!
//! [`DitherEffect`] owns everything that is independent of how pixels are
//! produced: camera, plane geometry, clock and the two effect stages. Each
//! frame it hands a [`FrameInputs`] snapshot to its [`FrameBackend`].

use glam::{Mat4, Vec2};
use tracing::{debug, info};
use winit::dpi::PhysicalSize;

use crate::dither::DitherPass;
use crate::field::NoiseField;
use crate::geometry::{aspect_ratio, PerspectiveCamera, SurfaceGeometry};
use crate::runtime::BoxedTimeSource;
use crate::types::{ConfigError, EffectConfig};

/// Per-frame values consumed by a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    /// Model-view-projection transform of the field plane.
    pub transform: Mat4,
    /// Surface size in device pixels.
    pub resolution: Vec2,
    /// Field time in seconds.
    pub time: f32,
    pub field: NoiseField,
    pub dither: DitherPass,
}

/// Something that can turn [`FrameInputs`] into a presented frame.
pub trait FrameBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resizes the presentation surface and the offscreen target.
    fn resize(&mut self, size: PhysicalSize<u32>);

    /// Renders the field into the target, then dithers it onto the surface.
    fn draw(&mut self, frame: &FrameInputs) -> Result<(), Self::Error>;

    /// Releases device resources. Called at most once.
    fn release(self)
    where
        Self: Sized;
}

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("invalid effect configuration: {0}")]
    Precondition(#[from] ConfigError),
    #[error("failed to initialise rendering backend")]
    DeviceInit(#[source] anyhow::Error),
}

/// Outcome of [`DitherEffect::frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The effect was torn down; nothing was drawn.
    Detached,
}

pub struct DitherEffect<B: FrameBackend> {
    config: EffectConfig,
    clock: BoxedTimeSource,
    camera: PerspectiveCamera,
    geometry: SurfaceGeometry,
    field: NoiseField,
    dither: DitherPass,
    time: f32,
    size: PhysicalSize<u32>,
    backend: Option<B>,
    observing_resize: bool,
    frames: u64,
}

impl<B: FrameBackend> DitherEffect<B> {
    /// Validates `config`, then builds the camera, geometry and backend for a
    /// surface of `size` device pixels.
    pub fn new<F>(
        config: EffectConfig,
        size: PhysicalSize<u32>,
        mut clock: BoxedTimeSource,
        create_backend: F,
    ) -> Result<Self, EffectError>
    where
        F: FnOnce(PhysicalSize<u32>) -> anyhow::Result<B>,
    {
        config.validate()?;

        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let camera = PerspectiveCamera::new(aspect_ratio(size.width, size.height));
        let geometry = SurfaceGeometry::covering(&camera);
        let mut dither = DitherPass::new(config.color_num, config.pixel_size);
        dither.set_size(size.width as f32, size.height as f32);

        let backend = create_backend(size).map_err(EffectError::DeviceInit)?;
        clock.reset();

        debug!(
            width = size.width,
            height = size.height,
            color_num = config.color_num,
            pixel_size = config.pixel_size,
            "dither effect initialised"
        );

        Ok(Self {
            config,
            clock,
            camera,
            geometry,
            field: NoiseField::from_config(&config),
            dither,
            time: 0.0,
            size,
            backend: Some(backend),
            observing_resize: true,
            frames: 0,
        })
    }

    /// Advances time and draws one frame.
    pub fn frame(&mut self) -> Result<FrameStatus, B::Error> {
        if self.backend.is_none() {
            return Ok(FrameStatus::Detached);
        }
        if !self.config.disable_animation {
            self.time = self.clock.sample().seconds;
        }
        let inputs = self.inputs();
        let Some(backend) = self.backend.as_mut() else {
            return Ok(FrameStatus::Detached);
        };
        backend.draw(&inputs)?;
        self.frames = self.frames.saturating_add(1);
        Ok(FrameStatus::Presented)
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if !self.observing_resize || size.width == 0 || size.height == 0 {
            return;
        }
        self.camera
            .set_aspect(aspect_ratio(size.width, size.height));
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(size);
        }
        self.size = size;
        self.dither.set_size(size.width as f32, size.height as f32);
        self.geometry.fit(&self.camera);
        debug!(width = size.width, height = size.height, "resized dither effect");
    }

    /// Stops frame and resize handling and releases the backend. Safe to call
    /// more than once.
    pub fn destroy(&mut self) {
        self.observing_resize = false;
        if let Some(backend) = self.backend.take() {
            backend.release();
            info!(frames = self.frames, "dither effect torn down");
        }
    }

    /// Snapshot handed to the backend on the next frame.
    pub fn inputs(&self) -> FrameInputs {
        FrameInputs {
            transform: self.geometry.transform(&self.camera),
            resolution: Vec2::new(self.size.width as f32, self.size.height as f32),
            time: self.time,
            field: self.field,
            dither: self.dither,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn geometry(&self) -> &SurfaceGeometry {
        &self.geometry
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_observing_resize(&self) -> bool {
        self.observing_resize
    }

    pub fn is_destroyed(&self) -> bool {
        self.backend.is_none()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }
}

impl<B: FrameBackend> Drop for DitherEffect<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    use super::*;
    use crate::runtime::{TimeSample, TimeSource};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Resize(u32, u32),
        Draw(FrameInputs),
        Release,
    }

    struct RecordingBackend {
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl FrameBackend for RecordingBackend {
        type Error = Infallible;

        fn resize(&mut self, size: PhysicalSize<u32>) {
            self.calls
                .borrow_mut()
                .push(Call::Resize(size.width, size.height));
        }

        fn draw(&mut self, frame: &FrameInputs) -> Result<(), Self::Error> {
            self.calls.borrow_mut().push(Call::Draw(*frame));
            Ok(())
        }

        fn release(self) {
            self.calls.borrow_mut().push(Call::Release);
        }
    }

    /// Advances one second per sample.
    struct SteppingClock {
        seconds: f32,
    }

    impl TimeSource for SteppingClock {
        fn reset(&mut self) {
            self.seconds = 0.0;
        }

        fn sample(&mut self) -> TimeSample {
            self.seconds += 1.0;
            TimeSample::new(self.seconds)
        }
    }

    fn clock() -> BoxedTimeSource {
        Box::new(SteppingClock { seconds: 0.0 })
    }

    fn effect(
        config: EffectConfig,
        width: u32,
        height: u32,
    ) -> (DitherEffect<RecordingBackend>, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let backend_calls = Rc::clone(&calls);
        let effect = DitherEffect::new(
            config,
            PhysicalSize::new(width, height),
            clock(),
            move |_| {
                Ok(RecordingBackend {
                    calls: backend_calls,
                })
            },
        )
        .expect("effect");
        (effect, calls)
    }

    fn draws(calls: &Rc<RefCell<Vec<Call>>>) -> Vec<FrameInputs> {
        calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Draw(inputs) => Some(*inputs),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn initial_state_matches_surface() {
        let (effect, _) = effect(EffectConfig::default(), 320, 180);
        let inputs = effect.inputs();
        assert_eq!(inputs.resolution, Vec2::new(320.0, 180.0));
        assert_eq!(inputs.dither.resolution(), Vec2::new(320.0, 180.0));
        let scale = effect.geometry().scale();
        assert!((scale.x / scale.y - 320.0 / 180.0).abs() < 1e-5);
        assert_eq!(effect.time(), 0.0);
    }

    #[test]
    fn frames_follow_the_clock() {
        let (mut effect, calls) = effect(EffectConfig::default(), 64, 64);
        for _ in 0..3 {
            assert_eq!(effect.frame(), Ok(FrameStatus::Presented));
        }
        let times: Vec<f32> = draws(&calls).iter().map(|inputs| inputs.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert_eq!(effect.frames(), 3);
    }

    #[test]
    fn disabled_animation_freezes_time() {
        let config = EffectConfig {
            disable_animation: true,
            ..EffectConfig::default()
        };
        let (mut effect, calls) = effect(config, 64, 64);
        for _ in 0..10 {
            effect.frame().expect("frame");
        }
        let frames = draws(&calls);
        assert_eq!(frames.len(), 10);
        assert!(frames.iter().all(|inputs| *inputs == frames[0]));
        assert_eq!(frames[0].time, 0.0);
    }

    #[test]
    fn resize_is_idempotent() {
        let (mut effect, calls) = effect(EffectConfig::default(), 64, 64);
        effect.resize(PhysicalSize::new(800, 600));
        let first = (effect.inputs(), *effect.geometry(), effect.size());
        effect.resize(PhysicalSize::new(800, 600));
        let second = (effect.inputs(), *effect.geometry(), effect.size());
        assert_eq!(first, second);
        assert_eq!(effect.inputs().dither.resolution(), Vec2::new(800.0, 600.0));
        assert_eq!(
            calls.borrow().as_slice(),
            &[Call::Resize(800, 600), Call::Resize(800, 600)]
        );
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let (mut effect, calls) = effect(EffectConfig::default(), 64, 48);
        effect.resize(PhysicalSize::new(0, 600));
        effect.resize(PhysicalSize::new(800, 0));
        assert_eq!(effect.size(), PhysicalSize::new(64, 48));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn teardown_is_idempotent_and_detaches() {
        let (mut effect, calls) = effect(EffectConfig::default(), 64, 64);
        effect.destroy();
        effect.destroy();
        assert!(effect.is_destroyed());
        assert!(!effect.is_observing_resize());

        effect.resize(PhysicalSize::new(128, 128));
        assert_eq!(effect.frame(), Ok(FrameStatus::Detached));
        assert_eq!(effect.size(), PhysicalSize::new(64, 64));
        drop(effect);
        assert_eq!(calls.borrow().as_slice(), &[Call::Release]);
    }

    #[test]
    fn drop_releases_backend() {
        let (effect, calls) = effect(EffectConfig::default(), 64, 64);
        drop(effect);
        assert_eq!(calls.borrow().as_slice(), &[Call::Release]);
    }

    #[test]
    fn invalid_config_is_rejected_before_backend_creation() {
        let config = EffectConfig {
            color_num: 1.0,
            ..EffectConfig::default()
        };
        let mut created = false;
        let result = DitherEffect::<RecordingBackend>::new(
            config,
            PhysicalSize::new(64, 64),
            clock(),
            |_| {
                created = true;
                Ok(RecordingBackend {
                    calls: Rc::default(),
                })
            },
        );
        assert!(matches!(
            result,
            Err(EffectError::Precondition(ConfigError::TooFewColors(_)))
        ));
        assert!(!created);
    }

    #[test]
    fn backend_failure_surfaces_as_device_init() {
        let result = DitherEffect::<RecordingBackend>::new(
            EffectConfig::default(),
            PhysicalSize::new(64, 64),
            clock(),
            |_| Err(anyhow::anyhow!("no adapter")),
        );
        match result {
            Err(EffectError::DeviceInit(err)) => assert_eq!(err.to_string(), "no adapter"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("backend failure was swallowed"),
        }
    }
}
