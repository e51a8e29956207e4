//! Test helpers and fixtures for esrgan integration tests.
//!
//! Sessions run on burn's `NdArray` backend through [`HostProvider`], a
//! device provider that counts context creation and destruction. Model files
//! are placeholder fixtures in a temp dir; the reference network is
//! [`PixelReplicate`], whose exact output makes every pixel checkable.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `PIXEL_EPSILON` (1e-5): exact networks
//! - `TTA_EPSILON` (1e-4): eight-way averaged output

pub mod tolerances;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use burn::prelude::*;
use esrgan::core::{DeviceCapabilities, DeviceProvider, Error, Result};
use esrgan::gpu::{DeviceContext, InferenceRunner, ModelLoader, PixelReplicate};
use esrgan::{DeviceRegistry, Frame, FrameMut, ModelFiles, ModelKind, Session, SessionConfig};
use tempfile::TempDir;

pub type TestBackend = NdArray<f32>;
pub type TestSession = Session<TestBackend, HostProvider>;

#[derive(Debug, Default)]
pub struct DeviceCounters {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
}

impl DeviceCounters {
    #[allow(dead_code)]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

pub struct HostContext {
    counters: Arc<DeviceCounters>,
}

impl DeviceContext<TestBackend> for HostContext {
    fn burn_device(&self) -> NdArrayDevice {
        NdArrayDevice::default()
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// CPU stand-in for a GPU provider.
pub struct HostProvider {
    pub devices: u32,
    pub compute_queues: u32,
    pub transfer_queues: u32,
    pub heap_budget_mb: u64,
    pub counters: Arc<DeviceCounters>,
}

impl HostProvider {
    pub fn new() -> Self {
        Self {
            devices: 1,
            compute_queues: 2,
            transfer_queues: 2,
            heap_budget_mb: 3000,
            counters: Arc::new(DeviceCounters::default()),
        }
    }

    #[allow(dead_code)]
    pub fn with_queues(mut self, compute: u32, transfer: u32) -> Self {
        self.compute_queues = compute;
        self.transfer_queues = transfer;
        self
    }

    #[allow(dead_code)]
    pub fn with_budget(mut self, heap_budget_mb: u64) -> Self {
        self.heap_budget_mb = heap_budget_mb;
        self
    }

    /// Registry over this provider plus a handle on its counters.
    pub fn registry(self) -> (DeviceRegistry<HostProvider>, Arc<DeviceCounters>) {
        let counters = Arc::clone(&self.counters);
        (DeviceRegistry::new(self), counters)
    }
}

impl DeviceProvider for HostProvider {
    type Context = HostContext;

    fn device_count(&self) -> u32 {
        self.devices
    }

    fn create_context(&self, _device_id: u32) -> Result<HostContext> {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(HostContext {
            counters: Arc::clone(&self.counters),
        })
    }

    fn capabilities(&self, _context: &HostContext) -> DeviceCapabilities {
        DeviceCapabilities {
            name: "host".into(),
            compute_queues: self.compute_queues,
            transfer_queues: self.transfer_queues,
            heap_budget_mb: self.heap_budget_mb,
        }
    }
}

/// Temp dir holding placeholder model files for `kind` at `scale`.
pub fn model_dir(kind: ModelKind, scale: u32) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let files = kind.files(dir.path(), scale);
    std::fs::write(&files.structure, b"7767517\n").expect("Failed to write structure file");
    std::fs::write(&files.weights, [0u8; 64]).expect("Failed to write weights file");
    dir
}

/// Scale-2 anime-video config with 32-pixel tiles reading from `dir`.
pub fn test_config(dir: &TempDir) -> SessionConfig {
    SessionConfig::default()
        .with_scale(2)
        .with_tile_size(32)
        .with_model_dir(dir.path())
}

pub fn open_session(
    registry: &DeviceRegistry<HostProvider>,
    config: &SessionConfig,
) -> Result<TestSession> {
    Session::open(registry, config, &esrgan::PixelReplicateLoader)
}

/// Owned planar RGB image with an explicit row stride.
#[derive(Debug, Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub planes: [Vec<f32>; 3],
}

impl Image {
    /// Every sample (padding included) set to `fill`.
    pub fn filled(width: u32, height: u32, stride: usize, fill: f32) -> Self {
        let len = stride * height as usize;
        Self {
            width,
            height,
            stride,
            planes: [vec![fill; len], vec![fill; len], vec![fill; len]],
        }
    }

    #[allow(dead_code)]
    pub fn uniform(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        let mut image = Self::filled(width, height, width as usize, 0.0);
        for (plane, value) in image.planes.iter_mut().zip(rgb) {
            plane.fill(value);
        }
        image
    }

    /// Distinct per-pixel, per-channel values in `[0, 1]`; padding gets `pad`.
    pub fn gradient(width: u32, height: u32, stride: usize, pad: f32) -> Self {
        let mut image = Self::filled(width, height, stride, pad);
        for (c, plane) in image.planes.iter_mut().enumerate() {
            for y in 0..height as usize {
                for x in 0..width as usize {
                    let v = ((x * 7 + y * 13 + c * 29) % 256) as f32 / 255.0;
                    plane[y * stride + x] = v;
                }
            }
        }
        image
    }

    pub fn at(&self, channel: usize, x: u32, y: u32) -> f32 {
        self.planes[channel][y as usize * self.stride + x as usize]
    }

    pub fn frame(&self) -> Frame<'_> {
        let [r, g, b] = &self.planes;
        Frame::new(self.width, self.height, self.stride, [r, g, b]).expect("Invalid test frame")
    }

    pub fn frame_mut(&mut self) -> FrameMut<'_> {
        let [r, g, b] = &mut self.planes;
        FrameMut::new(self.width, self.height, self.stride, [r, g, b])
            .expect("Invalid test frame")
    }
}

/// Upscale `image` through `session` into a fresh tightly-packed image.
pub fn upscale(session: &TestSession, image: &Image) -> Image {
    let s = session.scale();
    let mut out = Image::filled(image.width * s, image.height * s, (image.width * s) as usize, 0.0);
    session
        .process(&image.frame(), &mut out.frame_mut())
        .expect("Processing failed");
    out
}

/// Largest absolute difference between `output` and `input` replicated by `scale`.
pub fn replicate_error(input: &Image, output: &Image, scale: u32) -> f32 {
    let mut worst = 0.0f32;
    for c in 0..3 {
        for y in 0..output.height {
            for x in 0..output.width {
                let want = input.at(c, x / scale, y / scale);
                worst = worst.max((output.at(c, x, y) - want).abs());
            }
        }
    }
    worst
}

/// Pixel replication that records how many forward passes overlap.
#[allow(dead_code)]
pub struct CountingRunner {
    inner: PixelReplicate,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    hold: Duration,
}

impl InferenceRunner<TestBackend> for CountingRunner {
    fn forward(&self, input: Tensor<TestBackend, 4>) -> Tensor<TestBackend, 4> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        let output = self.inner.forward(input);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        output
    }
}

/// Loader handing out [`CountingRunner`]s that share one set of counters.
#[derive(Default)]
#[allow(dead_code)]
pub struct CountingLoader {
    pub in_flight: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl CountingLoader {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelLoader<TestBackend> for CountingLoader {
    fn load(
        &self,
        files: &ModelFiles,
        scale: u32,
        _device: &NdArrayDevice,
    ) -> Result<Box<dyn InferenceRunner<TestBackend>>> {
        files.check_readable()?;
        Ok(Box::new(CountingRunner {
            inner: PixelReplicate::new(scale),
            in_flight: Arc::clone(&self.in_flight),
            peak: Arc::clone(&self.peak),
            calls: Arc::clone(&self.calls),
            hold: Duration::from_millis(2),
        }))
    }
}

/// Loader that always fails, for rollback tests.
#[allow(dead_code)]
pub fn failing_loader(
    _files: &ModelFiles,
    _scale: u32,
    _device: &NdArrayDevice,
) -> Result<Box<dyn InferenceRunner<TestBackend>>> {
    Err(Error::ModelLoad("weights are corrupt".into()))
}
