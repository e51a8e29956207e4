//! Super-resolution sessions.
//!
//! A session owns one loaded network and a lease on the device it runs on.
//! [`Session::open`] validates the configuration, joins the device's registry
//! entry, fixes the tile sizes from the device's memory budget and loads the
//! weights; any failure along the way drops the lease again. Once open, any
//! number of threads may call [`Session::process`] at the same time; the
//! device gate decides how many of them actually submit work.
//!
//! [`Session::close`] (or dropping the session) waits for calls in flight,
//! then drops the network before the lease so the model's device memory is
//! gone before the context can be torn down.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use burn::tensor::backend::{Backend, ExecutionError};
use esrgan_core::{
    Band, DeviceLease, DeviceProvider, DeviceRegistry, Error, Frame, FrameMut, ResolvedConfig,
    Result, SessionConfig, TileScheduler,
};
use parking_lot::RwLock;

use crate::device_pool::DeviceContext;
use crate::postprocess::Postprocessor;
use crate::preprocess::Preprocessor;
use crate::runner::{InferenceRunner, ModelLoader};

/// Observable lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Open and idle.
    Ready,
    /// At least one `process` call is running.
    Processing,
    Closed,
}

/// # Field drop order
/// `runner` is declared before `lease`: the network's device buffers are
/// released before the lease can destroy the context they live in.
struct SessionInner<B: Backend, P: DeviceProvider> {
    runner: Box<dyn InferenceRunner<B>>,
    preprocessor: Preprocessor<B>,
    postprocessor: Postprocessor,
    lease: DeviceLease<P>,
}

impl<B: Backend, P: DeviceProvider> SessionInner<B, P> {
    fn process_band(&self, input: &Frame<'_>, output: &mut FrameMut<'_>, band: &Band) -> Result<()> {
        let device = self.preprocessor.device();
        let band_input = self.preprocessor.upload_band(input, band);
        let mut band_output = self
            .postprocessor
            .band_buffer::<B>(band, input.width(), device);
        let sync_per_tile = band.tile_count() > 1;

        for tile in band.tiles() {
            let tile_input = self.preprocessor.tile_input(&band_input, band, &tile);
            let outputs = self
                .preprocessor
                .variants(tile_input)
                .into_iter()
                .map(|(transform, variant)| (transform, self.runner.forward(variant)))
                .collect();

            let merged = self.postprocessor.merge(outputs)?;
            self.postprocessor.check_output(&merged, &tile)?;
            let cropped = self.postprocessor.crop(merged, &tile);
            band_output = self.postprocessor.accumulate(band_output, cropped, &tile);

            if sync_per_tile {
                sync_device::<B>(device)?;
            }
        }

        self.postprocessor.download(band_output, band, output)
    }
}

/// Wait for the tile work queued so far.
fn sync_device<B: Backend>(device: &B::Device) -> Result<()> {
    B::sync(device).map_err(device_fault)
}

fn device_fault(err: ExecutionError) -> Error {
    Error::DeviceFault(err.to_string())
}

/// Decrements the in-flight counter on every exit path.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A loaded network bound to one device.
pub struct Session<B: Backend, P: DeviceProvider> {
    config: ResolvedConfig,
    device_id: u32,
    in_flight: AtomicUsize,
    closed: AtomicBool,
    inner: RwLock<Option<SessionInner<B, P>>>,
}

impl<B, P> Session<B, P>
where
    B: Backend,
    P: DeviceProvider,
    P::Context: DeviceContext<B>,
{
    pub fn open(
        registry: &DeviceRegistry<P>,
        config: &SessionConfig,
        loader: &dyn ModelLoader<B>,
    ) -> Result<Self> {
        config.validate()?;
        config.model_files().check_readable()?;

        let lease = registry.acquire(config.device_id, config.concurrency)?;
        let resolved = config.resolve(lease.capabilities().heap_budget_mb)?;
        let device = lease.context().burn_device();

        tracing::debug!(
            "Loading {} at {}x on device {}",
            resolved.files.kind,
            resolved.scale,
            config.device_id
        );
        let runner = loader.load(&resolved.files, resolved.scale, &device)?;

        tracing::info!(
            "Opened session on device {} ({}): {} at {}x, tiles {}x{}, tta {}",
            config.device_id,
            lease.capabilities().name,
            resolved.files.kind,
            resolved.scale,
            resolved.tile_width,
            resolved.tile_height,
            resolved.tta
        );

        Ok(Self {
            device_id: config.device_id,
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            inner: RwLock::new(Some(SessionInner {
                runner,
                preprocessor: Preprocessor::new(device, resolved.tta),
                postprocessor: Postprocessor::new(resolved.scale),
                lease,
            })),
            config: resolved,
        })
    }
}

impl<B: Backend, P: DeviceProvider> Session<B, P> {
    /// Upscale `input` into `output`, which must be exactly `scale` times
    /// larger in both dimensions. Blocks until the whole frame is written.
    pub fn process(&self, input: &Frame<'_>, output: &mut FrameMut<'_>) -> Result<()> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(Error::SessionClosed)?;
        output.check_upscale_of(input, self.config.scale)?;

        let _in_flight = InFlight::enter(&self.in_flight);
        let _permit = inner.lease.gate().acquire();

        let scheduler = TileScheduler::with_prepadding(
            input.width(),
            input.height(),
            self.config.tile_width,
            self.config.tile_height,
            self.config.prepadding,
        )?;
        let (columns, rows) = scheduler.grid();
        tracing::debug!(
            "Processing {}x{} frame as {}x{} tiles",
            input.width(),
            input.height(),
            columns,
            rows
        );

        for band in scheduler.bands() {
            inner.process_band(input, output, &band)?;
        }
        Ok(())
    }

    /// Wait for in-flight calls, then release the network and the device
    /// lease. Later `process` calls fail with [`Error::SessionClosed`].
    pub fn close(&self) {
        let taken = self.inner.write().take();
        self.closed.store(true, Ordering::SeqCst);
        if let Some(inner) = taken {
            // Field order drops the runner before the lease.
            drop(inner);
            tracing::info!("Closed session on device {}", self.device_id);
        }
    }

    pub fn state(&self) -> SessionState {
        if self.closed.load(Ordering::SeqCst) {
            SessionState::Closed
        } else if self.in_flight.load(Ordering::SeqCst) > 0 {
            SessionState::Processing
        } else {
            SessionState::Ready
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn scale(&self) -> u32 {
        self.config.scale
    }

    /// Resolved `(horizontal, vertical)` tile sizes.
    pub fn tile_size(&self) -> (u32, u32) {
        (self.config.tile_width, self.config.tile_height)
    }

    pub fn tta(&self) -> bool {
        self.config.tta
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }
}

impl<B: Backend, P: DeviceProvider> Drop for Session<B, P> {
    fn drop(&mut self) {
        self.close();
    }
}
