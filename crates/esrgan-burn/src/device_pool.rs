//! wgpu device bring-up behind [`DeviceProvider`].
//!
//! Adapters are enumerated once, when the provider is built; software
//! rasterizers are skipped, so device ids only ever name real GPUs.
//!
//! # Runtime lifetime
//! A wgpu device handed to burn becomes a runtime that burn keeps for the
//! rest of the process; there is no call to unregister it. The provider
//! therefore creates at most one runtime per adapter and hands the same
//! [`WgpuDevice`] to every later context on that adapter. Dropping a
//! [`WgpuContext`] ends the registry's lease, not the runtime.

use std::collections::HashMap;

use burn::backend::wgpu::{init_device, RuntimeOptions, Wgpu, WgpuDevice, WgpuSetup};
use burn::tensor::backend::Backend;
use esrgan_core::{DeviceCapabilities, DeviceProvider, Error, Result};
use parking_lot::Mutex;
use wgpu::{Backends, DeviceDescriptor, DeviceType, Features};

/// A GPU context that can hand out the burn device it runs on.
pub trait DeviceContext<B: Backend>: Send + Sync + 'static {
    fn burn_device(&self) -> B::Device;
}

/// One initialized wgpu device.
pub struct WgpuContext {
    device: WgpuDevice,
    capabilities: DeviceCapabilities,
}

impl WgpuContext {
    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }
}

impl DeviceContext<Wgpu> for WgpuContext {
    fn burn_device(&self) -> WgpuDevice {
        self.device.clone()
    }
}

/// Runtimes by adapter index, created on first use.
struct RuntimeCache<D> {
    runtimes: Mutex<HashMap<u32, D>>,
}

impl<D: Clone> RuntimeCache<D> {
    fn new() -> Self {
        Self {
            runtimes: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_try_init(&self, device_id: u32, init: impl FnOnce() -> Result<D>) -> Result<D> {
        let mut runtimes = self.runtimes.lock();
        if let Some(runtime) = runtimes.get(&device_id) {
            tracing::debug!("Reusing runtime for GPU {}", device_id);
            return Ok(runtime.clone());
        }
        let runtime = init()?;
        runtimes.insert(device_id, runtime.clone());
        Ok(runtime)
    }
}

/// Enumerates GPUs and creates one burn wgpu runtime per device id.
pub struct WgpuProvider {
    instance: wgpu::Instance,
    adapters: Vec<wgpu::Adapter>,
    runtimes: RuntimeCache<WgpuDevice>,
    queue_slots: u32,
    heap_budget_mb: Option<u64>,
}

impl WgpuProvider {
    pub fn new() -> Self {
        Self::with_backends(preferred_backends())
    }

    pub fn with_backends(backends: Backends) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(backends)
            .into_iter()
            .filter(|adapter| adapter.get_info().device_type != DeviceType::Cpu)
            .collect();

        if adapters.is_empty() {
            tracing::warn!("No GPU adapter found for {:?}", backends);
        }
        for (id, adapter) in adapters.iter().enumerate() {
            let info = adapter.get_info();
            tracing::debug!("GPU {}: {} ({:?}, {:?})", id, info.name, info.device_type, info.backend);
        }

        Self {
            instance,
            adapters,
            runtimes: RuntimeCache::new(),
            queue_slots: 1,
            heap_budget_mb: None,
        }
    }

    /// Queues reported to the registry per device.
    ///
    /// wgpu exposes a single queue per device; raising this lets more calls
    /// overlap their host-side preprocessing and readback on one device.
    pub fn with_queue_slots(mut self, slots: u32) -> Self {
        self.queue_slots = slots.max(1);
        self
    }

    /// Memory budget reported to the registry, in MB, instead of the
    /// adapter's largest buffer size.
    pub fn with_heap_budget_mb(mut self, budget_mb: u64) -> Self {
        self.heap_budget_mb = Some(budget_mb);
        self
    }

    pub fn adapter_info(&self, device_id: u32) -> Option<wgpu::AdapterInfo> {
        self.adapters
            .get(device_id as usize)
            .map(|adapter| adapter.get_info())
    }

    fn heap_budget(&self, adapter: &wgpu::Adapter) -> u64 {
        self.heap_budget_mb
            .unwrap_or_else(|| adapter.limits().max_buffer_size / (1024 * 1024))
    }

    fn init_runtime(&self, device_id: u32, adapter: wgpu::Adapter) -> Result<WgpuDevice> {
        let adapter_info = adapter.get_info();
        tracing::debug!("Opening GPU adapter: {:?}", adapter_info);

        // Full adapter limits: 4x output bands outgrow the default binding size.
        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(async {
            adapter
                .request_device(&DeviceDescriptor {
                    label: Some("esrgan-burn GPU"),
                    required_features: Features::empty(),
                    required_limits: limits,
                    memory_hints: Default::default(),
                    trace: Default::default(),
                })
                .await
        })
        .map_err(|e| Error::DeviceUnavailable {
            id: device_id,
            reason: e.to_string(),
        })?;

        let setup = WgpuSetup {
            instance: self.instance.clone(),
            adapter,
            device,
            queue,
            backend: adapter_info.backend,
        };
        Ok(init_device(setup, RuntimeOptions::default()))
    }
}

impl Default for WgpuProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProvider for WgpuProvider {
    type Context = WgpuContext;

    fn device_count(&self) -> u32 {
        self.adapters.len() as u32
    }

    fn create_context(&self, device_id: u32) -> Result<WgpuContext> {
        let adapter = self
            .adapters
            .get(device_id as usize)
            .cloned()
            .ok_or_else(|| Error::InvalidDevice {
                id: device_id,
                count: self.device_count(),
            })?;

        let capabilities = DeviceCapabilities {
            name: adapter.get_info().name,
            compute_queues: self.queue_slots,
            transfer_queues: self.queue_slots,
            heap_budget_mb: self.heap_budget(&adapter),
        };
        let device = self
            .runtimes
            .get_or_try_init(device_id, || self.init_runtime(device_id, adapter))?;

        Ok(WgpuContext {
            device,
            capabilities,
        })
    }

    fn capabilities(&self, context: &WgpuContext) -> DeviceCapabilities {
        context.capabilities.clone()
    }
}

fn preferred_backends() -> Backends {
    #[cfg(target_os = "macos")]
    {
        Backends::METAL
    }
    #[cfg(target_os = "windows")]
    {
        Backends::DX12 | Backends::VULKAN
    }
    #[cfg(target_os = "linux")]
    {
        Backends::VULKAN
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        Backends::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esrgan_core::DeviceRegistry;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_provider_creation() {
        let provider = WgpuProvider::new().with_queue_slots(0);
        assert_eq!(provider.queue_slots, 1);
        // GPU may or may not be available
        let count = provider.device_count();
        assert!(provider.adapter_info(count).is_none());
    }

    struct CountingProvider {
        runtimes: RuntimeCache<u32>,
        inits: AtomicU32,
    }

    impl DeviceProvider for CountingProvider {
        type Context = u32;

        fn device_count(&self) -> u32 {
            2
        }

        fn create_context(&self, device_id: u32) -> Result<u32> {
            self.runtimes.get_or_try_init(device_id, || {
                Ok(self.inits.fetch_add(1, Ordering::SeqCst))
            })
        }

        fn capabilities(&self, _context: &u32) -> DeviceCapabilities {
            DeviceCapabilities {
                name: "counting".into(),
                compute_queues: 1,
                transfer_queues: 1,
                heap_budget_mb: 1024,
            }
        }
    }

    #[test]
    fn test_runtime_created_once_per_adapter() {
        let registry = DeviceRegistry::new(CountingProvider {
            runtimes: RuntimeCache::new(),
            inits: AtomicU32::new(0),
        });

        let first = *registry.acquire(0, 0).unwrap().context();
        assert!(!registry.is_active(0));
        let again = *registry.acquire(0, 0).unwrap().context();
        assert_eq!(first, again);
        assert_eq!(registry.provider().inits.load(Ordering::SeqCst), 1);

        let other = *registry.acquire(1, 0).unwrap().context();
        assert_ne!(other, first);
        assert_eq!(registry.provider().inits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_runtime_init_is_retried() {
        let cache = RuntimeCache::<u32>::new();
        let err = cache.get_or_try_init(0, || {
            Err(Error::DeviceUnavailable {
                id: 0,
                reason: "busy".into(),
            })
        });
        assert!(err.is_err());
        assert_eq!(cache.get_or_try_init(0, || Ok(7)).unwrap(), 7);
        assert_eq!(cache.get_or_try_init(0, || Ok(8)).unwrap(), 7);
    }

    #[test]
    fn test_out_of_range_device() {
        let provider = WgpuProvider::new();
        let count = provider.device_count();
        let err = provider.create_context(count).err().unwrap();
        assert!(matches!(err, Error::InvalidDevice { .. }));
    }
}
