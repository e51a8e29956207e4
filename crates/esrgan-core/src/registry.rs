//! Device registry: reference-counted GPU contexts and their gates.
//!
//! One entry per device id: the context, the [`ConcurrencyGate`] every session
//! on that device shares, and the number of live sessions. The first
//! [`acquire`](DeviceRegistry::acquire) for a device creates the context; the
//! last [`DeviceLease`] to drop destroys it. All bookkeeping happens under one
//! mutex, so concurrent opens never create two contexts for the same device.
//!
//! The registry is an ordinary value: create one per process (or per test)
//! and clone it into whatever opens sessions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::{DeviceCapabilities, DeviceProvider};
use crate::error::{Error, Result};
use crate::gate::ConcurrencyGate;

struct Entry<C> {
    context: Arc<C>,
    gate: Arc<ConcurrencyGate>,
    capabilities: DeviceCapabilities,
    live: usize,
}

struct RegistryInner<P: DeviceProvider> {
    provider: P,
    entries: Mutex<HashMap<u32, Entry<P::Context>>>,
}

/// Shared map from device id to context, gate and live-session count.
pub struct DeviceRegistry<P: DeviceProvider> {
    inner: Arc<RegistryInner<P>>,
}

impl<P: DeviceProvider> Clone for DeviceRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: DeviceProvider> DeviceRegistry<P> {
    pub fn new(provider: P) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                provider,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn provider(&self) -> &P {
        &self.inner.provider
    }

    /// Register one more session on `device_id`.
    ///
    /// `concurrency` only matters for the first session on a device: it sizes
    /// the gate, which later sessions share as-is.
    pub fn acquire(&self, device_id: u32, concurrency: u32) -> Result<DeviceLease<P>> {
        let count = self.inner.provider.device_count();
        if device_id >= count {
            return Err(Error::InvalidDevice {
                id: device_id,
                count,
            });
        }

        let mut entries = self.inner.entries.lock();
        let entry = match entries.entry(device_id) {
            std::collections::hash_map::Entry::Occupied(occupied) => occupied.into_mut(),
            std::collections::hash_map::Entry::Vacant(vacant) => {
                let context = self.inner.provider.create_context(device_id)?;
                let capabilities = self.inner.provider.capabilities(&context);
                let gate = ConcurrencyGate::for_device(&capabilities, concurrency);
                tracing::info!(
                    "Created context for device {} ({}), gate capacity {}",
                    device_id,
                    capabilities.name,
                    gate.capacity()
                );
                vacant.insert(Entry {
                    context: Arc::new(context),
                    gate: Arc::new(gate),
                    capabilities,
                    live: 0,
                })
            }
        };
        entry.live += 1;
        tracing::debug!("Device {} now has {} live session(s)", device_id, entry.live);

        Ok(DeviceLease {
            context: Arc::clone(&entry.context),
            gate: Arc::clone(&entry.gate),
            capabilities: entry.capabilities.clone(),
            ticket: LeaseTicket {
                registry: self.clone(),
                device_id,
            },
        })
    }

    /// Live sessions on `device_id` (0 when the device has no context).
    pub fn live_sessions(&self, device_id: u32) -> usize {
        self.inner
            .entries
            .lock()
            .get(&device_id)
            .map_or(0, |entry| entry.live)
    }

    /// Whether a context currently exists for `device_id`.
    pub fn is_active(&self, device_id: u32) -> bool {
        self.inner.entries.lock().contains_key(&device_id)
    }

    fn release(&self, device_id: u32) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(&device_id) else {
            tracing::warn!("Release for device {} without a registry entry", device_id);
            return;
        };
        entry.live = entry.live.saturating_sub(1);
        tracing::debug!("Device {} now has {} live session(s)", device_id, entry.live);

        if entry.live == 0 {
            // Gate first, then the context: nothing may outlive the device.
            if let Some(Entry { gate, context, .. }) = entries.remove(&device_id) {
                drop(gate);
                drop(context);
                tracing::info!("Released context for device {}", device_id);
            }
        }
    }
}

struct LeaseTicket<P: DeviceProvider> {
    registry: DeviceRegistry<P>,
    device_id: u32,
}

impl<P: DeviceProvider> Drop for LeaseTicket<P> {
    fn drop(&mut self) {
        self.registry.release(self.device_id);
    }
}

/// One session's claim on a device.
///
/// Dropping the lease decrements the live count and, for the last lease,
/// destroys the device's gate and context.
///
/// # Field drop order
/// Fields drop top to bottom. The context and gate handles go first so that
/// when `ticket` releases the registry entry, the registry holds the last
/// references and the context is destroyed inside the release, under the
/// registry lock.
pub struct DeviceLease<P: DeviceProvider> {
    context: Arc<P::Context>,
    gate: Arc<ConcurrencyGate>,
    capabilities: DeviceCapabilities,
    ticket: LeaseTicket<P>,
}

impl<P: DeviceProvider> DeviceLease<P> {
    pub fn device_id(&self) -> u32 {
        self.ticket.device_id
    }

    pub fn context(&self) -> &P::Context {
        &self.context
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn shares_gate_with(&self, other: &DeviceLease<P>) -> bool {
        Arc::ptr_eq(&self.gate, &other.gate)
    }
}
