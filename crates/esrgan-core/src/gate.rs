//! Per-device concurrency gate.
//!
//! A counting semaphore that bounds how many processing calls may submit work
//! to one device at a time. Waiters are woken in no particular order.

use parking_lot::{Condvar, Mutex};

use crate::device::DeviceCapabilities;

/// Counting semaphore shared by every session on one device.
#[derive(Debug)]
pub struct ConcurrencyGate {
    permits: Mutex<u32>,
    available: Condvar,
    capacity: u32,
}

impl ConcurrencyGate {
    /// `capacity` is floored at 1 so a gate can always make progress.
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Mutex::new(capacity),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Capacity from the device queues, optionally lowered by an override.
    pub fn for_device(caps: &DeviceCapabilities, override_permits: u32) -> Self {
        Self::new(gate_capacity(caps, override_permits))
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> u32 {
        *self.permits.lock()
    }

    /// Block until a permit is free, then take it.
    pub fn wait(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Return a permit and wake one waiter.
    ///
    /// A signal with no matching wait is ignored; the count never exceeds
    /// [`capacity`](Self::capacity).
    pub fn signal(&self) {
        let mut permits = self.permits.lock();
        if *permits >= self.capacity {
            tracing::warn!("Gate signalled with all {} permits free; ignoring", self.capacity);
            return;
        }
        *permits += 1;
        self.available.notify_one();
    }

    /// Scoped [`wait`](Self::wait): the permit is returned when the guard drops.
    pub fn acquire(&self) -> GatePermit<'_> {
        self.wait();
        GatePermit { gate: self }
    }

    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return None;
        }
        *permits -= 1;
        Some(GatePermit { gate: self })
    }
}

/// Held for the duration of one processing call.
#[must_use = "the permit is released as soon as it is dropped"]
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a ConcurrencyGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.signal();
    }
}

/// `min(override or transfer queues, compute queues)`, at least 1.
pub fn gate_capacity(caps: &DeviceCapabilities, override_permits: u32) -> u32 {
    let wanted = if override_permits > 0 {
        override_permits
    } else {
        caps.transfer_queues
    };
    wanted.min(caps.compute_queues).max(1)
}
