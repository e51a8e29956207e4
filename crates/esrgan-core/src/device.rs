//! Device abstraction: how a GPU context is brought up for a device id.
//!
//! The registry is framework-agnostic: a [`DeviceProvider`] knows how many
//! devices exist, how to create the context for one of them, and what that
//! device can do. `esrgan-burn` implements it on top of wgpu.

use crate::error::Result;

/// What the registry needs to know about a device once its context exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Adapter name, for logging.
    pub name: String,
    /// Queues able to run compute work.
    pub compute_queues: u32,
    /// Queues able to run transfers.
    pub transfer_queues: u32,
    /// Device-local memory the driver is willing to hand out, in MB.
    pub heap_budget_mb: u64,
}

/// Creates and describes GPU contexts.
///
/// Implementations must be shareable across threads: the registry calls
/// `create_context` under its lock from whichever thread opens a session.
pub trait DeviceProvider: Send + Sync + 'static {
    /// Owned GPU context, dropped when the last session on the device closes.
    ///
    /// Providers whose runtime outlives its contexts keep it and hand it out
    /// again on the next `create_context` for the same id.
    type Context: Send + Sync + 'static;

    fn device_count(&self) -> u32;

    fn create_context(&self, device_id: u32) -> Result<Self::Context>;

    fn capabilities(&self, context: &Self::Context) -> DeviceCapabilities;
}
