//! Tolerance constants for pixel comparisons.
//!
//! Samples are `[0, 1]` floats that pass through a ×255 / ÷255 round trip on
//! the device, so even exact networks pick up rounding.

/// Exact paths (pixel replication, uniform colours).
pub const PIXEL_EPSILON: f32 = 1e-5;

/// TTA averages eight restored outputs; summation adds a little more error.
#[allow(dead_code)]
pub const TTA_EPSILON: f32 = 1e-4;
