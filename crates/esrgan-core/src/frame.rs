//! Borrowed planar RGB frames.
//!
//! Planes hold `f32` samples in `[0, 1]`, row-major, with a row stride given
//! in elements. The stride may exceed the width (host row alignment); the
//! columns past the width are never read or written.

use crate::error::{Error, Result};

pub const CHANNELS: usize = 3;

fn check_plane(name: &str, len: usize, width: u32, height: u32, stride: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::FrameGeometry(format!(
            "{name}: empty frame {width}x{height}"
        )));
    }
    if stride < width as usize {
        return Err(Error::FrameGeometry(format!(
            "{name}: stride {stride} is smaller than width {width}"
        )));
    }
    let needed = stride * (height as usize - 1) + width as usize;
    if len < needed {
        return Err(Error::FrameGeometry(format!(
            "{name}: plane holds {len} samples, {width}x{height} at stride {stride} needs {needed}"
        )));
    }
    Ok(())
}

/// Read-only source frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    stride: usize,
    planes: [&'a [f32]; CHANNELS],
}

impl<'a> Frame<'a> {
    pub fn new(width: u32, height: u32, stride: usize, planes: [&'a [f32]; CHANNELS]) -> Result<Self> {
        for plane in &planes {
            check_plane("input", plane.len(), width, height, stride)?;
        }
        Ok(Self {
            width,
            height,
            stride,
            planes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn plane(&self, channel: usize) -> &'a [f32] {
        self.planes[channel]
    }

    /// Active samples of one row, stride padding excluded.
    pub fn row(&self, channel: usize, y: u32) -> &'a [f32] {
        let start = y as usize * self.stride;
        &self.planes[channel][start..start + self.width as usize]
    }
}

/// Caller-owned destination frame.
#[derive(Debug)]
pub struct FrameMut<'a> {
    width: u32,
    height: u32,
    stride: usize,
    planes: [&'a mut [f32]; CHANNELS],
}

impl<'a> FrameMut<'a> {
    pub fn new(
        width: u32,
        height: u32,
        stride: usize,
        planes: [&'a mut [f32]; CHANNELS],
    ) -> Result<Self> {
        for plane in &planes {
            check_plane("output", plane.len(), width, height, stride)?;
        }
        Ok(Self {
            width,
            height,
            stride,
            planes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row_mut(&mut self, channel: usize, y: u32) -> &mut [f32] {
        let start = y as usize * self.stride;
        let width = self.width as usize;
        &mut self.planes[channel][start..start + width]
    }

    /// Check that this frame can receive `source` upscaled by `scale`.
    pub fn check_upscale_of(&self, source: &Frame<'_>, scale: u32) -> Result<()> {
        let (w, h) = (source.width() * scale, source.height() * scale);
        if self.width != w || self.height != h {
            return Err(Error::FrameGeometry(format!(
                "output is {}x{}, expected {w}x{h} for a {}x{} input at {scale}x",
                self.width,
                self.height,
                source.width(),
                source.height()
            )));
        }
        Ok(())
    }
}
