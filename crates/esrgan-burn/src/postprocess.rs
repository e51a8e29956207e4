//! Network outputs back to frame rows.
//!
//! Per tile: undo the TTA transforms and average, then crop the padding away.
//! Per band: stitch the cropped tiles into one device buffer, read it back
//! once and write it into the destination frame at its own stride.

use burn::prelude::*;
use esrgan_core::{Band, Error, FrameMut, Result, Tile, CHANNELS};

use crate::dihedral::Dihedral;
use crate::preprocess::PIXEL_SCALE;

pub struct Postprocessor {
    scale: u32,
}

impl Postprocessor {
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Map every output back to the untransformed orientation and average.
    ///
    /// Outputs are summed in the order given, then divided once.
    pub fn merge<B: Backend>(&self, outputs: Vec<(Dihedral, Tensor<B, 4>)>) -> Result<Tensor<B, 4>> {
        let count = outputs.len();
        let mut restored = outputs
            .into_iter()
            .map(|(transform, output)| transform.inverse().apply(output));

        let first = restored
            .next()
            .ok_or_else(|| Error::ModelOutput("no network outputs to merge".into()))?;
        if count == 1 {
            return Ok(first);
        }

        let dims = first.dims();
        let mut sum = first;
        for output in restored {
            if output.dims() != dims {
                return Err(Error::ModelOutput(format!(
                    "TTA outputs disagree: {:?} vs {:?}",
                    output.dims(),
                    dims
                )));
            }
            sum = sum.add(output);
        }
        Ok(sum.div_scalar(count as f32))
    }

    /// Check the merged output covers the tile's padded window at scale.
    pub fn check_output<B: Backend>(&self, merged: &Tensor<B, 4>, tile: &Tile) -> Result<()> {
        let s = self.scale as usize;
        let expected = [
            1,
            CHANNELS,
            tile.padded.height() as usize * s,
            tile.padded.width() as usize * s,
        ];
        let got = merged.dims();
        if got != expected {
            return Err(Error::ModelOutput(format!(
                "tile ({}, {}) returned {:?}, expected {:?}",
                tile.column, tile.row, got, expected
            )));
        }
        Ok(())
    }

    /// Drop the upscaled padding, keeping only the tile's own output region.
    pub fn crop<B: Backend>(&self, merged: Tensor<B, 4>, tile: &Tile) -> Tensor<B, 4> {
        let s = self.scale as usize;
        let (ox, oy) = tile.inner_offset();
        let (ox, oy) = (ox as usize * s, oy as usize * s);
        let w = tile.output.width() as usize * s;
        let h = tile.output.height() as usize * s;
        merged.slice([0..1, 0..CHANNELS, oy..oy + h, ox..ox + w])
    }

    /// Zeroed device buffer for one band's upscaled rows.
    pub fn band_buffer<B: Backend>(&self, band: &Band, width: u32, device: &B::Device) -> Tensor<B, 4> {
        let s = self.scale as usize;
        Tensor::zeros(
            [1, CHANNELS, band.height() as usize * s, width as usize * s],
            device,
        )
    }

    /// Place a cropped tile at its column in the band buffer.
    pub fn accumulate<B: Backend>(
        &self,
        band_buffer: Tensor<B, 4>,
        cropped: Tensor<B, 4>,
        tile: &Tile,
    ) -> Tensor<B, 4> {
        let s = self.scale as usize;
        let [_, _, h, w] = cropped.dims();
        let x0 = tile.output.x0 as usize * s;
        band_buffer.slice_assign([0..1, 0..CHANNELS, 0..h, x0..x0 + w], cropped)
    }

    /// Read the band back, rescale to `[0, 1]` and write its rows.
    pub fn download<B: Backend>(
        &self,
        band_buffer: Tensor<B, 4>,
        band: &Band,
        output: &mut FrameMut<'_>,
    ) -> Result<()> {
        let [_, _, rows, width] = band_buffer.dims();
        if width != output.width() as usize {
            return Err(Error::FrameGeometry(format!(
                "band is {width} wide, output frame is {}",
                output.width()
            )));
        }

        let host = band_buffer
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| Error::Readback(format!("{e:?}")))?;

        let y0 = band.y0 * self.scale;
        for channel in 0..CHANNELS {
            let plane = &host[channel * rows * width..(channel + 1) * rows * width];
            for (y, src) in plane.chunks_exact(width).enumerate() {
                let dst = output.row_mut(channel, y0 + y as u32);
                for (d, &v) in dst.iter_mut().zip(src) {
                    *d = (v / PIXEL_SCALE).clamp(0.0, 1.0);
                }
            }
        }
        Ok(())
    }
}
