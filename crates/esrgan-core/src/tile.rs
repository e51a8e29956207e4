//! Tile scheduling.
//!
//! A frame is cut into horizontal bands of `tile_height` rows, and each band
//! into `tile_width` columns. Every tile carries the output rectangle it is
//! responsible for plus a padded input window (extended by [`PREPADDING`] on
//! every side, clamped to the frame) so the network sees enough context to
//! avoid seams. Output rectangles never overlap; padded windows do.
//!
//! Iteration is lazy and row-major: bands top to bottom, tiles left to right.

use crate::error::{Error, Result};

/// Context rows/columns added around each tile's input window.
pub const PREPADDING: u32 = 10;

/// Smallest explicit tile size accepted by the configuration.
pub const MIN_TILE_SIZE: u32 = 32;

/// Pick a tile size from the device heap budget (in MB).
pub fn auto_tile_size(heap_budget_mb: u64) -> u32 {
    if heap_budget_mb > 2600 {
        400
    } else if heap_budget_mb > 740 {
        200
    } else if heap_budget_mb > 250 {
        100
    } else {
        32
    }
}

/// `0` means automatic; anything else is used as-is.
pub fn resolve_tile_size(requested: u32, heap_budget_mb: u64) -> u32 {
    if requested == 0 {
        auto_tile_size(heap_budget_mb)
    } else {
        requested
    }
}

/// Axis-aligned rectangle, half-open on the right and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn scaled(&self, scale: u32) -> Rect {
        Rect {
            x0: self.x0 * scale,
            y0: self.y0 * scale,
            x1: self.x1 * scale,
            y1: self.y1 * scale,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }
}

/// One unit of inference work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Column index within the band.
    pub column: u32,
    /// Band index.
    pub row: u32,
    /// Input-space rectangle this tile produces output for.
    pub output: Rect,
    /// Input-space window fed to the network.
    pub padded: Rect,
}

impl Tile {
    /// Offset of the output rectangle inside the padded window.
    pub fn inner_offset(&self) -> (u32, u32) {
        (
            self.output.x0 - self.padded.x0,
            self.output.y0 - self.padded.y0,
        )
    }
}

/// A horizontal strip of tiles sharing one vertical padded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub index: u32,
    /// Rows `[y0, y1)` written by this band.
    pub y0: u32,
    pub y1: u32,
    /// Rows `[py0, py1)` read by this band.
    pub py0: u32,
    pub py1: u32,
    width: u32,
    tile_width: u32,
    prepadding: u32,
}

impl Band {
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn padded_height(&self) -> u32 {
        self.py1 - self.py0
    }

    pub fn tile_count(&self) -> u32 {
        self.width.div_ceil(self.tile_width)
    }

    pub fn tiles(self) -> BandTiles {
        BandTiles {
            band: self,
            next: 0,
        }
    }
}

/// Lazy iterator over the tiles of one band, left to right.
#[derive(Debug, Clone)]
pub struct BandTiles {
    band: Band,
    next: u32,
}

impl Iterator for BandTiles {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let band = &self.band;
        if self.next >= band.tile_count() {
            return None;
        }
        let column = self.next;
        self.next += 1;

        let x0 = column * band.tile_width;
        let x1 = (x0 + band.tile_width).min(band.width);
        Some(Tile {
            column,
            row: band.index,
            output: Rect {
                x0,
                y0: band.y0,
                x1,
                y1: band.y1,
            },
            padded: Rect {
                x0: x0.saturating_sub(band.prepadding),
                y0: band.py0,
                x1: (x1 + band.prepadding).min(band.width),
                y1: band.py1,
            },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.band.tile_count() - self.next.min(self.band.tile_count())) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BandTiles {}

/// Partition of one frame geometry into bands and tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileScheduler {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    prepadding: u32,
}

impl TileScheduler {
    /// Tile sizes must already be resolved; `0` (automatic) is rejected.
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Result<Self> {
        Self::with_prepadding(width, height, tile_width, tile_height, PREPADDING)
    }

    pub fn with_prepadding(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        prepadding: u32,
    ) -> Result<Self> {
        if tile_width == 0 {
            return Err(Error::config("tile_size", "must be resolved before tiling"));
        }
        if tile_height == 0 {
            return Err(Error::config("tile_size_y", "must be resolved before tiling"));
        }
        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            prepadding,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn prepadding(&self) -> u32 {
        self.prepadding
    }

    /// `(columns, rows)` of the tile grid.
    pub fn grid(&self) -> (u32, u32) {
        (
            self.width.div_ceil(self.tile_width),
            self.height.div_ceil(self.tile_height),
        )
    }

    pub fn tile_count(&self) -> usize {
        let (columns, rows) = self.grid();
        columns as usize * rows as usize
    }

    pub fn bands(&self) -> Bands {
        Bands {
            scheduler: *self,
            next: 0,
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = Tile> {
        self.bands().flat_map(Band::tiles)
    }

    fn band(&self, index: u32) -> Band {
        let y0 = index * self.tile_height;
        let y1 = (y0 + self.tile_height).min(self.height);
        Band {
            index,
            y0,
            y1,
            py0: y0.saturating_sub(self.prepadding),
            py1: (y1 + self.prepadding).min(self.height),
            width: self.width,
            tile_width: self.tile_width,
            prepadding: self.prepadding,
        }
    }
}

/// Lazy iterator over bands, top to bottom.
#[derive(Debug, Clone)]
pub struct Bands {
    scheduler: TileScheduler,
    next: u32,
}

impl Iterator for Bands {
    type Item = Band;

    fn next(&mut self) -> Option<Band> {
        let (_, rows) = self.scheduler.grid();
        if self.next >= rows {
            return None;
        }
        let band = self.scheduler.band(self.next);
        self.next += 1;
        Some(band)
    }
}
