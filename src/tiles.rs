//! Region tiling.
//!
//! Splits the coverage region into an evenly spaced lat/lon grid so each
//! tile's in-memory position set stays bounded. Tiles are half-open on both
//! axes, so every record belongs to at most one tile. Tracks crossing a tile
//! boundary are not reassembled across tiles.

use crate::{PositionRecord, RegionBounds, Result, StsError};

/// An evenly spaced grid of lat/lon tiles over a region.
#[derive(Debug, Clone)]
pub struct TileGrid {
    region: RegionBounds,
    lat_tiles: u32,
    lon_tiles: u32,
}

impl TileGrid {
    /// Create a grid with the given tile counts per axis.
    pub fn new(region: RegionBounds, lat_tiles: u32, lon_tiles: u32) -> Result<Self> {
        if !region.is_valid() {
            return Err(StsError::Configuration(format!(
                "invalid region bounds: {region:?}"
            )));
        }
        if lat_tiles == 0 || lon_tiles == 0 {
            return Err(StsError::Configuration(format!(
                "tile counts must be positive, got {lat_tiles}x{lon_tiles}"
            )));
        }
        Ok(Self {
            region,
            lat_tiles,
            lon_tiles,
        })
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.lat_tiles as usize * self.lon_tiles as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Latitude edge `i` of `lat_tiles + 1`, evenly spaced over the region.
    fn lat_edge(&self, i: u32) -> f64 {
        let span = self.region.lat_max - self.region.lat_min;
        self.region.lat_min + span * i as f64 / self.lat_tiles as f64
    }

    fn lon_edge(&self, i: u32) -> f64 {
        let span = self.region.lon_max - self.region.lon_min;
        self.region.lon_min + span * i as f64 / self.lon_tiles as f64
    }

    /// All tiles in deterministic order: longitude-major, latitude-minor.
    ///
    /// Each tile is half-open `[lat_min, lat_max) × [lon_min, lon_max)`,
    /// except that the grid's outermost max edges coincide with the region's
    /// (still exclusive, matching the region's own half-open membership).
    pub fn tiles(&self) -> Vec<RegionBounds> {
        let mut out = Vec::with_capacity(self.len());
        for i in 0..self.lon_tiles {
            for j in 0..self.lat_tiles {
                out.push(RegionBounds::new(
                    self.lat_edge(j),
                    self.lat_edge(j + 1),
                    self.lon_edge(i),
                    self.lon_edge(i + 1),
                ));
            }
        }
        out
    }

    /// Partition records into per-tile sets, in the same order as `tiles()`.
    ///
    /// Records outside the region are discarded. Tiles with no records come
    /// back as empty vectors; callers skip them without error.
    pub fn partition(&self, records: Vec<PositionRecord>) -> Vec<Vec<PositionRecord>> {
        let tiles = self.tiles();
        let mut out: Vec<Vec<PositionRecord>> = vec![Vec::new(); tiles.len()];
        for record in records {
            if let Some(idx) = tiles.iter().position(|t| t.contains(record.lat, record.lon)) {
                out[idx].push(record);
            }
        }
        out
    }
}
