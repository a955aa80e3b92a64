//! Geographic bounding boxes in WGS84 degrees.

use serde::{Deserialize, Serialize};

/// West/south/east/north envelope in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Square of side `2 * buffer` centred on `(lon, lat)`.
    pub fn around(lon: f64, lat: f64, buffer: f64) -> Self {
        Self::new(lon - buffer, lat - buffer, lon + buffer, lat + buffer)
    }

    /// Centre point as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Same box with every coordinate increased by `offset`.
    ///
    /// This moves the box diagonally north-east; nothing checks what lies there.
    pub fn shifted(&self, offset: f64) -> Self {
        Self::new(
            self.west + offset,
            self.south + offset,
            self.east + offset,
            self.north + offset,
        )
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.west, self.south, self.east, self.north
        )
    }
}
