//! Slippy-map tile addressing (Web Mercator, XYZ scheme).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A tile address at a given zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    /// Tile containing a WGS84 point.
    ///
    /// Latitudes beyond the Web Mercator limit (about ±85.05°) and longitudes of
    /// exactly 180° are clamped onto the edge tiles.
    pub fn from_lat_lon(lat: f64, lon: f64, zoom: u8) -> Self {
        let n = 2f64.powi(zoom as i32);
        let lat_rad = lat.to_radians();
        let x = ((lon + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();
        let max = n - 1.0;
        Self {
            x: clamp_index(x, max),
            y: clamp_index(y, max),
            zoom,
        }
    }

    /// Number of tiles along one axis at this zoom, saturating at `u64::MAX`.
    pub fn tiles_per_axis(&self) -> u64 {
        1u64.checked_shl(u32::from(self.zoom)).unwrap_or(u64::MAX)
    }

    /// Fill a URL template's `{z}`, `{x}` and `{y}` placeholders.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

fn clamp_index(value: f64, max: f64) -> u32 {
    // NaN (from tan at ±90°) lands on 0
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, max) as u32
}
