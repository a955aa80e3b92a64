//! Satellite tiles: slippy-map addressing and HTTP retrieval.

pub mod coord;
pub mod fetcher;

pub use coord::TileCoord;
pub use fetcher::{HttpTileSource, TileSource};
