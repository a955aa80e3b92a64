//! Geometry sampling: layer lookup, CRS handling, seeded polygon sampling.

pub mod crs;
pub mod layer;
pub mod sample;

pub use crs::{Reprojector, SourceCrs};
pub use layer::{VacantLandLayer, layer_candidates, load_layer, locate_layer};
pub use sample::{GeometrySampler, PolygonSample, describe_polygon, sample_indices};
