//! Seeded sampling of vacant-land polygons into fixed-size bounding boxes.

use super::layer::{VacantLandLayer, load_layer, locate_layer};
use crate::bbox::BoundingBox;
use crate::cities::CityRegistry;
use crate::config::{DatasetConfig, SamplingConfig};
use crate::error::CorpusError;
use geo::{Area, Centroid, MultiPolygon};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One sampled vacant-land polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonSample {
    pub city_code: String,
    pub city_name: String,
    pub bbox: BoundingBox,
    /// Approximate area in square metres (flat-earth degree conversion).
    pub area_sqm: f64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
}

/// Draws polygon samples from the per-city layers under one data root.
#[derive(Debug, Clone)]
pub struct GeometrySampler {
    data_root: PathBuf,
    extensions: Vec<String>,
    source_proj: Option<String>,
    sampling: SamplingConfig,
    cities: CityRegistry,
}

impl GeometrySampler {
    pub fn new(
        data_root: impl Into<PathBuf>,
        dataset: &DatasetConfig,
        sampling: &SamplingConfig,
    ) -> Self {
        Self {
            data_root: data_root.into(),
            extensions: dataset.extensions.clone(),
            source_proj: dataset.source_proj.clone(),
            sampling: sampling.clone(),
            cities: CityRegistry::new(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    /// Load a city's layer in WGS84.
    pub fn load_city(&self, code: &str) -> Result<VacantLandLayer, CorpusError> {
        let path = locate_layer(&self.data_root, code, &self.extensions).ok_or_else(|| {
            CorpusError::not_found(format!(
                "{} not found in {code}/ or {}",
                super::layer::layer_file_name(code, "*"),
                self.data_root.display()
            ))
        })?;
        load_layer(code, &path, self.source_proj.as_deref())
    }

    /// Draw up to `n` samples for a city.
    ///
    /// Returns `min(n, available)` samples minus any degenerate polygons. A missing
    /// or unreadable layer, or an unknown city code, yields an empty batch.
    pub fn sample_areas(&self, code: &str, n: usize) -> Vec<PolygonSample> {
        let Some(city_name) = self.cities.name(code) else {
            tracing::warn!(city = code, "unknown city code, skipping");
            return Vec::new();
        };

        let layer = match self.load_city(code) {
            Ok(layer) => layer,
            Err(e) => {
                tracing::warn!(city = code, error = %e, "failed to load vacant-land layer");
                return Vec::new();
            }
        };
        if layer.is_empty() {
            tracing::warn!(city = code, "layer has no polygons");
            return Vec::new();
        }
        tracing::info!(city = code, polygons = layer.len(), "vacant areas loaded");

        let indices = sample_indices(layer.len(), n, self.sampling.seed);
        indices
            .into_iter()
            .filter_map(|idx| {
                match describe_polygon(&layer.polygons[idx], &self.sampling) {
                    Ok((bbox, area_sqm, centroid_lat, centroid_lon)) => Some(PolygonSample {
                        city_code: code.to_string(),
                        city_name: city_name.to_string(),
                        bbox,
                        area_sqm,
                        centroid_lat,
                        centroid_lon,
                    }),
                    Err(e) => {
                        tracing::warn!(city = code, index = idx, error = %e, "skipping polygon");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Pick `min(n, len)` distinct indices; the same seed always yields the same indices.
pub fn sample_indices(len: usize, n: usize, seed: u64) -> Vec<usize> {
    let amount = n.min(len);
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, len, amount).into_vec()
}

/// Bounding box, area and centroid of one polygon.
///
/// Returns `(bbox, area_sqm, centroid_lat, centroid_lon)`.
pub fn describe_polygon(
    polygon: &MultiPolygon<f64>,
    sampling: &SamplingConfig,
) -> Result<(BoundingBox, f64, f64, f64), CorpusError> {
    let centroid = polygon
        .centroid()
        .ok_or_else(|| CorpusError::geometry("polygon has no centroid"))?;
    let (lon, lat) = (centroid.x(), centroid.y());
    if !lon.is_finite() || !lat.is_finite() {
        return Err(CorpusError::geometry(format!(
            "non-finite centroid ({lon}, {lat})"
        )));
    }

    let bbox = BoundingBox::around(lon, lat, sampling.buffer_deg);
    let area_sqm =
        polygon.unsigned_area() * sampling.meters_per_degree * sampling.meters_per_degree;
    Ok((bbox, area_sqm, lat, lon))
}
