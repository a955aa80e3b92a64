//! Locating and loading per-city vacant-land layers.

use super::crs::SourceCrs;
use crate::error::CorpusError;
use geo::{Geometry, MultiPolygon};
use std::path::{Path, PathBuf};

/// Polygons of one city's vacant-land layer, in WGS84 degrees.
#[derive(Debug, Clone)]
pub struct VacantLandLayer {
    pub city_code: String,
    pub path: PathBuf,
    pub polygons: Vec<MultiPolygon<f64>>,
    /// Records dropped on load: null shapes, non-polygons and unprojectable polygons.
    pub skipped: usize,
}

impl VacantLandLayer {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// File name of a city's layer for one extension, e.g. `CC_VL.shp`.
pub fn layer_file_name(code: &str, extension: &str) -> String {
    format!("{code}_VL.{extension}")
}

/// Candidate paths for a city's layer, in lookup order.
///
/// For each extension the per-city subdirectory (`<root>/<CODE>/<CODE>_VL.<ext>`)
/// is tried before the flat layout (`<root>/<CODE>_VL.<ext>`).
pub fn layer_candidates(root: &Path, code: &str, extensions: &[String]) -> Vec<PathBuf> {
    extensions
        .iter()
        .flat_map(|ext| {
            let name = layer_file_name(code, ext);
            [root.join(code).join(&name), root.join(&name)]
        })
        .collect()
}

/// First existing candidate path for a city's layer.
pub fn locate_layer(root: &Path, code: &str, extensions: &[String]) -> Option<PathBuf> {
    layer_candidates(root, code, extensions)
        .into_iter()
        .find(|path| path.is_file())
}

/// Read a layer and bring it into WGS84.
///
/// `crs_override` is a proj string used instead of `.prj` detection.
pub fn load_layer(
    code: &str,
    path: &Path,
    crs_override: Option<&str>,
) -> Result<VacantLandLayer, CorpusError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let (geometries, unreadable, crs) = match extension.as_str() {
        "shp" => {
            let (geometries, unreadable) = read_shapefile(path)?;
            (geometries, unreadable, SourceCrs::for_shapefile(path)?)
        }
        "geojson" | "json" => {
            let (geometries, unreadable) = read_geojson(path)?;
            (geometries, unreadable, SourceCrs::Geographic)
        }
        other => {
            return Err(CorpusError::dataset(format!(
                "unsupported layer format '.{other}' for {}",
                path.display()
            )));
        }
    };

    let crs = match crs_override {
        Some(proj) => SourceCrs::Projected {
            proj: proj.to_string(),
        },
        None => crs,
    };

    let total = geometries.len();
    let mut polygons: Vec<MultiPolygon<f64>> =
        geometries.into_iter().filter_map(into_multi_polygon).collect();
    let mut skipped = unreadable + (total - polygons.len());

    if let Some(reprojector) = crs.reprojector()? {
        let before = polygons.len();
        polygons = polygons
            .iter()
            .enumerate()
            .filter_map(|(index, polygon)| match reprojector.reproject(polygon) {
                Ok(projected) => Some(projected),
                Err(e) => {
                    tracing::warn!(city = code, index, error = %e, "dropping polygon");
                    None
                }
            })
            .collect();
        skipped += before - polygons.len();
    }

    tracing::debug!(
        city = code,
        path = %path.display(),
        polygons = polygons.len(),
        skipped,
        "loaded vacant-land layer"
    );

    Ok(VacantLandLayer {
        city_code: code.to_string(),
        path: path.to_path_buf(),
        polygons,
        skipped,
    })
}

/// Readable geometries plus the number of null or unconvertible shapes.
fn read_shapefile(path: &Path) -> Result<(Vec<Geometry<f64>>, usize), CorpusError> {
    let shapes = shapefile::read_shapes(path)?;
    let mut unreadable = 0;
    let geometries = shapes
        .into_iter()
        .filter_map(|shape| match Geometry::<f64>::try_from(shape) {
            Ok(geometry) => Some(geometry),
            Err(_) => {
                unreadable += 1;
                None
            }
        })
        .collect();
    Ok((geometries, unreadable))
}

/// Readable geometries plus the number of null or unconvertible features.
fn read_geojson(path: &Path) -> Result<(Vec<Geometry<f64>>, usize), CorpusError> {
    let text = std::fs::read_to_string(path)?;
    let raw: Vec<Option<geojson::Geometry>> = match text.parse::<geojson::GeoJson>()? {
        geojson::GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(|feature| feature.geometry)
            .collect(),
        geojson::GeoJson::Feature(feature) => vec![feature.geometry],
        geojson::GeoJson::Geometry(geometry) => vec![Some(geometry)],
    };

    let mut unreadable = 0;
    let mut geometries = Vec::with_capacity(raw.len());
    for geometry in raw {
        match geometry.map(Geometry::<f64>::try_from) {
            Some(Ok(geometry)) => geometries.push(geometry),
            Some(Err(e)) => {
                tracing::debug!(path = %path.display(), error = %e, "unconvertible feature");
                unreadable += 1;
            }
            None => unreadable += 1,
        }
    }
    Ok((geometries, unreadable))
}

fn into_multi_polygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        Geometry::GeometryCollection(collection) => {
            let polygons: Vec<_> = collection
                .into_iter()
                .filter_map(into_multi_polygon)
                .flat_map(|multi| multi.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}
