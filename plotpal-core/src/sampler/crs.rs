//! Source coordinate reference detection and reprojection to WGS84 degrees.
//!
//! Shapefiles carry their CRS as ESRI WKT in a sibling `.prj` file. Recognised:
//! plain geographic coordinates, Web Mercator, and any Transverse Mercator
//! (UTM, Gauss-Krüger) whose `PARAMETER` entries or PROJCS name pin it down.
//! Anything else needs an explicit proj string.

use crate::error::CorpusError;
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// proj string of the canonical output reference (EPSG:4326).
const WGS84_LONGLAT: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

const WEB_MERCATOR: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// Coordinate reference a layer is stored in.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCrs {
    /// Longitude/latitude in degrees; no transform needed.
    Geographic,
    /// Projected metres, described by a proj string.
    Projected { proj: String },
}

impl SourceCrs {
    /// Classify an ESRI/OGC WKT definition.
    pub fn from_wkt(wkt: &str) -> Result<Self, CorpusError> {
        let wkt = wkt.trim();
        let head = wkt
            .split(|c: char| c == '[' || c == '(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();

        match head.as_str() {
            "GEOGCS" | "GEOGCRS" | "GEODCRS" => return Ok(Self::Geographic),
            "PROJCS" | "PROJCRS" => {}
            _ => {
                return Err(CorpusError::UnsupportedCrs(format!(
                    "unrecognised WKT root '{head}'"
                )));
            }
        }

        let ellps = ellipsoid_params(wkt);

        if is_web_mercator(wkt) {
            return Ok(Self::Projected {
                proj: WEB_MERCATOR.to_string(),
            });
        }

        if let Some(tm) = TransverseMercator::from_wkt_parameters(wkt) {
            return Ok(Self::Projected {
                proj: tm.proj_string(&ellps),
            });
        }

        // Name-only definitions: the parameters are implied by the PROJCS name.
        if let Some(caps) = utm_regex().captures(wkt) {
            let zone: u8 = caps[1].parse().map_err(|_| {
                CorpusError::UnsupportedCrs(format!("bad UTM zone '{}'", &caps[1]))
            })?;
            if !(1..=60).contains(&zone) {
                return Err(CorpusError::UnsupportedCrs(format!(
                    "UTM zone {zone} out of range"
                )));
            }
            let south = if caps[2].eq_ignore_ascii_case("S") {
                " +south"
            } else {
                ""
            };
            return Ok(Self::Projected {
                proj: format!("+proj=utm +zone={zone}{south} {ellps} +units=m +no_defs"),
            });
        }

        if let Some(caps) = gk_cm_regex().captures(wkt) {
            let cm: f64 = caps[1].parse().map_err(|_| {
                CorpusError::UnsupportedCrs(format!("bad central meridian '{}'", &caps[1]))
            })?;
            return Ok(Self::Projected {
                proj: TransverseMercator::gauss_kruger(cm, 500_000.0).proj_string(&ellps),
            });
        }

        if let Some(caps) = gk_zone_regex().captures(wkt) {
            let zone: u32 = caps[2].parse().map_err(|_| {
                CorpusError::UnsupportedCrs(format!("bad GK zone '{}'", &caps[2]))
            })?;
            let cm = if caps.get(1).is_some() {
                3.0 * zone as f64
            } else {
                6.0 * zone as f64 - 3.0
            };
            let false_easting = zone as f64 * 1_000_000.0 + 500_000.0;
            return Ok(Self::Projected {
                proj: TransverseMercator::gauss_kruger(cm, false_easting).proj_string(&ellps),
            });
        }

        Err(CorpusError::UnsupportedCrs(projcs_name(wkt)))
    }

    /// CRS of a shapefile, read from its sibling `.prj`. A missing `.prj` is
    /// treated as geographic, which is what the dataset uses when one is absent.
    pub fn for_shapefile(shp_path: &Path) -> Result<Self, CorpusError> {
        let prj_path = shp_path.with_extension("prj");
        if !prj_path.exists() {
            tracing::debug!(
                path = %shp_path.display(),
                "no .prj file, assuming geographic coordinates"
            );
            return Ok(Self::Geographic);
        }
        let wkt = std::fs::read_to_string(&prj_path)?;
        Self::from_wkt(&wkt)
    }

    /// Transform into WGS84, or `None` when coordinates are already geographic.
    pub fn reprojector(&self) -> Result<Option<Reprojector>, CorpusError> {
        match self {
            Self::Geographic => Ok(None),
            Self::Projected { proj } => Reprojector::from_proj_string(proj).map(Some),
        }
    }
}

/// Converts projected coordinates into WGS84 longitude/latitude degrees.
pub struct Reprojector {
    src: Proj,
    dst: Proj,
}

impl Reprojector {
    pub fn from_proj_string(proj: &str) -> Result<Self, CorpusError> {
        let src = Proj::from_proj_string(proj)
            .map_err(|e| CorpusError::projection(format!("invalid source '{proj}': {e}")))?;
        let dst = Proj::from_proj_string(WGS84_LONGLAT)
            .map_err(|e| CorpusError::projection(format!("invalid WGS84 definition: {e}")))?;
        Ok(Self { src, dst })
    }

    /// Project one point; returns `(lon, lat)` in degrees.
    pub fn to_lon_lat(&self, x: f64, y: f64) -> Result<(f64, f64), CorpusError> {
        let mut point = (x, y, 0.0);
        proj4rs::transform::transform(&self.src, &self.dst, &mut point)
            .map_err(|e| CorpusError::projection(format!("({x}, {y}): {e}")))?;
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    }

    pub fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, CorpusError> {
        geometry.try_map_coords(|c: Coord<f64>| {
            self.to_lon_lat(c.x, c.y).map(|(x, y)| Coord { x, y })
        })
    }
}

fn is_web_mercator(wkt: &str) -> bool {
    let lower = wkt.to_ascii_lowercase();
    ["web_mercator", "mercator_auxiliary_sphere", "pseudo-mercator", "pseudo_mercator"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Ellipsoid parameters for the datums found in Chinese survey data.
fn ellipsoid_params(wkt: &str) -> String {
    let lower = wkt.to_ascii_lowercase();
    if lower.contains("cgcs2000") || lower.contains("cgcs_2000") {
        "+ellps=GRS80".to_string()
    } else if lower.contains("beijing_1954") || lower.contains("beijing 1954") {
        "+ellps=krass".to_string()
    } else if lower.contains("xian_1980") || lower.contains("xian 1980") {
        "+a=6378140 +b=6356755.288157528".to_string()
    } else {
        "+ellps=WGS84 +datum=WGS84".to_string()
    }
}

/// Transverse Mercator parameters, as carried by `PARAMETER[...]` entries.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TransverseMercator {
    central_meridian: f64,
    latitude_of_origin: f64,
    scale_factor: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    /// Gauss-Krüger zone: unit scale, origin on the equator.
    fn gauss_kruger(central_meridian: f64, false_easting: f64) -> Self {
        Self {
            central_meridian,
            latitude_of_origin: 0.0,
            scale_factor: 1.0,
            false_easting,
            false_northing: 0.0,
        }
    }

    /// Parameters of a `Transverse_Mercator` or `Gauss_Kruger` projection.
    ///
    /// `None` for other projections or when the central meridian is absent.
    fn from_wkt_parameters(wkt: &str) -> Option<Self> {
        let projection = projection_regex().captures(wkt)?[1].to_ascii_lowercase();
        if !matches!(
            projection.as_str(),
            "transverse_mercator" | "gauss_kruger" | "gauss-kruger"
        ) {
            return None;
        }

        let mut params = Self::gauss_kruger(f64::NAN, 0.0);
        for caps in parameter_regex().captures_iter(wkt) {
            let Ok(value) = caps[2].parse::<f64>() else {
                continue;
            };
            match caps[1].to_ascii_lowercase().as_str() {
                "central_meridian" | "longitude_of_center" => params.central_meridian = value,
                "latitude_of_origin" | "latitude_of_center" => params.latitude_of_origin = value,
                "scale_factor" => params.scale_factor = value,
                "false_easting" => params.false_easting = value,
                "false_northing" => params.false_northing = value,
                _ => {}
            }
        }
        params.central_meridian.is_finite().then_some(params)
    }

    fn proj_string(&self, ellps: &str) -> String {
        format!(
            "+proj=tmerc +lat_0={} +lon_0={} +k={} +x_0={} +y_0={} {ellps} +units=m +no_defs",
            self.latitude_of_origin,
            self.central_meridian,
            self.scale_factor,
            self.false_easting,
            self.false_northing
        )
    }
}

fn projcs_name(wkt: &str) -> String {
    wkt.split('"').nth(1).unwrap_or(wkt).to_string()
}

fn utm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)UTM[_ ]zone[_ ](\d{1,2})([NS])\b").expect("valid regex"))
}

fn gk_cm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)GK_CM_(\d{2,3}(?:\.\d+)?)E").expect("valid regex"))
}

fn gk_zone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(3_Degree_)?GK_Zone_(\d{1,2})N?\b").expect("valid regex")
    })
}

fn projection_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)PROJECTION\s*\[\s*"([^"]+)""#).expect("valid regex"))
}

fn parameter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)PARAMETER\s*\[\s*"([^"]+)"\s*,\s*([-+0-9.eE]+)\s*\]"#)
            .expect("valid regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{polygon, MultiPolygon};

    const WGS84_WKT: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    const UTM50N_WKT: &str = r#"PROJCS["WGS_1984_UTM_Zone_50N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",117.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    const WEB_MERCATOR_WKT: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;

    #[test]
    fn test_geographic_wkt() {
        assert_eq!(SourceCrs::from_wkt(WGS84_WKT).unwrap(), SourceCrs::Geographic);
    }

    fn gk(cm: f64, false_easting: f64, ellps: &str) -> SourceCrs {
        SourceCrs::Projected {
            proj: TransverseMercator::gauss_kruger(cm, false_easting).proj_string(ellps),
        }
    }

    #[test]
    fn test_utm_wkt_uses_its_parameters() {
        let crs = SourceCrs::from_wkt(UTM50N_WKT).unwrap();
        match crs {
            SourceCrs::Projected { proj } => {
                assert!(proj.contains("+proj=tmerc"));
                assert!(proj.contains("+lon_0=117"));
                assert!(proj.contains("+k=0.9996"));
                assert!(proj.contains("+x_0=500000"));
            }
            other => panic!("expected projected CRS, got {other:?}"),
        }
    }

    #[test]
    fn test_utm_name_without_parameters() {
        let crs = SourceCrs::from_wkt(
            r#"PROJCS["WGS_1984_UTM_Zone_51S",GEOGCS["GCS_WGS_1984"]]"#,
        )
        .unwrap();
        match crs {
            SourceCrs::Projected { proj } => {
                assert!(proj.contains("+proj=utm"));
                assert!(proj.contains("+zone=51"));
                assert!(proj.contains("+south"));
            }
            other => panic!("expected projected CRS, got {other:?}"),
        }
    }

    #[test]
    fn test_gauss_kruger_zones() {
        let cm = SourceCrs::from_wkt(
            r#"PROJCS["CGCS2000_3_Degree_GK_CM_117E",GEOGCS["GCS_China_Geodetic_Coordinate_System_2000"]]"#,
        )
        .unwrap();
        assert_eq!(cm, gk(117.0, 500_000.0, "+ellps=GRS80"));

        let zone3 = SourceCrs::from_wkt(
            r#"PROJCS["CGCS2000_3_Degree_GK_Zone_39",GEOGCS["GCS_China_Geodetic_Coordinate_System_2000"]]"#,
        )
        .unwrap();
        assert_eq!(zone3, gk(117.0, 39_500_000.0, "+ellps=GRS80"));

        let zone6 = SourceCrs::from_wkt(
            r#"PROJCS["Beijing_1954_GK_Zone_20",GEOGCS["GCS_Beijing_1954"]]"#,
        )
        .unwrap();
        assert_eq!(zone6, gk(117.0, 20_500_000.0, "+ellps=krass"));
    }

    #[test]
    fn test_gauss_kruger_zone_with_north_suffix() {
        let crs = SourceCrs::from_wkt(
            r#"PROJCS["Beijing_1954_GK_Zone_20N",GEOGCS["GCS_Beijing_1954"]]"#,
        )
        .unwrap();
        assert_eq!(crs, gk(117.0, 20_500_000.0, "+ellps=krass"));
    }

    #[test]
    fn test_custom_transverse_mercator_parameters() {
        let wkt = r#"PROJCS["CGCS2000_Transverse_Mercator",GEOGCS["GCS_China_Geodetic_Coordinate_System_2000",DATUM["D_China_2000",SPHEROID["CGCS2000",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",114.0],PARAMETER["Scale_Factor",1.0],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
        let crs = SourceCrs::from_wkt(wkt).unwrap();
        match &crs {
            SourceCrs::Projected { proj } => {
                assert!(proj.contains("+lon_0=114"), "{proj}");
                assert!(proj.contains("+ellps=GRS80"), "{proj}");
            }
            other => panic!("expected projected CRS, got {other:?}"),
        }

        let reprojector = crs.reprojector().unwrap().unwrap();
        let (lon, lat) = reprojector.to_lon_lat(500_000.0, 3_400_000.0).unwrap();
        assert_abs_diff_eq!(lon, 114.0, epsilon = 1e-6);
        assert!(lat > 30.0 && lat < 31.5, "lat = {lat}");
    }

    #[test]
    fn test_transverse_mercator_without_central_meridian_falls_back_to_name() {
        let wkt = r#"PROJCS["Xian_1980_3_Degree_GK_CM_120E",GEOGCS["GCS_Xian_1980"],PROJECTION["Gauss_Kruger"]]"#;
        assert_eq!(
            SourceCrs::from_wkt(wkt).unwrap(),
            gk(120.0, 500_000.0, "+a=6378140 +b=6356755.288157528")
        );
    }

    #[test]
    fn test_unknown_projection_is_rejected() {
        let err = SourceCrs::from_wkt(r#"PROJCS["Asia_North_Albers_Equal_Area_Conic",GEOGCS["GCS_WGS_1984"]]"#)
            .unwrap_err();
        assert!(matches!(err, CorpusError::UnsupportedCrs(name) if name.contains("Albers")));
    }

    #[test]
    fn test_missing_prj_is_geographic() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("CC_VL.shp");
        assert_eq!(SourceCrs::for_shapefile(&shp).unwrap(), SourceCrs::Geographic);

        std::fs::write(dir.path().join("CC_VL.prj"), UTM50N_WKT).unwrap();
        assert!(matches!(
            SourceCrs::for_shapefile(&shp).unwrap(),
            SourceCrs::Projected { .. }
        ));
    }

    #[test]
    fn test_utm_reprojection_hits_central_meridian() {
        let crs = SourceCrs::from_wkt(UTM50N_WKT).unwrap();
        let reprojector = crs.reprojector().unwrap().unwrap();
        let (lon, lat) = reprojector.to_lon_lat(500_000.0, 4_400_000.0).unwrap();
        assert_abs_diff_eq!(lon, 117.0, epsilon = 1e-6);
        assert!(lat > 39.0 && lat < 40.5, "lat = {lat}");
    }

    #[test]
    fn test_web_mercator_reprojection() {
        let crs = SourceCrs::from_wkt(WEB_MERCATOR_WKT).unwrap();
        let reprojector = crs.reprojector().unwrap().unwrap();

        let (lon, lat) = reprojector.to_lon_lat(0.0, 0.0).unwrap();
        assert_abs_diff_eq!(lon, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-9);

        // half the world's width east of Greenwich
        let (lon, _) = reprojector
            .to_lon_lat(std::f64::consts::PI * 6_378_137.0 / 2.0, 0.0)
            .unwrap();
        assert_abs_diff_eq!(lon, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reproject_polygon() {
        let reprojector = Reprojector::from_proj_string(WEB_MERCATOR).unwrap();
        let square: MultiPolygon<f64> = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 0.0),
            (x: 1000.0, y: 1000.0),
            (x: 0.0, y: 1000.0),
        ]]);
        let projected = reprojector.reproject(&square).unwrap();
        let exterior = projected.0[0].exterior();
        assert!(exterior.coords().all(|c| c.x.abs() < 0.01 && c.y.abs() < 0.01));
        assert!(exterior.coords().any(|c| c.x > 0.0));
    }

    #[test]
    fn test_geographic_has_no_reprojector() {
        assert!(SourceCrs::Geographic.reprojector().unwrap().is_none());
    }
}
