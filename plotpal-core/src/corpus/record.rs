//! Training records and the fixed prompt templates attached to them.

use crate::sampler::PolygonSample;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One labelled image destined for supervised fine-tuning.
///
/// Field order is the column order of the metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub image_path: String,
    pub city: String,
    pub city_code: String,
    pub has_vacant_land: bool,
    pub query: String,
    pub answer: String,
}

impl TrainingRecord {
    /// Record for the tile covering the sampled vacant polygon.
    pub fn vacant(sample: &PolygonSample, image_path: &Path) -> Self {
        Self {
            image_path: image_path.display().to_string(),
            city: sample.city_name.clone(),
            city_code: sample.city_code.clone(),
            has_vacant_land: true,
            query: analysis_query(&sample.city_name),
            answer: vacant_answer(&sample.city_name, sample.area_sqm),
        }
    }

    /// Record for the offset tile assumed to show developed land.
    pub fn developed(sample: &PolygonSample, image_path: &Path) -> Self {
        Self {
            image_path: image_path.display().to_string(),
            city: sample.city_name.clone(),
            city_code: sample.city_code.clone(),
            has_vacant_land: false,
            query: analysis_query(&sample.city_name),
            answer: developed_answer(&sample.city_name),
        }
    }
}

/// Which of the two images a record was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Vacant,
    Developed,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacant => "vacant",
            Self::Developed => "developed",
        }
    }

    /// `<CODE>_<ii>_<kind>.jpg`
    pub fn file_name(&self, city_code: &str, index: usize) -> String {
        format!("{city_code}_{index:02}_{}.jpg", self.as_str())
    }
}

pub fn analysis_query(city: &str) -> String {
    format!(
        "Analyze this satellite image of {city} and identify vacant spaces suitable for urban development."
    )
}

pub fn vacant_answer(city: &str, area_sqm: f64) -> String {
    format!(
        "I can identify vacant land in this satellite image from {city}. The area shows undeveloped space of approximately {area_sqm:.0} square meters that appears suitable for development. The vacant land is characterized by open space without existing buildings or dense infrastructure."
    )
}

pub fn developed_answer(city: &str) -> String {
    format!(
        "In this satellite image from {city}, I can see developed urban area with existing buildings and infrastructure. There are no significant vacant spaces visible that would be suitable for new development."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BoundingBox;
    use pretty_assertions::assert_eq;

    fn sample() -> PolygonSample {
        PolygonSample {
            city_code: "CC".into(),
            city_name: "Changchun".into(),
            bbox: BoundingBox::around(125.3, 43.8, 0.0045),
            area_sqm: 15_234.6,
            centroid_lat: 43.8,
            centroid_lon: 125.3,
        }
    }

    #[test]
    fn test_vacant_record() {
        let record = TrainingRecord::vacant(&sample(), Path::new("images/CC_00_vacant.jpg"));
        assert!(record.has_vacant_land);
        assert_eq!(record.city, "Changchun");
        assert_eq!(record.image_path, "images/CC_00_vacant.jpg");
        assert_eq!(
            record.query,
            "Analyze this satellite image of Changchun and identify vacant spaces suitable for urban development."
        );
        assert!(record.answer.contains("approximately 15235 square meters"));
    }

    #[test]
    fn test_developed_record() {
        let record = TrainingRecord::developed(&sample(), Path::new("images/CC_00_developed.jpg"));
        assert!(!record.has_vacant_land);
        assert_eq!(record.query, analysis_query("Changchun"));
        assert!(record.answer.starts_with("In this satellite image from Changchun"));
    }

    #[test]
    fn test_image_file_names() {
        assert_eq!(ImageKind::Vacant.file_name("CC", 3), "CC_03_vacant.jpg");
        assert_eq!(ImageKind::Developed.file_name("SJZ", 12), "SJZ_12_developed.jpg");
    }
}
