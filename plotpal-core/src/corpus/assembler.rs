//! Corpus assembly: sample polygons, fetch vacant and developed tiles, save
//! images, and write the metadata table.

use super::metadata::write_metadata;
use super::record::{ImageKind, TrainingRecord};
use crate::config::OutputConfig;
use crate::error::CorpusError;
use crate::sampler::{GeometrySampler, PolygonSample};
use crate::tiles::TileSource;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Outcome of one assembly run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusReport {
    pub records: Vec<TrainingRecord>,
    pub metadata_path: PathBuf,
    /// Records emitted per city code.
    pub per_city: BTreeMap<String, usize>,
    /// Cities that produced no samples (missing layer, unknown code, empty layer).
    pub cities_skipped: Vec<String>,
    /// Samples dropped because the vacant tile could not be fetched.
    pub failed_fetches: usize,
    /// Samples whose developed counterpart could not be fetched.
    pub developed_missing: usize,
    /// Images that were fetched but could not be written.
    pub failed_writes: usize,
}

impl CorpusReport {
    pub fn vacant_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_vacant_land).count()
    }

    pub fn developed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.has_vacant_land).count()
    }

    /// Every record references exactly one saved image.
    pub fn images_saved(&self) -> usize {
        self.records.len()
    }
}

/// Builds the labelled image corpus for a list of cities.
pub struct CorpusAssembler {
    sampler: GeometrySampler,
    tiles: Box<dyn TileSource>,
    output: OutputConfig,
    zoom: u8,
}

impl CorpusAssembler {
    pub fn new(
        sampler: GeometrySampler,
        tiles: Box<dyn TileSource>,
        output: OutputConfig,
        zoom: u8,
    ) -> Self {
        Self {
            sampler,
            tiles,
            output,
            zoom,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output.images_dir()
    }

    /// Process every city in order and write the metadata table.
    ///
    /// Per-city and per-sample failures are logged and counted; only failing to
    /// create the output directory or write the table aborts the run.
    pub async fn assemble(
        &self,
        cities: &[String],
        samples_per_city: usize,
    ) -> Result<CorpusReport, CorpusError> {
        let images_dir = self.images_dir();
        std::fs::create_dir_all(&images_dir)?;

        let mut report = CorpusReport {
            metadata_path: self.output.metadata_path(),
            ..CorpusReport::default()
        };

        for code in cities {
            let samples = self.sampler.sample_areas(code, samples_per_city);
            if samples.is_empty() {
                tracing::warn!(city = %code, "no samples found");
                report.cities_skipped.push(code.clone());
                continue;
            }

            let before = report.records.len();
            for (index, sample) in samples.iter().enumerate() {
                tracing::info!(city = %code, "fetching image {}/{}", index + 1, samples.len());
                self.process_sample(sample, index, &images_dir, &mut report)
                    .await;
            }
            let emitted = report.records.len() - before;
            report.per_city.insert(code.clone(), emitted);
            tracing::info!(city = %code, records = emitted, "city complete");
        }

        write_metadata(&report.metadata_path, &report.records)?;
        tracing::info!(
            total = report.records.len(),
            vacant = report.vacant_count(),
            developed = report.developed_count(),
            path = %report.metadata_path.display(),
            "metadata saved"
        );

        Ok(report)
    }

    async fn process_sample(
        &self,
        sample: &PolygonSample,
        index: usize,
        images_dir: &Path,
        report: &mut CorpusReport,
    ) {
        let code = &sample.city_code;

        let Some(vacant) = self.tiles.fetch_image(&sample.bbox, self.zoom).await else {
            tracing::warn!(city = %code, index, "failed to fetch vacant image");
            report.failed_fetches += 1;
            return;
        };
        let vacant_path = images_dir.join(ImageKind::Vacant.file_name(code, index));
        if let Err(e) = save_jpeg(&vacant, &vacant_path, self.output.jpeg_quality) {
            tracing::warn!(path = %vacant_path.display(), error = %e, "failed to save image");
            report.failed_writes += 1;
            return;
        }
        report
            .records
            .push(TrainingRecord::vacant(sample, &vacant_path));

        let shifted = sample.bbox.shifted(self.sampler.sampling().offset_deg);
        let Some(developed) = self.tiles.fetch_image(&shifted, self.zoom).await else {
            tracing::debug!(city = %code, index, "no developed counterpart");
            report.developed_missing += 1;
            return;
        };
        let developed_path = images_dir.join(ImageKind::Developed.file_name(code, index));
        if let Err(e) = save_jpeg(&developed, &developed_path, self.output.jpeg_quality) {
            tracing::warn!(path = %developed_path.display(), error = %e, "failed to save image");
            report.failed_writes += 1;
            return;
        }
        report
            .records
            .push(TrainingRecord::developed(sample, &developed_path));
    }
}

/// Encode an RGB raster as JPEG at the given quality.
///
/// A failed encode removes the partial file so no truncated image is left behind.
pub fn save_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<(), CorpusError> {
    let result = write_jpeg(image, path, quality);
    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<(), CorpusError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    image.write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}
