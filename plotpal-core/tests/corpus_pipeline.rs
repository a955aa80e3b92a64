//! End-to-end corpus construction against an on-disk layer and a stub tile source.

use async_trait::async_trait;
use image::RgbImage;
use plotpal_core::chat::{Conversation, FineTuneManifest, Role};
use plotpal_core::corpus::read_metadata;
use plotpal_core::pipeline::{build_corpus_with, format_corpus};
use plotpal_core::{BoundingBox, PlotpalConfig, TileSource};
use pretty_assertions::assert_eq;
use std::path::Path;

/// Serves a tile for every box starting west of `fail_east_of`, nothing for the rest.
struct StubTiles {
    fail_east_of: f64,
}

#[async_trait]
impl TileSource for StubTiles {
    async fn fetch_image(&self, bbox: &BoundingBox, _zoom: u8) -> Option<RgbImage> {
        (bbox.west < self.fail_east_of)
            .then(|| RgbImage::from_pixel(256, 256, image::Rgb([120, 110, 90])))
    }
}

fn write_city(root: &Path, code: &str, base_lon: f64, squares: usize) {
    let features: Vec<String> = (0..squares)
        .map(|i| {
            let w = base_lon + i as f64 * 0.1;
            let e = w + 0.001;
            format!(
                r#"{{"type":"Feature","properties":{{"id":{i}}},"geometry":{{"type":"Polygon","coordinates":[[[{w},30.0],[{e},30.0],[{e},30.001],[{w},30.001],[{w},30.0]]]}}}}"#
            )
        })
        .collect();
    std::fs::write(
        root.join(format!("{code}_VL.geojson")),
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(",")),
    )
    .unwrap();
}

fn workspace_config(ws: &Path) -> PlotpalConfig {
    let data = ws.join("DT43");
    std::fs::create_dir_all(&data).unwrap();
    // Wuhan: eight polygons, Hangzhou: four
    write_city(&data, "WH", 114.0, 8);
    write_city(&data, "HZ", 120.0, 4);

    let mut config = PlotpalConfig::default();
    config.dataset.cities = vec!["WH".into(), "HZ".into(), "ZZ".into()];
    config.sampling.samples_per_city = 5;
    config
}

#[tokio::test]
async fn builds_and_formats_full_corpus() {
    let ws = tempfile::tempdir().unwrap();
    let config = workspace_config(ws.path());

    let tiles = Box::new(StubTiles { fail_east_of: 180.0 });
    let report = build_corpus_with(ws.path(), &config, tiles).await.unwrap();

    // WH: 5 samples, HZ: 4 samples, ZZ has no layer
    assert_eq!(report.per_city.get("WH"), Some(&10));
    assert_eq!(report.per_city.get("HZ"), Some(&8));
    assert_eq!(report.cities_skipped, vec!["ZZ".to_string()]);
    assert_eq!(report.vacant_count(), 9);
    assert_eq!(report.developed_count(), 9);

    let images_dir = ws.path().join("training_data").join("images");
    let saved = std::fs::read_dir(&images_dir).unwrap().count();
    let rows = read_metadata(&report.metadata_path).unwrap();
    assert_eq!(rows.len(), saved);
    assert!(rows.iter().all(|r| Path::new(&r.image_path).is_file()));

    let formatted = format_corpus(ws.path(), &config).unwrap();
    assert_eq!(formatted.formatted, 18);
    assert_eq!(formatted.train, 14);
    assert_eq!(formatted.eval, 4);
    assert!(formatted.issues.is_empty());

    let first_line = std::fs::read_to_string(&formatted.train_path)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string();
    let conv: Conversation = serde_json::from_str(&first_line).unwrap();
    assert_eq!(conv.messages.len(), 3);
    assert_eq!(conv.turn_text(Role::System).unwrap(), config.training.system_prompt);

    let manifest = FineTuneManifest::load(&formatted.manifest_path).unwrap();
    assert_eq!(manifest.train.conversations, 14);
    assert_eq!(manifest.base_model, "Qwen/Qwen2-VL-7B-Instruct");
}

#[tokio::test]
async fn sampling_is_reproducible_across_runs() {
    let ws_a = tempfile::tempdir().unwrap();
    let ws_b = tempfile::tempdir().unwrap();
    let config_a = workspace_config(ws_a.path());
    let config_b = workspace_config(ws_b.path());

    let a = plotpal_core::pipeline::sampler_for(ws_a.path(), &config_a)
        .unwrap()
        .sample_areas("WH", 3);
    let b = plotpal_core::pipeline::sampler_for(ws_b.path(), &config_b)
        .unwrap()
        .sample_areas("WH", 3);
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
    for sample in &a {
        assert!((sample.bbox.width() - 2.0 * config_a.sampling.buffer_deg).abs() < 1e-9);
    }
}

#[tokio::test]
async fn missing_developed_tiles_shrink_corpus_consistently() {
    let ws = tempfile::tempdir().unwrap();
    let mut config = workspace_config(ws.path());
    config.dataset.cities = vec!["HZ".into()];

    // the last polygon's box starts just west of 120.3; shifted east by the
    // developed offset it crosses the line and its tile goes missing
    let tiles = Box::new(StubTiles { fail_east_of: 120.3 });
    let report = build_corpus_with(ws.path(), &config, tiles).await.unwrap();

    let saved = std::fs::read_dir(ws.path().join("training_data").join("images"))
        .unwrap()
        .count();
    assert_eq!(report.images_saved(), saved);
    assert_eq!(report.vacant_count(), 4);
    assert_eq!(report.developed_count(), 3);
    assert_eq!(report.failed_fetches, 0);
    assert_eq!(report.developed_missing, 1);

    // too few records for a training split with default minimums
    assert!(format_corpus(ws.path(), &config).is_err());
}
