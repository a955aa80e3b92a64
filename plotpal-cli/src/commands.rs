//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use plotpal_core::chat::Conversation;
use plotpal_core::config::{WORKSPACE_CONFIG_FILE, resolve_path};
use plotpal_core::corpus::{CorpusReport, save_jpeg};
use plotpal_core::discover::discover_dataset;
use plotpal_core::pipeline::sampler_for;
use plotpal_core::{CityRegistry, HttpTileSource, PlotpalConfig, TileCoord};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, config_file),
        Commands::Prompt { image, location } => handle_prompt(&image, &location),
        Commands::Discover => handle_discover(workspace, &load(workspace, config_file)?),
        Commands::Sample { city, n } => {
            handle_sample(workspace, &load(workspace, config_file)?, &city, n)
        }
        Commands::Fetch {
            lat,
            lon,
            zoom,
            out,
        } => {
            let config = load(workspace, config_file)?;
            handle_fetch(workspace, &config, lat, lon, zoom, &out).await
        }
        Commands::Build { cities, samples } => {
            handle_build(workspace, load(workspace, config_file)?, cities, samples).await
        }
        Commands::Format => handle_format(workspace, &load(workspace, config_file)?),
    }
}

fn load(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<PlotpalConfig> {
    let config = plotpal_core::config::load_config(Some(workspace), config_file, None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join(WORKSPACE_CONFIG_FILE);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&PlotpalConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

fn handle_discover(workspace: &Path, config: &PlotpalConfig) -> anyhow::Result<()> {
    let roots: Vec<PathBuf> = match &config.dataset.root {
        Some(root) => vec![resolve_path(workspace, root)],
        None => config
            .dataset
            .search_roots
            .iter()
            .map(|r| resolve_path(workspace, r))
            .collect(),
    };

    let Some(found) = discover_dataset(&roots, &config.dataset.extensions) else {
        println!("No vacant-land layers found. Searched:");
        for root in &roots {
            println!("  {}", root.display());
        }
        return Ok(());
    };

    let registry = CityRegistry::new();
    println!("Dataset root: {}", found.path.display());
    println!(
        "Layers: {} files, {} cities",
        found.layer_files,
        found.city_codes.len()
    );
    for code in &found.city_codes {
        let name = registry.name(code).unwrap_or("(unknown code)");
        println!("  {:<4} {}", code, name);
    }
    Ok(())
}

fn handle_sample(
    workspace: &Path,
    config: &PlotpalConfig,
    city: &str,
    n: Option<usize>,
) -> anyhow::Result<()> {
    let sampler = sampler_for(workspace, config)?;
    let n = n.unwrap_or(config.sampling.samples_per_city);
    let samples = sampler.sample_areas(city, n);
    if samples.is_empty() {
        println!("No samples drawn for {}.", city);
        return Ok(());
    }

    println!("{} samples for {}:", samples.len(), samples[0].city_name);
    for (i, sample) in samples.iter().enumerate() {
        println!(
            "  {:>2}. centroid ({:.5}, {:.5})  area {:>10.0} m²  bbox [{:.5}, {:.5}, {:.5}, {:.5}]",
            i + 1,
            sample.centroid_lat,
            sample.centroid_lon,
            sample.area_sqm,
            sample.bbox.west,
            sample.bbox.south,
            sample.bbox.east,
            sample.bbox.north,
        );
    }
    Ok(())
}

async fn handle_fetch(
    workspace: &Path,
    config: &PlotpalConfig,
    lat: f64,
    lon: f64,
    zoom: Option<u8>,
    out: &Path,
) -> anyhow::Result<()> {
    let source = HttpTileSource::new(&config.tiles)?;
    let coord = TileCoord::from_lat_lon(lat, lon, zoom.unwrap_or(config.tiles.zoom));
    println!("Fetching tile {} from {}", coord, source.tile_url(&coord));

    let image = source
        .fetch_tile(&coord)
        .await
        .map_err(|e| anyhow::anyhow!("Tile fetch failed: {}", e))?;
    let out = resolve_path(workspace, out);
    save_jpeg(&image, &out, config.output.jpeg_quality)?;
    println!(
        "Saved {}x{} image to {}",
        image.width(),
        image.height(),
        out.display()
    );
    Ok(())
}

async fn handle_build(
    workspace: &Path,
    mut config: PlotpalConfig,
    cities: Vec<String>,
    samples: Option<usize>,
) -> anyhow::Result<()> {
    if !cities.is_empty() {
        config.dataset.cities = cities;
    }
    if let Some(samples) = samples {
        config.sampling.samples_per_city = samples;
    }

    let report = plotpal_core::build_corpus(workspace, &config).await?;
    print_build_summary(&report);
    Ok(())
}

fn print_build_summary(report: &CorpusReport) {
    println!("Dataset created: {} samples", report.records.len());
    println!("  vacant:    {}", report.vacant_count());
    println!("  developed: {}", report.developed_count());
    for (code, count) in &report.per_city {
        println!("  {:<4} {}", code, count);
    }
    if !report.cities_skipped.is_empty() {
        println!("  skipped cities: {}", report.cities_skipped.join(", "));
    }
    if report.failed_fetches + report.developed_missing + report.failed_writes > 0 {
        println!(
            "  failed fetches: {}, missing developed: {}, failed writes: {}",
            report.failed_fetches, report.developed_missing, report.failed_writes
        );
    }
    println!("Metadata: {}", report.metadata_path.display());
}

fn handle_format(workspace: &Path, config: &PlotpalConfig) -> anyhow::Result<()> {
    let report = plotpal_core::format_corpus(workspace, config)?;
    println!(
        "Formatted {} of {} records",
        report.formatted, report.records
    );
    println!("  train: {} -> {}", report.train, report.train_path.display());
    println!("  eval:  {} -> {}", report.eval, report.eval_path.display());
    println!("  manifest: {}", report.manifest_path.display());
    if !report.issues.is_empty() {
        println!("  {} conversation issues (see log)", report.issues.len());
    }
    Ok(())
}

fn handle_prompt(image: &str, location: &str) -> anyhow::Result<()> {
    let conversation = Conversation::for_inference(image, location);
    println!("{}", serde_json::to_string_pretty(&conversation)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).await.unwrap();

        let config_path = workspace.join(WORKSPACE_CONFIG_FILE);
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: PlotpalConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.sampling.seed, 42);
        assert_eq!(parsed.tiles.zoom, 17);
        assert_eq!(parsed.dataset.cities, vec!["CC", "BJ", "SH", "GZ"]);
    }

    #[tokio::test]
    async fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let config_path = workspace.join(WORKSPACE_CONFIG_FILE);
        std::fs::write(&config_path, "[sampling]\nseed = 7\n").unwrap();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).await.unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "[sampling]\nseed = 7\n");
    }

    #[tokio::test]
    async fn test_format_without_corpus_fails() {
        let dir = TempDir::new().unwrap();
        let result = handle_command(Commands::Format, dir.path(), None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_discover_with_no_dataset_succeeds() {
        let dir = TempDir::new().unwrap();
        handle_command(Commands::Discover, dir.path(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_prompt_needs_no_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(WORKSPACE_CONFIG_FILE), "not = [valid").unwrap();
        let command = Commands::Prompt {
            image: "tile.jpg".into(),
            location: "Changchun, China".into(),
        };
        handle_command(command, dir.path(), None).await.unwrap();
    }
}
