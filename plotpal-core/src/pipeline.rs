//! End-to-end runs wiring configuration into the sampler, fetcher and assembler.
//!
//! Every input (workspace, data root, cities, counts) is passed in explicitly.

use crate::chat::{ChatDataset, FineTuneManifest, MANIFEST_FILE, SplitFile};
use crate::config::{OutputConfig, PlotpalConfig, resolve_path};
use crate::corpus::{CorpusAssembler, CorpusReport, read_metadata};
use crate::discover::discover_dataset;
use crate::error::CorpusError;
use crate::sampler::GeometrySampler;
use crate::tiles::{HttpTileSource, TileSource};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const TRAIN_FILE: &str = "train.jsonl";
pub const EVAL_FILE: &str = "eval.jsonl";

/// Dataset root: the configured one, else the first search root holding layers.
pub fn resolve_data_root(workspace: &Path, config: &PlotpalConfig) -> Result<PathBuf, CorpusError> {
    if let Some(root) = &config.dataset.root {
        let root = resolve_path(workspace, root);
        if !root.is_dir() {
            return Err(CorpusError::not_found(format!(
                "dataset root {}",
                root.display()
            )));
        }
        return Ok(root);
    }

    let roots: Vec<PathBuf> = config
        .dataset
        .search_roots
        .iter()
        .map(|r| resolve_path(workspace, r))
        .collect();
    discover_dataset(&roots, &config.dataset.extensions)
        .map(|found| found.path)
        .ok_or_else(|| {
            CorpusError::not_found(format!(
                "no *_VL layers under any search root of {}",
                workspace.display()
            ))
        })
}

/// Output settings with the corpus directory resolved against the workspace.
pub fn resolved_output(workspace: &Path, config: &PlotpalConfig) -> OutputConfig {
    OutputConfig {
        dir: resolve_path(workspace, &config.output.dir),
        ..config.output.clone()
    }
}

pub fn sampler_for(
    workspace: &Path,
    config: &PlotpalConfig,
) -> Result<GeometrySampler, CorpusError> {
    let root = resolve_data_root(workspace, config)?;
    Ok(GeometrySampler::new(root, &config.dataset, &config.sampling))
}

/// Build the image corpus and metadata table for the configured cities.
pub async fn build_corpus(
    workspace: &Path,
    config: &PlotpalConfig,
) -> Result<CorpusReport, CorpusError> {
    let tiles = HttpTileSource::new(&config.tiles)?;
    build_corpus_with(workspace, config, Box::new(tiles)).await
}

/// Same as [`build_corpus`] with a caller-supplied tile source.
pub async fn build_corpus_with(
    workspace: &Path,
    config: &PlotpalConfig,
    tiles: Box<dyn TileSource>,
) -> Result<CorpusReport, CorpusError> {
    let sampler = sampler_for(workspace, config)?;
    tracing::info!(root = %sampler.data_root().display(), "using dataset root");

    let assembler = CorpusAssembler::new(
        sampler,
        tiles,
        resolved_output(workspace, config),
        config.tiles.zoom,
    );
    assembler
        .assemble(&config.dataset.cities, config.sampling.samples_per_city)
        .await
}

/// Outcome of formatting a corpus for training.
#[derive(Debug, Clone, Serialize)]
pub struct FormatReport {
    pub records: usize,
    pub formatted: usize,
    pub train: usize,
    pub eval: usize,
    pub train_path: PathBuf,
    pub eval_path: PathBuf,
    pub manifest_path: PathBuf,
    pub issues: Vec<String>,
}

/// Read the metadata table, format conversations, write train/eval JSONL and the manifest.
pub fn format_corpus(
    workspace: &Path,
    config: &PlotpalConfig,
) -> Result<FormatReport, CorpusError> {
    let output = resolved_output(workspace, config);
    let records = read_metadata(&output.metadata_path())?;

    let dataset = ChatDataset::from_records(&records, &config.training.system_prompt);
    let issues = dataset.validate();
    for issue in &issues {
        tracing::warn!(%issue, "conversation check failed");
    }

    let (train, eval) = dataset.prepare(
        config.training.train_ratio,
        config.training.min_formatted_samples,
        config.training.min_train_samples,
    )?;

    let train_path = output.dir.join(TRAIN_FILE);
    let eval_path = output.dir.join(EVAL_FILE);
    train.export_jsonl(&train_path)?;
    eval.export_jsonl(&eval_path)?;

    let manifest = FineTuneManifest::new(
        &config.training.base_model,
        &resolve_path(workspace, &config.training.adapter_dir),
        SplitFile::describe(&train_path, train.len())?,
        SplitFile::describe(&eval_path, eval.len())?,
    );
    let manifest_path = output.dir.join(MANIFEST_FILE);
    manifest.save(&manifest_path)?;

    tracing::info!(
        train = train.len(),
        eval = eval.len(),
        path = %output.dir.display(),
        "training splits written"
    );

    Ok(FormatReport {
        records: records.len(),
        formatted: dataset.len(),
        train: train.len(),
        eval: eval.len(),
        train_path,
        eval_path,
        manifest_path,
        issues,
    })
}
