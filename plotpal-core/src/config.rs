//! Configuration system for PlotPal.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/plotpal/config.toml` and/or `plotpal.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the workspace-local configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "plotpal.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotpalConfig {
    /// Where the vacant-land layers live and which cities to process.
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Polygon sampling parameters.
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Satellite tile server settings.
    #[serde(default)]
    pub tiles: TileConfig,
    /// Output layout for images and metadata.
    #[serde(default)]
    pub output: OutputConfig,
    /// Chat formatting and fine-tune manifest settings.
    #[serde(default)]
    pub training: TrainingConfig,
}

impl PlotpalConfig {
    /// Check the configuration for values that would produce an unusable corpus.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.sampling.buffer_deg <= 0.0 {
            warnings.push(format!(
                "sampling.buffer_deg is {}; bounding boxes will be empty",
                self.sampling.buffer_deg
            ));
        }
        let tile_width_deg = 360.0 / 2f64.powi(self.tiles.zoom as i32);
        if self.sampling.offset_deg.abs() < tile_width_deg {
            warnings.push(format!(
                "sampling.offset_deg ({}) is narrower than one tile at zoom {} ({:.5}); developed images may repeat vacant ones",
                self.sampling.offset_deg, self.tiles.zoom, tile_width_deg
            ));
        }
        if self.tiles.zoom > 22 {
            warnings.push(format!(
                "tiles.zoom is {}; most tile servers stop at 22",
                self.tiles.zoom
            ));
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tiles.url_template.contains(placeholder) {
                warnings.push(format!("tiles.url_template is missing {placeholder}"));
            }
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            warnings.push(format!(
                "output.jpeg_quality is {}; expected 1-100",
                self.output.jpeg_quality
            ));
        }
        if !(self.training.train_ratio > 0.0 && self.training.train_ratio < 1.0) {
            warnings.push(format!(
                "training.train_ratio is {}; expected a value between 0 and 1",
                self.training.train_ratio
            ));
        }
        if self.dataset.extensions.is_empty() {
            warnings.push("dataset.extensions is empty; no layers can be found".to_string());
        }

        warnings
    }
}

/// Dataset location and city selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset root. When unset, `search_roots` are tried in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Candidate roots tried by discovery, relative to the workspace.
    #[serde(default = "default_search_roots")]
    pub search_roots: Vec<PathBuf>,
    /// Layer file extensions, in lookup order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// City codes processed by `build`.
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
    /// proj string forced for every layer, bypassing `.prj` detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_proj: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: None,
            search_roots: default_search_roots(),
            extensions: default_extensions(),
            cities: default_cities(),
            source_proj: None,
        }
    }
}

fn default_search_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from("DT43/Vacant lands of 36 major Chinese cities"),
        PathBuf::from("DT43"),
        PathBuf::from("Vacant lands of 36 major Chinese cities"),
        PathBuf::from("."),
    ]
}

fn default_extensions() -> Vec<String> {
    vec!["shp".to_string(), "geojson".to_string()]
}

fn default_cities() -> Vec<String> {
    ["CC", "BJ", "SH", "GZ"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Polygon sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Polygons drawn per city.
    #[serde(default = "default_samples_per_city")]
    pub samples_per_city: usize,
    /// RNG seed; identical seeds reproduce identical samples.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Half the side of the square bounding box, in degrees (~500 m box).
    #[serde(default = "default_buffer_deg")]
    pub buffer_deg: f64,
    /// Offset added to every bbox coordinate for the developed counterpart (~900 m).
    #[serde(default = "default_offset_deg")]
    pub offset_deg: f64,
    /// Flat-earth conversion factor used for polygon areas.
    #[serde(default = "default_meters_per_degree")]
    pub meters_per_degree: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            samples_per_city: default_samples_per_city(),
            seed: default_seed(),
            buffer_deg: default_buffer_deg(),
            offset_deg: default_offset_deg(),
            meters_per_degree: default_meters_per_degree(),
        }
    }
}

fn default_samples_per_city() -> usize {
    6
}

fn default_seed() -> u64 {
    42
}

fn default_buffer_deg() -> f64 {
    0.0045
}

fn default_offset_deg() -> f64 {
    0.008
}

fn default_meters_per_degree() -> f64 {
    111_000.0
}

/// Tile server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileConfig {
    /// URL template with `{z}`, `{y}` and `{x}` placeholders.
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            zoom: default_zoom(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_url_template() -> String {
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
        .to_string()
}

fn default_zoom() -> u8 {
    17
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("plotpal/{}", env!("CARGO_PKG_VERSION"))
}

/// Output layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Corpus directory, relative to the workspace unless absolute.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_images_subdir")]
    pub images_subdir: String,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            images_subdir: default_images_subdir(),
            metadata_file: default_metadata_file(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl OutputConfig {
    pub fn images_dir(&self) -> PathBuf {
        self.dir.join(&self.images_subdir)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(&self.metadata_file)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("training_data")
}

fn default_images_subdir() -> String {
    "images".to_string()
}

fn default_metadata_file() -> String {
    "dataset_metadata.csv".to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}

/// Chat formatting and fine-tune manifest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of formatted conversations assigned to the train split.
    #[serde(default = "default_train_ratio")]
    pub train_ratio: f64,
    /// Minimum number of formatted conversations before a split is written.
    #[serde(default = "default_min_formatted")]
    pub min_formatted_samples: usize,
    /// Minimum number of conversations in the train split.
    #[serde(default = "default_min_train")]
    pub min_train_samples: usize,
    /// System turn placed at the head of every training conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Base vision-language model the adapter is trained against.
    #[serde(default = "default_base_model")]
    pub base_model: String,
    /// Directory the external trainer saves the adapter to.
    #[serde(default = "default_adapter_dir")]
    pub adapter_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_ratio: default_train_ratio(),
            min_formatted_samples: default_min_formatted(),
            min_train_samples: default_min_train(),
            system_prompt: default_system_prompt(),
            base_model: default_base_model(),
            adapter_dir: default_adapter_dir(),
        }
    }
}

fn default_train_ratio() -> f64 {
    0.8
}

fn default_min_formatted() -> usize {
    10
}

fn default_min_train() -> usize {
    8
}

fn default_system_prompt() -> String {
    "You are an expert urban planner and satellite imagery analyst specializing in identifying vacant land suitable for development. \
Your task is to analyze satellite images and identify vacant spaces, undeveloped lots, and areas suitable for urban development.
Focus on:
1. Empty lots and undeveloped land
2. Large parking areas that could be redeveloped
3. Abandoned or underutilized industrial sites
4. Areas with good accessibility and infrastructure
Provide detailed analysis of development potential and suitability."
        .to_string()
}

fn default_base_model() -> String {
    "Qwen/Qwen2-VL-7B-Instruct".to_string()
}

fn default_adapter_dir() -> PathBuf {
    PathBuf::from("qwen2-vl-vacant-land")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `PLOTPAL_`)
/// 3. Explicit config file (`--config`)
/// 4. Workspace-local config (`plotpal.toml`)
/// 5. User config (`~/.config/plotpal/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&PlotpalConfig>,
) -> Result<PlotpalConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(PlotpalConfig::default()));

    if let Some(path) = user_config_path() {
        if path.exists() {
            figment = figment.merge(Toml::file(&path));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }

    // PLOTPAL_SAMPLING__SEED, PLOTPAL_TILES__ZOOM, ...
    figment = figment.merge(Env::prefixed("PLOTPAL_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Location of the user-level config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "plotpal", "plotpal")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Resolve a configured path against the workspace unless it is already absolute.
pub fn resolve_path(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}
