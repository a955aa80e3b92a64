//! # plotpal-core: vacant-land corpus construction
//!
//! Turns per-city vacant-land polygon layers into a supervised fine-tuning corpus
//! for a vision-language model:
//!
//! 1. **Sampling**: locate a city's layer, bring it into WGS84, and draw a
//!    seeded sample of polygons as centroids with fixed-size bounding boxes.
//! 2. **Tiles**: map each box to one slippy-map tile and fetch it over HTTP.
//! 3. **Corpus**: save a "vacant" image per sample plus an offset "developed"
//!    counterpart, attach prompt/answer templates, and write a metadata table.
//! 4. **Chat**: format records into system/user/assistant conversations, split
//!    them into train/eval JSONL, and describe the fine-tuning run.
//!
//! The model, adapters and training loop live outside this crate.

pub mod bbox;
pub mod chat;
pub mod cities;
pub mod config;
pub mod corpus;
pub mod discover;
pub mod error;
pub mod pipeline;
pub mod sampler;
pub mod tiles;

pub use bbox::BoundingBox;
pub use cities::CityRegistry;
pub use config::{PlotpalConfig, load_config};
pub use error::CorpusError;
pub use pipeline::{FormatReport, build_corpus, format_corpus};
pub use sampler::{GeometrySampler, PolygonSample};
pub use tiles::{HttpTileSource, TileCoord, TileSource};
