//! Corpus assembly: labelled images, prompt templates, metadata table.

pub mod assembler;
pub mod metadata;
pub mod record;

pub use assembler::{CorpusAssembler, CorpusReport, save_jpeg};
pub use metadata::{read_metadata, write_metadata};
pub use record::{ImageKind, TrainingRecord};
