//! VLM chat formatting: conversation schema, train/eval split, fine-tune manifest.

pub mod dataset;
pub mod manifest;
pub mod message;

pub use dataset::ChatDataset;
pub use manifest::{
    FineTuneManifest, LoraConfig, MANIFEST_FILE, QuantizationConfig, SftArguments, SplitFile,
};
pub use message::{ChatMessage, ContentPart, Conversation, Role};
