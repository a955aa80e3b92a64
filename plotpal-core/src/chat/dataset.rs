//! Chat dataset preparation for fine-tuning.

use super::message::{Conversation, Role};
use crate::corpus::TrainingRecord;
use crate::error::CorpusError;
use std::io::Write;
use std::path::Path;

/// Ordered collection of formatted conversations.
#[derive(Debug, Clone, Default)]
pub struct ChatDataset {
    conversations: Vec<Conversation>,
}

impl ChatDataset {
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
        }
    }

    /// Format records, dropping any whose image is not on disk.
    pub fn from_records(records: &[TrainingRecord], system_prompt: &str) -> Self {
        let mut dataset = Self::new();
        for record in records {
            if !Path::new(&record.image_path).is_file() {
                tracing::warn!(path = %record.image_path, "image not found, skipping record");
                continue;
            }
            dataset.add_conversation(Conversation::from_record(record, system_prompt));
        }
        tracing::info!(
            formatted = dataset.len(),
            total = records.len(),
            "formatted records for training"
        );
        dataset
    }

    pub fn add_conversation(&mut self, conv: Conversation) {
        self.conversations.push(conv);
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Order-preserving split: the first `floor(ratio * len)` go to train.
    pub fn split(&self, train_ratio: f64) -> (ChatDataset, ChatDataset) {
        let ratio = train_ratio.clamp(0.0, 1.0);
        let train_len = (ratio * self.len() as f64).floor() as usize;
        let (train, eval) = self.conversations.split_at(train_len);
        (
            ChatDataset {
                conversations: train.to_vec(),
            },
            ChatDataset {
                conversations: eval.to_vec(),
            },
        )
    }

    /// Split, refusing datasets too small to train on.
    pub fn prepare(
        &self,
        train_ratio: f64,
        min_formatted: usize,
        min_train: usize,
    ) -> Result<(ChatDataset, ChatDataset), CorpusError> {
        if self.len() < min_formatted {
            return Err(CorpusError::InsufficientSamples {
                stage: "formatted",
                required: min_formatted,
                actual: self.len(),
            });
        }
        let (train, eval) = self.split(train_ratio);
        if train.len() < min_train {
            return Err(CorpusError::InsufficientSamples {
                stage: "train",
                required: min_train,
                actual: train.len(),
            });
        }
        Ok((train, eval))
    }

    /// Export to a JSONL file, one conversation per line.
    pub fn export_jsonl(&self, path: &Path) -> Result<usize, CorpusError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        for conv in &self.conversations {
            serde_json::to_writer(&mut writer, conv)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(self.conversations.len())
    }

    /// Check conversations for empty turns and out-of-order roles.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (i, conv) in self.conversations.iter().enumerate() {
            if conv.messages.is_empty() {
                issues.push(format!("Conversation {i}: empty"));
                continue;
            }
            let roles: Vec<Role> = conv.messages.iter().map(|m| m.role).collect();
            if roles != [Role::System, Role::User, Role::Assistant] {
                issues.push(format!("Conversation {i}: unexpected turn order {roles:?}"));
            }
            for (j, msg) in conv.messages.iter().enumerate() {
                if msg.content.is_empty() || msg.text().trim().is_empty() {
                    issues.push(format!("Conversation {i}, message {j}: empty content"));
                }
            }
            if conv.images.is_empty() {
                issues.push(format!("Conversation {i}: no image"));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::{ChatMessage, ContentPart};

    fn conv(n: usize) -> Conversation {
        Conversation::from_record(
            &TrainingRecord {
                image_path: format!("img_{n}.jpg"),
                city: "Wuhan".into(),
                city_code: "WH".into(),
                has_vacant_land: n % 2 == 0,
                query: "q".into(),
                answer: format!("answer {n}"),
            },
            "system",
        )
    }

    fn dataset(n: usize) -> ChatDataset {
        let mut ds = ChatDataset::new();
        for i in 0..n {
            ds.add_conversation(conv(i));
        }
        ds
    }

    #[test]
    fn test_split_keeps_order() {
        let (train, eval) = dataset(12).split(0.8);
        assert_eq!(train.len(), 9);
        assert_eq!(eval.len(), 3);
        assert_eq!(
            train.conversations()[0].turn_text(Role::Assistant).as_deref(),
            Some("answer 0")
        );
        assert_eq!(
            eval.conversations()[0].turn_text(Role::Assistant).as_deref(),
            Some("answer 9")
        );
    }

    #[test]
    fn test_prepare_enforces_minimums() {
        let err = dataset(6).prepare(0.8, 10, 8).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::InsufficientSamples { stage: "formatted", required: 10, actual: 6 }
        ));

        // 10 formatted but only 7 would go to train at 0.75
        let err = dataset(10).prepare(0.75, 10, 8).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::InsufficientSamples { stage: "train", actual: 7, .. }
        ));

        let (train, eval) = dataset(10).prepare(0.8, 10, 8).unwrap();
        assert_eq!((train.len(), eval.len()), (8, 2));
    }

    #[test]
    fn test_from_records_skips_missing_images() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("BJ_00_vacant.jpg");
        std::fs::write(&present, b"jpeg").unwrap();

        let records = vec![
            TrainingRecord {
                image_path: present.display().to_string(),
                city: "Beijing".into(),
                city_code: "BJ".into(),
                has_vacant_land: true,
                query: "q".into(),
                answer: "a".into(),
            },
            TrainingRecord {
                image_path: dir.path().join("gone.jpg").display().to_string(),
                city: "Beijing".into(),
                city_code: "BJ".into(),
                has_vacant_land: false,
                query: "q".into(),
                answer: "a".into(),
            },
        ];
        let ds = ChatDataset::from_records(&records, "sys");
        assert_eq!(ds.len(), 1);
        assert!(ds.validate().is_empty());
    }

    #[test]
    fn test_export_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.jsonl");
        assert_eq!(dataset(3).export_jsonl(&path).unwrap(), 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: Conversation = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed, conv(2));
    }

    #[test]
    fn test_validate_flags_problems() {
        let mut ds = ChatDataset::new();
        ds.add_conversation(Conversation {
            images: vec![],
            messages: vec![ChatMessage::new(Role::User, vec![ContentPart::text("  ")])],
        });
        let issues = ds.validate();
        assert!(issues.iter().any(|i| i.contains("turn order")));
        assert!(issues.iter().any(|i| i.contains("empty content")));
        assert!(issues.iter().any(|i| i.contains("no image")));
    }
}
