//! Chat-message schema consumed by the vision-language fine-tuning stage.

use crate::corpus::TrainingRecord;
use serde::{Deserialize, Serialize};

/// System turn used when prompting a trained adapter.
pub const INFERENCE_SYSTEM_PROMPT: &str = "You are an expert urban planner and satellite imagery analyst specializing in identifying vacant land suitable for development.";

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One piece of a turn's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Image referenced by path; the trainer loads it.
    Image { image: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(path: impl Into<String>) -> Self {
        Self::Image { image: path.into() }
    }
}

/// A chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self { role, content }
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A conversation plus the images it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub images: Vec<String>,
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// System instruction, user turn with image and query, assistant answer.
    pub fn from_record(record: &TrainingRecord, system_prompt: &str) -> Self {
        Self {
            images: vec![record.image_path.clone()],
            messages: vec![
                ChatMessage::new(Role::System, vec![ContentPart::text(system_prompt)]),
                ChatMessage::new(
                    Role::User,
                    vec![
                        ContentPart::image(record.image_path.clone()),
                        ContentPart::text(record.query.clone()),
                    ],
                ),
                ChatMessage::new(Role::Assistant, vec![ContentPart::text(record.answer.clone())]),
            ],
        }
    }

    /// Prompt for asking a trained adapter about an arbitrary image; no answer turn.
    pub fn for_inference(image: &str, location: &str) -> Self {
        Self {
            images: vec![image.to_string()],
            messages: vec![
                ChatMessage::new(Role::System, vec![ContentPart::text(INFERENCE_SYSTEM_PROMPT)]),
                ChatMessage::new(
                    Role::User,
                    vec![
                        ContentPart::image(image),
                        ContentPart::text(format!(
                            "Analyze this satellite image of {location} and identify vacant spaces suitable for urban development. Describe what you see and assess development potential."
                        )),
                    ],
                ),
            ],
        }
    }

    /// Text of the first message with the given role.
    pub fn turn_text(&self, role: Role) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(ChatMessage::text)
    }
}
