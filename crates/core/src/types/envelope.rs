//! The JSON envelope every backend endpoint answers with.

use serde::{Deserialize, Serialize};

use super::id::ArticleId;

/// `{ ok, data?, message?, answer?, references?, used_chunks? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_chunks: Option<Vec<UsedChunk>>,
}

impl<T> Envelope<T> {
    /// Failure envelope with only a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            message: Some(message.into()),
            answer: None,
            references: None,
            used_chunks: None,
        }
    }

    /// Success envelope wrapping `data`.
    #[must_use]
    pub const fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            message: None,
            answer: None,
            references: None,
            used_chunks: None,
        }
    }
}

/// A manual article an answer was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub article_id: ArticleId,
    pub category_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Reference {
    /// `[CODE] title`, falling back to the article id when untitled.
    #[must_use]
    pub fn label(&self) -> String {
        match self.title.as_deref() {
            Some(title) => format!("[{}] {title}", self.category_code),
            None => format!("[{}] #{}", self.category_code, self.article_id),
        }
    }
}

/// A retrieved text chunk and its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedChunk {
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

impl UsedChunk {
    /// The first 30 characters of the chunk followed by its score.
    #[must_use]
    pub fn summary(&self) -> String {
        let head: String = self.content.chars().take(30).collect();
        format!("{head}... (Score: {})", self.score)
    }
}

/// Admin preview answer: text plus retrieval metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreviewAnswer {
    pub answer: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub used_chunks: Vec<UsedChunk>,
}

/// Non-streaming user chat answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default)]
    pub references: Vec<Reference>,
}
