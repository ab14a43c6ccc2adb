//! Admin preview chat transcript.

use bon_manual_core::PreviewAnswer;
use serde::{Deserialize, Serialize};

/// Shown in place of an answer when the preview call fails.
pub const PREVIEW_ERROR: &str = "Error occurred.";

/// One line of the preview transcript, pre-rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub from_admin: bool,
    pub content: String,
    /// `first 30 chars... (Score: x)` per retrieved chunk.
    #[serde(default)]
    pub used_chunks: Vec<String>,
    /// Titles of the referenced articles.
    #[serde(default)]
    pub references: Vec<String>,
}

/// Ordered preview transcript kept in the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewTranscript {
    entries: Vec<PreviewEntry>,
}

impl PreviewTranscript {
    pub fn push_question(&mut self, question: &str) {
        self.entries.push(PreviewEntry {
            from_admin: true,
            content: question.to_string(),
            used_chunks: Vec::new(),
            references: Vec::new(),
        });
    }

    pub fn push_answer(&mut self, answer: &PreviewAnswer) {
        self.entries.push(PreviewEntry {
            from_admin: false,
            content: answer.answer.clone(),
            used_chunks: answer.used_chunks.iter().map(|c| c.summary()).collect(),
            references: answer
                .references
                .iter()
                .map(|r| r.title.clone().unwrap_or_else(|| r.label()))
                .collect(),
        });
    }

    pub fn push_error(&mut self) {
        self.entries.push(PreviewEntry {
            from_admin: false,
            content: PREVIEW_ERROR.to_string(),
            used_chunks: Vec::new(),
            references: Vec::new(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[PreviewEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use bon_manual_core::{ArticleId, Reference, UsedChunk};

    use super::*;

    #[test]
    fn test_answer_metadata_is_summarized() {
        let mut transcript = PreviewTranscript::default();
        transcript.push_question("When do we open?");
        transcript.push_answer(&PreviewAnswer {
            answer: "At nine.".to_string(),
            references: vec![Reference {
                article_id: ArticleId::new(3),
                category_code: "OPS".to_string(),
                title: Some("Opening checklist".to_string()),
            }],
            used_chunks: vec![UsedChunk {
                content: "The store opens at 09:00 every day except holidays.".to_string(),
                score: 0.91,
            }],
        });
        transcript.push_error();

        let entries = transcript.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].from_admin);
        assert_eq!(entries[1].references, vec!["Opening checklist"]);
        assert_eq!(
            entries[1].used_chunks,
            vec!["The store opens at 09:00 every... (Score: 0.91)"]
        );
        assert_eq!(entries[2].content, PREVIEW_ERROR);
    }
}
