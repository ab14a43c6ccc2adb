//! Manual content: categories and the articles filed under them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{ArticleId, CategoryId};

/// Errors from client-side form validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
}

/// A top-level grouping of manual articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Short unique code, fixed once the category exists.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_count: Option<i64>,
    /// Older backends report the count under this name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_count: Option<i64>,
}

impl Category {
    /// Number of articles filed under this category, whichever field carried it.
    #[must_use]
    pub fn article_count(&self) -> i64 {
        self.article_count.or(self.doc_count).unwrap_or(0)
    }

    /// Description for display, with a placeholder when none is set.
    #[must_use]
    pub fn description_or_placeholder(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description")
    }
}

/// A single manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub category_id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub priority: i32,
    /// Requires a supervisor's confirmation before acting on it.
    #[serde(default)]
    pub requires_sm: bool,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

/// Body for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

impl CategoryDraft {
    /// Build a draft from raw form input, trimming text and blanking empty
    /// descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] when the code or name is blank.
    pub fn new(
        code: &str,
        name: &str,
        description: &str,
        sort_order: i32,
        is_active: bool,
    ) -> Result<Self, ValidationError> {
        let code = required("Code", code)?;
        let name = required("Name", name)?;
        Ok(Self {
            code,
            name,
            description: optional(description),
            sort_order,
            is_active,
        })
    }
}

/// Body for editing a category. The code cannot change, so it is not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

impl CategoryUpdate {
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] when the name is blank.
    pub fn new(
        name: &str,
        description: &str,
        sort_order: i32,
        is_active: bool,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("Name", name)?,
            description: optional(description),
            sort_order,
            is_active,
        })
    }
}

/// Body for creating or updating an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub category_id: CategoryId,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub priority: i32,
    pub requires_sm: bool,
    pub is_published: bool,
}

impl ArticleDraft {
    /// Validate title and content; the remaining fields pass through.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] when the title or content is blank.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.title = required("Title", &self.title)?;
        if self.content.trim().is_empty() {
            return Err(ValidationError::Required("Content"));
        }
        self.summary = self.summary.as_deref().and_then(optional);
        Ok(self)
    }
}

impl Default for ArticleDraft {
    fn default() -> Self {
        Self {
            category_id: CategoryId::new(1),
            title: String::new(),
            content: String::new(),
            summary: None,
            priority: 0,
            requires_sm: false,
            is_published: true,
        }
    }
}

impl From<&Article> for ArticleDraft {
    fn from(article: &Article) -> Self {
        Self {
            category_id: article.category_id,
            title: article.title.clone(),
            content: article.content.clone(),
            summary: article.summary.clone(),
            priority: article.priority,
            requires_sm: article.requires_sm,
            is_published: article.is_published,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(value.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
