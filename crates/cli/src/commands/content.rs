//! Read-only content commands for administrators.
//!
//! # Usage
//!
//! ```bash
//! bm-cli --password admin-secret categories
//! bm-cli --password admin-secret articles --category 2
//! bm-cli --password admin-secret preview "What if the fryer breaks?"
//! ```

use bon_manual_core::{Article, Category, CategoryId, PreviewAnswer, Role};

use super::{CliError, Context};

/// List every category.
///
/// # Errors
///
/// Returns an error if no password was given or the backend call fails.
#[allow(clippy::print_stdout)]
pub async fn categories(context: &Context) -> Result<(), CliError> {
    let credential = context.credential(Role::Admin)?;
    let mut categories = context.backend().categories(&credential).await?;
    categories.sort_by_key(|c| (c.sort_order, c.id));

    if context.json() {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for category in &categories {
            println!("{}", category_line(category));
        }
    }
    Ok(())
}

/// List articles, optionally in one category.
///
/// # Errors
///
/// Returns an error if no password was given or the backend call fails.
#[allow(clippy::print_stdout)]
pub async fn articles(context: &Context, category: Option<CategoryId>) -> Result<(), CliError> {
    let credential = context.credential(Role::Admin)?;
    let articles = context.backend().articles(&credential, category).await?;

    if context.json() {
        println!("{}", serde_json::to_string_pretty(&articles)?);
    } else {
        for article in &articles {
            println!("{}", article_line(article));
        }
    }
    Ok(())
}

/// Ask a preview question and show the retrieval details.
///
/// # Errors
///
/// Returns an error if no password was given or the backend call fails.
#[allow(clippy::print_stdout)]
pub async fn preview(context: &Context, question: &str) -> Result<(), CliError> {
    let credential = context.credential(Role::Admin)?;
    let answer = context.backend().preview_chat(&credential, question).await?;

    if context.json() {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!("{}", preview_text(&answer));
    }
    Ok(())
}

fn category_line(category: &Category) -> String {
    format!(
        "{:>4}  {:<8} {:<24} {:>4} articles{}",
        category.id.as_i64(),
        category.code,
        category.name,
        category.article_count(),
        if category.is_active { "" } else { "  (inactive)" },
    )
}

fn article_line(article: &Article) -> String {
    let mut flags = Vec::new();
    if !article.is_published {
        flags.push("draft");
    }
    if article.requires_sm {
        flags.push("supervisor");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", flags.join(", "))
    };
    format!(
        "{:>5}  cat {:<4} p{:<3} {}{flags}",
        article.id.as_i64(),
        article.category_id.as_i64(),
        article.priority,
        article.title
    )
}

fn preview_text(answer: &PreviewAnswer) -> String {
    let mut text = answer.answer.clone();
    if !answer.used_chunks.is_empty() {
        text.push_str("\n\nUsed chunks:");
        for chunk in &answer.used_chunks {
            text.push_str("\n  - ");
            text.push_str(&chunk.summary());
        }
    }
    if !answer.references.is_empty() {
        text.push_str("\n\nReferences:");
        for reference in &answer.references {
            text.push_str("\n  - ");
            text.push_str(&reference.label());
        }
    }
    text
}
