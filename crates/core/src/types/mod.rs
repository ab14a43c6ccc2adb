//! Core types for Bon Manual.
//!
//! Records mirror the JSON the backend exchanges; ids are type-safe wrappers.

pub mod content;
pub mod credential;
pub mod envelope;
pub mod id;

pub use content::{
    Article, ArticleDraft, Category, CategoryDraft, CategoryUpdate, ValidationError,
};
pub use credential::{Credential, Role};
pub use envelope::{ChatAnswer, Envelope, PreviewAnswer, Reference, UsedChunk};
pub use id::*;
