//! Manual backend integration.
//!
//! Every data-bearing operation lives in the backend; this module reaches it
//! over HTTP and runs streamed chat turns against it.

pub mod client;
pub mod error;
pub mod stream;

pub use client::{BackendClient, ForwardRequest};
pub use error::BackendError;
pub use stream::{drive, stream_answer};
