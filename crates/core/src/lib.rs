//! Bon Manual Core - Shared types and chat stream protocol.
//!
//! This crate provides the pieces shared by every Bon Manual component:
//! - `web` - Role-gated web front end and backend proxy
//! - `cli` - Terminal chat client and content tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure state machines - no I/O, no
//! HTTP clients. Byte streams are pushed in by the caller, which keeps the
//! SSE parser usable from both the server and the terminal client.
//!
//! # Modules
//!
//! - [`types`] - Content records, JSON envelope, roles and session credentials
//! - [`chat`] - Chat transcript with id-keyed message updates
//! - [`stream`] - SSE frame splitter, event decoder and per-turn state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod chat;
pub mod stream;
pub mod types;

pub use types::*;
