//! # Clause Harness Core
//!
//! Shared, WASM-safe logic for Clause Harness: data models, clause span
//! splitting, patch verification and application, the similarity index
//! abstraction, the embedding trait, and edit-proposal validation.
//!
//! This crate contains no tokio, sqlx, network, or filesystem I/O. It
//! compiles to both native targets and `wasm32-unknown-unknown`.
//!
//! ## Pipeline
//!
//! ```text
//!  raw text ──▶ split ──▶ spans ──▶ embed ──▶ index ──▶ search
//!
//!  text + instruction ──▶ propose ──▶ verify ──▶ apply ──▶ new text
//! ```

pub mod apply;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod proposal;
pub mod search;
pub mod split;
pub mod verify;

pub use error::{ClauseError, Result};
