//! # Clause Harness
//!
//! Grounded contract editing: split contracts into clause spans, index them
//! for similarity search, and turn natural-language instructions into edits
//! that are verified against the exact document text before they are applied.
//!
//! The pure pipeline (splitting, verification, application, ranking) lives
//! in `clause-harness-core`. This crate adds persistence, the embedding and
//! completion providers, the `clx` CLI, and the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │  Upload /   │──▶│ Split+Embed  │──▶│  SQLite   │
//! │  Library    │   │   (core)     │   │ docs+vecs │
//! └─────────────┘   └──────────────┘   └─────┬─────┘
//!                                            │
//!        ┌──────────────┬────────────────────┤
//!        ▼              ▼                    ▼
//!  ┌───────────┐  ┌───────────┐        ┌──────────┐
//!  │  Propose  │─▶│  Verify   │──────▶ │  Apply   │
//!  │  (model)  │  │  (core)   │        │  (core)  │
//!  └───────────┘  └───────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! clx init
//! clx library load
//! clx upload lease.txt --name "Lease"
//! clx search "notice period" --k 3
//! clx patch <id> "extend the term to two years" --apply
//! clx serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`app`] | Shared context and per-document locks |
//! | [`db`] / [`migrate`] | SQLite connection and schema |
//! | [`store`] | Documents, spans, and the vector index |
//! | [`embedding`] | Embedding providers |
//! | [`completion`] | Chat-completion providers |
//! | [`ingest`] | Upload, text replacement, deletion |
//! | [`library`] | Reference clause library |
//! | [`search`] | Similarity search |
//! | [`patch`] | Propose, verify, apply |
//! | [`generate`] | Clause generate, rewrite, summarize |
//! | [`server`] | HTTP API |

pub mod app;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod get;
pub mod http;
pub mod ingest;
pub mod library;
pub mod migrate;
pub mod patch;
pub mod search;
pub mod server;
pub mod store;
