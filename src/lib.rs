//! # Agri Knowledge
//!
//! A local-first knowledge indexer and semantic retriever for collected
//! agriculture articles.
//!
//! Articles are normalized, split into overlapping word windows, embedded
//! and stored in SQLite; queries are embedded the same way and ranked by
//! cosine distance. The engine itself lives in [`agri_knowledge_core`];
//! this crate adds configuration, persistence, concrete embedding
//! providers, and the `agk` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │ JSON articles│──▶│ Normalize+Chunk  │──▶│   SQLite    │
//! │   (loader)   │   │ +Embed (indexer) │   │ (or memory) │
//! └──────────────┘   └──────────────────┘   └──────┬──────┘
//!                                                  │
//!                                           ┌──────▼──────┐
//!                                           │  Retriever  │
//!                                           │ (agk search)│
//!                                           └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | Persistent vector store |
//! | [`embedding`] | Concrete embedding providers, lazy initialization |
//! | [`loader`] | Article JSON loading |
//! | [`knowledge`] | The [`KnowledgeBase`](knowledge::KnowledgeBase) handle |
//! | [`ingest`], [`search`], [`stats`] | CLI commands |

pub mod config;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod knowledge;
pub mod loader;
pub mod migrate;
pub mod search;
pub mod sqlite_store;
pub mod stats;
