//! # paradup
//!
//! Paragraph-level deduplication and document similarity for PDF and DOCX
//! corpora.
//!
//! Uploaded documents are extracted to text, normalized, and split into
//! paragraphs. Each distinct paragraph is stored once (content-addressed by
//! a SHA-256 of its normalized form) and linked to every document that
//! contains it. Pairwise document similarity is computed on demand with
//! TF-IDF cosine similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────────────┐   ┌──────────┐
//! │ PDF/DOCX │──▶│ paradup-core pipeline       │──▶│  SQLite  │
//! │ extract  │   │ normalize→segment→filter→   │   │  Store   │
//! └──────────┘   │ dedup                       │   └────┬─────┘
//!                └────────────────────────────┘        │
//!                                  ┌────────────────────┤
//!                                  ▼                    ▼
//!                            ┌───────────┐       ┌────────────┐
//!                            │ TF-IDF    │       │    CLI     │
//!                            │ similarity│       │ (paradup)  │
//!                            └───────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! paradup init
//! paradup upload reports/*.pdf letters/*.docx
//! paradup paragraphs --shared
//! paradup similarity calculate --min-similarity 0.3
//! paradup similarity similar <document-id>
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`upload`] | Upload validation and processing |
//! | [`documents`] | Listing, inspection, deletion |
//! | [`paragraphs`] | Canonical paragraph listing |
//! | [`similarity_cmd`] | Similarity calculation and queries |
//! | [`stats`] | Corpus statistics |

pub mod config;
pub mod db;
pub mod documents;
pub mod extract;
pub mod migrate;
pub mod paragraphs;
pub mod similarity_cmd;
pub mod sqlite_store;
pub mod stats;
pub mod upload;
