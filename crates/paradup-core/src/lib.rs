//! # paradup core
//!
//! Storage-agnostic logic for paradup: text normalization, paragraph
//! segmentation, container filtering, paragraph deduplication, and TF-IDF
//! document similarity.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence is
//! reached only through the [`store::Store`] trait; the application crate
//! supplies the SQLite implementation and [`store::memory::InMemoryStore`]
//! covers tests.
//!
//! ## Pipeline
//!
//! ```text
//! raw text ─▶ normalize ─▶ segment ─▶ container filter ─▶ dedup ─▶ Store
//!
//! processed documents ─▶ TF-IDF ─▶ pairwise cosine ─▶ Store (edge set)
//! ```

pub mod container;
pub mod dedup;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod segment;
pub mod similarity;
pub mod stopwords;
pub mod store;
pub mod structure;
pub mod tfidf;
pub mod tokenizer;
pub mod topic;
