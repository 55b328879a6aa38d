//! # News Store
//!
//! Validated, compressed and indexed storage for collected news items.
//!
//! Collectors upstream (RSS and HTML scrapers, model-backed summarizers and
//! classifiers) hand over batches of loosely typed items. This crate checks
//! them, normalizes them, writes each batch once as a canonical JSON file,
//! keeps a compressed archival copy, and indexes the batch in SQLite so it
//! can be searched by title, source, category, relevance and date.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌──────────────┐   ┌────────────┐
//! │ raw items │──▶│ validator │──▶│ raw/ or      │──▶│ compressed/│
//! │  (JSON)   │   │  + clean  │   │ processed/   │   │ .json.gz   │
//! └───────────┘   └───────────┘   └──────┬───────┘   └────────────┘
//!                                        │ index_file
//!                                        ▼
//!                                 ┌─────────────┐   search   ┌───────────┐
//!                                 │   SQLite    │──────────▶│ NewsItem  │
//!                                 │ news + cats │ re-reads   │  records  │
//!                                 └─────────────┘ the file   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! nstore init
//! nstore save batch.json            # processed/
//! nstore save batch.json --raw      # raw/
//! nstore search --query Ibovespa --min-relevance 4
//! nstore stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`validator`] | Item validation and cleaning |
//! | [`compressor`] | gzip / xz archival |
//! | [`indexer`] | SQLite ingestion |
//! | [`search`] | Filtered index search |
//! | [`storage`] | The save pipeline |
//! | [`stats`] | Index statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`error`] | Error taxonomy |

pub mod compressor;
pub mod config;
pub mod db;
pub mod error;
pub mod indexer;
pub mod migrate;
pub mod models;
pub mod search;
pub mod stats;
pub mod storage;
pub mod validator;

pub use error::{Result, StoreError};
pub use indexer::NewsIndex;
pub use models::{Area, IndexRecord, NewsItem};
pub use search::SearchQuery;
pub use storage::{NewsStorage, SaveReport};
