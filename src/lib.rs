//! # Memex
//!
//! A local OCR index for image folders.
//!
//! Memex walks directories for images, extracts their text with an OCR
//! engine on a pool of workers, and stores the text in SQLite with an FTS5
//! index so screenshots and scans can be found by what they say.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  WorkItem  ┌───────────┐  ExtractionResult  ┌──────────┐
//! │  Scanner  │──────────▶│  Workers  │──────────────────▶│   Sink   │
//! │ (walkdir) │  bounded   │   (OCR)   │      bounded       │          │
//! └─────┬─────┘            └───────────┘                    └────┬─────┘
//!       │ timestamp_of / folder_upsert                           │ upsert
//!       ▼                                                        ▼
//!  ┌──────────────────────────────────────────────────────────────────┐
//!  │                 Store (SQLite, image + image_fts)                │
//!  └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! memex init
//! memex scan ~/Pictures/Screenshots
//! memex search "invoice"
//! memex rescan                  # re-walk every known folder
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and base directory |
//! | [`db`] | Database connection |
//! | [`error`] | Extraction and initialization errors |
//! | [`extract`] | OCR engine abstraction |
//! | [`folders`] | `memex folders` |
//! | [`get`] | `memex get` and `memex comment` |
//! | [`ingest`] | `memex scan`, `rescan` and `sweep` |
//! | [`logging`] | tracing subscriber setup |
//! | [`migrate`] | Schema migrations |
//! | [`models`] | Core data types |
//! | [`pipeline`] | Worker pool and result sink |
//! | [`progress`] | Scan progress reporting |
//! | [`scanner`] | Directory traversal and change detection |
//! | [`search`] | `memex search` |
//! | [`stats`] | `memex stats` |
//! | [`store`] | Storage engine |

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod folders;
pub mod get;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod search;
pub mod stats;
pub mod store;
