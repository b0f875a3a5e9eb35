//! # scholarif
//!
//! Journal Impact Factor resolution for Google Scholar results.
//!
//! ## Modules
//!
//! - [`normalize`] - Journal name canonicalization
//! - [`dataset`] - Bundled name → metrics dataset
//! - [`index`] - Exact and fuzzy journal lookup
//! - [`resolver`] - Crossref client resolving paper titles to journal names
//! - [`scheduler`] - Bounded-concurrency FIFO request scheduler
//! - [`engine`] - Match pipeline combining all of the above
//! - [`scholar`] - Candidate extraction from Scholar result pages
//! - [`config`] - Engine configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholarif::config::EngineConfig;
//! use scholarif::dataset::Dataset;
//! use scholarif::engine::{CandidateInput, MatchEngine};
//! use scholarif::index::JournalIndex;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dataset = Dataset::load(std::path::Path::new("data.json"))?;
//!     let index = Arc::new(JournalIndex::build(&dataset));
//!     let engine = MatchEngine::from_config(index, &EngineConfig::default())?;
//!
//!     let candidate = CandidateInput::new("Nature").with_title("Deep learning");
//!     if let Some(record) = engine.resolve(&candidate).await {
//!         println!("IF {}", record.impact_factor());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod index;
pub mod normalize;
pub mod resolver;
pub mod scheduler;
pub mod scholar;

pub use error::{Result, ScholarIfError};
