//! Journal match pipeline.
//!
//! For one scraped candidate, tries in order and stops at the first hit:
//!
//! 1. exact lookup of the candidate (skipped when the page truncated it)
//! 2. Crossref-assisted lookup by paper title, through the request scheduler
//! 3. for truncated candidates, and only when step 2 produced no names at all:
//!    exact lookup again, then fuzzy lookup
//!
//! The engine never fails; every error path ends in an unmatched outcome.

use crate::config::EngineConfig;
use crate::dataset::JournalRecord;
use crate::error::Result;
use crate::index::JournalIndex;
use crate::normalize::{contains_hangul, normalize};
use crate::resolver::{CrossrefResolver, JournalNameSource};
use crate::scheduler::RequestScheduler;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// One scraped row's journal information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInput {
    /// Journal text as displayed on the page
    pub journal_candidate: String,
    /// Paper title, when the row has one
    #[serde(default)]
    pub paper_title: Option<String>,
    /// The page cut the journal text off
    #[serde(default)]
    pub is_truncated: bool,
}

impl CandidateInput {
    pub fn new(journal_candidate: impl Into<String>) -> Self {
        Self {
            journal_candidate: journal_candidate.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, paper_title: impl Into<String>) -> Self {
        self.paper_title = Some(paper_title.into());
        self
    }

    pub fn truncated(mut self, is_truncated: bool) -> Self {
        self.is_truncated = is_truncated;
        self
    }

    fn title(&self) -> Option<&str> {
        self.paper_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Which step produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    ApiAssisted,
    TruncatedExact,
    Fuzzy,
}

/// Result of resolving one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        record: JournalRecord,
        strategy: MatchStrategy,
    },
    /// Crossref named a journal but the dataset has none of its names
    NotFound { api_name: String },
    Unmatched,
    /// Row left alone (Hangul text)
    Skipped,
}

impl MatchOutcome {
    pub fn record(&self) -> Option<&JournalRecord> {
        match self {
            MatchOutcome::Matched { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<JournalRecord> {
        match self {
            MatchOutcome::Matched { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Top-percent figure for the quartile badge; only Q1 journals get one
    pub fn top_percent_badge(&self) -> Option<u32> {
        self.record()
            .filter(|r| r.is_q1())
            .and_then(JournalRecord::top_percent)
    }
}

/// A page row submitted for resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Stable identifier of the row on its page
    pub id: String,
    #[serde(flatten)]
    pub candidate: CandidateInput,
}

/// Outcome for one row of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    pub id: String,
    pub outcome: MatchOutcome,
}

/// Resolves candidates against the journal index with Crossref assistance
pub struct MatchEngine {
    index: Arc<JournalIndex>,
    source: Arc<dyn JournalNameSource>,
    scheduler: RequestScheduler,
    processed: Mutex<HashSet<String>>,
    skip_hangul: bool,
}

impl MatchEngine {
    pub fn new(
        index: Arc<JournalIndex>,
        source: Arc<dyn JournalNameSource>,
        scheduler: RequestScheduler,
    ) -> Self {
        Self {
            index,
            source,
            scheduler,
            processed: Mutex::new(HashSet::new()),
            skip_hangul: true,
        }
    }

    /// Engine backed by a Crossref resolver built from `config`
    pub fn from_config(index: Arc<JournalIndex>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let resolver = CrossrefResolver::new(config)?;
        let mut engine = Self::new(
            index,
            Arc::new(resolver),
            RequestScheduler::new(config.max_concurrent),
        );
        engine.skip_hangul = config.skip_hangul;
        Ok(engine)
    }

    pub fn with_skip_hangul(mut self, skip_hangul: bool) -> Self {
        self.skip_hangul = skip_hangul;
        self
    }

    pub fn index(&self) -> &JournalIndex {
        &self.index
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    /// Matched record for a candidate, if any
    pub async fn resolve(&self, candidate: &CandidateInput) -> Option<JournalRecord> {
        self.resolve_detailed(candidate).await.into_record()
    }

    /// Full outcome for a candidate
    pub async fn resolve_detailed(&self, candidate: &CandidateInput) -> MatchOutcome {
        if self.skip_hangul
            && (contains_hangul(&candidate.journal_candidate)
                || candidate.title().is_some_and(contains_hangul))
        {
            debug!(journal = %candidate.journal_candidate, "Skipping Hangul row");
            return MatchOutcome::Skipped;
        }

        let key = normalize(&candidate.journal_candidate);

        if !candidate.is_truncated {
            if let Some(record) = self.index.exact_lookup(&key) {
                return matched(record, MatchStrategy::Exact);
            }
        }

        let api_names = match candidate.title() {
            Some(title) => self.journal_names(title).await,
            None => Vec::new(),
        };

        if let Some(first) = api_names.first() {
            for name in &api_names {
                if let Some(record) = self.index.exact_lookup(&normalize(name)) {
                    return matched(record, MatchStrategy::ApiAssisted);
                }
            }
            debug!(api_name = %first, "Crossref journal not in dataset");
            return MatchOutcome::NotFound {
                api_name: first.clone(),
            };
        }

        if candidate.is_truncated {
            if let Some(record) = self.index.exact_lookup(&key) {
                return matched(record, MatchStrategy::TruncatedExact);
            }
            if let Some(record) = self.index.fuzzy_lookup(&key) {
                return matched(record, MatchStrategy::Fuzzy);
            }
        }

        MatchOutcome::Unmatched
    }

    /// Resolve a page's rows, each at most once per engine.
    ///
    /// Rows are marked processed before any lookup starts, so a second call made while
    /// the first is still waiting on Crossref skips them. Returns outcomes only for the
    /// rows resolved by this call, in input order.
    pub async fn resolve_rows(&self, rows: Vec<Row>) -> Vec<RowOutcome> {
        let rows_len = rows.len();
        let fresh: Vec<Row> = match self.processed.lock() {
            Ok(mut processed) => rows
                .into_iter()
                .filter(|row| processed.insert(row.id.clone()))
                .collect(),
            Err(e) => {
                warn!(error = %e, rows = rows_len, "Processed-row set poisoned, skipping batch");
                Vec::new()
            }
        };

        let outcomes = join_all(
            fresh
                .iter()
                .map(|row| self.resolve_detailed(&row.candidate)),
        )
        .await;

        let results: Vec<RowOutcome> = fresh
            .into_iter()
            .zip(outcomes)
            .map(|(row, outcome)| RowOutcome {
                id: row.id,
                outcome,
            })
            .collect();

        let matched = results
            .iter()
            .filter(|r| r.outcome.record().is_some())
            .count();
        info!(rows = results.len(), matched = matched, "Resolved rows");

        results
    }

    /// Mark a row processed; `false` when it already was
    pub fn mark_processed(&self, id: &str) -> bool {
        self.processed
            .lock()
            .map(|mut p| p.insert(id.to_string()))
            .unwrap_or(false)
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.processed
            .lock()
            .map(|p| p.contains(id))
            .unwrap_or(false)
    }

    /// Forget processed rows (new page)
    pub fn reset_processed(&self) {
        if let Ok(mut processed) = self.processed.lock() {
            processed.clear();
        }
    }

    async fn journal_names(&self, title: &str) -> Vec<String> {
        let source = Arc::clone(&self.source);
        let title = title.to_string();
        self.scheduler
            .submit(async move { source.journal_names(&title).await })
            .await
            .unwrap_or_default()
    }
}

fn matched(record: &JournalRecord, strategy: MatchStrategy) -> MatchOutcome {
    MatchOutcome::Matched {
        record: record.clone(),
        strategy,
    }
}
