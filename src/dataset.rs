//! Bundled journal dataset.
//!
//! The dataset is a JSON object mapping a journal display name to its metrics:
//!
//! ```json
//! { "NATURE": { "if": "50.5", "q": "Q1", "rank": "1/100" } }
//! ```
//!
//! `if` may be a number or a numeric string. Entries without a usable impact factor
//! are skipped with a warning instead of failing the whole load. Key order of the file
//! is preserved and is the insertion order of the index.

use crate::error::{Result, ScholarIfError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Metrics attached to one dataset name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalMetrics {
    /// Impact factor
    #[serde(rename = "if")]
    pub impact_factor: f64,
    /// JIF quartile ("Q1".."Q4")
    #[serde(rename = "q")]
    pub quartile: String,
    /// JIF rank, "<rank>/<total>"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

/// One dataset entry with the name it was listed under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Name as written in the dataset
    #[serde(rename = "originalName")]
    pub original_name: String,
    #[serde(flatten)]
    pub metrics: JournalMetrics,
}

impl JournalRecord {
    pub fn new(original_name: impl Into<String>, metrics: JournalMetrics) -> Self {
        Self {
            original_name: original_name.into(),
            metrics,
        }
    }

    pub fn impact_factor(&self) -> f64 {
        self.metrics.impact_factor
    }

    pub fn quartile(&self) -> &str {
        &self.metrics.quartile
    }

    pub fn is_q1(&self) -> bool {
        self.metrics.quartile.eq_ignore_ascii_case("Q1")
    }

    /// Position within the category as a rounded-up percentage: `"5/100"` gives 5.
    ///
    /// `None` when there is no rank or it does not read as `<n>/<d>` with `d > 0`.
    pub fn top_percent(&self) -> Option<u32> {
        let (rank, total) = self.metrics.rank.as_deref()?.split_once('/')?;
        let rank: u64 = rank.trim().parse().ok()?;
        let total: u64 = total.trim().parse().ok()?;
        if total == 0 {
            return None;
        }
        u32::try_from(rank.checked_mul(100)?.div_ceil(total)).ok()
    }
}

/// Dataset entry as it appears on disk, before the impact factor is validated
#[derive(Debug, Deserialize)]
struct RawMetrics {
    #[serde(rename = "if", default)]
    impact_factor: serde_json::Value,
    #[serde(rename = "q", default)]
    quartile: Option<String>,
    #[serde(default)]
    rank: Option<serde_json::Value>,
}

/// Ordered list of `(display name, metrics)` pairs
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    entries: Vec<(String, JournalMetrics)>,
}

impl Dataset {
    pub fn from_entries(entries: Vec<(String, JournalMetrics)>) -> Self {
        Self { entries }
    }

    /// Parse the dataset JSON object, keeping file order
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value.as_object().ok_or_else(|| {
            ScholarIfError::Dataset("top-level value must be an object".to_string())
        })?;

        let mut entries = Vec::with_capacity(object.len());
        let mut skipped = 0usize;

        for (name, raw) in object {
            match parse_metrics(raw) {
                Some(metrics) => entries.push((name.clone(), metrics)),
                None => {
                    debug!(journal = %name, "Skipping dataset entry without usable metrics");
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(skipped = skipped, "Dataset entries skipped");
        }

        Ok(Self { entries })
    }

    /// Load the dataset from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dataset = Self::from_json_str(&content)?;
        info!(path = ?path, entries = dataset.len(), "Loaded journal dataset");
        Ok(dataset)
    }

    pub fn entries(&self) -> &[(String, JournalMetrics)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_metrics(raw: &serde_json::Value) -> Option<JournalMetrics> {
    let raw: RawMetrics = serde_json::from_value(raw.clone()).ok()?;

    let impact_factor = parse_impact_factor(&raw.impact_factor)?;
    let quartile = raw.quartile.unwrap_or_default().trim().to_string();
    let rank = raw
        .rank
        .and_then(|r| match r {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|r| !r.is_empty() && !is_missing_marker(r));

    Some(JournalMetrics {
        impact_factor,
        quartile,
        rank,
    })
}

/// Accept `50.5` or `"50.5"`; reject spreadsheet placeholders and negatives
fn parse_impact_factor(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => {
            let s = s.trim();
            if is_missing_marker(s) {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };

    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

fn is_missing_marker(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "" | "nan" | "n/a" | "none"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(rank: Option<&str>, quartile: &str) -> JournalRecord {
        JournalRecord::new(
            "Test Journal",
            JournalMetrics {
                impact_factor: 1.0,
                quartile: quartile.to_string(),
                rank: rank.map(str::to_string),
            },
        )
    }

    #[test]
    fn test_top_percent() {
        assert_eq!(record(Some("1/100"), "Q1").top_percent(), Some(1));
        assert_eq!(record(Some("5/100"), "Q1").top_percent(), Some(5));
        assert_eq!(record(Some("7/100"), "Q1").top_percent(), Some(7));
        assert_eq!(record(Some("3/40"), "Q1").top_percent(), Some(8));
        assert_eq!(record(Some(" 12 / 57 "), "Q1").top_percent(), Some(22));
    }

    #[test]
    fn test_top_percent_unusable_rank() {
        assert_eq!(record(None, "Q1").top_percent(), None);
        assert_eq!(record(Some("12"), "Q1").top_percent(), None);
        assert_eq!(record(Some("a/b"), "Q1").top_percent(), None);
        assert_eq!(record(Some("3/0"), "Q1").top_percent(), None);
    }

    #[test]
    fn test_top_percent_oversized_rank() -> Result<()> {
        let dataset = Dataset::from_json_str(
            r#"{"BIG": {"if": 1.0, "q": "Q1", "rank": "1000000000000000000/1"}}"#,
        )?;
        let (name, metrics) = &dataset.entries()[0];
        let big = JournalRecord::new(name.clone(), metrics.clone());
        assert_eq!(big.top_percent(), None);
        assert_eq!(record(Some("99999999999999999999/3"), "Q1").top_percent(), None);
        Ok(())
    }

    #[test]
    fn test_is_q1() {
        assert!(record(None, "Q1").is_q1());
        assert!(!record(None, "Q2").is_q1());
    }

    #[test]
    fn test_from_json_preserves_order_and_accepts_strings() -> Result<()> {
        let json = r#"{
            "ZEBRAFISH": {"if": "1.5", "q": "Q3", "rank": "80/120"},
            "NATURE": {"if": 50.5, "q": "Q1", "rank": "1/100"},
            "ACTA": {"if": "2", "q": "Q2"}
        }"#;
        let dataset = Dataset::from_json_str(json)?;
        let names: Vec<&str> = dataset.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["ZEBRAFISH", "NATURE", "ACTA"]);
        assert_eq!(dataset.entries()[0].1.impact_factor, 1.5);
        assert_eq!(dataset.entries()[1].1.rank.as_deref(), Some("1/100"));
        assert_eq!(dataset.entries()[2].1.rank, None);
        Ok(())
    }

    #[test]
    fn test_from_json_skips_unusable_entries() -> Result<()> {
        let json = r#"{
            "GOOD": {"if": "3.1", "q": "Q2", "rank": "10/50"},
            "NAN": {"if": "nan", "q": "Q2"},
            "NEGATIVE": {"if": -1, "q": "Q2"},
            "MISSING": {"q": "Q1"},
            "NOT_AN_OBJECT": 12,
            "EMPTY_RANK": {"if": 0.5, "q": "Q4", "rank": "nan"}
        }"#;
        let dataset = Dataset::from_json_str(json)?;
        let names: Vec<&str> = dataset.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["GOOD", "EMPTY_RANK"]);
        assert_eq!(dataset.entries()[1].1.rank, None);
        Ok(())
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            Dataset::from_json_str("[1, 2]"),
            Err(ScholarIfError::Dataset(_))
        ));
        assert!(matches!(
            Dataset::from_json_str("{not json"),
            Err(ScholarIfError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"NATURE": {{"if": 50.5, "q": "Q1", "rank": "1/100"}}}}"#)?;
        let dataset = Dataset::load(file.path())?;
        assert_eq!(dataset.len(), 1);
        Ok(())
    }

    #[test]
    fn test_record_serializes_like_dataset() -> Result<()> {
        let json = serde_json::to_value(record(Some("5/100"), "Q1"))?;
        assert_eq!(json["originalName"], "Test Journal");
        assert_eq!(json["if"], 1.0);
        assert_eq!(json["q"], "Q1");
        assert_eq!(json["rank"], "5/100");
        Ok(())
    }
}
