//! Google Scholar page parsing.
//!
//! Extracts one [`Row`] per result from a saved search results page
//! (`div.gs_r.gs_or.gs_scl`) or author profile (`tr.gsc_a_tr`): the paper title, the
//! journal text shown under it, and whether Scholar cut that text off.

use crate::engine::{CandidateInput, Row};
use crate::error::{Result, ScholarIfError};
use crate::normalize::{is_truncated, strip_volume};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

/// Separators between the author, venue and publisher parts of a result's meta line
const META_SEPARATORS: [char; 3] = ['-', '\u{2013}', '\u{2014}'];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScholarIfError::Parse(e.to_string()))
}

fn text_of(elem: ElementRef<'_>) -> String {
    elem.text().collect::<String>().trim().to_string()
}

/// Journal candidate from a search result meta line such as
/// `"J Smith, A Doe - Nature, 2015 - nature.com"`.
///
/// Takes the second part up to its first comma; when that is a bare year, the third
/// part is used instead.
pub fn candidate_from_meta(meta: &str) -> Option<String> {
    let parts: Vec<&str> = meta.split(&META_SEPARATORS[..]).map(str::trim).collect();
    if parts.len() < 2 {
        return None;
    }

    let first_field = |part: &str| part.split(',').next().unwrap_or("").trim().to_string();

    let mut candidate = first_field(parts[1]);
    if is_year(&candidate) {
        if let Some(next) = parts.get(2) {
            candidate = first_field(*next);
        }
    }

    let candidate = strip_volume(&candidate);
    (!candidate.is_empty()).then_some(candidate)
}

/// Journal candidate from a profile row's venue line: `"Nature 521 (7553), 436-444, 2015"`
pub fn candidate_from_profile(venue_line: &str) -> Option<String> {
    let first = venue_line.split(',').next().unwrap_or("").trim();
    let candidate = strip_volume(first);
    (!candidate.is_empty()).then_some(candidate)
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_digit())
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Parse every resolvable row of a Scholar search or profile page
pub fn parse_rows(html: &str) -> Result<Vec<Row>> {
    let document = Html::parse_document(html);

    let result_selector = selector("div.gs_r.gs_or.gs_scl")?;
    let meta_selector = selector("div.gs_a")?;
    let title_link_selector = selector(".gs_rt a")?;
    let profile_selector = selector("tr.gsc_a_tr")?;
    let profile_info_selector = selector(".gsc_a_t .gs_gray")?;
    let profile_title_selector = selector(".gsc_a_at")?;

    let mut rows = Vec::new();

    for (idx, item) in document.select(&result_selector).enumerate() {
        let Some(meta) = item.select(&meta_selector).next() else {
            continue;
        };
        let meta_text = text_of(meta);
        let Some(journal) = candidate_from_meta(&meta_text) else {
            debug!(meta = %meta_text, "No journal in result meta line");
            continue;
        };

        let paper_title = item
            .select(&title_link_selector)
            .next()
            .map(text_of)
            .and_then(non_empty);

        let id = item
            .value()
            .attr("data-cid")
            .map(str::to_string)
            .unwrap_or_else(|| format!("result-{}", idx));

        rows.push(Row {
            id,
            candidate: CandidateInput {
                journal_candidate: journal,
                paper_title,
                is_truncated: is_truncated(&meta_text),
            },
        });
    }

    for (idx, item) in document.select(&profile_selector).enumerate() {
        let info: Vec<ElementRef<'_>> = item.select(&profile_info_selector).collect();
        let Some(venue) = info.get(1) else {
            continue;
        };
        let venue_text = text_of(*venue);
        let Some(journal) = candidate_from_profile(&venue_text) else {
            continue;
        };

        let title_link = item.select(&profile_title_selector).next();
        let paper_title = title_link.map(text_of).and_then(non_empty);
        let id = title_link
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("profile-{}", idx));

        rows.push(Row {
            id,
            candidate: CandidateInput {
                journal_candidate: journal,
                paper_title,
                is_truncated: is_truncated(&venue_text),
            },
        });
    }

    info!(rows = rows.len(), "Parsed Scholar rows");
    Ok(rows)
}
