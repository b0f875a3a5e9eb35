//! Crossref-backed journal name resolution.
//!
//! Given a paper title, asks the Crossref works search for the best matching records
//! and returns their journal (`container-title`) names. Results are cached per exact
//! title for the lifetime of the resolver. Transport failures are retried with a fixed
//! delay; the public entry point never fails, it degrades to an empty list.

use crate::config::EngineConfig;
use crate::error::{Result, ScholarIfError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Anything that can turn a paper title into candidate journal names.
///
/// Implementations must not fail: errors are absorbed into an empty result.
#[async_trait]
pub trait JournalNameSource: Send + Sync {
    /// Candidate journal names for a paper title, best first, without duplicates
    async fn journal_names(&self, paper_title: &str) -> Vec<String>;
}

/// Crossref API client with caching, timeout and retry
pub struct CrossrefResolver {
    client: reqwest::Client,
    works_url: Url,
    rows: String,
    mailto: Option<String>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    cache: Mutex<HashMap<String, Vec<String>>>,
}

impl CrossrefResolver {
    /// Create a resolver from the engine configuration
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let works_url = Url::parse(&format!(
            "{}/works",
            config.api_base_url.trim_end_matches('/')
        ))
        .map_err(|e| {
            ScholarIfError::Config(format!("Invalid API base URL '{}': {}", config.api_base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ScholarIfError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            works_url,
            rows: config.rows.to_string(),
            mailto: config.mailto.clone(),
            timeout: config.request_timeout,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Resolve a paper title to candidate journal names.
    ///
    /// Cached titles return immediately. A reachable service with no matching items
    /// ends the call at once; only transport and HTTP failures are retried.
    pub async fn resolve(&self, paper_title: &str) -> Vec<String> {
        if paper_title.trim().is_empty() {
            return Vec::new();
        }

        if let Some(cached) = self.cached(paper_title) {
            debug!(title = short(paper_title), "Cache hit");
            return cached;
        }

        for attempt in 0..=self.max_retries {
            match self.fetch_once(paper_title.trim()).await {
                Ok(names) => {
                    if names.is_empty() {
                        debug!(title = short(paper_title), "No journal names returned");
                    } else {
                        debug!(
                            title = short(paper_title),
                            names = ?names,
                            "Resolved journal names"
                        );
                        if let Ok(mut cache) = self.cache.lock() {
                            cache.insert(paper_title.to_string(), names.clone());
                        }
                    }
                    return names;
                }
                Err(e) if !e.is_retryable() => {
                    warn!(title = short(paper_title), error = %e, "Unusable Crossref response");
                    return Vec::new();
                }
                Err(e) => {
                    debug!(
                        title = short(paper_title),
                        attempt = attempt + 1,
                        error = %e,
                        "Lookup failed"
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!(
            title = short(paper_title),
            attempts = self.max_retries + 1,
            "Giving up on Crossref lookup"
        );
        Vec::new()
    }

    /// Single outbound query
    async fn fetch_once(&self, title: &str) -> Result<Vec<String>> {
        let mut params: Vec<(&str, &str)> =
            vec![("query.title", title), ("rows", self.rows.as_str())];
        if let Some(mailto) = self.mailto.as_deref() {
            params.push(("mailto", mailto));
        }

        let response = self
            .client
            .get(self.works_url.clone())
            .query(&params)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScholarIfError::Api {
                code: status.as_u16(),
                message: format!("Crossref API error: {}", status),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let data: CrossrefResponse = serde_json::from_str(&body)?;

        if data.status != "ok" {
            debug!(status = %data.status, "Crossref returned a non-ok status");
            return Ok(Vec::new());
        }

        Ok(extract_journal_names(&data.message))
    }

    fn classify(&self, e: reqwest::Error) -> ScholarIfError {
        if e.is_timeout() {
            ScholarIfError::Timeout(self.timeout.as_secs())
        } else {
            ScholarIfError::Network(e)
        }
    }

    fn cached(&self, paper_title: &str) -> Option<Vec<String>> {
        self.cache.lock().ok()?.get(paper_title).cloned()
    }

    /// Number of cached titles
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            let dropped = cache.len();
            cache.clear();
            info!(dropped = dropped, "Cleared Crossref cache");
        }
    }
}

#[async_trait]
impl JournalNameSource for CrossrefResolver {
    async fn journal_names(&self, paper_title: &str) -> Vec<String> {
        self.resolve(paper_title).await
    }
}

// === Crossref API Response Types ===

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: serde_json::Value,
}

/// First `container-title` of every item, deduplicated in first-seen order
fn extract_journal_names(message: &serde_json::Value) -> Vec<String> {
    let Some(items) = message["items"].as_array() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| item["container-title"].get(0)?.as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

fn short(title: &str) -> &str {
    match title.char_indices().nth(30) {
        Some((idx, _)) => &title[..idx],
        None => title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Instant;

    const TITLE: &str = "Human-level control through deep reinforcement learning";

    fn config_for(base_url: &str) -> EngineConfig {
        EngineConfig {
            api_base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn ok_body(journals: &[&str]) -> String {
        let items: Vec<_> = journals
            .iter()
            .map(|j| json!({ "container-title": [j] }))
            .collect();
        json!({ "status": "ok", "message": { "items": items } }).to_string()
    }

    fn title_matcher() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("query.title".into(), TITLE.into()),
            Matcher::UrlEncoded("rows".into(), "3".into()),
        ])
    }

    #[test]
    fn test_extract_journal_names_dedup_in_order() {
        let message = json!({
            "items": [
                { "container-title": ["Nature"] },
                { "container-title": [] },
                { "title": ["no container"] },
                { "container-title": ["Science", "Science (New York, N.Y.)"] },
                { "container-title": ["Nature"] },
                { "container-title": ["  "] }
            ]
        });
        assert_eq!(extract_journal_names(&message), vec!["Nature", "Science"]);
    }

    #[test]
    fn test_extract_journal_names_unexpected_shape() {
        assert!(extract_journal_names(&json!([{ "message": "bad" }])).is_empty());
        assert!(extract_journal_names(&json!({ "items": "none" })).is_empty());
        assert!(extract_journal_names(&serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_short_respects_char_boundaries() {
        let long = "한".repeat(40);
        assert_eq!(short(&long).chars().count(), 30);
        assert_eq!(short("abc"), "abc");
    }

    #[tokio::test]
    async fn test_resolve_and_cache() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(title_matcher())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok_body(&["Nature", "Nature", "Science"]))
            .expect(1)
            .create_async()
            .await;

        let resolver = CrossrefResolver::new(&config_for(&server.url()))?;
        assert_eq!(resolver.resolve(TITLE).await, vec!["Nature", "Science"]);
        assert_eq!(resolver.resolve(TITLE).await, vec!["Nature", "Science"]);
        assert_eq!(resolver.cache_len(), 1);

        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_result_not_retried_or_cached() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(ok_body(&[]))
            .expect(2)
            .create_async()
            .await;

        let resolver = CrossrefResolver::new(&config_for(&server.url()))?;
        assert!(resolver.resolve(TITLE).await.is_empty());
        assert_eq!(resolver.cache_len(), 0);
        // not cached, so a second call goes out again
        assert!(resolver.resolve(TITLE).await.is_empty());

        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_non_ok_status_field_is_empty() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "failed", "message": [{"type": "validation"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let resolver = CrossrefResolver::new(&config_for(&server.url()))?;
        assert!(resolver.resolve(TITLE).await.is_empty());

        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_json_not_retried() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .expect(1)
            .create_async()
            .await;

        let resolver = CrossrefResolver::new(&config_for(&server.url()))?;
        assert!(resolver.resolve(TITLE).await.is_empty());

        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_http_error_retries_twice_with_fixed_delay() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let config = EngineConfig {
            retry_delay: Duration::from_secs(1),
            ..config_for(&server.url())
        };
        let resolver = CrossrefResolver::new(&config)?;

        let started = Instant::now();
        let names = resolver.resolve(TITLE).await;
        let elapsed = started.elapsed();

        assert!(names.is_empty());
        assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_secs(30), "elapsed {:?}", elapsed);
        assert_eq!(resolver.cache_len(), 0);

        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_gives_up_with_empty_result() -> Result<()> {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let config = EngineConfig {
            request_timeout: Duration::from_millis(200),
            retry_delay: Duration::from_millis(10),
            ..config_for(&format!("http://{}", addr))
        };
        let resolver = CrossrefResolver::new(&config)?;

        let started = Instant::now();
        assert!(resolver.resolve(TITLE).await.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(600));

        hold.abort();
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_title_skips_request() -> Result<()> {
        let resolver = CrossrefResolver::new(&config_for("http://127.0.0.1:9"))?;
        assert!(resolver.resolve("   ").await.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_base_url() {
        let config = EngineConfig {
            api_base_url: "::not a url::".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            CrossrefResolver::new(&config),
            Err(ScholarIfError::Config(_))
        ));
    }
}
