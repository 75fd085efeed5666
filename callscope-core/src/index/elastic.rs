//! Elasticsearch backend for DXR-style code indexes.
//!
//! Blocking HTTP with timeout, retry and exponential backoff. Queries use
//! phrase matching on the server and exact filtering on our side, since
//! analyzed fields can match neighbouring spellings and similar paths.

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{CallscopeError, CallscopeResult};
use crate::index::document::{parse_response, RawResponse};
use crate::index::{Hits, IndexClient};
use crate::model::{FileInfo, FunctionDefinition, RefKind, SourceReference};

/// Field holding definition qualified names.
const DEFINITION_FIELD: &str = "c_function.qualname";
/// Field holding reference qualified names.
const REFERENCE_FIELD: &str = "c_function_ref.qualname";

/// Connection and query settings.
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL, e.g. `http://localhost:9200`
    pub endpoint: String,
    /// Explicit index name; auto-selected when `None`
    pub index: Option<String>,
    /// Substring an auto-selected index must contain
    pub include: String,
    /// Substrings an auto-selected index must not contain
    pub exclude: Vec<String>,
    /// Query `size`
    pub max_results: usize,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Initial backoff (doubles each retry)
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            index: None,
            include: "dxr".to_string(),
            exclude: Vec::new(),
            max_results: 1000,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Row of `/_cat/indices?format=json`.
#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
}

/// Pick an index deterministically: the lexicographically first name that
/// contains `include` and none of `exclude`.
pub fn select_index(names: &[String], include: &str, exclude: &[String]) -> Option<String> {
    let mut candidates: Vec<&String> = names
        .iter()
        .filter(|n| n.contains(include))
        .filter(|n| !exclude.iter().any(|x| !x.is_empty() && n.contains(x.as_str())))
        .collect();
    candidates.sort();
    candidates.first().map(|s| s.to_string())
}

/// Documents whose qualified-name field matches `qualname`.
pub fn qualname_query(kind: RefKind, qualname: &str, size: usize) -> Value {
    let field = match kind {
        RefKind::Definition => DEFINITION_FIELD,
        RefKind::Reference => REFERENCE_FIELD,
    };
    let mut phrase = serde_json::Map::new();
    phrase.insert(field.to_string(), json!(qualname));
    json!({
        "size": size,
        "query": { "match_phrase": phrase }
    })
}

/// Function definition documents in one file.
pub fn file_definitions_query(path: &str, size: usize) -> Value {
    json!({
        "size": size,
        "query": {
            "bool": {
                "must": [
                    { "exists": { "field": "c_function" } },
                    { "match_phrase": { "path": path } }
                ]
            }
        }
    })
}

/// The file document for `path` (the only documents carrying `links`).
pub fn file_query(path: &str, size: usize) -> Value {
    json!({
        "size": size,
        "query": {
            "bool": {
                "must": [
                    { "exists": { "field": "links" } },
                    { "match_phrase": { "path": path } }
                ]
            }
        }
    })
}

/// HTTP client bound to one index.
#[derive(Debug)]
pub struct ElasticIndex {
    config: ElasticConfig,
    client: Client,
    index: String,
}

impl ElasticIndex {
    /// Build the HTTP client and resolve the index to query.
    pub fn connect(mut config: ElasticConfig) -> CallscopeResult<Self> {
        if config.max_results == 0 {
            return Err(CallscopeError::invalid("max_results must be at least 1"));
        }
        config.endpoint = config.endpoint.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CallscopeError::unavailable_from(config.endpoint.clone(), e))?;

        let mut this = Self {
            config,
            client,
            index: String::new(),
        };

        this.index = match this.config.index.clone() {
            Some(name) => name,
            None => {
                let names = this.list_indices()?;
                select_index(&names, &this.config.include, &this.config.exclude).ok_or_else(
                    || {
                        CallscopeError::unavailable(
                            this.config.endpoint.clone(),
                            format!(
                                "no index containing '{}' among {} indices",
                                this.config.include,
                                names.len()
                            ),
                        )
                    },
                )?
            }
        };
        info!(endpoint = %this.config.endpoint, index = %this.index, "using index");
        Ok(this)
    }

    /// Name of the index being queried.
    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn list_indices(&self) -> CallscopeResult<Vec<String>> {
        let url = format!("{}/_cat/indices?format=json&h=index", self.config.endpoint);
        let body = self.send(&url, None)?;
        let rows: Vec<CatIndex> = serde_json::from_str(&body)
            .map_err(|e| CallscopeError::malformed(format!("index listing: {e}")))?;
        Ok(rows.into_iter().map(|r| r.index).collect())
    }

    fn search(&self, what: &str, query: &Value) -> CallscopeResult<RawResponse> {
        let url = format!("{}/{}/_search", self.config.endpoint, self.index);
        let started = Instant::now();
        let body = self.send(&url, Some(query))?;
        let response = parse_response(&body)?;
        debug!(
            query = what,
            took_ms = response.took.unwrap_or(0),
            elapsed_ms = started.elapsed().as_millis() as u64,
            hits = response.hits.hits.len(),
            "index query"
        );
        Ok(response)
    }

    /// Unified retry loop. GET without a body, POST with one.
    fn send(&self, url: &str, body: Option<&Value>) -> CallscopeResult<String> {
        let mut backoff = self.config.initial_backoff;
        let mut last_err = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!(
                    "index: retry attempt {}/{} after {:?}",
                    attempt, self.config.max_retries, backoff
                );
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(self.config.max_backoff);
            }

            let request = match body {
                Some(b) => self.client.post(url).json(b),
                None => self.client.get(url),
            };

            match request.send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .map_err(|e| CallscopeError::unavailable_from(url, e));
                    }
                    if status.is_client_error() {
                        let text = resp.text().unwrap_or_default();
                        return Err(CallscopeError::unavailable(
                            url,
                            format!("HTTP {status}: {text}"),
                        ));
                    }
                    last_err = format!("HTTP {status}");
                }
                Err(e) => {
                    last_err = e.to_string();
                }
            }
            warn!(url, error = %last_err, "index request failed");
        }

        Err(CallscopeError::unavailable(
            url,
            format!(
                "all {} retries exhausted: {last_err}",
                self.config.max_retries
            ),
        ))
    }
}

impl IndexClient for ElasticIndex {
    fn find_by_qualname(
        &self,
        qualname: &str,
        kind: RefKind,
    ) -> CallscopeResult<Hits<SourceReference>> {
        let size = self.config.max_results;
        let response = self.search("find_by_qualname", &qualname_query(kind, qualname, size))?;
        let truncated = response.is_truncated(size);
        let items = response
            .hits
            .hits
            .iter()
            .filter_map(|hit| hit.select(qualname, kind))
            .collect();
        Ok(Hits::new(items, truncated))
    }

    fn find_definitions_in_file(&self, path: &str) -> CallscopeResult<Hits<FunctionDefinition>> {
        let size = self.config.max_results;
        let response = self.search("find_definitions_in_file", &file_definitions_query(path, size))?;
        let truncated = response.is_truncated(size);
        let items = response
            .hits
            .hits
            .iter()
            .filter(|hit| hit.path() == Some(path))
            .flat_map(|hit| hit.definitions())
            .collect();
        Ok(Hits::new(items, truncated))
    }

    fn find_file(&self, path: &str) -> CallscopeResult<Option<FileInfo>> {
        let size = self.config.max_results;
        let response = self.search("find_file", &file_query(path, size))?;
        Ok(response
            .hits
            .hits
            .iter()
            .filter(|hit| hit.path() == Some(path))
            .find_map(|hit| hit.file_info()))
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.config.endpoint, self.index)
    }
}
