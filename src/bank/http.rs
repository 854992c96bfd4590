//! Paginated HTTP table source.
//!
//! Each page is requested with `POST {url}` and a JSON body
//! `{"page_size": n, "start_cursor": "..."}`; the response carries
//! `results`, `has_more` and `next_cursor`. Row properties are either plain
//! strings or rich-text objects (`title` / `rich_text` arrays of fragments with
//! `plain_text`).

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PAGE_SIZE, MAX_FETCH_PAGES};

use super::error::FetchError;
use super::fetch::EntryFetcher;
use super::types::RawRecord;

pub const DEFAULT_QUESTION_FIELD: &str = "Question";
pub const DEFAULT_ANSWER_FIELD: &str = "Answer";

#[derive(Clone)]
pub struct TableSourceConfig {
    pub url: String,
    /// Sent as a bearer token when present.
    pub token: Option<String>,
    pub question_field: String,
    pub answer_field: String,
    pub page_size: usize,
    pub timeout: Duration,
}

impl std::fmt::Debug for TableSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSourceConfig")
            .field("url", &self.url)
            .field("has_token", &self.token.is_some())
            .field("question_field", &self.question_field)
            .field("answer_field", &self.answer_field)
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TableSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            question_field: DEFAULT_QUESTION_FIELD.to_string(),
            answer_field: DEFAULT_ANSWER_FIELD.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn fields(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.question_field = question.into();
        self.answer_field = answer.into();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        if self.url.trim().is_empty() {
            return Err(FetchError::InvalidConfig {
                reason: "url cannot be empty".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(FetchError::InvalidConfig {
                reason: "page_size must be > 0".to_string(),
            });
        }
        if self.question_field.is_empty() || self.answer_field.is_empty() {
            return Err(FetchError::InvalidConfig {
                reason: "question and answer field names cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PageRequest<'a> {
    page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageRow {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

impl PageRow {
    /// Decodes one result row; rows are checked one at a time so a bad row never
    /// fails its page.
    fn decode(row: Value, question_field: &str, answer_field: &str) -> Result<RawRecord, String> {
        let row: PageRow = serde_json::from_value(row).map_err(|e| e.to_string())?;
        let id = match &row.id {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Null => return Err("missing id".to_string()),
            other => return Err(format!("unsupported id {}", other)),
        };

        Ok(RawRecord {
            question: row.properties.get(question_field).and_then(property_text),
            answer: row.properties.get(answer_field).and_then(property_text),
            id,
        })
    }
}

fn fragment_text(fragment: &Value) -> Option<&str> {
    match fragment {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("plain_text")
            .and_then(Value::as_str)
            .or_else(|| map.get("text")?.get("content")?.as_str()),
        _ => None,
    }
}

fn join_fragments(fragments: &[Value]) -> String {
    fragments.iter().filter_map(fragment_text).collect()
}

/// Extracts display text from a row property, or `None` when it has no text.
pub(crate) fn property_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(fragments) => join_fragments(fragments),
        Value::Object(map) => {
            if let Some(Value::Array(fragments)) = map.get("title").or_else(|| map.get("rich_text"))
            {
                join_fragments(fragments)
            } else if let Some(text) = fragment_text(value) {
                text.to_string()
            } else {
                return None;
            }
        }
        _ => return None,
    };

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Fetcher for a cursor-paginated HTTP table.
#[derive(Clone)]
pub struct HttpTableFetcher {
    client: HttpClient,
    config: TableSourceConfig,
}

impl std::fmt::Debug for HttpTableFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTableFetcher")
            .field("url", &self.config.url)
            .field("page_size", &self.config.page_size)
            .field("has_token", &self.config.token.is_some())
            .finish()
    }
}

impl HttpTableFetcher {
    pub fn new(config: TableSourceConfig) -> Result<Self, FetchError> {
        config.validate()?;

        let client = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::InvalidConfig {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TableSourceConfig {
        &self.config
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page, FetchError> {
        let mut request = self.client.post(&self.config.url).json(&PageRequest {
            page_size: self.config.page_size,
            start_cursor: cursor,
        });
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

impl EntryFetcher for HttpTableFetcher {
    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn fetch_entries(&self) -> Result<Vec<RawRecord>, FetchError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=MAX_FETCH_PAGES {
            let page = self.fetch_page(cursor.as_deref()).await?;
            let rows = page.results.len();

            for row in page.results {
                match PageRow::decode(row, &self.config.question_field, &self.config.answer_field)
                {
                    Ok(record) => records.push(record),
                    Err(reason) => debug!(page = page_number, %reason, "Skipping malformed row"),
                }
            }

            debug!(page = page_number, rows, has_more = page.has_more, "Fetched page");

            if !page.has_more {
                return Ok(records);
            }

            match page.next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                Some(next) => {
                    return Err(FetchError::Pagination {
                        reason: format!("cursor '{}' repeated", next),
                    });
                }
                None => {
                    return Err(FetchError::Pagination {
                        reason: "has_more set without next_cursor".to_string(),
                    });
                }
            }
        }

        warn!(max_pages = MAX_FETCH_PAGES, "Page limit reached");
        Err(FetchError::Pagination {
            reason: format!("exceeded {} pages", MAX_FETCH_PAGES),
        })
    }
}
