//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `FAQ_*` environment variables.
//! Pipeline thresholds are read separately by
//! [`PipelineConfig::from_env`](crate::pipeline::PipelineConfig::from_env).

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::bank::http::{DEFAULT_ANSWER_FIELD, DEFAULT_QUESTION_FIELD};
use crate::bank::{
    BankConfig, DEFAULT_REFRESH_BACKOFF_SECS, FetchError, FileFetcher, HttpTableFetcher,
    SourceFetcher, TableSourceConfig,
};
use crate::constants::{
    DEFAULT_BANK_TTL_SECS, DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBEDDING_MEMO_CAPACITY,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PAGE_SIZE,
};
use crate::embedding::EmbeddingConfig;
use crate::embedding::config::DEFAULT_EMBEDDING_MODEL;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `FAQ_*` overrides on top of defaults.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Paginated table endpoint holding the knowledge bank.
    pub source_url: Option<String>,

    /// Bearer token for the table endpoint.
    pub source_token: Option<String>,

    /// Property holding the question text. Default: `"Question"`.
    pub question_field: String,

    /// Property holding the answer text. Default: `"Answer"`.
    pub answer_field: String,

    /// Rows requested per page. Default: `100`.
    pub page_size: usize,

    /// Local JSON bank, used instead of the table endpoint when set.
    pub bank_file: Option<PathBuf>,

    /// OpenAI-compatible embeddings endpoint. Unset disables the semantic stage.
    pub embedding_url: Option<String>,

    pub embedding_model: String,

    pub embedding_api_key: Option<String>,

    /// Max texts per embedding request. Default: `64`.
    pub embed_batch_size: usize,

    /// Max memoized vectors. Default: `10_000`.
    pub embedding_memo_capacity: u64,

    /// Bank time-to-live. Default: 300s.
    pub bank_ttl: Duration,

    /// Serve the previous bank when a refresh fails. Default: `true`.
    pub serve_stale: bool,

    /// Timeout for outbound HTTP calls. Default: 15s.
    pub http_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("source_url", &self.source_url)
            .field("has_source_token", &self.source_token.is_some())
            .field("question_field", &self.question_field)
            .field("answer_field", &self.answer_field)
            .field("page_size", &self.page_size)
            .field("bank_file", &self.bank_file)
            .field("embedding_url", &self.embedding_url)
            .field("embedding_model", &self.embedding_model)
            .field("has_embedding_api_key", &self.embedding_api_key.is_some())
            .field("embed_batch_size", &self.embed_batch_size)
            .field("embedding_memo_capacity", &self.embedding_memo_capacity)
            .field("bank_ttl", &self.bank_ttl)
            .field("serve_stale", &self.serve_stale)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            source_url: None,
            source_token: None,
            question_field: DEFAULT_QUESTION_FIELD.to_string(),
            answer_field: DEFAULT_ANSWER_FIELD.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            bank_file: None,
            embedding_url: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            embedding_memo_capacity: DEFAULT_EMBEDDING_MEMO_CAPACITY,
            bank_ttl: Duration::from_secs(DEFAULT_BANK_TTL_SECS),
            serve_stale: true,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "FAQ_PORT";
    const ENV_BIND_ADDR: &'static str = "FAQ_BIND_ADDR";
    const ENV_SOURCE_URL: &'static str = "FAQ_SOURCE_URL";
    const ENV_SOURCE_TOKEN: &'static str = "FAQ_SOURCE_TOKEN";
    const ENV_QUESTION_FIELD: &'static str = "FAQ_QUESTION_FIELD";
    const ENV_ANSWER_FIELD: &'static str = "FAQ_ANSWER_FIELD";
    const ENV_PAGE_SIZE: &'static str = "FAQ_PAGE_SIZE";
    const ENV_BANK_FILE: &'static str = "FAQ_BANK_FILE";
    const ENV_EMBEDDING_URL: &'static str = "FAQ_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "FAQ_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "FAQ_EMBEDDING_API_KEY";
    const ENV_EMBED_BATCH_SIZE: &'static str = "FAQ_EMBED_BATCH_SIZE";
    const ENV_EMBEDDING_MEMO_CAPACITY: &'static str = "FAQ_EMBEDDING_MEMO_CAPACITY";
    const ENV_BANK_TTL_SECS: &'static str = "FAQ_BANK_TTL_SECS";
    const ENV_SERVE_STALE: &'static str = "FAQ_SERVE_STALE";
    const ENV_HTTP_TIMEOUT_SECS: &'static str = "FAQ_HTTP_TIMEOUT_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;

        let source_url = env_string(Self::ENV_SOURCE_URL);
        let source_token = env_string(Self::ENV_SOURCE_TOKEN);
        let question_field = env_string(Self::ENV_QUESTION_FIELD).unwrap_or(defaults.question_field);
        let answer_field = env_string(Self::ENV_ANSWER_FIELD).unwrap_or(defaults.answer_field);
        let page_size = env_parse(Self::ENV_PAGE_SIZE)?.unwrap_or(defaults.page_size);
        let bank_file = env_string(Self::ENV_BANK_FILE).map(PathBuf::from);

        let embedding_url = env_string(Self::ENV_EMBEDDING_URL);
        let embedding_model =
            env_string(Self::ENV_EMBEDDING_MODEL).unwrap_or(defaults.embedding_model);
        let embedding_api_key = env_string(Self::ENV_EMBEDDING_API_KEY);
        let embed_batch_size =
            env_parse(Self::ENV_EMBED_BATCH_SIZE)?.unwrap_or(defaults.embed_batch_size);
        let embedding_memo_capacity = env_parse(Self::ENV_EMBEDDING_MEMO_CAPACITY)?
            .unwrap_or(defaults.embedding_memo_capacity);

        let bank_ttl = env_parse(Self::ENV_BANK_TTL_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.bank_ttl);
        let serve_stale = env_bool(Self::ENV_SERVE_STALE)?.unwrap_or(defaults.serve_stale);
        let http_timeout = env_parse(Self::ENV_HTTP_TIMEOUT_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        Ok(Self {
            port,
            bind_addr,
            source_url,
            source_token,
            question_field,
            answer_field,
            page_size,
            bank_file,
            embedding_url,
            embedding_model,
            embedding_api_key,
            embed_batch_size,
            embedding_memo_capacity,
            bank_ttl,
            serve_stale,
            http_timeout,
        })
    }

    /// Validates the source selection, sizes and paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.bank_file, &self.source_url) {
            (Some(path), _) => {
                if !path.exists() {
                    return Err(ConfigError::PathNotFound { path: path.clone() });
                }
                if !path.is_file() {
                    return Err(ConfigError::NotAFile { path: path.clone() });
                }
            }
            (None, Some(_)) => {}
            (None, None) => {
                return Err(ConfigError::MissingEnvVar {
                    name: "FAQ_SOURCE_URL or FAQ_BANK_FILE",
                });
            }
        }

        for (field, value) in [
            (Self::ENV_PAGE_SIZE, self.page_size as u64),
            (Self::ENV_EMBED_BATCH_SIZE, self.embed_batch_size as u64),
            (Self::ENV_EMBEDDING_MEMO_CAPACITY, self.embedding_memo_capacity),
            (Self::ENV_HTTP_TIMEOUT_SECS, self.http_timeout.as_secs()),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be > 0".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Builds the configured fetcher. A bank file takes precedence over the table URL.
    pub fn source_fetcher(&self) -> Result<SourceFetcher, FetchError> {
        if let Some(path) = &self.bank_file {
            return Ok(SourceFetcher::File(FileFetcher::new(path.clone())));
        }

        let url = self.source_url.clone().ok_or_else(|| FetchError::InvalidConfig {
            reason: "no source URL or bank file configured".to_string(),
        })?;
        let table = TableSourceConfig::new(url)
            .token(self.source_token.clone())
            .fields(self.question_field.clone(), self.answer_field.clone())
            .page_size(self.page_size)
            .timeout(self.http_timeout);

        Ok(SourceFetcher::Table(HttpTableFetcher::new(table)?))
    }

    /// Embedding endpoint settings, or `None` when the semantic stage is disabled.
    pub fn embedding_config(&self) -> Option<EmbeddingConfig> {
        self.embedding_url.as_ref().map(|url| {
            EmbeddingConfig::new(url.clone())
                .model(self.embedding_model.clone())
                .api_key(self.embedding_api_key.clone())
                .timeout(self.http_timeout)
        })
    }

    pub fn bank_config(&self) -> BankConfig {
        BankConfig::default()
            .ttl(self.bank_ttl)
            .embed_batch_size(self.embed_batch_size)
            .serve_stale_on_error(self.serve_stale)
            .refresh_backoff(Duration::from_secs(DEFAULT_REFRESH_BACKOFF_SECS))
            .memo_capacity(self.embedding_memo_capacity)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }
}

/// Trimmed value of `name`, or `None` when unset or blank.
pub(crate) fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses `name` when set; a value that does not parse is an error, not a default.
pub(crate) fn env_parse<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env_string(name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::ParseError {
                name,
                reason: e.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

pub(crate) fn env_bool(name: &'static str) -> Result<Option<bool>, ConfigError> {
    match env_string(name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::ParseError {
                name,
                value,
                reason: "expected a boolean".to_string(),
            }),
        },
        None => Ok(None),
    }
}
