use super::error::FetchError;
use super::file::FileFetcher;
use super::http::HttpTableFetcher;
use super::types::RawRecord;

/// Retrieves every row of the backing store.
///
/// Implementations follow pagination until exhausted and either return all rows
/// or fail; a partial result is never returned.
pub trait EntryFetcher: Send + Sync {
    fn fetch_entries(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<RawRecord>, FetchError>> + Send;
}

/// Fetcher selected at startup from configuration.
#[derive(Debug, Clone)]
pub enum SourceFetcher {
    Table(HttpTableFetcher),
    File(FileFetcher),
}

impl SourceFetcher {
    pub fn describe(&self) -> String {
        match self {
            SourceFetcher::Table(fetcher) => format!("table:{}", fetcher.config().url),
            SourceFetcher::File(fetcher) => format!("file:{}", fetcher.path().display()),
        }
    }
}

impl EntryFetcher for SourceFetcher {
    async fn fetch_entries(&self) -> Result<Vec<RawRecord>, FetchError> {
        match self {
            SourceFetcher::Table(fetcher) => fetcher.fetch_entries().await,
            SourceFetcher::File(fetcher) => fetcher.fetch_entries().await,
        }
    }
}
