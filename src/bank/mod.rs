//! Knowledge bank: fetched Q/A entries, their vectors, and the TTL cache around them.

pub mod cache;
pub mod error;
pub mod fetch;
pub mod file;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod types;


pub use cache::{BankCache, BankConfig, DEFAULT_REFRESH_BACKOFF_SECS};
pub use error::{BankError, BankResult, FetchError};
pub use fetch::{EntryFetcher, SourceFetcher};
pub use file::FileFetcher;
pub use http::{HttpTableFetcher, TableSourceConfig};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockFetcher;
pub use types::{Bank, Entry, RawRecord, RecordRejected, SemanticStatus};
