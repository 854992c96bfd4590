use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::error::FetchError;
use super::fetch::EntryFetcher;
use super::types::RawRecord;

/// In-memory fetcher with failure injection and an optional artificial delay.
#[derive(Debug, Default)]
pub struct MockFetcher {
    records: RwLock<Vec<RawRecord>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    delay: RwLock<Option<Duration>>,
}

impl MockFetcher {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Default::default()
        }
    }

    /// Builds a fetcher from `(question, answer)` pairs with ids `1..=n`.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .enumerate()
                .map(|(i, (q, a))| RawRecord::new((i + 1).to_string(), *q, *a))
                .collect(),
        )
    }

    pub fn set_records(&self, records: Vec<RawRecord>) {
        *self.records.write() = records;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EntryFetcher for MockFetcher {
    async fn fetch_entries(&self) -> Result<Vec<RawRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Request {
                reason: "mock fetcher failure".to_string(),
            });
        }

        Ok(self.records.read().clone())
    }
}
