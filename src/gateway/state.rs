use std::sync::Arc;

use crate::bank::EntryFetcher;
use crate::embedding::Embedder;
use crate::pipeline::Resolver;

/// Shared state handed to every handler.
pub struct HandlerState<F: EntryFetcher + 'static, E: Embedder + 'static> {
    pub resolver: Arc<Resolver<F, E>>,
}

impl<F: EntryFetcher + 'static, E: Embedder + 'static> HandlerState<F, E> {
    pub fn new(resolver: Arc<Resolver<F, E>>) -> Self {
        Self { resolver }
    }
}

impl<F: EntryFetcher + 'static, E: Embedder + 'static> Clone for HandlerState<F, E> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}
