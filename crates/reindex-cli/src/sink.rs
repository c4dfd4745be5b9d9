//! Index sink used by dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use reindex_core::{Entity, IndexError, IndexSink};

/// Logs every document it is given instead of writing an index.
#[derive(Debug, Default)]
pub struct LoggingSink {
    documents: AtomicUsize,
}

impl LoggingSink {
    /// Create a sink that has seen no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents received so far.
    pub fn documents(&self) -> usize {
        self.documents.load(Ordering::Relaxed)
    }
}

impl IndexSink for LoggingSink {
    fn index(&self, entity: &Entity) -> Result<(), IndexError> {
        self.documents.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            entity = %entity.key(),
            document = %entity.document(),
            "would index document"
        );
        Ok(())
    }
}
