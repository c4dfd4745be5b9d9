//! Engine configuration.

use crate::store::SessionMode;

/// Default walk size at which a summary line is logged.
pub const DEFAULT_BULK_REPORT_THRESHOLD: usize = 10;

/// Default recursion limit of a walk.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default number of walks that may wait for a worker.
pub const DEFAULT_MAX_QUEUED: usize = 1024;

fn default_max_in_flight() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(4)
        .max(1)
}

/// Configuration of the reindex engine and its dispatcher.
#[derive(Debug, Clone)]
pub struct ReindexConfig {
    /// Maximum number of walks running at once.
    pub max_in_flight: usize,

    /// Maximum number of accepted walks waiting for a worker. Requests beyond
    /// this are dropped with a warning.
    pub max_queued: usize,

    /// A walk that indexes at least this many entities logs one summary line.
    pub bulk_report_threshold: usize,

    /// Branches deeper than this are pruned with a warning.
    pub max_depth: usize,

    /// Knobs applied to the walk's session.
    pub session_mode: SessionMode,
}

impl ReindexConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            max_queued: DEFAULT_MAX_QUEUED,
            bulk_report_threshold: DEFAULT_BULK_REPORT_THRESHOLD,
            max_depth: DEFAULT_MAX_DEPTH,
            session_mode: SessionMode::reindexing(),
        }
    }

    /// Set the number of workers.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    /// Set the queue bound. Zero means a request is only accepted when a
    /// worker is free.
    pub fn with_max_queued(mut self, max: usize) -> Self {
        self.max_queued = max;
        self
    }

    /// Set the summary threshold.
    pub fn with_bulk_report_threshold(mut self, threshold: usize) -> Self {
        self.bulk_report_threshold = threshold;
        self
    }

    /// Set the recursion limit.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the session knobs.
    pub fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self::new()
    }
}
