use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

use crate::page::MutationRecord;
use crate::Result;

use super::VideoRecord;

/// Default observation window
pub const DEFAULT_WATCH_TIMEOUT: Duration = Duration::from_millis(3000);

/// How a watch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A re-run produced records
    Found,
    /// The deadline passed first
    TimedOut,
    /// The document stopped publishing mutations
    SourceClosed,
}

/// Bounded wait for late-arriving content.
///
/// Each watch is a single future: it re-runs extraction whenever a mutation batch
/// adds nodes and resolves either on the first non-empty result or at the deadline,
/// whichever comes first. Dropping the receiver on return ends the observation.
#[derive(Debug, Clone, Copy)]
pub struct DynamicContentWatcher {
    timeout: Duration,
}

impl DynamicContentWatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn watch_and_retry<F>(
        &self,
        mut mutations: broadcast::Receiver<MutationRecord>,
        mut extract: F,
    ) -> Result<Vec<VideoRecord>>
    where
        F: FnMut() -> Result<Vec<VideoRecord>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut best: Vec<VideoRecord> = Vec::new();
        let mut reruns = 0usize;

        debug!("👀 Watching for late content for up to {:?}", self.timeout);

        let outcome = loop {
            match timeout_at(deadline, mutations.recv()).await {
                Err(_) => break WatchOutcome::TimedOut,
                Ok(Err(RecvError::Closed)) => break WatchOutcome::SourceClosed,
                Ok(Err(RecvError::Lagged(skipped))) => {
                    debug!("Watcher lagged behind {} mutation batches", skipped);
                }
                Ok(Ok(record)) if record.added_nodes == 0 => continue,
                Ok(Ok(_)) => {}
            }

            reruns += 1;
            let records = extract()?;
            if records.len() > best.len() {
                best = records;
            }
            if !best.is_empty() {
                break WatchOutcome::Found;
            }
        };

        info!(
            "Watcher finished: {:?} after {} re-runs, {} records",
            outcome,
            reruns,
            best.len()
        );
        Ok(best)
    }
}

impl Default for DynamicContentWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_WATCH_TIMEOUT)
    }
}
