//! Periodic stats refresh
//!
//! One [`StatsPoller`] backs one active view: it re-queries storage and
//! recomputes statistics on a fixed interval for as long as the view is
//! active, publishing snapshots through a watch channel. Overlapping
//! completions are resolved last-writer-wins. Aborting the task is the
//! only cancellation primitive; changing parameters means stopping the
//! poller and spawning a new one.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::storage::VolumeStorage;
use voldash_common::{compute_stats, TimeRange, Timeframe, VolumeStats};

/// View parameters one poller instance refreshes for
#[derive(Debug, Clone)]
pub struct PollerParams {
    /// Instrument to query
    pub symbol: String,
    /// Bar granularity to query
    pub timeframe: Timeframe,
    /// Display window to query
    pub range: TimeRange,
    /// Refresh interval
    pub interval: Duration,
}

/// Latest state of one polled view
#[derive(Debug, Clone, PartialEq)]
pub enum StatsSnapshot {
    /// No fetch has completed yet
    Loading,
    /// The most recently completed fetch
    Ready(VolumeStats),
    /// The most recent fetch failed; the next tick retries
    Failed(String),
}

/// Handle to a running stats refresh task
#[derive(Debug)]
pub struct StatsPoller {
    handle: JoinHandle<()>,
    rx: watch::Receiver<StatsSnapshot>,
}

impl StatsPoller {
    /// Spawn the refresh task for one view
    #[must_use]
    pub fn spawn(storage: Arc<dyn VolumeStorage>, params: PollerParams) -> Self {
        let (tx, rx) = watch::channel(StatsSnapshot::Loading);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(params.interval);
            loop {
                ticker.tick().await;

                let now = Utc::now();
                let cutoff = params.range.cutoff(now);
                let snapshot = match storage
                    .fetch_bars(&params.symbol, params.timeframe, cutoff)
                    .await
                {
                    Ok(bars) => {
                        debug!(
                            "Refreshed stats for {}/{}: {} bar(s)",
                            params.symbol,
                            params.timeframe,
                            bars.len()
                        );
                        StatsSnapshot::Ready(compute_stats(&bars, now))
                    }
                    Err(e) => {
                        warn!(
                            "Stats refresh for {}/{} failed: {}",
                            params.symbol, params.timeframe, e
                        );
                        StatsSnapshot::Failed(e.to_string())
                    }
                };

                // Only this task writes, so the latest completed fetch
                // always wins.
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });

        Self { handle, rx }
    }

    /// The most recently published snapshot
    #[must_use]
    pub fn latest(&self) -> StatsSnapshot {
        self.rx.borrow().clone()
    }

    /// Subscribe for snapshot updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StatsSnapshot> {
        self.rx.clone()
    }

    /// Stop refreshing. In-flight fetches are not awaited; their results
    /// are discarded with the task.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Whether the refresh task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
