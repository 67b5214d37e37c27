use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_types::{FetchOutcome, RelayError, UpstreamSource};
use feed_upstream::{body_preview, extract_records};
use parking_lot::RwLock;
use record_mapper::map_records;
use rolling_cache::{MergeReport, RollingCache};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const DEBUG_PREVIEW_CHARS: usize = 2_000;
const ERROR_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CycleOutcome {
    /// Another cycle held the busy flag.
    Skipped,
    Merged(MergeReport),
    Failed(RelayError),
}

/// Last raw upstream exchange, served by `/debug-upstream`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpstreamDebug {
    pub(crate) status: Option<u16>,
    pub(crate) fetched_at: Option<i64>,
    pub(crate) latency_ms: Option<u64>,
    pub(crate) preview: Option<String>,
    pub(crate) last_error: Option<String>,
    pub(crate) last_error_at: Option<i64>,
}

#[derive(Debug, Default)]
pub(crate) struct PollStats {
    cycles: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    admitted: AtomicU64,
    last: RwLock<UpstreamDebug>,
}

impl PollStats {
    pub(crate) fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub(crate) fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub(crate) fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    pub(crate) fn upstream_debug(&self) -> UpstreamDebug {
        self.last.read().clone()
    }

    fn record_fetch(&self, outcome: &FetchOutcome) {
        let mut last = self.last.write();
        last.status = Some(outcome.status);
        last.fetched_at = Some(outcome.fetched_at_ms);
        last.latency_ms = Some(outcome.latency_ms);
        last.preview = Some(body_preview(&outcome.body.render(), DEBUG_PREVIEW_CHARS));
    }

    fn record_error(&self, err: &RelayError, at_ms: i64) {
        let mut last = self.last.write();
        last.last_error = Some(err.to_string());
        last.last_error_at = Some(at_ms);
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives fetch → extract → map → merge on a fixed cadence. At most one
/// cycle runs at a time; ticks that land on a busy poller are dropped.
pub(crate) struct Poller {
    source: Arc<dyn UpstreamSource>,
    cache: Arc<RollingCache>,
    busy: AtomicBool,
    stats: PollStats,
}

impl Poller {
    pub(crate) fn new(source: Arc<dyn UpstreamSource>, cache: Arc<RollingCache>) -> Self {
        Self {
            source,
            cache,
            busy: AtomicBool::new(false),
            stats: PollStats::default(),
        }
    }

    pub(crate) fn cache(&self) -> &Arc<RollingCache> {
        &self.cache
    }

    pub(crate) fn stats(&self) -> &PollStats {
        &self.stats
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = BusyGuard::claim(&self.busy) else {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("relay.cycle.skipped").increment(1);
            tracing::debug!("poll cycle still in flight; tick skipped");
            return CycleOutcome::Skipped;
        };
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay.cycle.total").increment(1);

        let outcome = self.source.fetch().await;
        metrics::histogram!("relay.fetch.latency_ms").record(outcome.latency_ms as f64);
        self.stats.record_fetch(&outcome);

        let result = self.ingest(&outcome);
        metrics::gauge!("relay.cache.size").set(self.cache.len() as f64);

        match result {
            Ok(report) => {
                self.stats
                    .admitted
                    .fetch_add(report.admitted as u64, Ordering::Relaxed);
                metrics::counter!("relay.cycle.admitted").increment(report.admitted as u64);
                tracing::info!(
                    admitted = report.admitted,
                    duplicates = report.duplicates,
                    evicted = report.evicted_capacity + report.evicted_age,
                    size = self.cache.len(),
                    latency_ms = outcome.latency_ms,
                    "poll cycle merged"
                );
                CycleOutcome::Merged(report)
            }
            Err(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                self.stats.record_error(&err, outcome.fetched_at_ms);
                metrics::counter!("relay.cycle.failed").increment(1);
                tracing::warn!(%err, status = outcome.status, "poll cycle failed; cache untouched");
                CycleOutcome::Failed(err)
            }
        }
    }

    fn ingest(&self, outcome: &FetchOutcome) -> Result<MergeReport, RelayError> {
        if !outcome.is_success() {
            return Err(RelayError::Upstream {
                status: outcome.status,
                message: body_preview(&outcome.body.render(), ERROR_PREVIEW_CHARS),
            });
        }
        let raws = outcome
            .body
            .as_json()
            .map(extract_records)
            .unwrap_or_default();
        if raws.is_empty() {
            return Err(RelayError::EmptyExtraction);
        }
        let batch = map_records(&raws, self.cache.now_ms());
        if batch.rejected > 0 {
            metrics::counter!("relay.mapper.rejected").increment(batch.rejected as u64);
            tracing::debug!(rejected = batch.rejected, total = raws.len(), "mapper dropped records");
        }
        if batch.entries.is_empty() {
            return Err(RelayError::NoUsableRecords {
                rejected: batch.rejected,
            });
        }
        Ok(self.cache.merge(&batch.entries))
    }

    /// Age out stale entries independently of any fetch, so they expire
    /// while the upstream is down. Returns how many were dropped.
    pub(crate) fn prune_expired(&self) -> usize {
        let pruned = self.cache.prune();
        if pruned > 0 {
            metrics::gauge!("relay.cache.size").set(self.cache.len() as f64);
            tracing::info!(pruned, size = self.cache.len(), "expired entries pruned");
        }
        pruned
    }

    /// First tick fires immediately. Every tick prunes, then starts a cycle.
    pub(crate) fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.prune_expired();
                let poller = self.clone();
                tokio::spawn(async move {
                    poller.run_cycle().await;
                });
            }
        })
    }
}
