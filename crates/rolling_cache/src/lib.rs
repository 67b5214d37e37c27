use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use core_types::DrawEntry;
use infra_clock::{duration_ms, Clock, SystemClock};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

pub mod period;

pub use period::{compare_periods, period_key, sort_newest_first};

/// Eviction rules. Each policy is independent; `None` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub capacity: Option<usize>,
    pub max_age: Option<Duration>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            capacity: Some(21),
            max_age: None,
        }
    }
}

impl RetentionPolicy {
    pub fn capacity(n: usize) -> Self {
        Self {
            capacity: Some(n),
            max_age: None,
        }
    }

    pub fn max_age(age: Duration) -> Self {
        Self {
            capacity: None,
            max_age: Some(age),
        }
    }

    pub fn with_max_age(mut self, age: Option<Duration>) -> Self {
        self.max_age = age;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub admitted: usize,
    pub duplicates: usize,
    pub evicted_capacity: usize,
    pub evicted_age: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    /// Newest first, unique by period.
    pub entries: Vec<DrawEntry>,
    /// Wall clock of the last merge that admitted anything.
    pub updated_at_ms: Option<i64>,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest-first projection onto the drawn digits.
    pub fn values(&self) -> Vec<u8> {
        self.entries.iter().map(|e| e.number).collect()
    }
}

/// Deduplicated, newest-first window of draw results.
///
/// Readers take an `Arc` of the current snapshot and never wait on a merge;
/// writers build the next snapshot off-lock and swap it in whole.
pub struct RollingCache {
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
    current: RwLock<Arc<CacheSnapshot>>,
    writer: Mutex<()>,
}

impl RollingCache {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: RetentionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            current: RwLock::new(Arc::new(CacheSnapshot::default())),
            writer: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.current.read().clone()
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    pub fn last_merge_ms(&self) -> Option<i64> {
        self.current.read().updated_at_ms
    }

    pub fn merge(&self, entries: &[DrawEntry]) -> MergeReport {
        self.merge_at(entries, self.clock.now_ms())
    }

    pub fn merge_at(&self, entries: &[DrawEntry], now_ms: i64) -> MergeReport {
        let mut report = MergeReport::default();
        if entries.is_empty() {
            return report;
        }

        let _writer = self.writer.lock();
        let prev = self.snapshot();

        let mut seen: HashSet<String> = prev
            .entries
            .iter()
            .map(|e| period_key(&e.period))
            .collect();
        let mut next = prev.entries.clone();
        for entry in entries {
            if seen.insert(period_key(&entry.period)) {
                next.push(entry.clone());
                report.admitted += 1;
            } else {
                report.duplicates += 1;
            }
        }
        if report.admitted == 0 {
            return report;
        }

        sort_newest_first(&mut next, |e| e.period.as_str());
        let (evicted_capacity, evicted_age) = apply_policy(&mut next, self.policy, now_ms);
        report.evicted_capacity = evicted_capacity;
        report.evicted_age = evicted_age;

        *self.current.write() = Arc::new(CacheSnapshot {
            entries: next,
            updated_at_ms: Some(now_ms),
        });
        report
    }

    /// Drop entries past the age window. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.prune_at(self.clock.now_ms())
    }

    pub fn prune_at(&self, now_ms: i64) -> usize {
        if self.policy.max_age.is_none() {
            return 0;
        }

        let _writer = self.writer.lock();
        let prev = self.snapshot();
        let mut next = prev.entries.clone();
        let removed = prune_expired(&mut next, self.policy.max_age, now_ms);
        if removed > 0 {
            *self.current.write() = Arc::new(CacheSnapshot {
                entries: next,
                updated_at_ms: prev.updated_at_ms,
            });
        }
        removed
    }
}

fn prune_expired(entries: &mut Vec<DrawEntry>, max_age: Option<Duration>, now_ms: i64) -> usize {
    let Some(max_age) = max_age else {
        return 0;
    };
    let max_age_ms = duration_ms(max_age);
    let before = entries.len();
    entries.retain(|e| now_ms.saturating_sub(e.timestamp) <= max_age_ms);
    before - entries.len()
}

fn apply_policy(entries: &mut Vec<DrawEntry>, policy: RetentionPolicy, now_ms: i64) -> (usize, usize) {
    let mut evicted_capacity = 0;
    if let Some(cap) = policy.capacity {
        if entries.len() > cap {
            evicted_capacity = entries.len() - cap;
            entries.truncate(cap);
        }
    }
    let evicted_age = prune_expired(entries, policy.max_age, now_ms);
    (evicted_capacity, evicted_age)
}
