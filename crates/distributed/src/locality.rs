//! Split -> host cache locality hints.
//!
//! Writers serialize on a coordination lock and publish a fresh immutable
//! snapshot; readers clone the current snapshot handle and never wait on a
//! writer's bookkeeping. Hints are advisory: a missing or stale entry only
//! costs a cold cache read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use ssp_common::{HostId, SplitId, global_metrics};
use tracing::debug;

/// Immutable view of all hints at one point in time.
pub type LocalitySnapshot = Arc<HashMap<SplitId, Arc<[HostId]>>>;

#[derive(Default)]
pub struct CacheLocalityRegistry {
    write_lock: Mutex<()>,
    snapshot: RwLock<LocalitySnapshot>,
}

impl std::fmt::Debug for CacheLocalityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLocalityRegistry")
            .field("splits", &self.snapshot().len())
            .finish()
    }
}

impl CacheLocalityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `host` now holds a warm copy of `split`.
    ///
    /// Hosts accumulate in first-seen order; recording an already known host is
    /// a no-op.
    pub fn record_access(&self, split: &SplitId, host: &HostId) {
        self.update(|map| {
            let mut hosts = map.get(split).map(|h| h.to_vec()).unwrap_or_default();
            if hosts.contains(host) {
                return false;
            }
            hosts.push(host.clone());
            map.insert(split.clone(), hosts.into());
            true
        });
        debug!(
            split = %split,
            host = %host,
            operator = "CacheLocality",
            "split access recorded"
        );
    }

    /// Records one host for many splits under a single snapshot swap.
    pub fn record_accesses<'a>(&self, splits: impl IntoIterator<Item = &'a SplitId>, host: &HostId) {
        let splits = splits.into_iter().collect::<Vec<_>>();
        self.update(|map| {
            let mut changed = false;
            for split in &splits {
                let mut hosts = map.get(*split).map(|h| h.to_vec()).unwrap_or_default();
                if !hosts.contains(host) {
                    hosts.push(host.clone());
                    map.insert((*split).clone(), hosts.into());
                    changed = true;
                }
            }
            changed
        });
    }

    /// Hosts believed to hold `split`, first recorded first. Empty means no information.
    pub fn preferred_hosts(&self, split: &SplitId) -> Vec<HostId> {
        self.snapshot()
            .get(split)
            .map(|h| h.to_vec())
            .unwrap_or_default()
    }

    /// Drops all hints for `split`. Returns `true` when an entry existed.
    pub fn clear(&self, split: &SplitId) -> bool {
        self.update(|map| map.remove(split).is_some())
    }

    /// Drops every hint and returns the number of splits that had one.
    pub fn clear_all(&self) -> usize {
        let mut cleared = 0;
        self.update(|map| {
            cleared = map.len();
            map.clear();
            cleared > 0
        });
        debug!(cleared, operator = "CacheLocality", "locality hints cleared");
        cleared
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> LocalitySnapshot {
        Arc::clone(&self.snapshot.read().expect("locality snapshot lock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Applies `f` to a private copy of the map and publishes it when `f` reports a change.
    fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut HashMap<SplitId, Arc<[HostId]>>) -> bool,
    {
        let _guard = self.write_lock.lock().expect("locality write lock poisoned");
        let mut next = HashMap::clone(&self.snapshot());
        let changed = f(&mut next);
        if changed {
            let entries = next.len() as u64;
            *self
                .snapshot
                .write()
                .expect("locality snapshot lock poisoned") = Arc::new(next);
            global_metrics().set_locality_entries(entries);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn split(s: &str) -> SplitId {
        SplitId::new(s)
    }

    fn host(h: &str) -> HostId {
        HostId::new(h)
    }

    #[test]
    fn record_access_is_ordered_union() {
        let reg = CacheLocalityRegistry::new();
        reg.record_access(&split("a"), &host("h1"));
        reg.record_access(&split("a"), &host("h2"));
        reg.record_access(&split("a"), &host("h1"));
        assert_eq!(reg.preferred_hosts(&split("a")), vec![host("h1"), host("h2")]);
        assert!(reg.preferred_hosts(&split("missing")).is_empty());
    }

    #[test]
    fn clear_removes_one_entry_and_clear_all_reports_count() {
        let reg = CacheLocalityRegistry::new();
        reg.record_accesses([&split("a"), &split("b"), &split("c")], &host("h1"));
        assert!(reg.clear(&split("a")));
        assert!(!reg.clear(&split("a")));
        assert!(reg.preferred_hosts(&split("a")).is_empty());
        assert_eq!(reg.clear_all(), 2);
        assert_eq!(reg.clear_all(), 0);
        assert!(reg.is_empty());
    }

    #[test]
    fn snapshots_are_not_affected_by_later_writes() {
        let reg = CacheLocalityRegistry::new();
        reg.record_access(&split("a"), &host("h1"));
        let before = reg.snapshot();
        reg.record_access(&split("a"), &host("h2"));
        reg.clear(&split("a"));
        assert_eq!(before.get(&split("a")).map(|h| h.len()), Some(1));
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn concurrent_writers_keep_every_host() {
        let reg = Arc::new(CacheLocalityRegistry::new());
        let handles = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for s in 0..20 {
                        reg.record_access(&split(&format!("s{s}")), &host(&format!("h{i}")));
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.join().expect("writer thread");
        }
        assert_eq!(reg.len(), 20);
        assert!(
            reg.snapshot()
                .values()
                .all(|hosts| hosts.len() == 8)
        );
    }
}
