//! Request counters.
//!
//! One mutable record shared by every handler. Counters are per-field
//! atomics behind an `Arc`, so the handle clones cheaply into request
//! tasks and never hands out a reference to the live struct; readers
//! get a by-value [`StatsSnapshot`].

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::Serialize;

#[derive(Default)]
struct Counters {
    errors: AtomicI64,
    uploads: AtomicI64,
    exists_yes: AtomicI64,
    exists_no: AtomicI64,
    downloads: AtomicI64,
    downloads_not_found: AtomicI64,
    ul_bytes: AtomicI64,
    dl_bytes: AtomicI64,
}

/// Shared counter handle.
#[derive(Clone, Default)]
pub struct Stats {
    inner: Arc<Counters>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&self) {
        self.inner.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload(&self, bytes: i64) {
        self.inner.uploads.fetch_add(1, Ordering::Relaxed);
        self.inner.ul_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_exists_hit(&self) {
        self.inner.exists_yes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exists_miss(&self) {
        self.inner.exists_no.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download(&self, bytes: i64) {
        self.inner.downloads.fetch_add(1, Ordering::Relaxed);
        self.inner.dl_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_download_not_found(&self) {
        self.inner.downloads_not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &*self.inner;
        StatsSnapshot {
            errors: c.errors.load(Ordering::Relaxed),
            uploads: c.uploads.load(Ordering::Relaxed),
            exists_yes: c.exists_yes.load(Ordering::Relaxed),
            exists_no: c.exists_no.load(Ordering::Relaxed),
            downloads: c.downloads.load(Ordering::Relaxed),
            downloads_not_found: c.downloads_not_found.load(Ordering::Relaxed),
            ul_bytes: c.ul_bytes.load(Ordering::Relaxed),
            dl_bytes: c.dl_bytes.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters. Meant for tests that reuse one server.
    pub fn reset(&self) {
        let c = &*self.inner;
        for counter in [
            &c.errors,
            &c.uploads,
            &c.exists_yes,
            &c.exists_no,
            &c.downloads,
            &c.downloads_not_found,
            &c.ul_bytes,
            &c.dl_bytes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub errors: i64,
    pub uploads: i64,
    pub exists_yes: i64,
    pub exists_no: i64,
    pub downloads: i64,
    pub downloads_not_found: i64,
    pub ul_bytes: i64,
    pub dl_bytes: i64,
}

impl StatsSnapshot {
    /// Labeled non-zero counters for the end-of-run summary line.
    ///
    /// When every counter is zero, the single pair `cache_requests=0` is
    /// returned instead, so "the proxy saw no cache traffic" is
    /// distinguishable from an accidentally empty summary.
    pub fn summary(&self) -> Vec<(&'static str, i64)> {
        let labeled = [
            ("errors", self.errors),
            ("uploads", self.uploads),
            ("exists_yes", self.exists_yes),
            ("exists_no", self.exists_no),
            ("downloads", self.downloads),
            ("downloads_not_found", self.downloads_not_found),
            ("ul_bytes", self.ul_bytes),
            ("dl_bytes", self.dl_bytes),
        ];
        let non_zero: Vec<_> = labeled.into_iter().filter(|(_, v)| *v > 0).collect();
        if non_zero.is_empty() {
            vec![("cache_requests", 0)]
        } else {
            non_zero
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (label, value) in self.summary() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{label}={value}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_operations() {
        let stats = Stats::new();
        stats.record_upload(29);
        stats.record_upload(13);
        stats.record_exists_hit();
        stats.record_exists_miss();
        stats.record_download(42);
        stats.record_download_not_found();
        stats.record_error();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                errors: 1,
                uploads: 2,
                exists_yes: 1,
                exists_no: 1,
                downloads: 1,
                downloads_not_found: 1,
                ul_bytes: 42,
                dl_bytes: 42,
            }
        );
    }

    #[test]
    fn clones_share_the_same_counters() {
        let stats = Stats::new();
        stats.clone().record_upload(5);
        assert_eq!(stats.snapshot().uploads, 1);
    }

    #[test]
    fn reset_zeroes_everything() {
        let stats = Stats::new();
        stats.record_upload(5);
        stats.record_error();
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn summary_skips_zero_counters() {
        let snapshot = StatsSnapshot {
            uploads: 1,
            ul_bytes: 29,
            ..Default::default()
        };
        assert_eq!(snapshot.summary(), vec![("uploads", 1), ("ul_bytes", 29)]);
    }

    #[test]
    fn all_zero_summary_is_the_sentinel() {
        let snapshot = StatsSnapshot::default();
        assert_eq!(snapshot.summary(), vec![("cache_requests", 0)]);
        assert_eq!(snapshot.to_string(), "cache_requests=0");
    }

    #[test]
    fn display_joins_pairs_with_spaces() {
        let snapshot = StatsSnapshot {
            uploads: 2,
            downloads: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.to_string(), "uploads=2 downloads=1");
    }
}
