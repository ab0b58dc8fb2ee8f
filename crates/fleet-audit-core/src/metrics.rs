//! Global atomic counters for audit runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    checks_evaluated: AtomicU64,
    probe_failures: AtomicU64,
    services_audited: AtomicU64,
    issues_filed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            checks_evaluated: AtomicU64::new(0),
            probe_failures: AtomicU64::new(0),
            services_audited: AtomicU64::new(0),
            issues_filed: AtomicU64::new(0),
        }
    }

    /// An evaluator ran (not-applicable dimensions are not counted).
    pub fn inc_checks_evaluated(&self) {
        self.checks_evaluated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_evaluated", "counter incremented");
    }

    /// A probe call failed and was folded into a `fail` result.
    pub fn inc_probe_failures(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "probe_failures", "counter incremented");
    }

    pub fn inc_services_audited(&self) {
        self.services_audited.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "services_audited", "counter incremented");
    }

    /// An issue was created or updated in the tracker.
    pub fn inc_issues_filed(&self) {
        self.issues_filed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "issues_filed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            checks_evaluated = self.checks_evaluated(),
            probe_failures = self.probe_failures(),
            services_audited = self.services_audited(),
            issues_filed = self.issues_filed(),
        );
    }

    pub fn checks_evaluated(&self) -> u64 {
        self.checks_evaluated.load(Ordering::Relaxed)
    }

    pub fn probe_failures(&self) -> u64 {
        self.probe_failures.load(Ordering::Relaxed)
    }

    pub fn services_audited(&self) -> u64 {
        self.services_audited.load(Ordering::Relaxed)
    }

    pub fn issues_filed(&self) -> u64 {
        self.issues_filed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.checks_evaluated.store(0, Ordering::Relaxed);
        self.probe_failures.store(0, Ordering::Relaxed);
        self.services_audited.store(0, Ordering::Relaxed);
        self.issues_filed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_checks_evaluated();
        m.inc_checks_evaluated();
        assert_eq!(m.checks_evaluated(), 2);

        m.inc_probe_failures();
        assert_eq!(m.probe_failures(), 1);

        m.inc_services_audited();
        m.inc_issues_filed();
        m.inc_issues_filed();
        assert_eq!(m.services_audited(), 1);
        assert_eq!(m.issues_filed(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_checks_evaluated();
        m.inc_probe_failures();
        m.inc_services_audited();
        m.inc_issues_filed();
        m.reset();
        assert_eq!(m.checks_evaluated(), 0);
        assert_eq!(m.probe_failures(), 0);
        assert_eq!(m.services_audited(), 0);
        assert_eq!(m.issues_filed(), 0);
    }
}
