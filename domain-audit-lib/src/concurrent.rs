//! Concurrent processing utilities for domain verification.
//!
//! This module provides the pool sizing rule, a shared progress counter and
//! the observer hook the coordinator reports through while a run is in flight.

use crate::types::DomainRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Upper bound on the worker pool, whatever the configuration says.
pub const MAX_POOL_SIZE: usize = 256;

/// Default worker pool size: one per CPU core, never fewer than two.
pub fn default_pool_size() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores.max(2).min(MAX_POOL_SIZE)
}

/// Completed/total counter shared between the coordinator and its callers.
///
/// Cloning is cheap; all clones see the same counts.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run of `total` domains.
    pub(crate) fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Mark one more domain as finished and return the new completed count.
    pub(crate) fn increment(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// `(completed, total)` snapshot.
    pub fn snapshot(&self) -> (usize, usize) {
        (self.completed(), self.total())
    }
}

/// Receives events while a run is in progress.
///
/// Called from the single task that collects results, so implementations
/// see records one at a time in completion order.
pub trait VerificationObserver: Send + Sync {
    /// A domain finished; `completed` of `total` are now done.
    fn on_progress(&self, _completed: usize, _total: usize) {}

    /// The record for a finished domain.
    fn on_record(&self, _record: &DomainRecord) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl VerificationObserver for NoopObserver {}
