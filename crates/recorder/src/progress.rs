//! Write progress shared between the writer task and the frame loop

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Progress of one episode write
///
/// Updated by the writer task only; reads are lock-free and may lag by a
/// frame.
#[derive(Debug)]
pub struct WriteProgress {
    total: usize,
    /// Frames written or abandoned
    processed: AtomicUsize,
    written: AtomicUsize,
    failed: AtomicUsize,
    done: AtomicBool,
}

impl WriteProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            done: AtomicBool::new(false),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// `processed / total` in `[0, 1]`; `1.0` for an empty episode
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.processed() as f64 / self.total as f64).min(1.0)
    }

    /// Whether the writer has finished (successfully or not)
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn inc_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Release);
    }

    /// Count every remaining frame as processed (episode abandoned)
    pub(crate) fn abandon_rest(&self) {
        self.processed.store(self.total, Ordering::Release);
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            processed: self.processed(),
            written: self.written(),
            failed: self.failed(),
        }
    }
}

/// Point-in-time copy of [`WriteProgress`] (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub written: usize,
    pub failed: usize,
}
