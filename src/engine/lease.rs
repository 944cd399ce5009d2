//! Resource leases for engine-allocated objects
//!
//! Table definitions and OLE scratch buffers handed out by an engine are tied
//! to a lease. Dropping the owning value releases the lease, so release happens
//! on every exit path without caller discipline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts leases that have been acquired but not yet released
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    outstanding: Arc<AtomicUsize>,
}

impl ResourceTracker {
    /// Create a tracker with no outstanding leases
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a lease
    pub fn acquire(&self) -> Lease {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        Lease {
            outstanding: Some(self.outstanding.clone()),
        }
    }

    /// Number of leases currently held
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

/// A held resource; released on drop
#[derive(Debug, Default)]
pub struct Lease {
    outstanding: Option<Arc<AtomicUsize>>,
}

impl Lease {
    /// A lease that is not tracked by anyone
    pub fn untracked() -> Self {
        Self { outstanding: None }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(outstanding) = self.outstanding.take() {
            outstanding.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
