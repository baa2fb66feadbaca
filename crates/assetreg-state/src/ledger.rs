//! The ordered key-value ledger abstraction.
//!
//! A [`Ledger`] is the view one invocation has of the host ledger: point
//! reads and writes plus prefix scans. Scans hand out a [`ScanHandle`],
//! which holds a lease on host-side scan state until it is closed or
//! dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::StateResult;
use crate::keys::CompositeKey;

/// Raw `(key, value)` pair produced by a scan, in key order.
pub type ScanEntry = (Vec<u8>, Vec<u8>);

/// Ordered key-value ledger scoped to a single invocation.
///
/// Implementations must be read-your-own-writes consistent: a `get_state`
/// after a `put_state` of the same key observes the new value.
pub trait Ledger {
    fn get_state(&self, key: &CompositeKey) -> StateResult<Option<Vec<u8>>>;

    fn put_state(&mut self, key: &CompositeKey, value: &[u8]) -> StateResult<()>;

    /// Open a scan over every key of `object_type` whose parts begin with
    /// `parts`, in key order.
    fn scan_partial(&self, object_type: &str, parts: &[String]) -> StateResult<ScanHandle<'_>>;
}

/// Counts scan handles that have been acquired and not yet released.
#[derive(Debug, Clone, Default)]
pub struct ScanTracker {
    open: Arc<AtomicUsize>,
}

impl ScanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> ScanLease {
        self.open.fetch_add(1, Ordering::SeqCst);
        ScanLease {
            open: Some(Arc::clone(&self.open)),
        }
    }

    pub fn open_scans(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// One outstanding scan. Released exactly once, explicitly or on drop.
#[derive(Debug)]
pub struct ScanLease {
    open: Option<Arc<AtomicUsize>>,
}

impl ScanLease {
    fn release(&mut self) {
        if let Some(open) = self.open.take() {
            open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_held(&self) -> bool {
        self.open.is_some()
    }
}

impl Drop for ScanLease {
    fn drop(&mut self) {
        self.release();
    }
}

/// A scoped scan over the ledger.
///
/// Callers should [`close`](ScanHandle::close) the handle once exhausted;
/// any other exit path (an early `?` return included) releases it on drop.
/// A closed handle yields nothing further.
pub struct ScanHandle<'a> {
    entries: Box<dyn Iterator<Item = StateResult<ScanEntry>> + 'a>,
    lease: ScanLease,
}

impl<'a> ScanHandle<'a> {
    pub fn new<I>(entries: I, lease: ScanLease) -> Self
    where
        I: Iterator<Item = StateResult<ScanEntry>> + 'a,
    {
        Self {
            entries: Box::new(entries),
            lease,
        }
    }

    pub fn is_open(&self) -> bool {
        self.lease.is_held()
    }

    pub fn close(mut self) {
        self.lease.release();
    }
}

impl Iterator for ScanHandle<'_> {
    type Item = StateResult<ScanEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.lease.is_held() {
            return None;
        }
        self.entries.next()
    }
}
