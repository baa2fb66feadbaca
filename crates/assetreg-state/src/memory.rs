//! In-memory ledger over an ordered map.
//!
//! Useful for embedding the registry in a host that manages its own
//! persistence, and for tests that need to inspect raw ledger contents.

use std::collections::BTreeMap;

use crate::error::{StateError, StateResult};
use crate::keys::CompositeKey;
use crate::ledger::{Ledger, ScanEntry, ScanHandle, ScanTracker};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    scans: ScanTracker,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn open_scans(&self) -> usize {
        self.scans.open_scans()
    }

    /// Store raw bytes under an unvalidated key.
    pub fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }
}

impl Ledger for MemoryLedger {
    fn get_state(&self, key: &CompositeKey) -> StateResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key.as_bytes()).cloned())
    }

    fn put_state(&mut self, key: &CompositeKey, value: &[u8]) -> StateResult<()> {
        self.entries.insert(key.as_bytes().to_vec(), value.to_vec());
        Ok(())
    }

    fn scan_partial(&self, object_type: &str, parts: &[String]) -> StateResult<ScanHandle<'_>> {
        let prefix = CompositeKey::new(object_type, parts)?;
        let (start, end) = prefix.scan_range();
        let entries = self
            .entries
            .range(start..end)
            .map(|(key, value)| Ok::<ScanEntry, StateError>((key.clone(), value.clone())));
        Ok(ScanHandle::new(entries, self.scans.acquire()))
    }
}
