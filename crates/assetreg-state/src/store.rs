//! LedgerStore — redb-backed ledger for the asset registry.
//!
//! The store owns the database; each invocation runs inside its own
//! [`LedgerTxn`], a redb write transaction that is committed only when the
//! invocation succeeds. Both on-disk and in-memory backends are supported
//! (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, WriteTransaction};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::keys::CompositeKey;
use crate::ledger::{Ledger, ScanEntry, ScanHandle, ScanTracker};
use crate::tables::LEDGER;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe handle on a redb ledger.
#[derive(Clone)]
pub struct LedgerStore {
    db: Arc<Database>,
    scans: ScanTracker,
}

impl LedgerStore {
    /// Open (or create) a persistent ledger at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            scans: ScanTracker::new(),
        };
        store.ensure_tables()?;
        debug!(?path, "ledger opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory ledger (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            scans: ScanTracker::new(),
        };
        store.ensure_tables()?;
        debug!("in-memory ledger opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(LEDGER).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Begin one invocation's transaction.
    pub fn begin(&self) -> StateResult<LedgerTxn> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        Ok(LedgerTxn {
            txn,
            scans: self.scans.clone(),
        })
    }

    /// Run `f` in a fresh transaction, committing if it returns `Ok` and
    /// aborting otherwise. No write from a failed call is ever visible.
    pub fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut LedgerTxn) -> Result<T, E>,
        E: From<StateError>,
    {
        let mut txn = self.begin()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = txn.abort() {
                    warn!(error = %abort_err, "abort after failed invocation did not complete");
                }
                Err(err)
            }
        }
    }

    /// Scan handles acquired against this store and not yet released.
    pub fn open_scans(&self) -> usize {
        self.scans.open_scans()
    }
}

/// A single invocation's read/write view of the ledger.
pub struct LedgerTxn {
    txn: WriteTransaction,
    scans: ScanTracker,
}

impl LedgerTxn {
    pub fn commit(self) -> StateResult<()> {
        self.txn.commit().map_err(map_err!(Transaction))?;
        debug!("ledger transaction committed");
        Ok(())
    }

    pub fn abort(self) -> StateResult<()> {
        self.txn.abort().map_err(map_err!(Transaction))?;
        debug!("ledger transaction aborted");
        Ok(())
    }
}

impl Ledger for LedgerTxn {
    fn get_state(&self, key: &CompositeKey) -> StateResult<Option<Vec<u8>>> {
        let table = self.txn.open_table(LEDGER).map_err(map_err!(Table))?;
        let value = table
            .get(key.as_bytes())
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn put_state(&mut self, key: &CompositeKey, value: &[u8]) -> StateResult<()> {
        {
            let mut table = self.txn.open_table(LEDGER).map_err(map_err!(Table))?;
            table
                .insert(key.as_bytes(), value)
                .map_err(map_err!(Write))?;
        }
        debug!(%key, len = value.len(), "state put");
        Ok(())
    }

    fn scan_partial(&self, object_type: &str, parts: &[String]) -> StateResult<ScanHandle<'_>> {
        let prefix = CompositeKey::new(object_type, parts)?;
        let (start, end) = prefix.scan_range();
        let table = self.txn.open_table(LEDGER).map_err(map_err!(Table))?;
        // The table borrow cannot outlive this call, so the range is
        // materialized before the handle is returned.
        let entries: Vec<StateResult<ScanEntry>> = table
            .range(start.as_slice()..end.as_slice())
            .map_err(map_err!(Read))?
            .map(|item| {
                item.map(|(key, value)| (key.value().to_vec(), value.value().to_vec()))
                    .map_err(map_err!(Read))
            })
            .collect();
        debug!(%prefix, matches = entries.len(), "scan opened");
        Ok(ScanHandle::new(entries.into_iter(), self.scans.acquire()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(object_type: &str, parts: &[&str]) -> CompositeKey {
        CompositeKey::new(object_type, parts).unwrap()
    }

    fn scan_keys(txn: &LedgerTxn, object_type: &str, parts: &[&str]) -> Vec<Vec<String>> {
        let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
        txn.scan_partial(object_type, &parts)
            .unwrap()
            .map(|entry| {
                let (raw, _) = entry.unwrap();
                CompositeKey::from_raw(raw).decode().unwrap().1
            })
            .collect()
    }

    #[test]
    fn put_and_get_within_transaction() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut txn = store.begin().unwrap();
        let k = key("APP_DESCRIPTOR", &["d1"]);

        assert!(txn.get_state(&k).unwrap().is_none());
        txn.put_state(&k, b"v1").unwrap();
        assert_eq!(txn.get_state(&k).unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn commit_makes_writes_visible() {
        let store = LedgerStore::open_in_memory().unwrap();
        let k = key("APP_DESCRIPTOR", &["d1"]);

        let mut txn = store.begin().unwrap();
        txn.put_state(&k, b"v1").unwrap();
        txn.commit().unwrap();

        let txn = store.begin().unwrap();
        assert_eq!(txn.get_state(&k).unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn abort_discards_writes() {
        let store = LedgerStore::open_in_memory().unwrap();
        let k = key("APP_DESCRIPTOR", &["d1"]);

        let mut txn = store.begin().unwrap();
        txn.put_state(&k, b"v1").unwrap();
        txn.abort().unwrap();

        let txn = store.begin().unwrap();
        assert!(txn.get_state(&k).unwrap().is_none());
    }

    #[test]
    fn transact_commits_on_ok_and_aborts_on_err() {
        let store = LedgerStore::open_in_memory().unwrap();
        let kept = key("APP_DESCRIPTOR", &["kept"]);
        let dropped = key("APP_DESCRIPTOR", &["dropped"]);

        store
            .transact(|txn| txn.put_state(&kept, b"yes"))
            .unwrap();
        let err = store
            .transact(|txn| {
                txn.put_state(&dropped, b"no")?;
                Err::<(), _>(StateError::Write("forced".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, StateError::Write(_)));

        let txn = store.begin().unwrap();
        assert!(txn.get_state(&kept).unwrap().is_some());
        assert!(txn.get_state(&dropped).unwrap().is_none());
    }

    #[test]
    fn scan_returns_prefix_matches_in_key_order() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut txn = store.begin().unwrap();
        for (d, b) in [("d1", "b2"), ("d10", "b1"), ("d1", "b1"), ("d2", "b1")] {
            txn.put_state(&key("APP_BUNDLE", &[d, b]), b"x").unwrap();
        }
        txn.put_state(&key("APP_DESCRIPTOR", &["d1"]), b"x").unwrap();

        assert_eq!(
            scan_keys(&txn, "APP_BUNDLE", &["d1"]),
            vec![vec!["d1", "b1"], vec!["d1", "b2"]]
        );
        assert_eq!(scan_keys(&txn, "APP_BUNDLE", &[]).len(), 4);
        assert_eq!(scan_keys(&txn, "APP_DESCRIPTOR", &[]), vec![vec!["d1"]]);
        assert_eq!(store.open_scans(), 0);
    }

    #[test]
    fn scan_lease_is_tracked_by_store() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin().unwrap();
        let handle = txn.scan_partial("APP_BUNDLE", &[]).unwrap();
        assert_eq!(store.open_scans(), 1);
        handle.close();
        assert_eq!(store.open_scans(), 0);
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.redb");
        let k = key("APP_DESCRIPTOR", &["prod"]);

        {
            let store = LedgerStore::open(&db_path).unwrap();
            store.transact(|txn| txn.put_state(&k, b"v")).unwrap();
        }

        // Reopen the same database file.
        let store = LedgerStore::open(&db_path).unwrap();
        let txn = store.begin().unwrap();
        assert_eq!(txn.get_state(&k).unwrap(), Some(b"v".to_vec()));
    }
}
