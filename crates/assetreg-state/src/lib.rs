//! assetreg-state — the ledger layer of the asset registry.
//!
//! Provides the composite key codec, the [`Ledger`] abstraction with its
//! scoped [`ScanHandle`], a redb-backed [`LedgerStore`], an in-memory
//! [`MemoryLedger`], and the prefix [`run_query`] engine.
//!
//! # Architecture
//!
//! Records live in a single ordered key space. Keys are encoded
//! `CompositeKey`s (`\0{object_type}\0{part}\0...`), so every object type and
//! every key-part prefix occupies one contiguous range that a prefix scan
//! walks in key order.
//!
//! Nothing here caches records between invocations: a `LedgerStore` hands
//! out one `LedgerTxn` per invocation, and `LedgerStore::transact` commits it
//! only when the invocation succeeds.

pub mod error;
pub mod keys;
pub mod ledger;
pub mod memory;
pub mod query;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use keys::CompositeKey;
pub use ledger::{Ledger, ScanEntry, ScanHandle, ScanLease, ScanTracker};
pub use memory::MemoryLedger;
pub use query::run_query;
pub use store::{LedgerStore, LedgerTxn};
