//! redb table definitions for the asset registry ledger.
//!
//! The registry keeps a single ordered key space. Keys are encoded
//! [`CompositeKey`](crate::keys::CompositeKey) bytes so that every object
//! type and every key-part prefix occupies one contiguous range.

use redb::TableDefinition;

/// Raw records keyed by composite key bytes.
pub const LEDGER: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ledger");
