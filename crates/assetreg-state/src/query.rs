//! Prefix query engine.
//!
//! Runs a [`Query`] against a [`Ledger`] and collects every matching record
//! keyed by the last part of its composite key. `offset`, `max_count` and
//! `return_values` are echoed back but not applied: the full result set is
//! always materialized and `has_more` is always false.

use std::collections::HashMap;

use assetreg_core::proto::{ObjectType, Query, QueryResult};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::keys;
use crate::ledger::Ledger;

pub fn run_query<L: Ledger + ?Sized>(ledger: &L, query: &Query) -> StateResult<QueryResult> {
    let object_type = ObjectType::try_from(query.object_type)
        .map_err(|_| StateError::UnknownObjectType(query.object_type))?;

    let mut scan = ledger.scan_partial(object_type.tag(), &query.key_parts)?;
    let mut results = HashMap::new();
    // Any early return below drops `scan`, which releases it.
    for entry in scan.by_ref() {
        let (key, value) = entry?;
        let (_, mut parts) = keys::decode(&key)?;
        let last = parts
            .pop()
            .ok_or_else(|| StateError::MalformedKey("key has no parts".to_string()))?;
        results.insert(last, value);
    }
    scan.close();

    debug!(
        object_type = object_type.tag(),
        prefix = ?query.key_parts,
        matches = results.len(),
        "query complete"
    );
    Ok(QueryResult {
        query: Some(query.clone()),
        has_more: false,
        results,
    })
}
