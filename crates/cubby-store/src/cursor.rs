//! Linear entry scans.
//!
//! The host engine has no multi-get or multi-delete keyed by an arbitrary
//! set, so bulk reads and deletes walk a cursor over every entry of the
//! store and test key membership. This is O(n) in the store size regardless
//! of how few keys are requested, trading per-key random access for
//! simplicity.

use cubby_core::protocol::{Entry, StoreCursor};
use cubby_core::{EngineError, Error, KeySet, Result};

use crate::awaited::settle;

/// Walk the cursor to exhaustion, collecting entries whose key is in `keys`.
///
/// Entries arrive in ascending key order, which the result preserves.
pub(crate) async fn collect_entries(
    mut cursor: Box<dyn StoreCursor>,
    keys: &KeySet,
    store: &str,
) -> Result<Vec<Entry>> {
    let mut matches = Vec::new();
    loop {
        let stepped = settle(|done| cursor.step(done))
            .await?
            .map_err(|source| read_error(store, source))?;
        match stepped {
            Some(entry) => {
                if keys.contains(&entry.key) {
                    matches.push(entry);
                }
            }
            None => return Ok(matches),
        }
    }
}

/// Walk the cursor to exhaustion, removing entries whose key is in `keys`.
///
/// The cursor advances after each decision; how many entries were actually
/// removed is not reported.
pub(crate) async fn delete_entries(
    mut cursor: Box<dyn StoreCursor>,
    keys: &KeySet,
    store: &str,
) -> Result<()> {
    loop {
        let stepped = settle(|done| cursor.step(done))
            .await?
            .map_err(|source| write_error(store, source))?;
        match stepped {
            Some(entry) if keys.contains(&entry.key) => {
                settle(|done| cursor.remove(done))
                    .await?
                    .map_err(|source| write_error(store, source))?;
            }
            Some(_) => {}
            None => return Ok(()),
        }
    }
}

fn read_error(store: &str, source: EngineError) -> Error {
    Error::Read {
        store: store.to_string(),
        source,
    }
}

fn write_error(store: &str, source: EngineError) -> Error {
    Error::Write {
        store: store.to_string(),
        source,
    }
}
