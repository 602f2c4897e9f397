//! Process-wide set of open image handles.
//!
//! A handle joins the set when it is constructed and leaves it exactly once,
//! when it is closed. The sanity checker uses membership to spot handles that
//! are used after close.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

static OPEN_IMAGES: Lazy<Mutex<HashMap<u64, String>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Add a new handle and return its id.
pub(crate) fn register(filename: &str) -> u64 {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    OPEN_IMAGES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, filename.to_string());
    id
}

/// Remove a handle. Returns `false` if it was not registered.
pub(crate) fn remove(id: u64) -> bool {
    OPEN_IMAGES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id)
        .is_some()
}

/// Whether the handle with this id is open.
pub fn is_open(id: u64) -> bool {
    OPEN_IMAGES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&id)
}

/// Number of open handles in the process.
pub fn open_count() -> usize {
    OPEN_IMAGES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}

/// Filenames of all open handles, in no particular order.
pub fn open_filenames() -> Vec<String> {
    OPEN_IMAGES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .cloned()
        .collect()
}
