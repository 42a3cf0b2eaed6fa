pub mod api;
pub mod events;
pub mod limits;
pub mod meta;
pub mod store;
pub mod types;
pub mod writable;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `m`, taking over the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
