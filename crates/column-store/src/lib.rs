//! Client-side reactive cache of a table's or view's columns, kept in sync
//! with the remote column API.

pub mod core;
pub mod error;

pub use crate::core::{
    api::{ColumnsApi, HttpColumnsApi},
    events::{ColumnEvent, ColumnEventKind},
    meta::Meta,
    store::{ColumnStore, ColumnStoreBuilder},
    types::{ColumnRecord, LoadState, PartialColumn, Snapshot, TabularType},
};
pub use crate::error::{AppError, AppResult};
