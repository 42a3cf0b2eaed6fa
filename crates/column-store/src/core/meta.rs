//! Selection and sort state kept alongside a column store.
//!
//! The store only hands out a shared reference to it; `Meta` follows column
//! changes by subscribing to the store's snapshots via [`Meta::bind`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::core::{
    lock,
    store::ColumnStore,
    types::{ColumnId, ColumnRecord, LoadState, Snapshot},
    writable::Subscription,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub column_id: ColumnId,
    pub direction: SortDirection,
}

#[derive(Debug, Default)]
struct MetaState {
    selected: HashSet<ColumnId>,
    sorting: Vec<SortEntry>,
}

#[derive(Debug, Default)]
pub struct Meta {
    state: Mutex<MetaState>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, id: ColumnId) {
        let mut s = lock(&self.state);
        s.selected.insert(id);
    }

    pub fn deselect(&self, id: ColumnId) {
        let mut s = lock(&self.state);
        s.selected.remove(&id);
    }

    pub fn selected(&self) -> HashSet<ColumnId> {
        lock(&self.state).selected.clone()
    }

    /// Sorts by `id`, replacing any existing entry for that column.
    pub fn sort_by(&self, id: ColumnId, direction: SortDirection) {
        let mut s = lock(&self.state);
        s.sorting.retain(|e| e.column_id != id);
        s.sorting.push(SortEntry {
            column_id: id,
            direction,
        });
    }

    pub fn sorting(&self) -> Vec<SortEntry> {
        lock(&self.state).sorting.clone()
    }

    /// Drops selection and sort entries that reference columns not in `columns`.
    pub fn reconcile(&self, columns: &[ColumnRecord]) {
        let live: HashSet<ColumnId> = columns.iter().map(|c| c.id).collect();
        let mut s = lock(&self.state);
        s.selected.retain(|id| live.contains(id));
        s.sorting.retain(|e| live.contains(&e.column_id));
    }

    /// Keeps this state in line with every `Done` snapshot `store` publishes.
    pub fn bind(self: &Arc<Self>, store: &ColumnStore) -> Subscription<Snapshot> {
        let meta = Arc::clone(self);
        store.subscribe(move |snapshot| {
            if snapshot.state == LoadState::Done {
                meta.reconcile(&snapshot.columns);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(id: ColumnId) -> ColumnRecord {
        ColumnRecord {
            id,
            name: format!("c{id}"),
            r#type: "TEXT".into(),
            type_options: None,
            display_options: None,
            index: 0,
            nullable: true,
            primary_key: false,
            valid_target_types: vec![],
            display_index: None,
        }
    }

    #[test]
    fn reconcile_drops_missing_columns() {
        let meta = Meta::new();
        meta.select(1);
        meta.select(2);
        meta.sort_by(2, SortDirection::Asc);
        meta.sort_by(3, SortDirection::Desc);

        meta.reconcile(&[column(1), column(3)]);

        assert_eq!(meta.selected(), HashSet::from([1]));
        assert_eq!(
            meta.sorting(),
            vec![SortEntry {
                column_id: 3,
                direction: SortDirection::Desc
            }]
        );
    }

    #[test]
    fn sort_by_replaces_existing_entry() {
        let meta = Meta::new();
        meta.sort_by(1, SortDirection::Asc);
        meta.sort_by(1, SortDirection::Desc);
        assert_eq!(meta.sorting().len(), 1);
        assert_eq!(meta.sorting()[0].direction, SortDirection::Desc);
    }
}
