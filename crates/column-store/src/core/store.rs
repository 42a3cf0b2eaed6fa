//! Reactive cache of one tabular entity's columns.
//!
//! Every mutator except [`ColumnStore::rename`] performs its remote write and
//! then a full [`ColumnStore::fetch`]. A new fetch cancels the one in flight,
//! and a cancelled fetch never publishes.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    core::{
        api::ColumnsApi,
        events::{ColumnEvent, ColumnEventKind, EventHandler, HandlerId},
        limits::effective_list_limit,
        lock,
        meta::Meta,
        types::{ColumnId, ColumnRecord, LoadState, OptionMap, PartialColumn, Snapshot},
        writable::{Subscription, Writable},
    },
    error::{AppError, AppResult},
};

pub type FetchCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

struct Inner {
    api: Arc<dyn ColumnsApi>,
    snapshot: Arc<Writable<Snapshot>>,
    events: EventHandler,
    meta: Arc<Meta>,
    on_fetch: Option<FetchCallback>,
    list_limit: usize,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
    destroyed: AtomicBool,
}

/// Cheap to clone; clones share the same snapshot, handlers and in-flight fetch.
#[derive(Clone)]
pub struct ColumnStore {
    inner: Arc<Inner>,
}

pub struct ColumnStoreBuilder {
    api: Arc<dyn ColumnsApi>,
    meta: Option<Arc<Meta>>,
    list_limit: Option<usize>,
    on_fetch: Option<FetchCallback>,
}

impl ColumnStoreBuilder {
    pub fn meta(mut self, meta: Arc<Meta>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn list_limit(mut self, limit: usize) -> Self {
        self.list_limit = Some(limit);
        self
    }

    /// Called with each `Done` snapshot, right after it is published.
    pub fn on_fetch(mut self, callback: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.on_fetch = Some(Box::new(callback));
        self
    }

    /// Builds the store and starts the initial fetch on the current tokio
    /// runtime. The store is `Loading` until that fetch lands.
    pub fn spawn(self) -> AppResult<ColumnStore> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| AppError::Internal(e.to_string()))?;
        let store = self.build();
        let initial = store.clone();
        handle.spawn(async move {
            initial.fetch().await;
        });
        Ok(store)
    }

    pub fn build(self) -> ColumnStore {
        ColumnStore {
            inner: Arc::new(Inner {
                api: self.api,
                snapshot: Arc::new(Writable::new(Snapshot::loading())),
                events: EventHandler::new(),
                meta: self.meta.unwrap_or_default(),
                on_fetch: self.on_fetch,
                list_limit: effective_list_limit(self.list_limit),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                destroyed: AtomicBool::new(false),
            }),
        }
    }
}

impl ColumnStore {
    pub fn builder(api: Arc<dyn ColumnsApi>) -> ColumnStoreBuilder {
        ColumnStoreBuilder {
            api,
            meta: None,
            list_limit: None,
            on_fetch: None,
        }
    }

    pub fn new(api: Arc<dyn ColumnsApi>) -> Self {
        Self::builder(api).build()
    }

    pub fn get(&self) -> Snapshot {
        self.inner.snapshot.get()
    }

    pub fn set(&self, snapshot: Snapshot) {
        self.inner.snapshot.set(snapshot);
    }

    pub fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        self.inner.snapshot.update(f);
    }

    /// Registers `listener` and calls it with the current snapshot.
    pub fn subscribe(&self, listener: impl Fn(&Snapshot) + Send + Sync + 'static) -> Subscription<Snapshot> {
        self.inner.snapshot.subscribe(listener)
    }

    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.watch()
    }

    pub fn on(&self, kind: ColumnEventKind, handler: impl Fn(&ColumnEvent) + Send + Sync + 'static) -> HandlerId {
        self.inner.events.on(kind, handler)
    }

    pub fn off(&self, id: HandlerId) -> bool {
        self.inner.events.off(id)
    }

    pub fn meta(&self) -> &Arc<Meta> {
        &self.inner.meta
    }

    pub fn is_fetching(&self) -> bool {
        lock(&self.inner.in_flight).is_some()
    }

    pub fn columns_by_ids(&self, ids: &[ColumnId]) -> Vec<ColumnRecord> {
        self.get()
            .columns
            .into_iter()
            .filter(|c| ids.contains(&c.id))
            .collect()
    }

    /// Reloads all columns. Returns the published snapshot, or `None` when the
    /// request failed or was superseded by a newer fetch.
    pub async fn fetch(&self) -> Option<Snapshot> {
        let guard = self.begin_fetch();
        let token = guard.token.clone();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            res = self.inner.api.list(self.inner.list_limit) => Some(res),
        };
        let Some(outcome) = outcome else {
            debug!(generation = guard.generation, "column fetch superseded");
            return None;
        };

        let (snapshot, loaded) = match outcome {
            Ok(page) => (Snapshot::done(page.results), true),
            Err(e) => {
                warn!(generation = guard.generation, error = %e, "column fetch failed");
                (Snapshot::failed(e.message()), false)
            }
        };
        if !self.publish_if_current(guard.generation, snapshot.clone()) {
            debug!(generation = guard.generation, "column fetch superseded");
            return None;
        }
        if !loaded {
            return None;
        }
        if let Some(callback) = &self.inner.on_fetch {
            callback(&snapshot);
        }
        Some(snapshot)
    }

    /// Creates a column and reloads. Returns the server's representation.
    pub async fn add(&self, column: PartialColumn) -> AppResult<ColumnRecord> {
        let created = self.inner.api.create(&column).await.inspect_err(|e| {
            warn!(error = %e, "column create failed");
        })?;
        self.fetch().await;
        Ok(created)
    }

    /// Renames a column. Does not reload; emits `ColumnRenamed` instead.
    pub async fn rename(&self, id: ColumnId, name: impl Into<String>) -> AppResult<()> {
        let patch = PartialColumn {
            name: Some(name.into()),
            ..Default::default()
        };
        self.inner.api.update(id, &patch).await?;
        self.inner.events.dispatch(&ColumnEvent::ColumnRenamed(id));
        Ok(())
    }

    pub async fn set_nullability_of_column(&self, column: &ColumnRecord, nullable: bool) -> AppResult<()> {
        if column.primary_key {
            return Err(AppError::Validation(format!(
                "Column \"{}\" cannot allow NULL because it is a primary key.",
                column.name
            )));
        }
        let patch = PartialColumn {
            nullable: Some(nullable),
            ..Default::default()
        };
        self.inner.api.update(column.id, &patch).await?;
        self.fetch().await;
        Ok(())
    }

    /// Changes type and both option maps in one request, reloads, then emits
    /// `ColumnPatched` with the server's column.
    pub async fn patch_type(
        &self,
        id: ColumnId,
        r#type: impl Into<String>,
        type_options: Option<OptionMap>,
        display_options: Option<OptionMap>,
    ) -> AppResult<ColumnRecord> {
        let patch = PartialColumn {
            r#type: Some(r#type.into()),
            type_options: Some(type_options),
            display_options: Some(display_options),
            ..Default::default()
        };
        let column = self.inner.api.update(id, &patch).await?;
        self.fetch().await;
        self.inner.events.dispatch(&ColumnEvent::ColumnPatched(column.clone()));
        Ok(column)
    }

    pub async fn delete_column(&self, id: ColumnId) -> AppResult<()> {
        self.inner.api.delete(id).await?;
        self.fetch().await;
        Ok(())
    }

    /// Cancels any in-flight fetch and drops all listeners and handlers.
    /// Safe to call more than once.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(in_flight) = lock(&self.inner.in_flight).take() {
            in_flight.token.cancel();
        }
        self.inner.events.clear();
        self.inner.snapshot.clear();
        debug!("column store destroyed");
    }

    /// Supersedes the in-flight fetch and marks the snapshot as loading, as
    /// one step under the in-flight lock.
    fn begin_fetch(&self) -> FetchGuard<'_> {
        let token = CancellationToken::new();
        let generation = {
            let mut slot = lock(&self.inner.in_flight);
            let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
            let previous = slot.replace(InFlight {
                generation,
                token: token.clone(),
            });
            if let Some(previous) = previous {
                debug!(cancelled = previous.generation, generation, "cancelling in-flight column fetch");
                previous.token.cancel();
            }
            self.inner.snapshot.stage_update(|s| s.state = LoadState::Loading);
            generation
        };
        self.inner.snapshot.flush();
        FetchGuard {
            inner: &self.inner,
            generation,
            token,
        }
    }

    /// Stores `snapshot` only if `generation` still owns the in-flight slot.
    /// Check and store happen under the same lock, so a newer fetch cannot
    /// start in between.
    fn publish_if_current(&self, generation: u64, snapshot: Snapshot) -> bool {
        {
            let slot = lock(&self.inner.in_flight);
            if !slot.as_ref().is_some_and(|f| f.generation == generation) {
                return false;
            }
            debug!(
                generation,
                state = ?snapshot.state,
                columns = snapshot.columns.len(),
                "publishing column snapshot"
            );
            self.inner.snapshot.stage(snapshot);
        }
        self.inner.snapshot.flush();
        true
    }
}

/// Clears the in-flight slot when its fetch ends, however it ends. A newer
/// fetch's handle is left alone.
struct FetchGuard<'a> {
    inner: &'a Inner,
    generation: u64,
    token: CancellationToken,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let mut slot = lock(&self.inner.in_flight);
        if slot.as_ref().is_some_and(|f| f.generation == self.generation) {
            *slot = None;
        }
    }
}
