use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use column_store::{
    core::{
        events::{ColumnEvent, ColumnEventKind, HandlerId},
        store::ColumnStore,
        types::Snapshot,
        writable::Subscription,
    },
    error::{AppError, AppResult},
};

use super::protocol::*;

pub struct BridgeHandler {
    store: ColumnStore,
    notifications: mpsc::UnboundedReceiver<Notification>,
    subscription: Option<Subscription<Snapshot>>,
    handlers: Vec<HandlerId>,
}

impl BridgeHandler {
    pub fn new(store: ColumnStore) -> Self {
        let (tx, notifications) = mpsc::unbounded_channel();

        let snapshots = tx.clone();
        let subscription = store.subscribe(move |snapshot| {
            let data = serde_json::to_value(snapshot).unwrap_or(Value::Null);
            let _ = snapshots.send(Notification::new("snapshot", data));
        });

        let mut handlers = Vec::new();
        for kind in [ColumnEventKind::Renamed, ColumnEventKind::Patched] {
            let events = tx.clone();
            handlers.push(store.on(kind, move |event| {
                let _ = events.send(event_notification(event));
            }));
        }

        Self {
            store,
            notifications,
            subscription: Some(subscription),
            handlers,
        }
    }

    /// Notifications queued since the last call, in publish order.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }

    pub async fn handle(&mut self, req: BridgeRequest) -> BridgeResponse<Value> {
        if req.v != PROTOCOL_VERSION {
            return BridgeResponse::err(
                req.v,
                req.id,
                "INVALID_REQUEST",
                format!("unsupported protocol version: {}", req.v),
            );
        }

        let result = match req.cmd.as_str() {
            "get" => to_value(self.store.get()),
            "fetch" => self.handle_fetch().await,
            "columns_by_ids" => self.handle_columns_by_ids(&req.payload),
            "add" => self.handle_add(&req.payload).await,
            "rename" => self.handle_rename(&req.payload).await,
            "set_nullable" => self.handle_set_nullable(&req.payload).await,
            "patch_type" => self.handle_patch_type(&req.payload).await,
            "delete" => self.handle_delete(&req.payload).await,
            other => Err(AppError::InvalidRequest(format!("unknown cmd: {other}"))),
        };

        match result {
            Ok(data) => BridgeResponse::ok(req.v, req.id, data),
            Err(e) => BridgeResponse::err(req.v, req.id, e.code(), e.to_string()),
        }
    }

    /// Detaches from the store and tears it down.
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        for id in self.handlers.drain(..) {
            self.store.off(id);
        }
        self.store.destroy();
    }

    async fn handle_fetch(&mut self) -> AppResult<Value> {
        // A failed fetch is reported through the snapshot, not as an error.
        self.store.fetch().await;
        to_value(self.store.get())
    }

    fn handle_columns_by_ids(&mut self, payload: &Value) -> AppResult<Value> {
        let p: ColumnsByIdsPayload = parse(payload)?;
        to_value(self.store.columns_by_ids(&p.ids))
    }

    async fn handle_add(&mut self, payload: &Value) -> AppResult<Value> {
        let p: AddPayload = parse(payload)?;
        to_value(self.store.add(p.column).await?)
    }

    async fn handle_rename(&mut self, payload: &Value) -> AppResult<Value> {
        let p: RenamePayload = parse(payload)?;
        self.store.rename(p.id, p.name).await?;
        Ok(Value::Bool(true))
    }

    async fn handle_set_nullable(&mut self, payload: &Value) -> AppResult<Value> {
        let p: SetNullablePayload = parse(payload)?;
        let column = self
            .store
            .get()
            .column(p.id)
            .cloned()
            .ok_or_else(|| AppError::InvalidRequest(format!("unknown column id: {}", p.id)))?;
        self.store.set_nullability_of_column(&column, p.nullable).await?;
        Ok(Value::Bool(true))
    }

    async fn handle_patch_type(&mut self, payload: &Value) -> AppResult<Value> {
        let p: PatchTypePayload = parse(payload)?;
        let column = self
            .store
            .patch_type(p.id, p.r#type, p.type_options, p.display_options)
            .await?;
        to_value(column)
    }

    async fn handle_delete(&mut self, payload: &Value) -> AppResult<Value> {
        let p: DeletePayload = parse(payload)?;
        self.store.delete_column(p.id).await?;
        Ok(Value::Bool(true))
    }
}

fn parse<T: DeserializeOwned>(payload: &Value) -> AppResult<T> {
    serde_json::from_value(payload.clone()).map_err(|e| AppError::InvalidRequest(e.to_string()))
}

fn to_value<T: serde::Serialize>(v: T) -> AppResult<Value> {
    Ok(serde_json::to_value(v)?)
}

fn event_notification(event: &ColumnEvent) -> Notification {
    match event {
        ColumnEvent::ColumnRenamed(id) => Notification::new("column_renamed", Value::from(*id)),
        ColumnEvent::ColumnPatched(column) => Notification::new(
            "column_patched",
            serde_json::to_value(column).unwrap_or(Value::Null),
        ),
    }
}
