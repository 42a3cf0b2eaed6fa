//! Scripted in-memory column API used by the store tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use column_store::{
    core::{
        api::ColumnsApi,
        types::{ColumnId, ColumnRecord, Page, PartialColumn},
    },
    error::{AppError, AppResult},
};
use tokio::sync::oneshot;

pub fn column(id: ColumnId, name: &str, primary_key: bool) -> ColumnRecord {
    ColumnRecord {
        id,
        name: name.to_string(),
        r#type: "INTEGER".to_string(),
        type_options: None,
        display_options: None,
        index: id as u32,
        nullable: !primary_key,
        primary_key,
        valid_target_types: vec!["TEXT".to_string()],
        display_index: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(usize),
    Create(PartialColumn),
    Update(ColumnId, PartialColumn),
    Delete(ColumnId),
}

/// A queued list response. With a gate, the call waits until the gate's
/// sender fires (or is dropped).
pub struct Scripted {
    gate: Option<oneshot::Receiver<()>>,
    result: AppResult<Vec<ColumnRecord>>,
}

#[derive(Default)]
struct State {
    columns: Vec<ColumnRecord>,
    next_id: ColumnId,
    calls: Vec<Call>,
    scripted: VecDeque<Scripted>,
    fail_writes: Option<String>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn with_columns(columns: Vec<ColumnRecord>) -> Self {
        let next_id = columns.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(State {
                columns,
                next_id,
                ..Default::default()
            }),
        }
    }

    pub fn script_list(&self, result: AppResult<Vec<ColumnRecord>>) {
        self.state.lock().unwrap().scripted.push_back(Scripted { gate: None, result });
    }

    /// Queues a list response that is held until the returned sender fires.
    pub fn script_gated_list(&self, result: AppResult<Vec<ColumnRecord>>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().scripted.push_back(Scripted {
            gate: Some(rx),
            result,
        });
        tx
    }

    pub fn fail_writes(&self, message: &str) {
        self.state.lock().unwrap().fail_writes = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::List(_))).count()
    }

    pub fn write_calls(&self) -> usize {
        self.calls().len() - self.list_calls()
    }

    fn check_write(&self, call: Call) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.fail_writes {
            Some(message) => Err(AppError::transport(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ColumnsApi for FakeApi {
    async fn list(&self, limit: usize) -> AppResult<Page<ColumnRecord>> {
        let scripted = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::List(limit));
            state.scripted.pop_front()
        };
        let results = match scripted {
            Some(Scripted { gate, result }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                result?
            }
            None => self.state.lock().unwrap().columns.clone(),
        };
        Ok(Page {
            count: Some(results.len() as u64),
            results,
        })
    }

    async fn create(&self, column: &PartialColumn) -> AppResult<ColumnRecord> {
        self.check_write(Call::Create(column.clone()))?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let mut created = self::column(id, column.name.as_deref().unwrap_or("column"), false);
        if let Some(t) = &column.r#type {
            created.r#type = t.clone();
        }
        created.index = state.columns.len() as u32;
        state.columns.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: ColumnId, patch: &PartialColumn) -> AppResult<ColumnRecord> {
        self.check_write(Call::Update(id, patch.clone()))?;
        let mut state = self.state.lock().unwrap();
        let Some(existing) = state.columns.iter_mut().find(|c| c.id == id) else {
            return Err(AppError::Transport {
                status: Some(404),
                message: Some("Not found.".to_string()),
            });
        };
        if let Some(name) = &patch.name {
            existing.name = name.clone();
        }
        if let Some(t) = &patch.r#type {
            existing.r#type = t.clone();
        }
        if let Some(opts) = &patch.type_options {
            existing.type_options = opts.clone();
        }
        if let Some(opts) = &patch.display_options {
            existing.display_options = opts.clone();
        }
        if let Some(nullable) = patch.nullable {
            existing.nullable = nullable;
        }
        Ok(existing.clone())
    }

    async fn delete(&self, id: ColumnId) -> AppResult<()> {
        self.check_write(Call::Delete(id))?;
        self.state.lock().unwrap().columns.retain(|c| c.id != id);
        Ok(())
    }
}
