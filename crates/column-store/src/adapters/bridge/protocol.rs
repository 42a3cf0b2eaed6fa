use serde::{Deserialize, Serialize};

use column_store::core::types::{ColumnId, OptionMap, PartialColumn};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BridgeRequest {
    pub v: u32,
    pub id: String,
    pub cmd: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct BridgeResponse<T> {
    pub v: u32,
    pub id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> BridgeResponse<T> {
    pub fn ok(v: u32, id: String, data: T) -> Self {
        Self {
            v,
            id,
            status: "ok",
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(v: u32, id: String, code: &'static str, error: String) -> Self {
        Self {
            v,
            id,
            status: "error",
            data: None,
            error: Some(error),
            code: Some(code),
        }
    }
}

/// Unsolicited message: a published snapshot or a semantic column event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub v: u32,
    pub event: &'static str,
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(event: &'static str, data: serde_json::Value) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            event,
            data,
        }
    }
}

// Payloads

#[derive(Debug, Deserialize)]
pub struct ColumnsByIdsPayload {
    pub ids: Vec<ColumnId>,
}

#[derive(Debug, Deserialize)]
pub struct AddPayload {
    pub column: PartialColumn,
}

#[derive(Debug, Deserialize)]
pub struct RenamePayload {
    pub id: ColumnId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetNullablePayload {
    pub id: ColumnId,
    pub nullable: bool,
}

#[derive(Debug, Deserialize)]
pub struct PatchTypePayload {
    pub id: ColumnId,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub type_options: Option<OptionMap>,
    #[serde(default)]
    pub display_options: Option<OptionMap>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePayload {
    pub id: ColumnId,
}
