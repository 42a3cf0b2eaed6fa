use serde::{Deserialize, Serialize};

pub type ColumnId = u64;

pub type OptionMap = serde_json::Map<String, serde_json::Value>;

/// Kind of tabular entity that owns the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TabularType {
    Table,
    View,
}

impl TabularType {
    pub fn path_segment(self) -> &'static str {
        match self {
            TabularType::Table => "tables",
            TabularType::View => "views",
        }
    }
}

/// A column as the server describes it, plus the locally assigned
/// `display_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub id: ColumnId,
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub type_options: Option<OptionMap>,
    #[serde(default)]
    pub display_options: Option<OptionMap>,
    /// Ordinal position on the server.
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub valid_target_types: Vec<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub display_index: Option<usize>,
}

/// Subset of column fields sent on create and update. Unset fields are
/// omitted from the body; `Some(None)` on an option map sends `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialColumn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_options: Option<Option<OptionMap>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_options: Option<Option<OptionMap>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Done,
    Error,
}

/// Published state of a column store. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: LoadState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub columns: Vec<ColumnRecord>,
    pub primary_key_column_id: Option<ColumnId>,
}

impl Snapshot {
    pub fn loading() -> Self {
        Self {
            state: LoadState::Loading,
            error: None,
            columns: Vec::new(),
            primary_key_column_id: None,
        }
    }

    /// Builds a `Done` snapshot from a list response: assigns display
    /// indices in response order and picks the first primary-key column.
    pub fn done(mut columns: Vec<ColumnRecord>) -> Self {
        for (i, column) in columns.iter_mut().enumerate() {
            column.display_index = Some(i);
        }
        let primary_key_column_id = columns.iter().find(|c| c.primary_key).map(|c| c.id);
        Self {
            state: LoadState::Done,
            error: None,
            columns,
            primary_key_column_id,
        }
    }

    pub fn failed(error: Option<String>) -> Self {
        Self {
            state: LoadState::Error,
            error,
            columns: Vec::new(),
            primary_key_column_id: None,
        }
    }

    pub fn column(&self, id: ColumnId) -> Option<&ColumnRecord> {
        self.columns.iter().find(|c| c.id == id)
    }
}
