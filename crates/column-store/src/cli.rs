use clap::Parser;

use column_store::TabularType;

#[derive(Parser, Debug, Clone)]
#[command(name = "column-store")]
pub struct Args {
    /// Base URL of the server hosting the column API.
    #[arg(long, default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Whether the parent entity is a table or a view.
    #[arg(long, value_enum, default_value_t = TabularType::Table)]
    pub parent_kind: TabularType,

    /// Id of the table or view whose columns are tracked.
    #[arg(long)]
    pub parent_id: u64,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Records requested per list call (capped at 500).
    #[arg(long, default_value_t = 500)]
    pub list_limit: usize,

    /// Timeout for a single HTTP request.
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}
