mod handler;
mod io;
mod protocol;

use std::{sync::Arc, time::Duration};

use column_store::{
    core::{api::HttpColumnsApi, store::ColumnStore},
    error::{AppError, AppResult},
};

use crate::cli::Args;

use handler::BridgeHandler;
use io::NdjsonIo;
use protocol::{BridgeRequest, PROTOCOL_VERSION};

pub fn run(args: Args) -> AppResult<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    rt.block_on(async move {
        let api = HttpColumnsApi::new(
            &args.base_url,
            args.parent_kind,
            args.parent_id,
            Duration::from_millis(args.timeout_ms),
        )?;
        tracing::info!(url = api.url(), "tracking columns");
        let store = ColumnStore::builder(Arc::new(api))
            .list_limit(args.list_limit)
            .build();

        let mut io = NdjsonIo::stdio();
        let mut handler = BridgeHandler::new(store.clone());

        store.fetch().await;
        flush(&mut io, &mut handler)?;

        loop {
            let Some(line) = io.read_line()? else { break };
            if line.is_empty() {
                continue;
            }

            let req: BridgeRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    let _ = io.protocol_error(PROTOCOL_VERSION, e.to_string());
                    continue;
                }
            };

            let resp = handler.handle(req).await;
            flush(&mut io, &mut handler)?;
            io.write_json_line(&resp)?;
        }

        handler.shutdown();
        Ok(())
    })
}

fn flush<R, W>(io: &mut NdjsonIo<R, W>, handler: &mut BridgeHandler) -> AppResult<()>
where
    R: std::io::BufRead,
    W: std::io::Write,
{
    for n in handler.drain_notifications() {
        io.write_json_line(&n)?;
    }
    Ok(())
}
