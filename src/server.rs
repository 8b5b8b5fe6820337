use crate::error::{describe_error, Error};
use crate::mcp::{
    rpc_error, rpc_ok, Id, Request, Response, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::{call_tool, tool_descriptors, ToolContext, PROTOCOL_VERSION};
use futures::FutureExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

pub const SERVER_NAME: &str = "mcp-github-actions-versions";

/// Serve newline-delimited JSON-RPC on stdin/stdout until stdin closes.
///
/// Every request runs as its own task; replies go through one writer so
/// lines never interleave. Finished tasks are reaped as the session runs,
/// and in-flight requests are drained before returning.
pub async fn run_stdio_server(ctx: ToolContext) -> anyhow::Result<()> {
    let ctx = Arc::new(ctx);
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();

    let writer = tokio::spawn(async move {
        let mut out = tokio::io::stdout();
        while let Some(resp) = rx.recv().await {
            let mut payload = serde_json::to_string(&resp)?;
            payload.push('\n');
            out.write_all(payload.as_bytes()).await?;
            out.flush().await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    info!(
        "GitHub Actions Release MCP Server running on stdio; protocol={}",
        PROTOCOL_VERSION
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            next = lines.next_line() => {
                let Some(line) = next? else { break };
                if !line.trim().is_empty() {
                    let ctx = Arc::clone(&ctx);
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let id = request_id(&line);
                        let reply = handle_guarded(id, handle_message(&ctx, &line)).await;
                        if let Some(resp) = reply {
                            // Fails only once the writer died; its error surfaces below.
                            let _ = tx.send(resp);
                        }
                    });
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_joined(joined)
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        log_joined(joined);
    }
    drop(tx);
    writer.await??;
    debug!("stdin closed; shutting down");
    Ok(())
}

fn log_joined(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!("request task failed: {}", e);
    }
}

// Best-effort id lookup so a failed handler can still be answered.
fn request_id(line: &str) -> Option<Id> {
    let raw: Value = serde_json::from_str(line).ok()?;
    serde_json::from_value(raw.get("id")?.clone()).ok()
}

/// Run one request handler; a panic becomes an internal-error reply for `id`.
pub async fn handle_guarded<F>(id: Option<Id>, work: F) -> Option<Response>
where
    F: Future<Output = Option<Response>>,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(resp) => resp,
        Err(_) => {
            error!("request handler panicked (id={:?})", id);
            id.map(|id| {
                rpc_error(
                    Some(id),
                    INTERNAL_ERROR,
                    "Internal error: request handler panicked",
                )
            })
        }
    }
}

/// Handle one raw JSON-RPC line. Notifications produce no response.
pub async fn handle_message(ctx: &ToolContext, line: &str) -> Option<Response> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(rpc_error(None, PARSE_ERROR, format!("Parse error: {}", e))),
    };
    let id_hint = raw
        .get("id")
        .and_then(|v| serde_json::from_value::<Id>(v.clone()).ok());
    let req: Request = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(e) => {
            return Some(rpc_error(
                id_hint,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ))
        }
    };
    debug!("Received method={}", req.method);
    if req.jsonrpc != "2.0" {
        return Some(rpc_error(
            req.id,
            INVALID_REQUEST,
            "Invalid request: jsonrpc must be \"2.0\"",
        ));
    }
    let Some(id) = req.id else {
        debug!("notification {} ignored", req.method);
        return None;
    };
    Some(dispatch(ctx, id, &req.method, req.params).await)
}

async fn dispatch(ctx: &ToolContext, id: Id, method: &str, params: Value) -> Response {
    match method {
        "initialize" => handle_initialize(id),
        "ping" => rpc_ok(Some(id), serde_json::json!({})),
        "tools/list" => rpc_ok(Some(id), serde_json::json!({ "tools": tool_descriptors() })),
        "tools/call" => handle_tools_call(ctx, id, params).await,
        other => rpc_error(Some(id), METHOD_NOT_FOUND, format!("Method not found: {}", other)),
    }
}

fn handle_initialize(id: Id) -> Response {
    rpc_ok(
        Some(id),
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn handle_tools_call(ctx: &ToolContext, id: Id, params: Value) -> Response {
    let call: ToolCallParams = match serde_json::from_value(params) {
        Ok(c) => c,
        Err(e) => return rpc_error(Some(id), INVALID_PARAMS, format!("Invalid params: {}", e)),
    };
    match call_tool(ctx, &call.name, &call.arguments).await {
        Ok(result) => rpc_ok(Some(id), result),
        Err(e) => {
            let message = describe_error(&e);
            warn!("tool {} failed: {}", call.name, message);
            rpc_error(Some(id), error_code(&e), message)
        }
    }
}

fn error_code(err: &Error) -> i64 {
    match err {
        Error::UnknownTool(_) => METHOD_NOT_FOUND,
        e if e.is_input_error() => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}
