// SPDX-License-Identifier: MIT
// sonard host — line-delimited JSON over stdio.
//
// stdout carries protocol responses only; logs go to stderr. Suggestion
// requests are spawned so a fast-typing editor can keep issuing requests
// while earlier ones sit in the debounce window (that is what supersedes
// them).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sonard::completion::provider::DocumentView;
use sonard::config::{EngineConfig, SonarModel};
use sonard::EngineContext;

#[derive(Parser)]
#[command(
    name = "sonard",
    about = "Inline AI code suggestions over stdio",
    version
)]
struct Args {
    /// Path to sonard.toml
    #[arg(long, env = "SONARD_CONFIG", default_value = "sonard.toml")]
    config: PathBuf,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, env = "SONARD_LOG", default_value = "info")]
    log: String,

    /// Override the debounce quiet period in milliseconds
    #[arg(long, env = "SONARD_DEBOUNCE_MS")]
    debounce_ms: Option<u64>,
}

#[derive(Deserialize)]
struct HostRequest {
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestParams {
    /// Full document text.
    text: String,
    /// 0-based cursor line.
    line: usize,
    /// 0-based cursor column.
    col: usize,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelParams {
    request_id: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigUpdateParams {
    api_key: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

type PendingMap = Arc<Mutex<HashMap<String, CancellationToken>>>;
type ResponseTx = mpsc::UnboundedSender<String>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout is reserved for the host protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = EngineConfig::load(&args.config);
    if let Some(ms) = args.debounce_ms {
        config.debounce_ms = ms;
    }
    info!(
        model = %config.model.as_str(),
        enabled = config.enabled,
        configured = config.is_ready(),
        "sonard starting"
    );

    serve(EngineContext::new(config)).await
}

async fn serve(ctx: EngineContext) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Single writer task keeps responses line-atomic.
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
            {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HostRequest>(&line) {
            Ok(req) => dispatch(req, &ctx, &tx, &pending).await,
            Err(e) => send(&tx, json!({ "id": Value::Null, "error": format!("parse error: {e}") })),
        }
    }

    drop(tx);
    let _ = writer.await;
    Ok(())
}

async fn dispatch(req: HostRequest, ctx: &EngineContext, tx: &ResponseTx, pending: &PendingMap) {
    debug!(method = %req.method, "dispatch");
    let id = req.id;

    match req.method.as_str() {
        "completion.suggest" => {
            let params: SuggestParams = match serde_json::from_value(req.params) {
                Ok(p) => p,
                Err(e) => return send_error(tx, id, &format!("invalid params: {e}")),
            };
            let cancel = CancellationToken::new();
            pending.lock().await.insert(id.to_string(), cancel.clone());

            let ctx = ctx.clone();
            let tx = tx.clone();
            let pending = pending.clone();
            tokio::spawn(async move {
                let view = DocumentView {
                    text: &params.text,
                    cursor_line: params.line,
                    cursor_col: params.col,
                    file_path: params.file_path.as_deref(),
                    language: params.language.as_deref(),
                };
                let suggestion = ctx.provider.provide(view, cancel).await;
                pending.lock().await.remove(&id.to_string());
                send(&tx, json!({ "id": id, "result": { "suggestion": suggestion } }));
            });
        }

        "completion.cancel" => {
            let params: CancelParams = match serde_json::from_value(req.params) {
                Ok(p) => p,
                Err(e) => return send_error(tx, id, &format!("invalid params: {e}")),
            };
            if let Some(token) = pending.lock().await.remove(&params.request_id.to_string()) {
                token.cancel();
            }
            send(tx, json!({ "id": id, "result": { "cancelled": true } }));
        }

        "config.update" => {
            let params: ConfigUpdateParams = match serde_json::from_value(req.params) {
                Ok(p) => p,
                Err(e) => return send_error(tx, id, &format!("invalid params: {e}")),
            };
            let model = params
                .model
                .as_deref()
                .map(SonarModel::parse_or_default)
                .unwrap_or_default();
            ctx.provider
                .update_configuration(params.api_key, model, params.enabled)
                .await;
            send(tx, json!({ "id": id, "result": { "updated": true } }));
        }

        "engine.enable" => {
            ctx.provider.enable().await;
            send(tx, json!({ "id": id, "result": { "enabled": true } }));
        }

        "engine.disable" => {
            ctx.provider.disable().await;
            send(tx, json!({ "id": id, "result": { "enabled": false } }));
        }

        "engine.stats" => {
            let stats = ctx.provider.cache_stats();
            match serde_json::to_value(&stats) {
                Ok(v) => send(tx, json!({ "id": id, "result": { "cache": v } })),
                Err(e) => send_error(tx, id, &format!("stats unavailable: {e}")),
            }
        }

        other => send_error(tx, id, &format!("method not found: {other}")),
    }
}

fn send(tx: &ResponseTx, value: Value) {
    let _ = tx.send(value.to_string());
}

fn send_error(tx: &ResponseTx, id: Value, message: &str) {
    send(tx, json!({ "id": id, "error": message }));
}
