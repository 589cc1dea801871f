// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::protocol::{ErrorResponse, Request, SuccessResponse, INVALID_PARAMS, OPERATION_FAILED};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// One exposed object: methods dispatched by name. Implementations return
/// the result value or a `(code, message)` error pair.
#[async_trait]
pub trait RpcHandler: Send + Sync {
	async fn handle(&self, method: &str, params: Value) -> std::result::Result<Value, (String, String)>;
}

/// Serves the handler on a unix socket until shutdown flips. A stale
/// socket file from an unclean exit is replaced.
pub async fn serve(
	path: &Path,
	handler: Arc<dyn RpcHandler>,
	mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
	if let Some(parent) = path.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}
	match tokio::fs::remove_file(path).await {
		Ok(()) => debug!(path = %path.display(), "removed stale socket"),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
		Err(e) => return Err(e.into()),
	}

	let listener = UnixListener::bind(path)?;
	info!(path = %path.display(), "ipc server listening");

	loop {
		tokio::select! {
			biased;

			_ = shutdown.changed() => {
				if *shutdown.borrow() {
					info!("ipc server shutting down");
					break;
				}
			}

			accepted = listener.accept() => {
				match accepted {
					Ok((stream, _)) => {
						let handler = Arc::clone(&handler);
						tokio::spawn(handle_connection(stream, handler));
					}
					Err(e) => warn!(error = %e, "accept failed"),
				}
			}
		}
	}

	let _ = tokio::fs::remove_file(path).await;
	Ok(())
}

async fn handle_connection(stream: UnixStream, handler: Arc<dyn RpcHandler>) {
	let (reader, mut writer) = stream.into_split();
	let mut lines = BufReader::new(reader).lines();

	while let Ok(Some(line)) = lines.next_line().await {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let response = match serde_json::from_str::<Request>(line) {
			Ok(request) => {
				debug!(method = %request.method, id = request.id, "ipc request");
				match handler.handle(&request.method, request.params).await {
					Ok(result) => serde_json::to_string(&SuccessResponse::new(request.id, result)),
					Err((code, message)) => {
						serde_json::to_string(&ErrorResponse::new(request.id, &code, message))
					}
				}
			}
			Err(e) => serde_json::to_string(&ErrorResponse::new(
				0,
				INVALID_PARAMS,
				format!("invalid request: {e}"),
			)),
		};

		let payload = response.unwrap_or_else(|e| {
			format!(
				r#"{{"id":0,"error":{{"code":"{OPERATION_FAILED}","message":"serialize: {e}"}}}}"#
			)
		});

		if writer.write_all(payload.as_bytes()).await.is_err() {
			break;
		}
		if writer.write_all(b"\n").await.is_err() {
			break;
		}
	}
}
