// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use vula_core::constants::DEFAULT_PUBLISH_SOCKET;
use vula_ipc::{self as ipc, RpcHandler};
use vula_mdns::Publish;

#[derive(Args)]
pub struct PublishArgs {
	/// Unix socket exposing the publish instruction channel
	#[arg(long, default_value = DEFAULT_PUBLISH_SOCKET)]
	pub socket: PathBuf,
}

struct PublishRpc(Arc<Publish>);

#[async_trait]
impl RpcHandler for PublishRpc {
	async fn handle(&self, method: &str, raw: Value) -> Result<Value, (String, String)> {
		match method {
			ipc::METHOD_LISTEN => {
				let p: ipc::PublishListenParams = serde_json::from_value(raw)
					.map_err(|e| (ipc::INVALID_PARAMS.to_string(), e.to_string()))?;
				self.0
					.listen(&p.announcements)
					.await
					.map_err(|e| (ipc::OPERATION_FAILED.to_string(), e.to_string()))?;
				Ok(Value::Null)
			}
			other => Err((
				ipc::UNKNOWN_METHOD.to_string(),
				format!("no such method: {other}"),
			)),
		}
	}
}

pub async fn run(args: PublishArgs) -> anyhow::Result<()> {
	let publish = Arc::new(Publish::new()?);

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let handler = Arc::new(PublishRpc(Arc::clone(&publish)));
	let socket = args.socket.clone();
	let server = tokio::spawn(async move { ipc::serve(&socket, handler, shutdown_rx).await });

	info!("publish daemon running");
	tokio::signal::ctrl_c().await?;

	let _ = shutdown_tx.send(true);
	publish.shutdown().await;
	let _ = server.await;
	Ok(())
}
