// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use vula_core::constants::{DEFAULT_DISCOVER_SOCKET, DEFAULT_ORGANIZE_SOCKET};
use vula_core::CapResult;
use vula_ipc::{self as ipc, OrganizeClient, RpcHandler};
use vula_mdns::{DescriptorSink, Discover};

#[derive(Args)]
pub struct DiscoverArgs {
	/// Unix socket exposing the discover instruction channel
	#[arg(long, default_value = DEFAULT_DISCOVER_SOCKET)]
	pub socket: PathBuf,

	/// Organize IPC socket receiving discovered descriptors
	#[arg(long, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub organize_socket: PathBuf,
}

/// Forwards discovered descriptors to the organizer over IPC.
struct OrganizeSink(OrganizeClient);

#[async_trait]
impl DescriptorSink for OrganizeSink {
	async fn process_descriptor_string(&self, descriptor: &str) -> CapResult<String> {
		Ok(self.0.process_descriptor_string(descriptor).await?)
	}
}

struct DiscoverRpc(Arc<Discover>);

#[async_trait]
impl RpcHandler for DiscoverRpc {
	async fn handle(&self, method: &str, raw: Value) -> Result<Value, (String, String)> {
		match method {
			ipc::METHOD_LISTEN => {
				let p: ipc::DiscoverListenParams = serde_json::from_value(raw)
					.map_err(|e| (ipc::INVALID_PARAMS.to_string(), e.to_string()))?;
				self.0
					.listen(&p.ip_addrs, &p.our_wg_pk)
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

pub async fn run(args: DiscoverArgs) -> anyhow::Result<()> {
	let sink = Arc::new(OrganizeSink(OrganizeClient::new(&args.organize_socket)));
	let discover = Arc::new(Discover::new(sink));
	discover.listen(&[], "").await?;

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let handler = Arc::new(DiscoverRpc(Arc::clone(&discover)));
	let socket = args.socket.clone();
	let server = tokio::spawn(async move { ipc::serve(&socket, handler, shutdown_rx).await });

	info!("discover daemon running");
	tokio::signal::ctrl_c().await?;

	let _ = shutdown_tx.send(true);
	discover.shutdown().await;
	let _ = server.await;
	Ok(())
}
