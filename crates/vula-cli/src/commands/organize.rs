// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::Context;
use async_trait::async_trait;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use vula_core::constants::{
	DEFAULT_DISCOVER_SOCKET, DEFAULT_FWMARK, DEFAULT_HOSTS_FILE, DEFAULT_INTERFACE,
	DEFAULT_IP_RULE_PRIORITY, DEFAULT_KEYS_FILE, DEFAULT_ORGANIZE_SOCKET, DEFAULT_PUBLISH_SOCKET,
	DEFAULT_ROUTING_TABLE, DEFAULT_STATE_FILE, DEFAULT_WG_PORT, ORGANIZE_LIB_DIR,
};
use vula_ipc::{self as ipc, RpcHandler};
use vula_organize::{Capabilities, Organize, OrganizeConfig};
use vula_store::{AtomicDir, HostsFileStore, KeyFileStore, StateFileStore};
use vula_sysnet::{IprouteNetwork, KernelWgDevice};

#[derive(Args)]
pub struct OrganizeArgs {
	/// Which routing table to use
	#[arg(short = 't', long, default_value_t = DEFAULT_ROUTING_TABLE)]
	pub table: u32,

	/// WireGuard interface name
	#[arg(short = 'I', long, default_value = DEFAULT_INTERFACE)]
	pub interface: String,

	/// YAML state file
	#[arg(short = 'c', long, default_value = DEFAULT_STATE_FILE)]
	pub state_file: PathBuf,

	/// YAML file for cryptographic keys
	#[arg(short = 'k', long, default_value = DEFAULT_KEYS_FILE)]
	pub keys_file: PathBuf,

	/// WireGuard listen port
	#[arg(short = 'p', long, default_value_t = DEFAULT_WG_PORT)]
	pub port: u16,

	/// Firewall mark for vula-originated traffic
	#[arg(short = 'm', long, default_value_t = DEFAULT_FWMARK)]
	pub fwmark: u32,

	/// Priority of the vula policy rule
	#[arg(short = 'r', long, default_value_t = DEFAULT_IP_RULE_PRIORITY)]
	pub ip_rule_priority: u32,

	/// Unix socket exposing the organize IPC surface
	#[arg(long, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub socket: PathBuf,
}

fn local_hostname() -> anyhow::Result<String> {
	let hostname = nix::unistd::gethostname().context("reading hostname")?;
	let hostname = hostname.to_string_lossy();
	// FIXME: the announced domain should become a pref
	Ok(format!("{hostname}.local."))
}

pub async fn run(args: OrganizeArgs) -> anyhow::Result<()> {
	let writer = AtomicDir::new(ORGANIZE_LIB_DIR);
	let key_store = Arc::new(KeyFileStore::new(&args.keys_file, writer.clone()));
	let state_store = Arc::new(StateFileStore::new(&args.state_file, writer.clone()));
	let hosts_store = Arc::new(HostsFileStore::new(DEFAULT_HOSTS_FILE, writer));

	let caps = Capabilities {
		state_store,
		hosts_store,
		network: Arc::new(IprouteNetwork),
		wg: Arc::new(KernelWgDevice::new(&args.interface)?),
		discover: Arc::new(ipc::DiscoverClient::new(DEFAULT_DISCOVER_SOCKET)),
		publish: Arc::new(ipc::PublishClient::new(DEFAULT_PUBLISH_SOCKET)),
	};

	let config = OrganizeConfig {
		interface: args.interface.clone(),
		hostname: local_hostname()?,
		port: args.port,
		fwmark: args.fwmark,
		routing_table: args.table,
		ip_rule_priority: args.ip_rule_priority,
	};

	let organize = Organize::new(config, caps, key_store, Arc::new(vula_crypto::XdhEngine))
		.context("constructing organizer")?;
	organize.start().await.context("starting organizer")?;

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let handler = Arc::new(OrganizeRpc(Arc::clone(&organize)));
	let socket = args.socket.clone();
	let server = tokio::spawn(async move { ipc::serve(&socket, handler, shutdown_rx).await });

	info!("organize daemon running");
	tokio::signal::ctrl_c().await?;
	info!("shutting down");

	let _ = shutdown_tx.send(true);
	organize.shutdown();
	let _ = server.await;
	Ok(())
}

/// Dispatches the IPC surface onto the organizer.
pub struct OrganizeRpc(pub Arc<Organize>);

fn params<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, (String, String)> {
	serde_json::from_value(value)
		.map_err(|e| (ipc::INVALID_PARAMS.to_string(), e.to_string()))
}

fn failed(err: impl std::fmt::Display) -> (String, String) {
	(ipc::OPERATION_FAILED.to_string(), err.to_string())
}

fn ok<T: serde::Serialize>(value: T) -> Result<Value, (String, String)> {
	serde_json::to_value(value).map_err(failed)
}

#[async_trait]
impl RpcHandler for OrganizeRpc {
	async fn handle(&self, method: &str, raw: Value) -> Result<Value, (String, String)> {
		let organize = &self.0;
		match method {
			ipc::METHOD_SYNC => {
				let p: ipc::SyncParams = params(raw)?;
				ok(organize.sync(p.dry_run).await.map_err(failed)?)
			}
			ipc::METHOD_SHOW_PEER => {
				let p: ipc::QueryParams = params(raw)?;
				ok(organize.show_peer(&p.query).await.map_err(failed)?)
			}
			ipc::METHOD_PEER_DESCRIPTOR => {
				let p: ipc::QueryParams = params(raw)?;
				ok(organize.peer_descriptor(&p.query).map_err(failed)?)
			}
			ipc::METHOD_PEER_IDS => {
				let p: ipc::PeerIdsParams = params(raw)?;
				ok(organize.peer_ids(&p.which).map_err(failed)?)
			}
			ipc::METHOD_REDISCOVER => ok(organize.rediscover().await.map_err(failed)?),
			ipc::METHOD_SET_PEER => {
				let p: ipc::SetPeerParams = params(raw)?;
				ok(organize.set_peer(&p.vk, &p.path, &p.value).await.map_err(failed)?)
			}
			ipc::METHOD_REMOVE_PEER => {
				let p: ipc::VkParams = params(raw)?;
				ok(organize.remove_peer(&p.vk).await.map_err(failed)?)
			}
			ipc::METHOD_PEER_ADDR_ADD => {
				let p: ipc::PeerAddrParams = params(raw)?;
				ok(organize.peer_addr_add(&p.vk, &p.value).await.map_err(failed)?)
			}
			ipc::METHOD_PEER_ADDR_DEL => {
				let p: ipc::PeerAddrParams = params(raw)?;
				ok(organize.peer_addr_del(&p.vk, &p.value).await.map_err(failed)?)
			}
			ipc::METHOD_OUR_LATEST_DESCRIPTORS => {
				ok(organize.our_latest_descriptors().map_err(failed)?)
			}
			ipc::METHOD_GET_VK_BY_NAME => {
				let p: ipc::HostnameParams = params(raw)?;
				ok(organize.get_vk_by_name(&p.hostname).map_err(failed)?)
			}
			ipc::METHOD_VERIFY_AND_PIN_PEER => {
				let p: ipc::VerifyAndPinParams = params(raw)?;
				ok(organize
					.verify_and_pin_peer(&p.vk, &p.hostname)
					.await
					.map_err(failed)?)
			}
			ipc::METHOD_PROCESS_DESCRIPTOR_STRING => {
				let p: ipc::DescriptorParams = params(raw)?;
				ok(organize
					.process_descriptor_string(&p.descriptor)
					.await
					.map_err(failed)?)
			}
			ipc::METHOD_SHOW_PREFS => ok(organize.show_prefs().map_err(failed)?),
			ipc::METHOD_SET_PREF => {
				let p: ipc::PrefParams = params(raw)?;
				ok(organize.set_pref(&p.pref, &p.value).await.map_err(failed)?)
			}
			ipc::METHOD_ADD_PREF => {
				let p: ipc::PrefParams = params(raw)?;
				ok(organize.add_pref(&p.pref, &p.value).await.map_err(failed)?)
			}
			ipc::METHOD_REMOVE_PREF => {
				let p: ipc::PrefParams = params(raw)?;
				ok(organize.remove_pref(&p.pref, &p.value).await.map_err(failed)?)
			}
			ipc::METHOD_RELEASE_GATEWAY => ok(organize.release_gateway().await.map_err(failed)?),
			other => Err((
				ipc::UNKNOWN_METHOD.to_string(),
				format!("no such method: {other}"),
			)),
		}
	}
}
