// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{IpcError, Result};
use crate::protocol::*;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use vula_core::system::{DiscoverControl, PublishControl};
use vula_core::CapResult;

/// One-request-per-connection JSON-RPC client. Calls are infrequent and
/// small; a fresh connection per call keeps the protocol stateless.
pub struct RpcClient {
	path: PathBuf,
	next_id: AtomicU64,
}

impl RpcClient {
	pub fn new(path: impl AsRef<Path>) -> Self {
		Self {
			path: path.as_ref().to_path_buf(),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn socket_path(&self) -> &Path {
		&self.path
	}

	pub async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request = Request {
			id,
			method: method.to_string(),
			params: serde_json::to_value(params)?,
		};

		let stream = UnixStream::connect(&self.path).await?;
		let (reader, mut writer) = stream.into_split();

		let mut payload = serde_json::to_string(&request)?;
		payload.push('\n');
		writer.write_all(payload.as_bytes()).await?;

		let mut lines = BufReader::new(reader).lines();
		let line = lines
			.next_line()
			.await?
			.ok_or(IpcError::ConnectionClosed)?;

		if let Ok(success) = serde_json::from_str::<SuccessResponse>(&line) {
			return Ok(serde_json::from_value(success.result)?);
		}
		let error: ErrorResponse = serde_json::from_str(&line)?;
		Err(IpcError::Remote {
			code: error.error.code,
			message: error.error.message,
		})
	}
}

/// Typed client for the organizer's full IPC surface.
pub struct OrganizeClient {
	rpc: RpcClient,
}

impl OrganizeClient {
	pub fn new(path: impl AsRef<Path>) -> Self {
		Self {
			rpc: RpcClient::new(path),
		}
	}

	pub fn socket_path(&self) -> &Path {
		self.rpc.socket_path()
	}

	pub async fn sync(&self, dry_run: bool) -> Result<Vec<String>> {
		self.rpc.call(METHOD_SYNC, SyncParams { dry_run }).await
	}

	pub async fn show_peer(&self, query: &str) -> Result<String> {
		self.rpc
			.call(METHOD_SHOW_PEER, QueryParams { query: query.into() })
			.await
	}

	pub async fn peer_descriptor(&self, query: &str) -> Result<String> {
		self.rpc
			.call(METHOD_PEER_DESCRIPTOR, QueryParams { query: query.into() })
			.await
	}

	pub async fn peer_ids(&self, which: &str) -> Result<Vec<String>> {
		self.rpc
			.call(METHOD_PEER_IDS, PeerIdsParams { which: which.into() })
			.await
	}

	pub async fn rediscover(&self) -> Result<String> {
		self.rpc.call(METHOD_REDISCOVER, Value::Null).await
	}

	pub async fn set_peer(&self, vk: &str, path: &[String], value: &str) -> Result<String> {
		self.rpc
			.call(
				METHOD_SET_PEER,
				SetPeerParams {
					vk: vk.into(),
					path: path.to_vec(),
					value: value.into(),
				},
			)
			.await
	}

	pub async fn remove_peer(&self, vk: &str) -> Result<String> {
		self.rpc.call(METHOD_REMOVE_PEER, VkParams { vk: vk.into() }).await
	}

	pub async fn peer_addr_add(&self, vk: &str, value: &str) -> Result<String> {
		self.rpc
			.call(
				METHOD_PEER_ADDR_ADD,
				PeerAddrParams { vk: vk.into(), value: value.into() },
			)
			.await
	}

	pub async fn peer_addr_del(&self, vk: &str, value: &str) -> Result<String> {
		self.rpc
			.call(
				METHOD_PEER_ADDR_DEL,
				PeerAddrParams { vk: vk.into(), value: value.into() },
			)
			.await
	}

	pub async fn our_latest_descriptors(&self) -> Result<String> {
		self.rpc.call(METHOD_OUR_LATEST_DESCRIPTORS, Value::Null).await
	}

	pub async fn get_vk_by_name(&self, hostname: &str) -> Result<String> {
		self.rpc
			.call(
				METHOD_GET_VK_BY_NAME,
				HostnameParams { hostname: hostname.into() },
			)
			.await
	}

	pub async fn verify_and_pin_peer(&self, vk: &str, hostname: &str) -> Result<String> {
		self.rpc
			.call(
				METHOD_VERIFY_AND_PIN_PEER,
				VerifyAndPinParams { vk: vk.into(), hostname: hostname.into() },
			)
			.await
	}

	pub async fn process_descriptor_string(&self, descriptor: &str) -> Result<String> {
		self.rpc
			.call(
				METHOD_PROCESS_DESCRIPTOR_STRING,
				DescriptorParams { descriptor: descriptor.into() },
			)
			.await
	}

	pub async fn show_prefs(&self) -> Result<String> {
		self.rpc.call(METHOD_SHOW_PREFS, Value::Null).await
	}

	pub async fn set_pref(&self, pref: &str, value: &str) -> Result<String> {
		self.rpc
			.call(METHOD_SET_PREF, PrefParams { pref: pref.into(), value: value.into() })
			.await
	}

	pub async fn add_pref(&self, pref: &str, value: &str) -> Result<String> {
		self.rpc
			.call(METHOD_ADD_PREF, PrefParams { pref: pref.into(), value: value.into() })
			.await
	}

	pub async fn remove_pref(&self, pref: &str, value: &str) -> Result<String> {
		self.rpc
			.call(METHOD_REMOVE_PREF, PrefParams { pref: pref.into(), value: value.into() })
			.await
	}

	pub async fn release_gateway(&self) -> Result<String> {
		self.rpc.call(METHOD_RELEASE_GATEWAY, Value::Null).await
	}
}

/// Client handle on the discover daemon's instruction channel.
pub struct DiscoverClient {
	rpc: RpcClient,
}

impl DiscoverClient {
	pub fn new(path: impl AsRef<Path>) -> Self {
		Self {
			rpc: RpcClient::new(path),
		}
	}
}

#[async_trait]
impl DiscoverControl for DiscoverClient {
	async fn listen(&self, ip_addrs: &[String], our_wg_pk: &str) -> CapResult<()> {
		let _: Value = self
			.rpc
			.call(
				METHOD_LISTEN,
				DiscoverListenParams {
					ip_addrs: ip_addrs.to_vec(),
					our_wg_pk: our_wg_pk.to_string(),
				},
			)
			.await?;
		Ok(())
	}
}

/// Client handle on the publish daemon's instruction channel.
pub struct PublishClient {
	rpc: RpcClient,
}

impl PublishClient {
	pub fn new(path: impl AsRef<Path>) -> Self {
		Self {
			rpc: RpcClient::new(path),
		}
	}
}

#[async_trait]
impl PublishControl for PublishClient {
	async fn listen(&self, announcements: &BTreeMap<String, String>) -> CapResult<()> {
		let _: Value = self
			.rpc
			.call(
				METHOD_LISTEN,
				PublishListenParams {
					announcements: announcements.clone(),
				},
			)
			.await?;
		Ok(())
	}
}
