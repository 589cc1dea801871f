// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reconciliation: the single source of truth for what the kernel should
//! look like. Every kernel-mutating step short-circuits under dry-run and
//! appends the operation it would have performed to the returned log.

use crate::engine::Organize;
use crate::error::{OrganizeError, Result};
use crate::queries::PeerMap;
use ipnet::IpNet;
use std::collections::BTreeSet;
use tracing::{debug, instrument};
use vula_core::constants::{GATEWAY_ROUTES, MAIN_ROUTING_TABLE};
use vula_core::{Peer, SystemState, WgPeerConfig};

impl Organize {
	/// §4.8: full sync. Interfaces, device config, policy rules, every
	/// peer, then removal of unknown peers and routes.
	#[instrument(skip(self))]
	pub async fn sync(&self, dry_run: bool) -> Result<Vec<String>> {
		let (peers, system_state, primary_ip) = {
			let state = self.state.lock().expect("state lock");
			(
				state.peers.clone(),
				state.system_state.clone(),
				state.prefs.primary_ip,
			)
		};

		let mut log = self
			.caps
			.network
			.sync_interfaces(&self.config.interface, primary_ip, dry_run)
			.await?;

		log.extend(self.sync_device_config(dry_run).await?);

		log.extend(
			self.caps
				.network
				.sync_rules(
					self.config.routing_table,
					self.config.fwmark,
					self.config.ip_rule_priority,
					dry_run,
				)
				.await?,
		);

		for (id, peer) in &peers {
			debug!(peer = %peer.name_and_id(), "syncing peer");
			match self.sync_peer(&peers, id, &system_state, dry_run).await {
				Ok(peer_log) => log.extend(peer_log),
				Err(e) => log.push(format!("failed to sync peer: {e}")),
			}
		}

		log.extend(self.remove_unknown_with(&peers, dry_run).await?);
		Ok(log)
	}

	/// Ensures the device's private key, listen port, and fwmark match the
	/// configuration, reconfiguring only when something differs.
	async fn sync_device_config(&self, dry_run: bool) -> Result<Vec<String>> {
		let current = self.caps.wg.configuration().await?;
		let matches = current.private_key == self.keys.wg_sk.expose()
			&& current.listen_port == self.config.port
			&& current.fwmark == self.config.fwmark;
		if matches {
			debug!(interface = %self.config.interface, "no device reconfiguration needed");
			return Ok(Vec::new());
		}

		if !dry_run {
			self.caps
				.wg
				.set_configuration(
					self.keys.wg_sk.expose(),
					self.config.port,
					self.config.fwmark,
				)
				.await?;
		}
		Ok(vec![
			"# configure interface".to_string(),
			format!(
				"wg set {} private-key <redacted> listen-port {} fwmark {}",
				self.config.interface, self.config.port, self.config.fwmark
			),
		])
	}

	/// Trigger entry point: sync one peer against the live state.
	pub(crate) async fn sync_peer_by_id(&self, id: &str, dry_run: bool) -> Result<Vec<String>> {
		let (peers, system_state) = {
			let state = self.state.lock().expect("state lock");
			(state.peers.clone(), state.system_state.clone())
		};
		self.sync_peer(&peers, id, &system_state, dry_run).await
	}

	async fn sync_peer(
		&self,
		peers: &PeerMap,
		id: &str,
		system_state: &SystemState,
		dry_run: bool,
	) -> Result<Vec<String>> {
		let peer = peers.get(id).ok_or_else(|| OrganizeError::PeerNotFound {
			key: "vk",
			value: id.to_string(),
		})?;

		if !peer.enabled {
			// disabled peers are cleaned up through the unknown sweep
			return self.remove_unknown_with(peers, dry_run).await;
		}

		debug!(peer = %peer.name(), "syncing enabled peer");
		let mut log = Vec::new();

		let psk = self.psk.psk(&peer.descriptor.pq_pk)?;
		let config = wg_peer_config(peer, &psk);
		log.extend(self.caps.wg.apply_peer(&config, dry_run).await?);

		log.extend(
			self.caps
				.network
				.sync_routes(
					&peer.routes(),
					self.config.routing_table,
					&self.config.interface,
					&system_state.current_subnets,
					dry_run,
				)
				.await?,
		);

		if peer.use_as_gateway {
			log.extend(
				self.caps
					.network
					.sync_routes(
						&GATEWAY_ROUTES[..],
						MAIN_ROUTING_TABLE,
						&self.config.interface,
						&system_state.current_subnets,
						dry_run,
					)
					.await?,
			);
		}

		Ok(log)
	}

	/// Trigger entry point: sweep against the live state.
	pub(crate) async fn remove_unknown(&self, dry_run: bool) -> Result<Vec<String>> {
		let peers = self.state.lock().expect("state lock").peers.clone();
		self.remove_unknown_with(&peers, dry_run).await
	}

	/// §4.8 step 5: drop WireGuard peers and routes that no enabled peer
	/// accounts for, and the gateway defaults when no gateway remains.
	async fn remove_unknown_with(&self, peers: &PeerMap, dry_run: bool) -> Result<Vec<String>> {
		let enabled: Vec<&Peer> = peers.values().filter(|p| p.enabled).collect();
		let enabled_pks: BTreeSet<&[u8]> = enabled
			.iter()
			.map(|p| p.descriptor.wg_pk.as_slice())
			.collect();

		let mut log = Vec::new();
		for device_peer in self.caps.wg.peers().await? {
			if enabled_pks.contains(device_peer.public_key.as_slice()) {
				continue;
			}
			log.push(format!(
				"wg set {} peer {} remove",
				self.config.interface,
				device_peer.public_key_base64()
			));
			if !dry_run {
				self.caps
					.wg
					.apply_peer(&WgPeerConfig::removal(device_peer.public_key), false)
					.await?;
			}
		}

		let expected: BTreeSet<IpNet> = enabled.iter().flat_map(|p| p.routes()).collect();
		let has_enabled_gateway = enabled.iter().any(|p| p.use_as_gateway);

		log.extend(
			self.caps
				.network
				.remove_unknown_routes(
					&expected,
					self.config.routing_table,
					has_enabled_gateway,
					dry_run,
				)
				.await?,
		);
		Ok(log)
	}
}

/// The WireGuard slot an enabled peer should occupy.
fn wg_peer_config(peer: &Peer, psk: &[u8; 32]) -> WgPeerConfig {
	WgPeerConfig {
		public_key: peer.descriptor.wg_pk.clone(),
		preshared_key: Some(psk.to_vec()),
		endpoint: peer.endpoint(),
		persistent_keepalive: None,
		allowed_ips: peer.wg_allowed_ips(),
		remove: false,
		stats: None,
	}
}
