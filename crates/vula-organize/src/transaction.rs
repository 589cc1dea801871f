// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::edit;
use crate::error::{OrganizeError, Result};
use crate::event::EditOp;
use crate::queries;
use crate::trigger::Trigger;
use ipnet::IpNet;
use std::collections::BTreeMap;
use std::net::IpAddr;
use tracing::info;
use vula_core::constants::GATEWAY_ROUTES;
use vula_core::net::{addrs_in_subnets, host_prefix};
use vula_core::{Descriptor, OrganizeState, Peer, SystemState};

/// One event's workspace: a deep copy of the live state plus the action
/// log, pending triggers, and operator-facing messages accumulated while
/// the handlers run. On success the state replaces the live one; on
/// failure the whole transaction is discarded.
pub struct Transaction {
	pub state: OrganizeState,
	pub actions: Vec<String>,
	pub triggers: Vec<Trigger>,
	pub messages: Vec<String>,
}

impl Transaction {
	pub fn new(state: OrganizeState) -> Self {
		Self {
			state,
			actions: Vec::new(),
			triggers: Vec::new(),
			messages: Vec::new(),
		}
	}

	pub fn add_action(&mut self, name: &str, args: &[&str]) {
		self.actions.push(format!("{name} [{}]", args.join(", ")));
	}

	pub fn add_trigger(&mut self, trigger: Trigger) {
		self.triggers.push(trigger);
	}

	pub fn add_message(&mut self, message: impl Into<String>) {
		self.messages.push(message.into());
	}

	fn ignore(&mut self, reason: &str) {
		self.add_action("IGNORE", &[reason]);
	}

	/// §4.7: the descriptor pipeline. Guards return early; each rejection
	/// is recorded as a message and dropped silently.
	pub fn incoming_descriptor(&mut self, descriptor: Descriptor, now: i64) -> Result<()> {
		self.add_action("IncomingDescriptor", &[]);
		let text = vula_codec::serialize_descriptor(&descriptor);

		if descriptor.wg_pk == self.state.system_state.our_wg_pk {
			self.add_message(format!("ignore descriptor: {text}: has our wg pk"));
			return Ok(());
		}

		if !vula_codec::is_fresh(&descriptor, now) {
			self.add_message(format!("reject descriptor: {text}: not fresh"));
			return Ok(());
		}

		let id = descriptor.id();
		if let Some(existing) = self.state.peers.get(&id) {
			if descriptor.valid_start <= existing.descriptor.valid_start {
				self.add_message(format!("ignore descriptor: {text}: replay"));
				return Ok(());
			}
		}

		if addrs_in_subnets(&descriptor.addrs(), &self.state.system_state.current_subnets)
			.is_empty()
		{
			self.add_message(format!("reject descriptor: {text}: wrong subnet"));
			return Ok(());
		}

		let in_local_domain = self
			.state
			.prefs
			.local_domains
			.iter()
			.any(|domain| descriptor.hostname.ends_with(domain.as_str()));
		if !in_local_domain {
			self.add_message(format!("reject descriptor: {text}: invalid domain"));
			return Ok(());
		}

		let conflicts: Vec<String> = queries::conflicts_for_descriptor(&self.state.peers, &descriptor)
			.into_iter()
			.map(String::from)
			.collect();
		if !conflicts.is_empty() {
			if conflicts
				.iter()
				.any(|cid| self.state.peers.get(cid).map(|p| p.pinned).unwrap_or(false))
			{
				self.add_message(format!("reject descriptor: {text}: conflict with pinned peer"));
				return Ok(());
			}
			for conflict_id in conflicts {
				self.remove_peer(&conflict_id)?;
			}
		}

		if self.state.peers.contains_key(&id) {
			self.update_peer_descriptor(&id, descriptor)
		} else {
			self.accept_new_peer(descriptor)
		}
	}

	pub fn accept_new_peer(&mut self, descriptor: Descriptor) -> Result<()> {
		let text = vula_codec::serialize_descriptor(&descriptor);
		self.add_action("AcceptNewPeer", &[&text]);

		let ephemeral = descriptor.ephemeral;
		let id = descriptor.id();
		let mut peer = Peer::from_descriptor(descriptor);
		peer.pinned = if ephemeral { false } else { self.state.prefs.pin_new_peers };
		self.state.peers.insert(id.clone(), peer);

		self.update_peer(&id, None, None)
	}

	pub fn update_peer_descriptor(&mut self, id: &str, descriptor: Descriptor) -> Result<()> {
		let text = vula_codec::serialize_descriptor(&descriptor);
		self.add_action("UpdatePeerDescriptor", &[id, &text]);

		let peer = self.state.peers.get_mut(id).ok_or_else(|| not_found(id))?;
		peer.descriptor = descriptor.clone();
		self.update_peer(id, Some(&descriptor), None)
	}

	/// §4.7 update-peer: recompute enabled addresses, prune peers with no
	/// reachable address, pick up new local-domain nicknames, and mark the
	/// peer as gateway when it owns a default-route address.
	pub fn update_peer(
		&mut self,
		id: &str,
		descriptor: Option<&Descriptor>,
		system_state: Option<&SystemState>,
	) -> Result<()> {
		self.add_action("UpdatePeer", &[id]);

		let peer = self.state.peers.get(id).ok_or_else(|| not_found(id))?;
		info!(peer = %peer.name_and_id(), "updating peer");

		let descriptor = descriptor.cloned().unwrap_or_else(|| peer.descriptor.clone());
		let subnet_view = system_state
			.unwrap_or(&self.state.system_state)
			.current_subnets_no_ula();
		let subnets: Vec<IpNet> = subnet_view.keys().copied().collect();
		let allowed = self.state.prefs.subnets_allowed.clone();
		let local_domains = self.state.prefs.local_domains.clone();
		// gateway election consults the state current at dequeue, not the
		// sample being applied
		let gateways = self.state.system_state.gateways.clone();

		let peer = self.state.peers.get_mut(id).ok_or_else(|| not_found(id))?;

		let mut new_addrs: BTreeMap<IpAddr, bool> = BTreeMap::new();
		if peer.pinned {
			// pinned peers survive network changes: previously accepted
			// addresses stay
			for addr in descriptor.addrs() {
				new_addrs.insert(addr, true);
			}
			for (addr, enabled) in &peer.addrs {
				if *enabled {
					new_addrs.insert(*addr, true);
				}
			}
		} else {
			for addr in descriptor.addrs() {
				if subnets.iter().chain(allowed.iter()).any(|net| net.contains(&addr)) {
					new_addrs.insert(addr, true);
				}
			}
		}
		peer.addrs = new_addrs;

		if !peer.addrs.values().any(|enabled| *enabled) {
			info!(peer = %peer.name_and_id(), "removing peer with no currently local IPs");
			return self.remove_peer(id);
		}

		if !descriptor.hostname.is_empty()
			&& !peer
				.nicknames
				.get(&descriptor.hostname)
				.copied()
				.unwrap_or(false)
			&& local_domains
				.iter()
				.any(|d| !d.is_empty() && descriptor.hostname.ends_with(d.as_str()))
		{
			peer.nicknames.insert(descriptor.hostname.clone(), true);
		}

		let descriptor_local_addrs: Vec<IpAddr> = descriptor
			.addrs()
			.into_iter()
			.filter(|addr| subnets.iter().any(|net| net.contains(addr)))
			.collect();
		if gateways.iter().any(|gw| descriptor_local_addrs.contains(gw)) {
			peer.use_as_gateway = true;
		}

		self.add_trigger(Trigger::SyncPeer(id.to_string()));
		Ok(())
	}

	pub fn remove_peer(&mut self, id: &str) -> Result<()> {
		self.add_action("RemovePeer", &[id]);

		let peer = self.state.peers.remove(id).ok_or_else(|| not_found(id))?;

		self.add_trigger(Trigger::RemoveWgPeer(peer.descriptor.wg_pk.clone()));
		self.add_trigger(Trigger::RemoveRoutes(peer.routes()));
		if peer.use_as_gateway {
			self.add_trigger(Trigger::RemoveRoutes(GATEWAY_ROUTES.to_vec()));
		}
		Ok(())
	}

	pub fn user_remove_peer(&mut self, query: &str) -> Result<()> {
		let Some(peer) = queries::query(&self.state.peers, query)? else {
			self.ignore("no such peer");
			return Ok(());
		};
		let id = peer.id();
		self.remove_peer(&id)
	}

	pub fn peer_addr_add(&mut self, vk: &str, addr: IpAddr) -> Result<()> {
		self.add_action("PeerAddrAdd", &[vk, &addr.to_string()]);

		let peer = self.state.peers.get_mut(vk).ok_or_else(|| not_found(vk))?;
		peer.addrs.insert(addr, true);
		self.add_trigger(Trigger::SyncPeer(vk.to_string()));
		Ok(())
	}

	pub fn peer_addr_del(&mut self, vk: &str, addr: IpAddr) -> Result<()> {
		self.add_action("PeerAddrDel", &[vk, &addr.to_string()]);

		let peer = self.state.peers.get_mut(vk).ok_or_else(|| not_found(vk))?;
		peer.addrs.remove(&addr);
		self.add_trigger(Trigger::SyncPeer(vk.to_string()));
		self.add_trigger(Trigger::RemoveRoutes(vec![host_prefix(addr)]));
		Ok(())
	}

	pub fn verify_and_pin_peer(&mut self, vk: &str, hostname: &str) -> Result<()> {
		self.add_action("VerifyAndPinPeer", &[vk, hostname]);

		let id = queries::with_hostname(&self.state.peers, hostname)?.id();
		if id != vk {
			return Err(OrganizeError::InvalidValue(format!(
				"verify key mismatch for {hostname}: expected {vk}, have {id}"
			)));
		}

		let peer = self.state.peers.get_mut(&id).ok_or_else(|| not_found(&id))?;
		peer.verified = true;
		peer.pinned = true;
		Ok(())
	}

	pub fn release_gateway(&mut self) -> Result<()> {
		self.add_action("ReleaseGateway", &[]);

		let gateway_ids = queries::gateway_ids(&self.state.peers);
		let Some(id) = gateway_ids.first() else {
			self.add_message("no current gateway peer");
			return Ok(());
		};
		if let Some(peer) = self.state.peers.get_mut(id) {
			peer.use_as_gateway = false;
		}
		self.add_trigger(Trigger::GetNewSystemState);
		Ok(())
	}

	/// §4.6: reconcile gateway designation with a fresh sample, re-run
	/// update-peer everywhere, then swap the sample in.
	pub fn adjust_to_new_system_state(&mut self, next: SystemState) -> Result<()> {
		self.add_action("AdjustToNewSystemState", &[]);

		let gateway_ids = queries::gateway_ids(&self.state.peers);
		if let Some(id) = gateway_ids.first() {
			let peer = self.state.peers.get(id).ok_or_else(|| not_found(id))?;
			let still_gateway = peer
				.enabled_ips()
				.iter()
				.any(|ip| next.gateways.contains(ip));
			if !peer.pinned && !still_gateway {
				// a non-pinned peer stops being the gateway the moment its
				// address is no longer a default-route hop
				if let Some(peer) = self.state.peers.get_mut(id) {
					peer.use_as_gateway = false;
				}
				self.add_trigger(Trigger::RemoveRoutes(GATEWAY_ROUTES.to_vec()));
			}
		}

		let pinned_gateway = gateway_ids
			.first()
			.and_then(|id| self.state.peers.get(id))
			.map(|p| p.pinned)
			.unwrap_or(false);
		if !pinned_gateway {
			// first hit wins; multiple default routes elect a single peer
			for gateway in next.gateways.clone() {
				let hit = queries::with_enabled_ip(&self.state.peers, &gateway)
					.map(|(id, _)| id.clone());
				if let Some(id) = hit {
					if let Some(peer) = self.state.peers.get_mut(&id) {
						peer.use_as_gateway = true;
					}
					self.add_trigger(Trigger::SyncPeer(id));
					break;
				}
			}
		}

		let ids: Vec<String> = self.state.peers.keys().cloned().collect();
		for id in ids {
			self.update_peer(&id, None, Some(&next))?;
		}

		self.state.system_state = next;
		Ok(())
	}

	/// Structured edit against the state tree by dotted path.
	pub fn edit(&mut self, op: EditOp, path: &[String], value: &str) -> Result<()> {
		self.add_action("Edit", &[&op.to_string(), &path.join(", "), value]);

		self.state = edit::apply(&self.state, op, path, value)?;

		if path.len() > 1 && path[0] == "peers" {
			self.update_peer(&path[1].clone(), None, None)?;
		} else if path.first().map(String::as_str) == Some("prefs") {
			self.add_trigger(Trigger::GetNewSystemState);
		}
		self.add_trigger(Trigger::RemoveUnknown);
		Ok(())
	}
}

fn not_found(id: &str) -> OrganizeError {
	OrganizeError::PeerNotFound {
		key: "vk",
		value: id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;

	fn base_state() -> OrganizeState {
		let mut state = OrganizeState::new();
		state.system_state.our_wg_pk = vec![0xaa; 32];
		state.system_state.current_subnets.insert(
			"10.0.0.0/24".parse().unwrap(),
			vec!["10.0.0.1".parse().unwrap()],
		);
		state
	}

	fn descriptor(vk: u8, wg: u8, hostname: &str, addr: &str, valid_start: i64) -> Descriptor {
		let mut d = Descriptor::default();
		d.verify_key = vec![vk; 32];
		d.wg_pk = vec![wg; 32];
		d.pq_pk = vec![9; 64];
		d.hostname = hostname.to_string();
		d.port = 5354;
		d.valid_start = valid_start;
		d.valid_duration = 86400;
		match addr.parse::<IpAddr>().unwrap() {
			IpAddr::V4(a) => d.v4_addrs.push(a),
			IpAddr::V6(a) => d.v6_addrs.push(a),
		}
		d
	}

	fn vk_id(vk: u8) -> String {
		STANDARD.encode([vk; 32])
	}

	#[test]
	fn pipeline_accepts_a_fresh_local_descriptor() {
		let mut t = Transaction::new(base_state());
		let now = 1000;
		t.incoming_descriptor(descriptor(1, 11, "new.local.", "10.0.0.7", now), now)
			.unwrap();

		let peer = t.state.peers.get(&vk_id(1)).expect("peer accepted");
		assert!(peer.enabled);
		assert!(peer.nicknames["new.local."]);
		assert!(peer.addrs[&"10.0.0.7".parse::<IpAddr>().unwrap()]);
		assert!(t
			.triggers
			.iter()
			.any(|tr| matches!(tr, Trigger::SyncPeer(id) if *id == vk_id(1))));
	}

	#[test]
	fn pipeline_ignores_our_own_key() {
		let mut t = Transaction::new(base_state());
		let mut d = descriptor(1, 11, "self.local.", "10.0.0.7", 1000);
		d.wg_pk = vec![0xaa; 32];
		t.incoming_descriptor(d, 1000).unwrap();
		assert!(t.state.peers.is_empty());
	}

	#[test]
	fn pipeline_rejects_stale_descriptors() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "old.local.", "10.0.0.7", 100), 1000)
			.unwrap();
		assert!(t.state.peers.is_empty());
	}

	#[test]
	fn replay_with_older_valid_start_is_a_no_op() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.7", 2000), 1000)
			.unwrap();
		// same peer, earlier valid_start
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.8", 1500), 1000)
			.unwrap();

		let peer = &t.state.peers[&vk_id(1)];
		assert_eq!(peer.descriptor.valid_start, 2000);
		assert!(!peer.addrs.contains_key(&"10.0.0.8".parse::<IpAddr>().unwrap()));
	}

	#[test]
	fn newer_descriptor_updates_the_peer() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.7", 1000), 1000)
			.unwrap();
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.8", 2000), 1000)
			.unwrap();

		let peer = &t.state.peers[&vk_id(1)];
		assert_eq!(peer.descriptor.valid_start, 2000);
		assert!(peer.addrs[&"10.0.0.8".parse::<IpAddr>().unwrap()]);
		// old address no longer advertised and peer is not pinned
		assert!(!peer.addrs.contains_key(&"10.0.0.7".parse::<IpAddr>().unwrap()));
	}

	#[test]
	fn pipeline_rejects_wrong_subnet() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "far.local.", "192.0.2.7", 1000), 1000)
			.unwrap();
		assert!(t.state.peers.is_empty());
	}

	#[test]
	fn pipeline_rejects_foreign_domain() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "host.example.com", "10.0.0.7", 1000), 1000)
			.unwrap();
		assert!(t.state.peers.is_empty());
	}

	#[test]
	fn conflicting_unpinned_peer_is_replaced() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "name.local.", "10.0.0.7", 1000), 1000)
			.unwrap();
		// different identity, same hostname and address
		t.incoming_descriptor(descriptor(2, 12, "name.local.", "10.0.0.7", 1000), 1000)
			.unwrap();

		assert!(!t.state.peers.contains_key(&vk_id(1)));
		let peer = &t.state.peers[&vk_id(2)];
		assert!(peer.enabled);
		// conflict resolution: no other enabled peer holds the name or key
		assert_eq!(t.state.peers.len(), 1);
	}

	#[test]
	fn conflicting_pinned_peer_wins() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "name.local.", "10.0.0.7", 1000), 1000)
			.unwrap();
		t.state.peers.get_mut(&vk_id(1)).unwrap().pinned = true;

		t.incoming_descriptor(descriptor(2, 12, "name.local.", "10.0.0.7", 1000), 1000)
			.unwrap();

		assert!(t.state.peers.contains_key(&vk_id(1)));
		assert!(!t.state.peers.contains_key(&vk_id(2)));
	}

	#[test]
	fn ephemeral_descriptor_is_never_pinned() {
		let mut state = base_state();
		state.prefs.pin_new_peers = true;
		let mut t = Transaction::new(state);

		let mut d = descriptor(1, 11, "eph.local.", "10.0.0.7", 1000);
		d.ephemeral = true;
		t.incoming_descriptor(d, 1000).unwrap();
		assert!(!t.state.peers[&vk_id(1)].pinned);

		t.incoming_descriptor(descriptor(2, 12, "durable.local.", "10.0.0.8", 1000), 1000)
			.unwrap();
		assert!(t.state.peers[&vk_id(2)].pinned);
	}

	#[test]
	fn addr_add_then_del_round_trips() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.7", 1000), 1000)
			.unwrap();
		let id = vk_id(1);
		let extra: IpAddr = "10.0.0.99".parse().unwrap();

		t.peer_addr_add(&id, extra).unwrap();
		assert!(t.state.peers[&id].addrs[&extra]);

		t.peer_addr_del(&id, extra).unwrap();
		assert!(!t.state.peers[&id].addrs.contains_key(&extra));
		assert!(t
			.triggers
			.iter()
			.any(|tr| matches!(tr, Trigger::RemoveRoutes(routes) if routes.contains(&"10.0.0.99/32".parse().unwrap()))));
	}

	#[test]
	fn addr_ops_on_unknown_peer_fail() {
		let mut t = Transaction::new(base_state());
		let err = t.peer_addr_add("missing", "10.0.0.1".parse().unwrap()).unwrap_err();
		assert!(matches!(err, OrganizeError::PeerNotFound { .. }));
	}

	#[test]
	fn verify_and_pin_checks_the_key() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.7", 1000), 1000)
			.unwrap();

		assert!(t.verify_and_pin_peer(&vk_id(2), "a.local.").is_err());
		let peer = &t.state.peers[&vk_id(1)];
		assert!(!peer.verified && !peer.pinned);

		t.verify_and_pin_peer(&vk_id(1), "a.local.").unwrap();
		let peer = &t.state.peers[&vk_id(1)];
		assert!(peer.verified && peer.pinned);
	}

	#[test]
	fn pinned_peer_survives_subnet_change() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.7", 1000), 1000)
			.unwrap();
		t.state.peers.get_mut(&vk_id(1)).unwrap().pinned = true;

		let mut next = SystemState::default();
		next.current_subnets.insert(
			"192.168.1.0/24".parse().unwrap(),
			vec!["192.168.1.1".parse().unwrap()],
		);
		t.adjust_to_new_system_state(next).unwrap();

		let peer = &t.state.peers[&vk_id(1)];
		assert!(peer.addrs[&"10.0.0.7".parse::<IpAddr>().unwrap()]);
	}

	#[test]
	fn unpinned_peer_is_dropped_when_unreachable() {
		// the peer's subnet is neither current (after the change) nor in
		// the allowed list, so nothing keeps it alive
		let mut state = base_state();
		state.system_state.current_subnets.insert(
			"203.0.113.0/24".parse().unwrap(),
			vec!["203.0.113.1".parse().unwrap()],
		);
		let mut t = Transaction::new(state);
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "203.0.113.7", 1000), 1000)
			.unwrap();
		assert!(t.state.peers.contains_key(&vk_id(1)));

		let mut next = SystemState::default();
		next.current_subnets.insert(
			"192.168.1.0/24".parse().unwrap(),
			vec!["192.168.1.1".parse().unwrap()],
		);
		t.adjust_to_new_system_state(next).unwrap();

		assert!(t.state.peers.is_empty());
		assert!(t
			.triggers
			.iter()
			.any(|tr| matches!(tr, Trigger::RemoveWgPeer(pk) if *pk == vec![11u8; 32])));
	}

	#[test]
	fn unpinned_peer_in_allowed_subnet_survives_network_change() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "a.local.", "10.0.0.7", 1000), 1000)
			.unwrap();

		let mut next = SystemState::default();
		next.current_subnets.insert(
			"192.168.1.0/24".parse().unwrap(),
			vec!["192.168.1.1".parse().unwrap()],
		);
		t.adjust_to_new_system_state(next).unwrap();

		// 10.0.0.0/8 is in the default allowed subnets
		assert!(t.state.peers[&vk_id(1)].addrs[&"10.0.0.7".parse::<IpAddr>().unwrap()]);
	}

	#[test]
	fn gateway_follows_default_route_to_a_peer() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "gw.local.", "10.0.0.7", 1000), 1000)
			.unwrap();

		let mut next = base_state().system_state;
		next.gateways = vec!["10.0.0.7".parse().unwrap()];
		t.adjust_to_new_system_state(next).unwrap();

		assert!(t.state.peers[&vk_id(1)].use_as_gateway);
	}

	#[test]
	fn unpinned_gateway_loses_flag_when_route_moves() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "gw.local.", "10.0.0.7", 1000), 1000)
			.unwrap();
		t.state.peers.get_mut(&vk_id(1)).unwrap().use_as_gateway = true;

		let mut next = base_state().system_state;
		next.gateways = vec!["10.0.0.200".parse().unwrap()];
		t.adjust_to_new_system_state(next).unwrap();

		assert!(!t.state.peers[&vk_id(1)].use_as_gateway);
		assert!(t
			.triggers
			.iter()
			.any(|tr| matches!(tr, Trigger::RemoveRoutes(routes) if routes.len() == 4)));
	}

	#[test]
	fn release_gateway_clears_flag_and_resamples() {
		let mut t = Transaction::new(base_state());
		t.incoming_descriptor(descriptor(1, 11, "gw.local.", "10.0.0.7", 1000), 1000)
			.unwrap();
		t.state.peers.get_mut(&vk_id(1)).unwrap().use_as_gateway = true;

		t.release_gateway().unwrap();
		assert!(!t.state.peers[&vk_id(1)].use_as_gateway);
		assert!(t.triggers.contains(&Trigger::GetNewSystemState));
	}

	#[test]
	fn release_gateway_without_gateway_is_harmless() {
		let mut t = Transaction::new(base_state());
		t.release_gateway().unwrap();
		assert!(t.messages.iter().any(|m| m.contains("no current gateway")));
	}
}
