// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Queries over the peer map. These are pure; they never mutate.

use crate::error::{OrganizeError, Result};
use std::collections::BTreeMap;
use std::net::IpAddr;
use vula_core::{Descriptor, Peer};

pub type PeerMap = BTreeMap<String, Peer>;

/// The enabled peer carrying `name` as a nickname.
pub fn with_hostname<'a>(peers: &'a PeerMap, name: &str) -> Result<&'a Peer> {
	peers
		.values()
		.find(|p| p.enabled && p.nicknames.contains_key(name))
		.ok_or_else(|| OrganizeError::PeerNotFound {
			key: "hostname",
			value: name.to_string(),
		})
}

/// Peers currently flagged as gateway. More than one is possible only
/// transiently; callers take the first.
pub fn gateways(peers: &PeerMap) -> Vec<&Peer> {
	peers.values().filter(|p| p.use_as_gateway).collect()
}

pub fn gateway_ids(peers: &PeerMap) -> Vec<String> {
	peers
		.iter()
		.filter(|(_, p)| p.use_as_gateway)
		.map(|(id, _)| id.clone())
		.collect()
}

/// The peer with `ip` among its enabled addresses, if any.
pub fn with_enabled_ip<'a>(peers: &'a PeerMap, ip: &IpAddr) -> Option<(&'a String, &'a Peer)> {
	peers
		.iter()
		.find(|(_, p)| p.addrs.get(ip).copied().unwrap_or(false))
}

pub fn enabled(peers: &PeerMap) -> PeerMap {
	peers
		.iter()
		.filter(|(_, p)| p.enabled)
		.map(|(id, p)| (id.clone(), p.clone()))
		.collect()
}

pub fn ids_matching(peers: &PeerMap, which: &str) -> Result<Vec<String>> {
	let filter: fn(&Peer) -> bool = match which {
		"enabled" => |p| p.enabled,
		"disabled" => |p| !p.enabled,
		"all" => |_| true,
		other => return Err(OrganizeError::UnknownFilter(other.to_string())),
	};
	Ok(peers
		.iter()
		.filter(|(_, p)| filter(p))
		.map(|(id, _)| id.clone())
		.collect())
}

/// Enabled peers (other than the descriptor's own) sharing a hostname,
/// WireGuard key, or address with the descriptor.
pub fn conflicts_for_descriptor<'a>(peers: &'a PeerMap, descriptor: &Descriptor) -> Vec<&'a str> {
	let descriptor_addrs = descriptor.addrs();
	let mut hits: Vec<&str> = Vec::new();

	for (id, peer) in peers {
		if !peer.enabled || peer.descriptor.verify_key == descriptor.verify_key {
			continue;
		}

		let hostname_clash = peer
			.enabled_names()
			.iter()
			.any(|name| *name == descriptor.hostname);
		let wg_pk_clash = peer.descriptor.wg_pk == descriptor.wg_pk;
		let addr_clash = descriptor_addrs.iter().any(|a| peer.addrs.contains_key(a));

		if hostname_clash || wg_pk_clash || addr_clash {
			hits.push(id.as_str());
		}
	}
	hits
}

/// Query by exact ID, then enabled nickname, then enabled IP string.
/// More than one match is an invariant violation.
pub fn query<'a>(peers: &'a PeerMap, query: &str) -> Result<Option<&'a Peer>> {
	if let Some(peer) = peers.get(query) {
		return Ok(Some(peer));
	}

	let by_name: Vec<&Peer> = peers
		.values()
		.filter(|p| p.enabled && p.enabled_names().iter().any(|n| n == query))
		.collect();
	if !by_name.is_empty() {
		return unique(by_name, query);
	}

	let by_ip: Vec<&Peer> = peers
		.values()
		.filter(|p| {
			p.enabled && p.enabled_ips().iter().any(|ip| ip.to_string() == query)
		})
		.collect();
	if !by_ip.is_empty() {
		return unique(by_ip, query);
	}

	Ok(None)
}

fn unique<'a>(matches: Vec<&'a Peer>, query: &str) -> Result<Option<&'a Peer>> {
	if matches.len() > 1 {
		return Err(OrganizeError::Bug(format!(
			"query '{query}' matched {} peers",
			matches.len()
		)));
	}
	Ok(matches.into_iter().next())
}

/// Hosts-file projection: every enabled name of every enabled peer,
/// pointing at that peer's first advertised address.
pub fn hosts_entries(peers: &PeerMap) -> Vec<(String, String)> {
	let mut entries = Vec::new();
	for peer in peers.values().filter(|p| p.enabled) {
		let Some(first) = peer.descriptor.addrs().first().copied() else {
			continue;
		};
		for name in peer.enabled_names() {
			entries.push((first.to_string(), name));
		}
	}
	entries
}
