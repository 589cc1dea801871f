// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::constants::VULA_SUBNET;
use crate::descriptor::Descriptor;
use crate::net::{host_prefix, is_link_local, sort_ll_first};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

/// The organizer's view of another host: its current descriptor plus local
/// decoration. Addresses are curated from the descriptor and any locally
/// added ones, each individually enabled or disabled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Peer {
	pub descriptor: Descriptor,

	#[serde(default)]
	pub petname: String,

	#[serde(default)]
	pub nicknames: BTreeMap<String, bool>,

	#[serde(default)]
	pub addrs: BTreeMap<IpAddr, bool>,

	pub enabled: bool,

	#[serde(default)]
	pub verified: bool,

	#[serde(default)]
	pub pinned: bool,

	#[serde(default)]
	pub use_as_gateway: bool,
}

impl Peer {
	/// Builds a fresh peer from an accepted descriptor: enabled, with the
	/// hostname as its only nickname and every advertised address enabled.
	pub fn from_descriptor(descriptor: Descriptor) -> Self {
		let nicknames = BTreeMap::from([(descriptor.hostname.clone(), true)]);
		let addrs = descriptor.addrs().into_iter().map(|a| (a, true)).collect();
		Self {
			descriptor,
			petname: String::new(),
			nicknames,
			addrs,
			enabled: true,
			verified: false,
			pinned: false,
			use_as_gateway: false,
		}
	}

	pub fn id(&self) -> String {
		self.descriptor.id()
	}

	/// Display name: petname if set, else the hostname when it is an enabled
	/// nickname, else the first enabled nickname in sorted order.
	pub fn name(&self) -> String {
		if !self.petname.is_empty() {
			return self.petname.clone();
		}
		if self.nicknames.get(&self.descriptor.hostname).copied().unwrap_or(false) {
			return self.descriptor.hostname.clone();
		}
		self.enabled_names()
			.into_iter()
			.next()
			.unwrap_or_else(|| "<unnamed>".to_string())
	}

	pub fn name_and_id(&self) -> String {
		format!("{} ({})", self.name(), self.id())
	}

	/// All enabled names in sorted order, petname included.
	pub fn enabled_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self
			.nicknames
			.iter()
			.filter(|(_, enabled)| **enabled)
			.map(|(name, _)| name.clone())
			.collect();
		if !self.petname.is_empty() && !names.contains(&self.petname) {
			names.push(self.petname.clone());
		}
		names.sort();
		names
	}

	/// Enabled names other than the display name, sorted.
	pub fn other_names(&self) -> Vec<String> {
		let name = self.name();
		self.enabled_names().into_iter().filter(|n| *n != name).collect()
	}

	/// Addresses with the given enabled flag. When asking for enabled
	/// addresses the descriptor's primary IP is included.
	pub fn ips(&self, enabled: bool) -> Vec<IpAddr> {
		let mut ips = Vec::new();
		if enabled {
			if let Some(primary) = self.descriptor.primary_ip {
				ips.push(primary);
			}
		}
		ips.extend(
			self.addrs
				.iter()
				.filter(|(_, on)| **on == enabled)
				.map(|(addr, _)| *addr),
		);
		ips
	}

	pub fn enabled_ips(&self) -> Vec<IpAddr> {
		self.ips(true)
	}

	/// Routable addresses: enabled addresses excluding v6 link-local.
	pub fn routable_ips(&self) -> Vec<IpAddr> {
		self.enabled_ips()
			.into_iter()
			.filter(|ip| !(ip.is_ipv6() && is_link_local(ip)))
			.collect()
	}

	/// One host route per routable address.
	pub fn routes(&self) -> Vec<IpNet> {
		self.routable_ips().into_iter().map(host_prefix).collect()
	}

	/// WireGuard allowed-IPs: the host routes, plus both default prefixes
	/// when this peer is the gateway.
	pub fn wg_allowed_ips(&self) -> Vec<IpNet> {
		let mut nets = self.routes();
		if self.use_as_gateway {
			nets.push("0.0.0.0/0".parse().unwrap());
			nets.push("::/0".parse().unwrap());
		}
		nets
	}

	/// Endpoint address selection: the first enabled non-ULA address after
	/// the link-local-first sort.
	pub fn endpoint_addr(&self) -> Option<IpAddr> {
		let mut addrs: Vec<IpAddr> = self
			.enabled_ips()
			.into_iter()
			.filter(|addr| !VULA_SUBNET.contains(addr))
			.collect();
		sort_ll_first(&mut addrs);
		addrs.first().copied()
	}

	pub fn endpoint(&self) -> Option<SocketAddr> {
		self.endpoint_addr()
			.map(|addr| SocketAddr::new(addr, self.descriptor.port))
	}
}
