// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::constants::{IPV4_LINK_LOCAL, IPV6_LINK_LOCAL, IPV6_ULA};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Operator policy. Edited only by user events; every edit is re-validated
/// before commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prefs {
	pub pin_new_peers: bool,
	pub auto_repair: bool,
	pub subnets_allowed: Vec<IpNet>,
	pub subnets_forbidden: Vec<IpNet>,
	pub iface_prefix_allowed: Vec<String>,
	pub accept_nonlocal: bool,
	pub local_domains: Vec<String>,
	pub ephemeral_mode: bool,
	pub accept_default_route: bool,
	pub overwrite_unpinned: bool,
	/// Seconds a descriptor is retained past its validity, reserved for the
	/// expiry sweep.
	pub expire_time: u64,
	#[serde(default)]
	pub primary_ip: Option<IpAddr>,
	pub record_events: bool,
	pub enable_ipv6: bool,
	pub enable_ipv4: bool,
}

impl Default for Prefs {
	fn default() -> Self {
		Self {
			pin_new_peers: false,
			auto_repair: true,
			subnets_allowed: vec![
				*IPV6_LINK_LOCAL,
				*IPV6_ULA,
				*IPV4_LINK_LOCAL,
				"10.0.0.0/8".parse().unwrap(),
				"192.168.0.0/16".parse().unwrap(),
				"172.16.0.0/12".parse().unwrap(),
			],
			subnets_forbidden: vec![],
			iface_prefix_allowed: vec![
				"en".into(),
				"eth".into(),
				"wl".into(),
				"thunderbolt".into(),
			],
			accept_nonlocal: false,
			local_domains: vec!["local.".into()],
			ephemeral_mode: false,
			accept_default_route: true,
			overwrite_unpinned: true,
			expire_time: 3600,
			primary_ip: None,
			record_events: false,
			enable_ipv6: true,
			enable_ipv4: true,
		}
	}
}
