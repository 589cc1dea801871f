// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::constants::VULA_SUBNET;
use crate::descriptor::b64;
use crate::peer::Peer;
use crate::prefs::Prefs;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// The parts of the kernel's state relevant to organizer events. Replaced
/// wholesale by the NewSystemState event; never mutated in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemState {
	pub current_subnets: BTreeMap<IpNet, Vec<IpAddr>>,
	pub current_interfaces: BTreeMap<String, Vec<IpAddr>>,
	#[serde(with = "b64")]
	pub our_wg_pk: Vec<u8>,
	pub gateways: Vec<IpAddr>,
	pub has_v6: bool,
}

impl SystemState {
	/// Every currently assigned address, across all subnets.
	pub fn current_ips(&self) -> Vec<IpAddr> {
		self.current_subnets.values().flatten().copied().collect()
	}

	/// Current subnets with the vula ULA overlay subnet removed. Peer
	/// address pruning works against this view so the overlay itself never
	/// keeps a peer alive.
	pub fn current_subnets_no_ula(&self) -> BTreeMap<IpNet, Vec<IpAddr>> {
		self.current_subnets
			.iter()
			.filter(|(prefix, _)| **prefix != *VULA_SUBNET)
			.map(|(prefix, addrs)| (*prefix, addrs.clone()))
			.collect()
	}
}

/// The complete organizer document: policy, peers, the last sampled system
/// state, and the (currently inert, forward-compatible) event log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizeState {
	pub prefs: Prefs,
	#[serde(default)]
	pub peers: BTreeMap<String, Peer>,
	pub system_state: SystemState,
	#[serde(default)]
	pub event_log: Vec<String>,
}

impl OrganizeState {
	pub fn new() -> Self {
		Self {
			prefs: Prefs::default(),
			peers: BTreeMap::new(),
			system_state: SystemState::default(),
			event_log: Vec::new(),
		}
	}
}
