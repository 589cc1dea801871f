// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Construction and signing of this node's own service descriptors, one
//! per interface carrying an allowed address.

use crate::error::Result;
use std::collections::BTreeMap;
use std::net::IpAddr;
use vula_core::net::sort_ll_first;
use vula_core::{Descriptor, OrganizeState, Prefs};
use vula_crypto::{sign_descriptor, Keys};

const DESCRIPTOR_VALIDITY_SECS: i64 = 86400;

/// What the mDNS daemons should do right now: addresses to browse on and
/// one signed descriptor per announcing interface.
#[derive(Debug, Default)]
pub struct AnnouncementPlan {
	pub discover_ips: Vec<String>,
	pub announcements: BTreeMap<String, String>,
}

/// Builds the plan from the current system state: for every interface,
/// filter its addresses against the allowed subnets, and announce a signed
/// descriptor when any remain.
pub fn announcement_plan(
	keys: &Keys,
	state: &OrganizeState,
	hostname: &str,
	port: u16,
	valid_from: i64,
) -> Result<AnnouncementPlan> {
	let mut plan = AnnouncementPlan::default();

	for (interface, addrs) in &state.system_state.current_interfaces {
		let mut allowed: Vec<IpAddr> = addrs
			.iter()
			.filter(|addr| {
				state
					.prefs
					.subnets_allowed
					.iter()
					.any(|net| net.contains(*addr))
			})
			.copied()
			.collect();
		if allowed.is_empty() {
			continue;
		}

		plan.discover_ips.extend(allowed.iter().map(|a| a.to_string()));
		sort_ll_first(&mut allowed);

		let mut descriptor =
			build_descriptor(keys, &state.prefs, hostname, port, &allowed, valid_from);
		sign_descriptor(&mut descriptor, keys.ed25519_sk.expose())?;
		plan.announcements.insert(
			interface.clone(),
			vula_codec::serialize_descriptor(&descriptor),
		);
	}

	Ok(plan)
}

fn build_descriptor(
	keys: &Keys,
	prefs: &Prefs,
	hostname: &str,
	port: u16,
	addrs: &[IpAddr],
	valid_from: i64,
) -> Descriptor {
	let addrs: Vec<IpAddr> = addrs
		.iter()
		.filter(|addr| match addr {
			IpAddr::V4(_) => prefs.enable_ipv4,
			IpAddr::V6(_) => prefs.enable_ipv6,
		})
		.copied()
		.collect();

	let mut descriptor = Descriptor {
		primary_ip: prefs.primary_ip,
		wg_pk: keys.wg_pk.clone(),
		pq_pk: keys.pq_pk.clone(),
		verify_key: keys.ed25519_pk.clone(),
		valid_start: valid_from,
		valid_duration: DESCRIPTOR_VALIDITY_SECS,
		port,
		hostname: hostname.to_string(),
		ephemeral: prefs.ephemeral_mode,
		..Descriptor::default()
	};
	descriptor.set_addrs(&addrs);
	descriptor
}

#[cfg(test)]
mod tests {
	use super::*;
	use vula_core::OrganizeState;
	use vula_crypto::{verify_descriptor, XdhEngine};

	fn state_with_interface(interface: &str, addrs: &[&str]) -> OrganizeState {
		let mut state = OrganizeState::new();
		state.prefs.primary_ip = Some("fdff:ffff:ffdf::1".parse().unwrap());
		state.system_state.current_interfaces.insert(
			interface.to_string(),
			addrs.iter().map(|a| a.parse().unwrap()).collect(),
		);
		state
	}

	#[test]
	fn plan_signs_one_descriptor_per_interface() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let state = state_with_interface("eth0", &["10.0.0.5", "fe80::5"]);

		let plan = announcement_plan(&keys, &state, "me.local.", 5354, 1000).unwrap();
		assert_eq!(plan.announcements.len(), 1);

		let descriptor = vula_codec::parse_descriptor(&plan.announcements["eth0"]).unwrap();
		assert!(verify_descriptor(&descriptor));
		assert_eq!(descriptor.hostname, "me.local.");
		assert_eq!(descriptor.port, 5354);
		assert_eq!(descriptor.valid_start, 1000);
		assert_eq!(descriptor.valid_duration, 86400);
		assert_eq!(descriptor.addrs().len(), 2);
	}

	#[test]
	fn interfaces_without_allowed_addresses_are_skipped() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let state = state_with_interface("eth0", &["203.0.113.5"]);

		let plan = announcement_plan(&keys, &state, "me.local.", 5354, 1000).unwrap();
		assert!(plan.announcements.is_empty());
		assert!(plan.discover_ips.is_empty());
	}

	#[test]
	fn v4_only_pref_drops_v6_addresses() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let mut state = state_with_interface("eth0", &["10.0.0.5", "fe80::5"]);
		state.prefs.enable_ipv6 = false;

		let plan = announcement_plan(&keys, &state, "me.local.", 5354, 1000).unwrap();
		let descriptor = vula_codec::parse_descriptor(&plan.announcements["eth0"]).unwrap();
		assert_eq!(descriptor.v6_addrs.len(), 0);
		assert_eq!(descriptor.v4_addrs.len(), 1);
	}

	#[test]
	fn ephemeral_mode_marks_descriptors() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let mut state = state_with_interface("eth0", &["10.0.0.5"]);
		state.prefs.ephemeral_mode = true;

		let plan = announcement_plan(&keys, &state, "me.local.", 5354, 1000).unwrap();
		let descriptor = vula_codec::parse_descriptor(&plan.announcements["eth0"]).unwrap();
		assert!(descriptor.ephemeral);
	}
}
