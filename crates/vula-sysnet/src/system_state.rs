// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::ip::run_ip_json;
use crate::model::{AddrEntry, RouteEntry};
use ipnet::IpNet;
use std::net::IpAddr;
use vula_core::constants::VULA_SUBNET;
use vula_core::system::{NetworkSample, SystemStateQuery};

fn subnet_of(addr: IpAddr, prefix_len: u8) -> Option<IpNet> {
	IpNet::new(addr, prefix_len).ok().map(|net| net.trunc())
}

/// One interface address as sampled from the kernel.
#[derive(Clone, Debug)]
pub struct InterfaceAddr {
	pub interface: String,
	pub addr: IpAddr,
	pub prefix_len: u8,
}

pub fn filter_addrs(addrs: &[InterfaceAddr], query: &SystemStateQuery) -> Vec<InterfaceAddr> {
	addrs
		.iter()
		.filter(|entry| match entry.addr {
			IpAddr::V4(_) => query.enable_ipv4,
			IpAddr::V6(_) => query.enable_ipv6,
		})
		.filter(|entry| {
			query
				.iface_prefix_allowed
				.iter()
				.any(|prefix| entry.interface.starts_with(prefix.as_str()))
		})
		.filter(|entry| {
			!query
				.subnets_forbidden
				.iter()
				.any(|net| net.contains(&entry.addr))
		})
		.cloned()
		.collect()
}

/// Derives the sample from address and route dumps: subnet and interface
/// maps filtered by policy, current default-route gateways, and v6
/// availability.
pub fn build_sample(
	addrs: Vec<InterfaceAddr>,
	gateways: Vec<IpAddr>,
	query: &SystemStateQuery,
) -> NetworkSample {
	let mut sample = NetworkSample {
		has_v6: addrs.iter().any(|entry| entry.addr.is_ipv6()),
		gateways,
		..NetworkSample::default()
	};

	for entry in filter_addrs(&addrs, query) {
		let Some(subnet) = subnet_of(entry.addr, entry.prefix_len) else {
			continue;
		};
		sample.current_subnets.entry(subnet).or_default().push(entry.addr);
		sample
			.current_interfaces
			.entry(entry.interface)
			.or_default()
			.push(entry.addr);
	}

	if let Some(primary_ip) = query.primary_ip {
		sample.current_subnets.insert(*VULA_SUBNET, vec![primary_ip]);
	}

	sample
}

pub async fn sample_system_state(query: &SystemStateQuery) -> Result<NetworkSample> {
	let addr_entries: Vec<AddrEntry> = run_ip_json(&["addr", "show"]).await?;
	let mut addrs = Vec::new();
	for entry in addr_entries {
		for info in entry.addr_info {
			addrs.push(InterfaceAddr {
				interface: entry.ifname.clone(),
				addr: info.local,
				prefix_len: info.prefixlen,
			});
		}
	}

	let mut gateways = Vec::new();
	for family in ["-4", "-6"] {
		let routes: Vec<RouteEntry> = run_ip_json(&[family, "route", "show", "table", "all"]).await?;
		for route in routes {
			if let Some(gateway) = route.gateway {
				gateways.push(gateway);
			}
		}
	}

	Ok(build_sample(addrs, gateways, query))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn query() -> SystemStateQuery {
		SystemStateQuery {
			enable_ipv4: true,
			enable_ipv6: true,
			iface_prefix_allowed: vec!["en".into(), "eth".into(), "wl".into()],
			subnets_forbidden: vec![],
			primary_ip: Some("fdff:ffff:ffdf::1".parse().unwrap()),
		}
	}

	fn addr(interface: &str, addr: &str, prefix_len: u8) -> InterfaceAddr {
		InterfaceAddr {
			interface: interface.into(),
			addr: addr.parse().unwrap(),
			prefix_len,
		}
	}

	#[test]
	fn sample_groups_addresses_by_subnet_and_interface() {
		let sample = build_sample(
			vec![
				addr("eth0", "10.89.0.2", 24),
				addr("eth0", "fe80::1", 64),
				addr("wlan0", "192.168.1.5", 24),
			],
			vec!["10.89.0.1".parse().unwrap()],
			&query(),
		);

		assert_eq!(
			sample.current_subnets[&"10.89.0.0/24".parse().unwrap()],
			vec!["10.89.0.2".parse::<IpAddr>().unwrap()]
		);
		assert_eq!(sample.current_interfaces["eth0"].len(), 2);
		assert_eq!(sample.current_interfaces["wlan0"].len(), 1);
		assert_eq!(sample.gateways.len(), 1);
		assert!(sample.has_v6);
	}

	#[test]
	fn loopback_and_unknown_interfaces_are_filtered() {
		let sample = build_sample(
			vec![addr("lo", "127.0.0.1", 8), addr("docker0", "172.17.0.1", 16)],
			vec![],
			&query(),
		);
		assert!(sample.current_subnets.len() == 1); // only the ULA subnet
		assert!(sample.current_interfaces.is_empty());
	}

	#[test]
	fn forbidden_subnets_are_excluded() {
		let mut q = query();
		q.subnets_forbidden.push("192.168.0.0/16".parse().unwrap());
		let sample = build_sample(
			vec![addr("eth0", "192.168.1.5", 24), addr("eth0", "10.0.0.5", 24)],
			vec![],
			&q,
		);
		assert!(!sample
			.current_subnets
			.contains_key(&"192.168.1.0/24".parse().unwrap()));
		assert!(sample.current_subnets.contains_key(&"10.0.0.0/24".parse().unwrap()));
	}

	#[test]
	fn v4_only_query_drops_v6_subnets_but_reports_has_v6() {
		let mut q = query();
		q.enable_ipv6 = false;
		let sample = build_sample(
			vec![addr("eth0", "10.0.0.5", 24), addr("eth0", "fe80::1", 64)],
			vec![],
			&q,
		);
		assert!(sample.has_v6);
		assert!(!sample.current_subnets.contains_key(&"fe80::/64".parse().unwrap()));
	}

	#[test]
	fn primary_ip_lands_in_the_ula_subnet() {
		let sample = build_sample(vec![], vec![], &query());
		assert_eq!(
			sample.current_subnets[&*VULA_SUBNET],
			vec!["fdff:ffff:ffdf::1".parse::<IpAddr>().unwrap()]
		);
	}
}
