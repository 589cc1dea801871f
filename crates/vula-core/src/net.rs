// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::IpNet;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// True for 169.254.0.0/16 and fe80::/10 addresses.
pub fn is_link_local(addr: &IpAddr) -> bool {
	match addr {
		IpAddr::V4(a) => a.is_link_local(),
		IpAddr::V6(a) => (a.segments()[0] & 0xffc0) == 0xfe80,
	}
}

/// Sorts addresses link-local first, then v6 before v4. The sort is stable,
/// so advertised order survives within each class.
pub fn sort_ll_first(addrs: &mut [IpAddr]) {
	addrs.sort_by_key(|addr| (!is_link_local(addr), !addr.is_ipv6()));
}

/// The subset of `addrs` contained in at least one of the given subnets.
pub fn addrs_in_subnets(addrs: &[IpAddr], subnets: &BTreeMap<IpNet, Vec<IpAddr>>) -> Vec<IpAddr> {
	addrs
		.iter()
		.filter(|addr| subnets.keys().any(|subnet| subnet.contains(*addr)))
		.copied()
		.collect()
}

/// The host prefix (/32 or /128) covering exactly this address.
pub fn host_prefix(addr: IpAddr) -> IpNet {
	match addr {
		IpAddr::V4(a) => IpNet::V4(ipnet::Ipv4Net::new(a, 32).unwrap()),
		IpAddr::V6(a) => IpNet::V6(ipnet::Ipv6Net::new(a, 128).unwrap()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ip(s: &str) -> IpAddr {
		s.parse().unwrap()
	}

	#[test]
	fn sort_puts_link_local_first_then_v6() {
		let mut addrs = vec![
			ip("169.254.0.1"),
			ip("127.0.0.1"),
			ip("ff00::1"),
			ip("169.254.0.2"),
			ip("fe80::1"),
			ip("::1"),
		];
		sort_ll_first(&mut addrs);
		let expected: Vec<IpAddr> = [
			"fe80::1",
			"169.254.0.1",
			"169.254.0.2",
			"ff00::1",
			"::1",
			"127.0.0.1",
		]
		.iter()
		.map(|s| ip(s))
		.collect();
		assert_eq!(addrs, expected);
	}

	#[test]
	fn addrs_in_subnets_filters_by_containment() {
		let mut subnets = BTreeMap::new();
		subnets.insert("10.0.0.0/24".parse().unwrap(), vec![ip("10.0.0.9")]);
		subnets.insert("fe80::/10".parse().unwrap(), vec![ip("fe80::1")]);

		let addrs = vec![ip("10.0.0.7"), ip("10.0.5.21"), ip("fe80::2")];
		assert_eq!(
			addrs_in_subnets(&addrs, &subnets),
			vec![ip("10.0.0.7"), ip("fe80::2")]
		);
	}

	#[test]
	fn host_prefix_is_full_length() {
		assert_eq!(host_prefix(ip("10.0.0.1")).to_string(), "10.0.0.1/32");
		assert_eq!(host_prefix(ip("fe80::1")).to_string(), "fe80::1/128");
	}
}
