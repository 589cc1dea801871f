// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::IpNet;
use std::sync::LazyLock;

/// The main routing table on Linux.
pub const MAIN_ROUTING_TABLE: u32 = 254;

/// Companion dummy link carrying the primary IP.
pub const DUMMY_LINK_NAME: &str = "vula-net";

/// Base directory that owns all organizer files. The atomic writer refuses
/// to write anywhere else.
pub const ORGANIZE_LIB_DIR: &str = "/var/lib/vula-organize";

pub const DEFAULT_STATE_FILE: &str = "/var/lib/vula-organize/vula-organize.yaml";
pub const DEFAULT_KEYS_FILE: &str = "/var/lib/vula-organize/keys.yaml";
pub const DEFAULT_HOSTS_FILE: &str = "/var/lib/vula-organize/hosts";

/// Unix socket carrying the organizer's IPC surface.
pub const DEFAULT_ORGANIZE_SOCKET: &str = "/run/vula/organize.sock";
pub const DEFAULT_DISCOVER_SOCKET: &str = "/run/vula/discover.sock";
pub const DEFAULT_PUBLISH_SOCKET: &str = "/run/vula/publish.sock";

pub const DEFAULT_INTERFACE: &str = "vula";
pub const DEFAULT_ROUTING_TABLE: u32 = 666;
pub const DEFAULT_FWMARK: u32 = 555;
pub const DEFAULT_IP_RULE_PRIORITY: u32 = 666;
pub const DEFAULT_WG_PORT: u16 = 5354;

/// mDNS service type and domain for descriptor announcements.
pub const MDNS_SERVICE_TYPE: &str = "_opabinia._udp.local.";

pub const SYSTEMD_UNITS: [&str; 3] = [
	"vula-publish.service",
	"vula-discover.service",
	"vula-organize.service",
];

/// The ULA subnet holding every node's stable primary IP.
pub static VULA_SUBNET: LazyLock<IpNet> =
	LazyLock::new(|| "fdff:ffff:ffdf::/48".parse().unwrap());

/// The four half-internet prefixes installed for a gateway peer.
pub static GATEWAY_ROUTES: LazyLock<[IpNet; 4]> = LazyLock::new(|| {
	[
		"0.0.0.0/1".parse().unwrap(),
		"128.0.0.0/1".parse().unwrap(),
		"::/1".parse().unwrap(),
		"8000::/1".parse().unwrap(),
	]
});

pub static IPV4_LINK_LOCAL: LazyLock<IpNet> =
	LazyLock::new(|| "169.254.0.0/16".parse().unwrap());
pub static IPV6_LINK_LOCAL: LazyLock<IpNet> = LazyLock::new(|| "fe80::/10".parse().unwrap());
pub static IPV6_ULA: LazyLock<IpNet> = LazyLock::new(|| "fc00::/7".parse().unwrap());

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vula_subnet_contains_primary_ips() {
		assert!(VULA_SUBNET.contains(&"fdff:ffff:ffdf::1".parse::<std::net::IpAddr>().unwrap()));
		assert!(!VULA_SUBNET.contains(&"fd00::1".parse::<std::net::IpAddr>().unwrap()));
	}

	#[test]
	fn gateway_routes_cover_both_families() {
		let v4 = GATEWAY_ROUTES.iter().filter(|n| matches!(n, IpNet::V4(_))).count();
		let v6 = GATEWAY_ROUTES.iter().filter(|n| matches!(n, IpNet::V6(_))).count();
		assert_eq!((v4, v6), (2, 2));
	}
}
