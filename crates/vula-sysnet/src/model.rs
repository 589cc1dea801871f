// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Serde views of `ip -json` output. Only the fields vula consumes are
//! declared; everything else is ignored.

use ipnet::IpNet;
use serde::Deserialize;
use std::net::IpAddr;

#[derive(Debug, Deserialize)]
pub struct LinkEntry {
	pub ifname: String,
	#[serde(default)]
	pub operstate: String,
	#[serde(default)]
	pub linkinfo: Option<LinkInfo>,
}

#[derive(Debug, Deserialize)]
pub struct LinkInfo {
	#[serde(default)]
	pub info_kind: String,
}

#[derive(Debug, Deserialize)]
pub struct AddrEntry {
	pub ifname: String,
	#[serde(default)]
	pub addr_info: Vec<AddrInfo>,
}

#[derive(Debug, Deserialize)]
pub struct AddrInfo {
	pub local: IpAddr,
	pub prefixlen: u8,
}

#[derive(Debug, Deserialize)]
pub struct RouteEntry {
	#[serde(default)]
	pub dst: String,
	#[serde(default)]
	pub gateway: Option<IpAddr>,
	#[serde(default)]
	pub dev: Option<String>,
	#[serde(default)]
	pub prefsrc: Option<IpAddr>,
	#[serde(default)]
	pub scope: Option<String>,
}

impl RouteEntry {
	/// The destination as a prefix. `default` maps to the zero prefix of
	/// the route's family; bare addresses get their host prefix length.
	pub fn dst_prefix(&self, v6_table: bool) -> Option<IpNet> {
		if self.dst == "default" {
			let net = if v6_table { "::/0" } else { "0.0.0.0/0" };
			return net.parse().ok();
		}
		if let Ok(net) = self.dst.parse::<IpNet>() {
			return Some(net.trunc());
		}
		if let Ok(addr) = self.dst.parse::<IpAddr>() {
			return Some(vula_core::net::host_prefix(addr));
		}
		None
	}
}

#[derive(Debug, Deserialize)]
pub struct RuleEntry {
	#[serde(default)]
	pub priority: u32,
	#[serde(default)]
	pub fwmark: Option<String>,
	#[serde(default)]
	pub table: Option<String>,
	#[serde(default, rename = "not")]
	pub inverted: bool,
}

impl RuleEntry {
	pub fn fwmark_value(&self) -> Option<u32> {
		let raw = self.fwmark.as_deref()?;
		if let Some(hex) = raw.strip_prefix("0x") {
			u32::from_str_radix(hex, 16).ok()
		} else {
			raw.parse().ok()
		}
	}

	pub fn table_id(&self) -> Option<u32> {
		match self.table.as_deref()? {
			"local" => Some(255),
			"main" => Some(254),
			"default" => Some(253),
			other => other.parse().ok(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_addr_dump() {
		let json = r#"[
			{"ifindex":1,"ifname":"lo","flags":["LOOPBACK","UP"],
			 "addr_info":[{"family":"inet","local":"127.0.0.1","prefixlen":8,"scope":"host"}]},
			{"ifindex":2,"ifname":"eth0","flags":["BROADCAST","UP"],
			 "addr_info":[
				{"family":"inet","local":"10.89.0.2","prefixlen":24,"scope":"global"},
				{"family":"inet6","local":"fe80::1","prefixlen":64,"scope":"link"}]}
		]"#;
		let entries: Vec<AddrEntry> = serde_json::from_str(json).unwrap();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[1].ifname, "eth0");
		assert_eq!(entries[1].addr_info.len(), 2);
		assert_eq!(entries[1].addr_info[0].local, "10.89.0.2".parse::<IpAddr>().unwrap());
		assert_eq!(entries[1].addr_info[0].prefixlen, 24);
	}

	#[test]
	fn parse_route_dump() {
		let json = r#"[
			{"dst":"default","gateway":"10.89.0.1","dev":"eth0","protocol":"dhcp","flags":[]},
			{"dst":"10.89.0.0/24","dev":"eth0","protocol":"kernel","scope":"link","prefsrc":"10.89.0.2","flags":[]},
			{"dst":"10.89.0.7","dev":"vula","protocol":"static","scope":"link","flags":[]}
		]"#;
		let entries: Vec<RouteEntry> = serde_json::from_str(json).unwrap();
		assert_eq!(entries[0].gateway, Some("10.89.0.1".parse().unwrap()));
		assert_eq!(entries[0].dst_prefix(false), Some("0.0.0.0/0".parse().unwrap()));
		assert_eq!(entries[1].dst_prefix(false), Some("10.89.0.0/24".parse().unwrap()));
		assert_eq!(entries[2].dst_prefix(false), Some("10.89.0.7/32".parse().unwrap()));
	}

	#[test]
	fn parse_rule_dump() {
		let json = r#"[
			{"priority":0,"src":"all","table":"local"},
			{"priority":666,"src":"all","fwmark":"0x22b","table":"666","not":true},
			{"priority":32766,"src":"all","table":"main"}
		]"#;
		let entries: Vec<RuleEntry> = serde_json::from_str(json).unwrap();
		assert_eq!(entries[0].table_id(), Some(255));
		assert!(entries[1].inverted);
		assert_eq!(entries[1].fwmark_value(), Some(555));
		assert_eq!(entries[1].table_id(), Some(666));
		assert_eq!(entries[2].table_id(), Some(254));
		assert!(!entries[2].inverted);
	}

	#[test]
	fn parse_link_dump() {
		let json = r#"[
			{"ifindex":7,"ifname":"vula","flags":["POINTOPOINT","NOARP","UP"],
			 "operstate":"UNKNOWN","linkinfo":{"info_kind":"wireguard"}}
		]"#;
		let entries: Vec<LinkEntry> = serde_json::from_str(json).unwrap();
		assert_eq!(entries[0].linkinfo.as_ref().unwrap().info_kind, "wireguard");
	}

	#[test]
	fn default_route_in_v6_table() {
		let entry = RouteEntry {
			dst: "default".into(),
			gateway: Some("fe80::1".parse().unwrap()),
			dev: None,
			prefsrc: None,
			scope: None,
		};
		assert_eq!(entry.dst_prefix(true), Some("::/0".parse().unwrap()));
	}
}
