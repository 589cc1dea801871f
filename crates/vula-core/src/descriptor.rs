// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A signed, timestamped advertisement of one host's identity, keys,
/// addresses, and WireGuard listen port.
///
/// Field renames follow the wire keys of the canonical text form, so the
/// persisted YAML and the descriptor string use the same vocabulary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Descriptor {
	/// Stable primary IP inside the vula ULA subnet. Omitted until the
	/// announcing node has generated one.
	#[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
	pub primary_ip: Option<IpAddr>,

	#[serde(rename = "v4a", default)]
	pub v4_addrs: Vec<Ipv4Addr>,

	#[serde(rename = "v6a", default)]
	pub v6_addrs: Vec<Ipv6Addr>,

	/// WireGuard public key (X25519, 32 bytes).
	#[serde(rename = "pk", with = "b64")]
	pub wg_pk: Vec<u8>,

	/// CSIDH-512 public key used for PSK agreement.
	#[serde(rename = "c", with = "b64")]
	pub pq_pk: Vec<u8>,

	pub hostname: String,

	pub port: u16,

	/// Ed25519 verify key. Its base64 encoding is the descriptor (and peer) ID.
	#[serde(rename = "vk", with = "b64")]
	pub verify_key: Vec<u8>,

	/// Validity start, epoch seconds.
	#[serde(rename = "vf")]
	pub valid_start: i64,

	/// Validity duration, seconds.
	#[serde(rename = "dt")]
	pub valid_duration: i64,

	/// Extra routes offered by this peer.
	#[serde(rename = "r", default)]
	pub routes: Vec<IpNet>,

	/// Ephemeral peers are never pinned.
	#[serde(rename = "e", default)]
	pub ephemeral: bool,

	#[serde(rename = "s", default, with = "b64")]
	pub signature: Vec<u8>,
}

impl Descriptor {
	/// The descriptor ID: base64 of the verify key. All other fields may
	/// change across versions of the same peer.
	pub fn id(&self) -> String {
		STANDARD.encode(&self.verify_key)
	}

	/// All advertised addresses, v4 first then v6, preserving advertised
	/// order within each family.
	pub fn addrs(&self) -> Vec<IpAddr> {
		self.v4_addrs
			.iter()
			.copied()
			.map(IpAddr::V4)
			.chain(self.v6_addrs.iter().copied().map(IpAddr::V6))
			.collect()
	}

	pub fn set_addrs(&mut self, addrs: &[IpAddr]) {
		self.v4_addrs.clear();
		self.v6_addrs.clear();
		for addr in addrs {
			match addr {
				IpAddr::V4(a) => self.v4_addrs.push(*a),
				IpAddr::V6(a) => self.v6_addrs.push(*a),
			}
		}
	}
}

pub(crate) mod b64 {
	use super::*;
	use serde::{Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(deserializer)?;
		STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
	}
}
