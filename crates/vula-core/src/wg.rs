// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ipnet::IpNet;
use std::net::SocketAddr;

/// Desired or observed configuration of one WireGuard peer slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WgPeerConfig {
	pub public_key: Vec<u8>,
	pub preshared_key: Option<Vec<u8>>,
	pub endpoint: Option<SocketAddr>,
	pub persistent_keepalive: Option<u16>,
	pub allowed_ips: Vec<IpNet>,
	pub remove: bool,
	pub stats: Option<WgPeerStats>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WgPeerStats {
	/// Epoch seconds of the newest completed handshake, if any.
	pub latest_handshake: Option<i64>,
	pub rx_bytes: u64,
	pub tx_bytes: u64,
}

impl WgPeerConfig {
	pub fn removal(public_key: Vec<u8>) -> Self {
		Self {
			public_key,
			remove: true,
			..Self::default()
		}
	}

	pub fn public_key_base64(&self) -> String {
		STANDARD.encode(&self.public_key)
	}
}

/// Device-level WireGuard configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WgDeviceConfig {
	pub private_key: Vec<u8>,
	pub public_key: Vec<u8>,
	pub listen_port: u16,
	pub fwmark: u32,
}
