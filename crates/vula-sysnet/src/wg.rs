// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{Result, SysnetError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::UNIX_EPOCH;
use tracing::debug;
use vula_core::system::WgDevice;
use vula_core::{CapResult, WgDeviceConfig, WgPeerConfig, WgPeerStats};
use wireguard_control::{
	AllowedIp, Backend, Device, DeviceUpdate, InterfaceName, Key, PeerConfigBuilder, PeerInfo,
};

/// Which parts of a peer slot need to change.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct PeerDiff {
	pub create: bool,
	pub preshared_key: bool,
	pub endpoint: bool,
	pub keepalive: bool,
	pub allowed_ips: bool,
}

impl PeerDiff {
	pub fn any(&self) -> bool {
		self.create || self.preshared_key || self.endpoint || self.keepalive || self.allowed_ips
	}
}

/// Field-by-field comparison of the desired slot with what the kernel
/// currently holds.
pub(crate) fn diff_peer(current: Option<&WgPeerConfig>, desired: &WgPeerConfig) -> PeerDiff {
	let Some(current) = current else {
		return PeerDiff {
			create: true,
			preshared_key: true,
			endpoint: true,
			keepalive: true,
			allowed_ips: true,
		};
	};

	let current_ips: BTreeSet<_> = current.allowed_ips.iter().collect();
	let desired_ips: BTreeSet<_> = desired.allowed_ips.iter().collect();

	PeerDiff {
		create: false,
		preshared_key: current.preshared_key != desired.preshared_key,
		endpoint: current.endpoint != desired.endpoint,
		keepalive: current.persistent_keepalive.unwrap_or(0)
			!= desired.persistent_keepalive.unwrap_or(0),
		allowed_ips: current_ips != desired_ips,
	}
}

/// The `wg set` line recorded in sync logs for this configuration.
pub(crate) fn peer_config_log(device: &str, config: &WgPeerConfig) -> String {
	let mut line = format!("wg set {device} peer {}", config.public_key_base64());
	if config.remove {
		line.push_str(" remove");
		return line;
	}
	if let Some(endpoint) = config.endpoint {
		line.push_str(&format!(" endpoint {endpoint}"));
	}
	if config.preshared_key.is_some() {
		line.push_str(" preshared-key <redacted>");
	}
	if let Some(keepalive) = config.persistent_keepalive {
		line.push_str(&format!(" persistent-keepalive {keepalive}"));
	}
	if !config.allowed_ips.is_empty() {
		let ips: Vec<String> = config.allowed_ips.iter().map(|n| n.to_string()).collect();
		line.push_str(&format!(" allowed-ips {}", ips.join(",")));
	}
	line
}

fn key_from(bytes: &[u8]) -> Result<Key> {
	let array: [u8; 32] = bytes
		.try_into()
		.map_err(|_| SysnetError::Parse(format!("wireguard key of {} bytes", bytes.len())))?;
	Ok(Key(array))
}

fn peer_from_kernel(info: &PeerInfo) -> WgPeerConfig {
	WgPeerConfig {
		public_key: info.config.public_key.0.to_vec(),
		preshared_key: info.config.preshared_key.as_ref().map(|k| k.0.to_vec()),
		endpoint: info.config.endpoint,
		persistent_keepalive: info.config.persistent_keepalive_interval,
		allowed_ips: info
			.config
			.allowed_ips
			.iter()
			.filter_map(|ip| ipnet::IpNet::new(ip.address, ip.cidr).ok())
			.collect(),
		remove: false,
		stats: Some(WgPeerStats {
			latest_handshake: info.stats.last_handshake_time.and_then(|t| {
				t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs() as i64)
			}),
			rx_bytes: info.stats.rx_bytes,
			tx_bytes: info.stats.tx_bytes,
		}),
	}
}

fn allowed_ips_of(config: &WgPeerConfig) -> Vec<AllowedIp> {
	config
		.allowed_ips
		.iter()
		.map(|net| AllowedIp {
			address: net.addr(),
			cidr: net.prefix_len(),
		})
		.collect()
}

/// Kernel WireGuard device adapter.
pub struct KernelWgDevice {
	name: String,
	interface: InterfaceName,
}

impl KernelWgDevice {
	pub fn new(name: &str) -> Result<Self> {
		let interface: InterfaceName = name
			.parse()
			.map_err(|_| SysnetError::Parse(format!("invalid interface name: {name}")))?;
		Ok(Self {
			name: name.to_string(),
			interface,
		})
	}

	fn device(&self) -> Result<Device> {
		Device::get(&self.interface, Backend::Kernel).map_err(|source| SysnetError::WireGuard {
			device: self.name.clone(),
			source,
		})
	}

	fn apply(&self, update: DeviceUpdate) -> Result<()> {
		update
			.apply(&self.interface, Backend::Kernel)
			.map_err(|source| SysnetError::WireGuard {
				device: self.name.clone(),
				source,
			})
	}
}

#[async_trait]
impl WgDevice for KernelWgDevice {
	fn name(&self) -> &str {
		&self.name
	}

	async fn configuration(&self) -> CapResult<WgDeviceConfig> {
		let device = self.device()?;
		Ok(WgDeviceConfig {
			private_key: device.private_key.map(|k| k.0.to_vec()).unwrap_or_default(),
			public_key: device.public_key.map(|k| k.0.to_vec()).unwrap_or_default(),
			listen_port: device.listen_port.unwrap_or(0),
			fwmark: device.fwmark.unwrap_or(0),
		})
	}

	async fn set_configuration(
		&self,
		private_key: &[u8],
		listen_port: u16,
		fwmark: u32,
	) -> CapResult<()> {
		let update = DeviceUpdate::new()
			.set_private_key(key_from(private_key)?)
			.set_listen_port(listen_port)
			.set_fwmark(fwmark);
		Ok(self.apply(update)?)
	}

	async fn peers(&self) -> CapResult<Vec<WgPeerConfig>> {
		let device = self.device()?;
		Ok(device.peers.iter().map(peer_from_kernel).collect())
	}

	async fn apply_peer(&self, config: &WgPeerConfig, dry_run: bool) -> CapResult<Vec<String>> {
		let key = key_from(&config.public_key)?;
		let device = self.device()?;
		let current = device
			.peers
			.iter()
			.find(|p| p.config.public_key.0 == key.0)
			.map(peer_from_kernel);

		let mut log = Vec::new();

		if config.remove {
			if current.is_none() {
				log.push(format!(
					"# can't remove non-existent wireguard peer {}",
					config.public_key_base64()
				));
				return Ok(log);
			}
			log.push(format!(
				"# removing wireguard peer {}",
				config.public_key_base64()
			));
			log.push(peer_config_log(&self.name, config));
			if !dry_run {
				self.apply(DeviceUpdate::new().remove_peer_by_key(&key))?;
			}
			return Ok(log);
		}

		let diff = diff_peer(current.as_ref(), config);
		if !diff.any() {
			debug!(peer = %config.public_key_base64(), "no wg update necessary");
			return Ok(log);
		}

		let mut builder = PeerConfigBuilder::new(&key);
		if diff.preshared_key {
			if let Some(psk) = &config.preshared_key {
				builder = builder.set_preshared_key(key_from(psk)?);
			}
		}
		if diff.endpoint {
			if let Some(endpoint) = config.endpoint {
				builder = builder.set_endpoint(endpoint);
			}
		}
		if diff.keepalive {
			builder =
				builder.set_persistent_keepalive_interval(config.persistent_keepalive.unwrap_or(0));
		}
		if diff.allowed_ips {
			builder = builder
				.replace_allowed_ips()
				.add_allowed_ips(&allowed_ips_of(config));
		}

		log.push(if diff.create {
			format!("# configure new wireguard peer {}", config.public_key_base64())
		} else {
			format!("# reconfigure wireguard peer {}", config.public_key_base64())
		});
		log.push(peer_config_log(&self.name, config));

		if !dry_run {
			self.apply(DeviceUpdate::new().add_peer(builder))?;
		}
		Ok(log)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn desired(allowed: &[&str]) -> WgPeerConfig {
		WgPeerConfig {
			public_key: vec![7; 32],
			preshared_key: Some(vec![8; 32]),
			endpoint: Some("10.0.0.7:5354".parse().unwrap()),
			persistent_keepalive: None,
			allowed_ips: allowed.iter().map(|n| n.parse().unwrap()).collect(),
			remove: false,
			stats: None,
		}
	}

	#[test]
	fn missing_peer_needs_full_create() {
		let diff = diff_peer(None, &desired(&["10.0.0.7/32"]));
		assert!(diff.create && diff.any());
	}

	#[test]
	fn identical_peer_needs_nothing() {
		let d = desired(&["10.0.0.7/32"]);
		let diff = diff_peer(Some(&d), &d);
		assert!(!diff.any());
	}

	#[test]
	fn allowed_ip_order_does_not_matter() {
		let mut current = desired(&["10.0.0.7/32", "fd54::2/128"]);
		let d = desired(&["fd54::2/128", "10.0.0.7/32"]);
		current.stats = None;
		let diff = diff_peer(Some(&current), &d);
		assert!(!diff.any());
	}

	#[test]
	fn changed_psk_or_endpoint_is_detected() {
		let current = desired(&["10.0.0.7/32"]);

		let mut d = desired(&["10.0.0.7/32"]);
		d.preshared_key = Some(vec![9; 32]);
		assert!(diff_peer(Some(&current), &d).preshared_key);

		let mut d = desired(&["10.0.0.7/32"]);
		d.endpoint = Some("10.0.0.8:5354".parse().unwrap());
		let diff = diff_peer(Some(&current), &d);
		assert!(diff.endpoint && !diff.preshared_key);
	}

	#[test]
	fn keepalive_none_equals_zero() {
		let mut current = desired(&["10.0.0.7/32"]);
		current.persistent_keepalive = Some(0);
		let d = desired(&["10.0.0.7/32"]);
		assert!(!diff_peer(Some(&current), &d).keepalive);
	}

	#[test]
	fn log_line_matches_wg_set_syntax() {
		let line = peer_config_log("vula", &desired(&["10.0.0.7/32", "0.0.0.0/0"]));
		assert!(line.starts_with("wg set vula peer "));
		assert!(line.contains("endpoint 10.0.0.7:5354"));
		assert!(line.contains("preshared-key <redacted>"));
		assert!(line.contains("allowed-ips 10.0.0.7/32,0.0.0.0/0"));

		let removal = peer_config_log("vula", &WgPeerConfig::removal(vec![7; 32]));
		assert!(removal.ends_with(" remove"));
	}
}
