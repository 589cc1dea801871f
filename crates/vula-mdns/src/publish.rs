// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use mdns_sd::{ServiceDaemon, ServiceInfo, TxtProperty};
use std::collections::BTreeMap;
use std::net::IpAddr;
use tokio::sync::Mutex;
use tracing::{debug, info};
use vula_core::constants::{MDNS_SERVICE_TYPE, VULA_SUBNET};

/// The publish daemon: one service announcement per instructed interface,
/// TXT records carrying the descriptor fields with raw-byte addresses.
pub struct Publish {
	daemon: ServiceDaemon,
	announced: Mutex<BTreeMap<String, String>>,
}

impl Publish {
	pub fn new() -> Result<Self> {
		Ok(Self {
			daemon: ServiceDaemon::new()?,
			announced: Mutex::new(BTreeMap::new()),
		})
	}

	/// Applies a fresh interface-to-descriptor instruction set: stale
	/// announcements are withdrawn, new or changed ones (re)registered.
	pub async fn listen(&self, announcements: &BTreeMap<String, String>) -> Result<()> {
		let mut announced = self.announced.lock().await;

		let stale: Vec<String> = announced
			.keys()
			.filter(|iface| !announcements.contains_key(*iface))
			.cloned()
			.collect();
		for iface in stale {
			if let Some(fullname) = announced.remove(&iface) {
				info!(interface = iface, "withdrawing service announcement");
				let _ = self.daemon.unregister(&fullname);
			}
		}

		for (iface, descriptor_string) in announcements {
			let descriptor = vula_codec::parse_descriptor(descriptor_string)?;

			let listen_ips: Vec<IpAddr> = descriptor
				.addrs()
				.into_iter()
				.filter(|addr| !VULA_SUBNET.contains(addr))
				.collect();

			let records = vula_codec::descriptor_to_txt(&descriptor);
			let properties: Vec<TxtProperty> = records
				.iter()
				.map(|(key, value)| TxtProperty::from((key.as_str(), value.as_slice())))
				.collect();

			let instance = descriptor.hostname.trim_end_matches('.').replace('.', "-");
			let service = ServiceInfo::new(
				MDNS_SERVICE_TYPE,
				&instance,
				&descriptor.hostname,
				&listen_ips[..],
				descriptor.port,
				properties,
			)?;
			let fullname = service.get_fullname().to_string();

			if let Some(previous) = announced.get(iface) {
				debug!(interface = iface, "updating service announcement");
				let _ = self.daemon.unregister(previous);
			} else {
				debug!(interface = iface, ips = ?listen_ips, "registering service announcement");
			}
			self.daemon.register(service)?;
			announced.insert(iface.clone(), fullname);
		}
		Ok(())
	}

	pub async fn shutdown(&self) {
		let mut announced = self.announced.lock().await;
		for (_, fullname) in announced.iter() {
			let _ = self.daemon.unregister(fullname);
		}
		announced.clear();
		let _ = self.daemon.shutdown();
	}
}
