// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vula_core::constants::MDNS_SERVICE_TYPE;
use vula_core::CapResult;

/// Where discovered descriptors go: in deployment, the organizer's
/// ProcessDescriptorString over IPC.
#[async_trait]
pub trait DescriptorSink: Send + Sync {
	async fn process_descriptor_string(&self, descriptor: &str) -> CapResult<String>;
}

/// The discover daemon: browses the vula service and forwards every
/// decodable descriptor to the sink. Invalid records are dropped at debug
/// level; a hostile network must not perturb anything.
pub struct Discover {
	sink: Arc<dyn DescriptorSink>,
	session: Mutex<Option<ServiceDaemon>>,
}

impl Discover {
	pub fn new(sink: Arc<dyn DescriptorSink>) -> Self {
		Self {
			sink,
			session: Mutex::new(None),
		}
	}

	/// (Re)starts browsing. The address list steers logging only; the
	/// responder binds per-interface on its own. Passing our WireGuard
	/// public key drops our own announcements before they reach the
	/// organizer.
	pub async fn listen(&self, ip_addrs: &[String], our_wg_pk: &str) -> Result<()> {
		let mut session = self.session.lock().await;
		if let Some(old) = session.take() {
			let _ = old.shutdown();
		}

		let daemon = ServiceDaemon::new()?;
		let receiver = daemon.browse(MDNS_SERVICE_TYPE)?;
		info!(addrs = ip_addrs.join(", "), "browsing for descriptors");

		let sink = Arc::clone(&self.sink);
		let our_wg_pk = our_wg_pk.to_string();
		tokio::spawn(async move {
			while let Ok(event) = receiver.recv_async().await {
				let ServiceEvent::ServiceResolved(service) = event else {
					continue;
				};

				let records: Vec<(String, Vec<u8>)> = service
					.get_properties()
					.iter()
					.map(|prop| (prop.key().to_string(), prop.val().unwrap_or(&[]).to_vec()))
					.collect();

				let descriptor = match vula_codec::descriptor_from_txt(&records) {
					Ok(descriptor) => descriptor,
					Err(e) => {
						debug!(error = %e, "discover dropped invalid descriptor");
						continue;
					}
				};

				let text = vula_codec::serialize_descriptor(&descriptor);
				if !our_wg_pk.is_empty() && text.contains(&format!("pk={our_wg_pk};")) {
					debug!("discover ignored descriptor with our wg pk");
					continue;
				}

				debug!(descriptor = %text, "discovered descriptor");
				if let Err(e) = sink.process_descriptor_string(&text).await {
					warn!(error = %e, "failed to hand descriptor to organize");
				}
			}
			debug!("discover browse loop ended");
		});

		*session = Some(daemon);
		Ok(())
	}

	pub async fn shutdown(&self) {
		if let Some(daemon) = self.session.lock().await.take() {
			let _ = daemon.shutdown();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex as StdMutex;

	struct RecordingSink {
		seen: StdMutex<Vec<String>>,
	}

	#[async_trait]
	impl DescriptorSink for RecordingSink {
		async fn process_descriptor_string(&self, descriptor: &str) -> CapResult<String> {
			self.seen.lock().unwrap().push(descriptor.to_string());
			Ok(String::new())
		}
	}

	#[tokio::test]
	async fn listen_restarts_cleanly() {
		let sink = Arc::new(RecordingSink {
			seen: StdMutex::new(vec![]),
		});
		let discover = Discover::new(sink.clone());

		// browsing may be unavailable in sandboxed test environments; the
		// restart and shutdown paths must still be safe to drive
		let _ = discover.listen(&[], "").await;
		let _ = discover.listen(&["10.0.0.1".to_string()], "").await;
		discover.shutdown().await;
		assert!(sink.seen.lock().unwrap().is_empty());
	}
}
