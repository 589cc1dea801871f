// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::descriptors;
use crate::error::{OrganizeError, Result};
use crate::event::{now_epoch, EditOp, Event, EventOutcome};
use crate::queries;
use crate::render;
use crate::transaction::Transaction;
use crate::trigger::Trigger;
use rand::RngCore;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};
use vula_core::constants::{
	DEFAULT_FWMARK, DEFAULT_INTERFACE, DEFAULT_IP_RULE_PRIORITY, DEFAULT_ROUTING_TABLE,
	DEFAULT_WG_PORT, IPV6_LINK_LOCAL, IPV6_ULA, VULA_SUBNET,
};
use vula_core::system::{
	DiscoverControl, HostsStore, NetworkSystem, PublishControl, StateStore, SystemStateQuery,
	WgDevice,
};
use vula_core::{OrganizeState, SystemState};
use vula_crypto::{load_or_generate, KeyStore, Keys, PqDh, PskCache};

#[derive(Clone, Debug)]
pub struct OrganizeConfig {
	pub interface: String,
	/// This node's DNS name, ending in a local domain suffix.
	pub hostname: String,
	pub port: u16,
	pub fwmark: u32,
	pub routing_table: u32,
	pub ip_rule_priority: u32,
}

impl Default for OrganizeConfig {
	fn default() -> Self {
		Self {
			interface: DEFAULT_INTERFACE.to_string(),
			hostname: "vula.local.".to_string(),
			port: DEFAULT_WG_PORT,
			fwmark: DEFAULT_FWMARK,
			routing_table: DEFAULT_ROUTING_TABLE,
			ip_rule_priority: DEFAULT_IP_RULE_PRIORITY,
		}
	}
}

/// The external surfaces the organizer drives.
#[derive(Clone)]
pub struct Capabilities {
	pub state_store: Arc<dyn StateStore>,
	pub hosts_store: Arc<dyn HostsStore>,
	pub network: Arc<dyn NetworkSystem>,
	pub wg: Arc<dyn WgDevice>,
	pub discover: Arc<dyn DiscoverControl>,
	pub publish: Arc<dyn PublishControl>,
}

struct QueuedEvent {
	event: Event,
	done: oneshot::Sender<EventOutcome>,
}

/// The control plane. One instance per host; all state mutation runs on
/// its single-writer event loop, reads take the state mutex briefly.
pub struct Organize {
	pub(crate) config: OrganizeConfig,
	pub(crate) caps: Capabilities,
	pub(crate) keys: Keys,
	pub(crate) psk: PskCache,
	pub(crate) state: Mutex<OrganizeState>,
	events_tx: mpsc::Sender<QueuedEvent>,
	shutdown_tx: watch::Sender<bool>,
}

impl Organize {
	/// Loads keys and state, wires the capabilities, and starts the event
	/// loop. Call [`Organize::start`] afterwards to bootstrap and begin
	/// monitoring.
	pub fn new(
		config: OrganizeConfig,
		caps: Capabilities,
		key_store: Arc<dyn KeyStore>,
		pq_engine: Arc<dyn PqDh>,
	) -> Result<Arc<Self>> {
		let keys = load_or_generate(&*key_store, &*pq_engine)?;
		let mut state = caps.state_store.load()?;
		state.system_state.our_wg_pk = keys.wg_pk.clone();

		let psk = PskCache::new(pq_engine, keys.pq_sk.clone());
		let (events_tx, events_rx) = mpsc::channel(256);
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		let organize = Arc::new(Self {
			config,
			caps,
			keys,
			psk,
			state: Mutex::new(state),
			events_tx,
			shutdown_tx,
		});

		tokio::spawn(Arc::clone(&organize).event_loop(events_rx, shutdown_rx));
		Ok(organize)
	}

	/// First-run bootstrap and live wiring: primary IP, v6 allowed
	/// subnets, system-state sampling, kernel monitoring, mDNS
	/// instructions, and an initial full sync.
	#[instrument(skip(self))]
	pub async fn start(self: &Arc<Self>) -> Result<()> {
		if let Err(e) = self.caps.discover.listen(&[], "").await {
			warn!(error = %e, "discover daemon not reachable yet");
		}

		let (primary_ip, enable_ipv6) = {
			let state = self.state.lock().expect("state lock");
			(state.prefs.primary_ip, state.prefs.enable_ipv6)
		};

		if primary_ip.is_none() {
			let addr = random_primary_ip();
			let handler: crate::event::CustomHandler = Arc::new(move |t: &mut Transaction| {
				t.state.prefs.primary_ip = Some(addr);
				t.add_trigger(Trigger::GetNewSystemState);
				Ok(())
			});
			let outcome = self
				.submit(Event::Custom {
					name: "SET_PRIMARY_IP".into(),
					args: vec![addr.to_string()],
					handler,
				})
				.await?;
			if !outcome.ok() {
				return Err(OrganizeError::InvalidValue(
					outcome.error.unwrap_or_default(),
				));
			}

			if !enable_ipv6 {
				return Err(OrganizeError::InvalidValue(
					"v4-only hosts require setting the primary_ip pref manually".into(),
				));
			}
		}

		self.refresh_system_state("startup").await?;

		if enable_ipv6 {
			// both belong to the default prefs; adding them here covers
			// state files written before v6 support
			let handler: crate::event::CustomHandler = Arc::new(|t: &mut Transaction| {
				for subnet in [*IPV6_LINK_LOCAL, *IPV6_ULA] {
					if !t.state.prefs.subnets_allowed.contains(&subnet) {
						t.state.prefs.subnets_allowed.push(subnet);
					}
				}
				Ok(())
			});
			self.submit(Event::Custom {
				name: "ADD_IPV6_ALLOWED_SUBNETS".into(),
				args: vec![IPV6_LINK_LOCAL.to_string(), IPV6_ULA.to_string()],
				handler,
			})
			.await?;
		}

		let mut updates = self.caps.network.subscribe().await?;
		let monitor = Arc::clone(self);
		let mut shutdown_rx = self.shutdown_tx.subscribe();
		tokio::spawn(async move {
			loop {
				tokio::select! {
					biased;

					_ = shutdown_rx.changed() => {
						if *shutdown_rx.borrow() {
							break;
						}
					}

					update = updates.recv() => {
						let Some(update) = update else { break };
						let reason = format!("netlink event: {update}");
						if let Err(e) = monitor.refresh_system_state(&reason).await {
							warn!(error = %e, "system state refresh failed");
						}
					}
				}
			}
			debug!("monitor loop stopped");
		});

		self.instruct_zeroconf().await?;
		self.sync(false).await?;
		Ok(())
	}

	pub fn shutdown(&self) {
		let _ = self.shutdown_tx.send(true);
	}

	/// Enqueues an event and waits for its result document.
	pub async fn submit(&self, event: Event) -> Result<EventOutcome> {
		let (done, rx) = oneshot::channel();
		self.events_tx
			.send(QueuedEvent { event, done })
			.await
			.map_err(|_| OrganizeError::Shutdown)?;
		rx.await.map_err(|_| OrganizeError::Shutdown)
	}

	async fn event_loop(
		self: Arc<Self>,
		mut events_rx: mpsc::Receiver<QueuedEvent>,
		mut shutdown_rx: watch::Receiver<bool>,
	) {
		loop {
			tokio::select! {
				biased;

				_ = shutdown_rx.changed() => {
					if *shutdown_rx.borrow() {
						info!("event loop draining");
						events_rx.close();
						while let Some(queued) = events_rx.recv().await {
							self.process(queued).await;
						}
						info!("event loop shut down");
						break;
					}
				}

				queued = events_rx.recv() => {
					let Some(queued) = queued else { break };
					self.process(queued).await;
				}
			}
		}
	}

	/// §4.5: snapshot, dispatch, persist, publish, then triggers.
	async fn process(self: &Arc<Self>, queued: QueuedEvent) {
		let (name, args) = queued.event.text();
		debug!(event = %name, "processing event");

		let snapshot = self.state.lock().expect("state lock").clone();
		let mut t = Transaction::new(snapshot);
		let result = queued.event.apply(&mut t);

		for message in &t.messages {
			debug!("{message}");
		}

		let mut outcome = EventOutcome {
			event: format!("{name} [{}]", args.join(", ")),
			actions: t.actions.clone(),
			writes: Vec::new(),
			error: result.as_ref().err().map(|e| e.to_string()),
		};

		let mut triggers = Vec::new();
		if result.is_ok() {
			match self.persist(&t.state) {
				Ok(()) => {
					*self.state.lock().expect("state lock") = t.state;
					triggers = t.triggers;
				}
				Err(e) => {
					warn!(error = %e, "failed to persist state, discarding transaction");
					outcome.error = Some(e.to_string());
				}
			}
		}

		let _ = queued.done.send(outcome);

		if let Err(e) = self.run_triggers(triggers).await {
			warn!(error = %e, "trigger execution failed");
		}
	}

	fn persist(&self, state: &OrganizeState) -> Result<()> {
		self.caps.state_store.save(state)?;
		self.caps
			.hosts_store
			.write_hosts(&queries::hosts_entries(&state.peers))?;
		Ok(())
	}

	async fn run_triggers(self: &Arc<Self>, triggers: Vec<Trigger>) -> Result<()> {
		let mut failures = Vec::new();
		for trigger in triggers {
			debug!(trigger = trigger.name(), "running trigger");
			let result = match trigger {
				Trigger::SyncPeer(id) => self.sync_peer_by_id(&id, false).await.map(|_| ()),
				Trigger::RemoveRoutes(routes) => self
					.caps
					.network
					.remove_routes(
						&routes,
						self.config.routing_table,
						&self.config.interface,
						false,
					)
					.await
					.map(|_| ())
					.map_err(Into::into),
				Trigger::RemoveWgPeer(pk) => self
					.caps
					.wg
					.apply_peer(&vula_core::WgPeerConfig::removal(pk), false)
					.await
					.map(|_| ())
					.map_err(Into::into),
				Trigger::GetNewSystemState => {
					// runs asynchronously: the refresh enqueues an event and
					// must not wait on the loop it was called from
					let organize = Arc::clone(self);
					tokio::spawn(async move {
						if let Err(e) = organize.refresh_system_state("trigger").await {
							warn!(error = %e, "deferred system state refresh failed");
						}
					});
					Ok(())
				}
				Trigger::RemoveUnknown => self.remove_unknown(false).await.map(|_| ()),
			};
			if let Err(e) = result {
				failures.push(e.to_string());
			}
		}

		if failures.is_empty() {
			Ok(())
		} else {
			Err(OrganizeError::Compound(failures))
		}
	}

	/// Re-samples the kernel and posts the coalesced NewSystemState event,
	/// then runs a full repair sync.
	#[instrument(skip(self))]
	pub async fn refresh_system_state(self: &Arc<Self>, reason: &str) -> Result<()> {
		let query = {
			let state = self.state.lock().expect("state lock");
			SystemStateQuery {
				enable_ipv4: state.prefs.enable_ipv4,
				enable_ipv6: state.prefs.enable_ipv6,
				iface_prefix_allowed: state.prefs.iface_prefix_allowed.clone(),
				subnets_forbidden: state.prefs.subnets_forbidden.clone(),
				primary_ip: state.prefs.primary_ip,
			}
		};

		let sample = self.caps.network.system_state(&query).await?;
		let next = SystemState {
			current_subnets: sample.current_subnets,
			current_interfaces: sample.current_interfaces,
			our_wg_pk: self.keys.wg_pk.clone(),
			gateways: sample.gateways,
			has_v6: sample.has_v6,
		};

		info!(reason, "applying new system state");
		let outcome = self.submit(Event::NewSystemState(Box::new(next))).await?;
		if let Some(error) = outcome.error {
			return Err(OrganizeError::InvalidValue(error));
		}

		// TODO: narrow this once triggers cover every removal themselves
		self.sync(false).await?;
		Ok(())
	}

	/// Re-announces and re-browses on the current set of interfaces.
	/// Returns the addresses discovery now listens on.
	pub async fn instruct_zeroconf(&self) -> Result<Vec<String>> {
		let (state, port, hostname) = {
			let state = self.state.lock().expect("state lock");
			(state.clone(), self.config.port, self.config.hostname.clone())
		};

		let plan =
			descriptors::announcement_plan(&self.keys, &state, &hostname, port, now_epoch())?;

		info!(
			discover = plan.discover_ips.join(", "),
			interfaces = plan.announcements.len(),
			"instructing zeroconf daemons"
		);
		if let Err(e) = self.caps.discover.listen(&plan.discover_ips, "").await {
			warn!(error = %e, "could not instruct discover daemon");
		}
		if let Err(e) = self.caps.publish.listen(&plan.announcements).await {
			warn!(error = %e, "could not instruct publish daemon");
		}
		Ok(plan.discover_ips)
	}

	// ----- IPC surface ------------------------------------------------

	pub async fn process_descriptor_string(&self, descriptor: &str) -> Result<String> {
		debug!(descriptor, "processing descriptor string");
		let outcome = self
			.submit(Event::IncomingDescriptor(descriptor.to_string()))
			.await?;
		Ok(outcome.to_yaml())
	}

	pub async fn verify_and_pin_peer(&self, vk: &str, hostname: &str) -> Result<String> {
		let outcome = self
			.submit(Event::VerifyAndPinPeer {
				vk: vk.to_string(),
				hostname: hostname.to_string(),
			})
			.await?;
		Ok(outcome.to_yaml())
	}

	pub async fn remove_peer(&self, vk: &str) -> Result<String> {
		let outcome = self
			.submit(Event::UserRemovePeer { query: vk.to_string() })
			.await?;
		Ok(outcome.to_yaml())
	}

	pub async fn peer_addr_add(&self, vk: &str, value: &str) -> Result<String> {
		let outcome = self
			.submit(Event::UserPeerAddrAdd {
				vk: vk.to_string(),
				ip: value.to_string(),
			})
			.await?;
		Ok(outcome.to_yaml())
	}

	pub async fn peer_addr_del(&self, vk: &str, value: &str) -> Result<String> {
		let outcome = self
			.submit(Event::UserPeerAddrDel {
				vk: vk.to_string(),
				ip: value.to_string(),
			})
			.await?;
		Ok(outcome.to_yaml())
	}

	pub async fn set_peer(&self, vk: &str, path: &[String], value: &str) -> Result<String> {
		let mut full_path = vec!["peers".to_string(), vk.to_string()];
		full_path.extend_from_slice(path);
		let outcome = self
			.submit(Event::UserEdit {
				op: EditOp::Set,
				path: full_path,
				value: value.to_string(),
			})
			.await?;
		Ok(outcome.to_yaml())
	}

	pub async fn set_pref(&self, pref: &str, value: &str) -> Result<String> {
		self.edit_pref(EditOp::Set, pref, value).await
	}

	pub async fn add_pref(&self, pref: &str, value: &str) -> Result<String> {
		self.edit_pref(EditOp::Add, pref, value).await
	}

	pub async fn remove_pref(&self, pref: &str, value: &str) -> Result<String> {
		self.edit_pref(EditOp::Remove, pref, value).await
	}

	async fn edit_pref(&self, op: EditOp, pref: &str, value: &str) -> Result<String> {
		let outcome = self
			.submit(Event::UserEdit {
				op,
				path: vec!["prefs".to_string(), pref.to_string()],
				value: value.to_string(),
			})
			.await?;
		Ok(outcome.to_yaml())
	}

	pub async fn release_gateway(&self) -> Result<String> {
		let outcome = self.submit(Event::ReleaseGateway).await?;
		Ok(outcome.to_yaml())
	}

	pub async fn show_peer(&self, query: &str) -> Result<String> {
		let peer = {
			let state = self.state.lock().expect("state lock");
			queries::query(&state.peers, query)?
				.cloned()
				.ok_or_else(|| OrganizeError::PeerNotFound {
					key: "query",
					value: query.to_string(),
				})?
		};

		let stats = match self.caps.wg.peers().await {
			Ok(peers) => peers
				.into_iter()
				.find(|p| p.public_key == peer.descriptor.wg_pk)
				.and_then(|p| p.stats),
			Err(e) => {
				debug!(error = %e, "could not read peer stats");
				None
			}
		};

		Ok(render::show_peer(&peer, stats, now_epoch()))
	}

	pub fn peer_descriptor(&self, query: &str) -> Result<String> {
		let state = self.state.lock().expect("state lock");
		let peer = queries::query(&state.peers, query)?.ok_or_else(|| {
			OrganizeError::PeerNotFound {
				key: "query",
				value: query.to_string(),
			}
		})?;
		Ok(vula_codec::serialize_descriptor(&peer.descriptor))
	}

	pub fn peer_ids(&self, which: &str) -> Result<Vec<String>> {
		let state = self.state.lock().expect("state lock");
		queries::ids_matching(&state.peers, which)
	}

	pub fn get_vk_by_name(&self, hostname: &str) -> Result<String> {
		let state = self.state.lock().expect("state lock");
		Ok(queries::with_hostname(&state.peers, hostname)?.id())
	}

	pub fn show_prefs(&self) -> Result<String> {
		let state = self.state.lock().expect("state lock");
		Ok(serde_yaml::to_string(&state.prefs)?)
	}

	pub fn our_latest_descriptors(&self) -> Result<String> {
		let (state, port, hostname) = {
			let state = self.state.lock().expect("state lock");
			(state.clone(), self.config.port, self.config.hostname.clone())
		};
		let plan =
			descriptors::announcement_plan(&self.keys, &state, &hostname, port, now_epoch())?;
		Ok(serde_yaml::to_string(&plan.announcements)?)
	}

	pub async fn rediscover(&self) -> Result<String> {
		let ips = self.instruct_zeroconf().await?;
		Ok(ips.join(", "))
	}
}

/// A stable random address inside the vula ULA subnet, generated once and
/// persisted in prefs.
fn random_primary_ip() -> IpAddr {
	let IpAddr::V6(base) = VULA_SUBNET.network() else {
		unreachable!("vula subnet is v6");
	};
	let mut octets = base.octets();
	rand::thread_rng().fill_bytes(&mut octets[6..]);
	IpAddr::V6(Ipv6Addr::from(octets))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn random_primary_ip_is_inside_the_ula_subnet() {
		for _ in 0..32 {
			let ip = random_primary_ip();
			assert!(VULA_SUBNET.contains(&ip));
		}
	}

	#[test]
	fn default_config_matches_deployment_defaults() {
		let config = OrganizeConfig::default();
		assert_eq!(config.interface, "vula");
		assert_eq!(config.port, 5354);
		assert_eq!(config.fwmark, 555);
		assert_eq!(config.routing_table, 666);
	}
}
