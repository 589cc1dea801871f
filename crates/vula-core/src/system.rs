// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capability traits for every external surface the organizer consumes.
//!
//! The organizer is constructed with one implementation of each; tests
//! inject recording doubles, the CLI injects the kernel, mDNS, and disk
//! adapters. Triggers carry plain values only, so none of these traits ever
//! receive references into organizer state.

use crate::error::CapResult;
use crate::state::OrganizeState;
use crate::wg::{WgDeviceConfig, WgPeerConfig};
use async_trait::async_trait;
use ipnet::IpNet;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use tokio::sync::mpsc;

/// Inputs to a system-state sample, copied out of prefs.
#[derive(Clone, Debug, Default)]
pub struct SystemStateQuery {
	pub enable_ipv4: bool,
	pub enable_ipv6: bool,
	pub iface_prefix_allowed: Vec<String>,
	pub subnets_forbidden: Vec<IpNet>,
	pub primary_ip: Option<IpAddr>,
}

/// One sampled view of the kernel's addressing and routing.
#[derive(Clone, Debug, Default)]
pub struct NetworkSample {
	pub current_subnets: BTreeMap<IpNet, Vec<IpAddr>>,
	pub current_interfaces: BTreeMap<String, Vec<IpAddr>>,
	pub gateways: Vec<IpAddr>,
	pub has_v6: bool,
}

/// Kernel addressing, routing, and policy-rule surface.
#[async_trait]
pub trait NetworkSystem: Send + Sync {
	/// Samples subnets, interface addresses, default-route gateways, and
	/// v6 availability, filtered by the query's policy.
	async fn system_state(&self, query: &SystemStateQuery) -> CapResult<NetworkSample>;

	/// Subscribes to kernel address and route change notifications. Each
	/// message names the changed class (`address` or `route`).
	async fn subscribe(&self) -> CapResult<mpsc::Receiver<String>>;

	/// Ensures the WireGuard link and the dummy companion link exist and
	/// are up, with the primary IP assigned on the dummy.
	async fn sync_interfaces(
		&self,
		wg_link: &str,
		primary_ip: Option<IpAddr>,
		dry_run: bool,
	) -> CapResult<Vec<String>>;

	/// Installs the `not fwmark <m> lookup <table>` rule for both address
	/// families if absent.
	async fn sync_rules(
		&self,
		table: u32,
		fwmark: u32,
		priority: u32,
		dry_run: bool,
	) -> CapResult<Vec<String>>;

	/// Ensures a route to each destination exists in the table via the
	/// interface, using a source address from the covering current subnet.
	async fn sync_routes(
		&self,
		dests: &[IpNet],
		table: u32,
		interface: &str,
		current_subnets: &BTreeMap<IpNet, Vec<IpAddr>>,
		dry_run: bool,
	) -> CapResult<Vec<String>>;

	/// Idempotently removes routes to the destinations from the table.
	async fn remove_routes(
		&self,
		dests: &[IpNet],
		table: u32,
		interface: &str,
		dry_run: bool,
	) -> CapResult<Vec<String>>;

	/// Removes every route in the table whose destination is unexpected,
	/// and the gateway default prefixes from the main table when no enabled
	/// gateway peer remains.
	async fn remove_unknown_routes(
		&self,
		expected: &BTreeSet<IpNet>,
		table: u32,
		has_enabled_gateway: bool,
		dry_run: bool,
	) -> CapResult<Vec<String>>;
}

/// Control surface of one WireGuard device.
#[async_trait]
pub trait WgDevice: Send + Sync {
	fn name(&self) -> &str;

	async fn configuration(&self) -> CapResult<WgDeviceConfig>;

	async fn set_configuration(
		&self,
		private_key: &[u8],
		listen_port: u16,
		fwmark: u32,
	) -> CapResult<()>;

	async fn peers(&self) -> CapResult<Vec<WgPeerConfig>>;

	/// Applies one peer configuration (or removal), returning the log of
	/// operations. Every kernel mutation short-circuits under dry-run.
	async fn apply_peer(&self, config: &WgPeerConfig, dry_run: bool) -> CapResult<Vec<String>>;
}

/// Persistent organizer state document.
pub trait StateStore: Send + Sync {
	/// Absent file yields defaults; a malformed file is a loud error.
	fn load(&self) -> CapResult<OrganizeState>;
	fn save(&self, state: &OrganizeState) -> CapResult<()>;
}

/// Hosts-file projection: one `(address, name)` line per entry.
pub trait HostsStore: Send + Sync {
	fn write_hosts(&self, entries: &[(String, String)]) -> CapResult<()>;
}

/// Handle on the discover daemon.
#[async_trait]
pub trait DiscoverControl: Send + Sync {
	async fn listen(&self, ip_addrs: &[String], our_wg_pk: &str) -> CapResult<()>;
}

/// Handle on the publish daemon. The map is interface name to signed
/// canonical descriptor string.
#[async_trait]
pub trait PublishControl: Send + Sync {
	async fn listen(&self, announcements: &BTreeMap<String, String>) -> CapResult<()>;
}

/// Status of one service-manager unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitStatus {
	/// `active`, `inactive`, `activatable`, `disabled`, or `error`.
	pub state: String,
	/// Epoch seconds of the last state change, when known.
	pub since_epoch: Option<i64>,
	/// Human detail appended to the unit name, if any.
	pub detail: String,
}

/// Service-manager inspection for the status probe.
#[async_trait]
pub trait UnitInspector: Send + Sync {
	async fn unit_status(&self, unit: &str) -> CapResult<UnitStatus>;
}
