// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::{links, monitor, routes, rules, system_state};
use async_trait::async_trait;
use ipnet::IpNet;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use tokio::sync::mpsc;
use vula_core::system::{NetworkSample, NetworkSystem, SystemStateQuery};
use vula_core::CapResult;

/// The production [`NetworkSystem`]: iproute2 for addressing, routing,
/// rules, and change monitoring.
#[derive(Clone, Copy, Debug, Default)]
pub struct IprouteNetwork;

#[async_trait]
impl NetworkSystem for IprouteNetwork {
	async fn system_state(&self, query: &SystemStateQuery) -> CapResult<NetworkSample> {
		Ok(system_state::sample_system_state(query).await?)
	}

	async fn subscribe(&self) -> CapResult<mpsc::Receiver<String>> {
		Ok(monitor::subscribe().await?)
	}

	async fn sync_interfaces(
		&self,
		wg_link: &str,
		primary_ip: Option<IpAddr>,
		dry_run: bool,
	) -> CapResult<Vec<String>> {
		Ok(links::sync_interfaces(wg_link, primary_ip, dry_run).await?)
	}

	async fn sync_rules(
		&self,
		table: u32,
		fwmark: u32,
		priority: u32,
		dry_run: bool,
	) -> CapResult<Vec<String>> {
		Ok(rules::sync_rules(table, fwmark, priority, dry_run).await?)
	}

	async fn sync_routes(
		&self,
		dests: &[IpNet],
		table: u32,
		interface: &str,
		current_subnets: &BTreeMap<IpNet, Vec<IpAddr>>,
		dry_run: bool,
	) -> CapResult<Vec<String>> {
		Ok(routes::sync_routes(dests, table, interface, current_subnets, dry_run).await?)
	}

	async fn remove_routes(
		&self,
		dests: &[IpNet],
		table: u32,
		interface: &str,
		dry_run: bool,
	) -> CapResult<Vec<String>> {
		Ok(routes::remove_routes(dests, table, interface, dry_run).await?)
	}

	async fn remove_unknown_routes(
		&self,
		expected: &BTreeSet<IpNet>,
		table: u32,
		has_enabled_gateway: bool,
		dry_run: bool,
	) -> CapResult<Vec<String>> {
		Ok(routes::remove_unknown_routes(expected, table, has_enabled_gateway, dry_run).await?)
	}
}
