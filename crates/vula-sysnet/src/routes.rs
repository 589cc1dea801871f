// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::ip::{run_ip, run_ip_json};
use crate::model::RouteEntry;
use ipnet::IpNet;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use tracing::{debug, info};
use vula_core::constants::{GATEWAY_ROUTES, MAIN_ROUTING_TABLE};

async fn routes_in_table(table: u32, v6: bool) -> Result<Vec<RouteEntry>> {
	let table_arg = table.to_string();
	let family = if v6 { "-6" } else { "-4" };
	run_ip_json(&[family, "route", "show", "table", &table_arg]).await
}

async fn table_destinations(table: u32) -> Result<BTreeSet<IpNet>> {
	let mut dests = BTreeSet::new();
	for v6 in [false, true] {
		for entry in routes_in_table(table, v6).await? {
			if let Some(prefix) = entry.dst_prefix(v6) {
				dests.insert(prefix);
			}
		}
	}
	Ok(dests)
}

/// Ensures a route per destination exists in the table via the interface.
/// The source address comes from the first current subnet covering the
/// destination; pinned-peer destinations outside every current subnet get
/// no source hint.
pub async fn sync_routes(
	dests: &[IpNet],
	table: u32,
	interface: &str,
	current_subnets: &BTreeMap<IpNet, Vec<IpAddr>>,
	dry_run: bool,
) -> Result<Vec<String>> {
	debug!(?dests, table, "looking for routes");
	let existing = table_destinations(table).await?;
	let mut log = Vec::new();

	for dest in dests {
		if existing.contains(&dest.trunc()) {
			debug!(%dest, "found existing route");
			continue;
		}

		let src = current_subnets
			.iter()
			.find(|(net, addrs)| net.contains(&dest.addr()) && !addrs.is_empty())
			.map(|(_, addrs)| addrs[0]);

		let dest_str = dest.to_string();
		let table_str = table.to_string();
		let mut args = vec![
			"route", "add", &dest_str, "dev", interface, "proto", "static", "scope", "link",
		];
		let src_str;
		if let Some(src) = src {
			src_str = src.to_string();
			args.push("src");
			args.push(&src_str);
		}
		args.push("table");
		args.push(&table_str);

		log.push(format!("ip {}", args.join(" ")));
		if !dry_run {
			info!("[#] {}", log.last().unwrap());
			run_ip(&args).await?;
		}
	}
	Ok(log)
}

/// Idempotently removes the given destinations from the table.
pub async fn remove_routes(
	dests: &[IpNet],
	table: u32,
	interface: &str,
	dry_run: bool,
) -> Result<Vec<String>> {
	let existing = table_destinations(table).await?;
	let mut log = Vec::new();

	for dest in dests {
		if !existing.contains(&dest.trunc()) {
			continue;
		}
		let dest_str = dest.to_string();
		let table_str = table.to_string();
		if !dry_run {
			run_ip(&["route", "del", &dest_str, "dev", interface, "table", &table_str]).await?;
		}
		log.push(format!("ip route del {dest} dev {interface} table {table}"));
	}
	Ok(log)
}

/// Removes every route in the table not accounted for by `expected`, and
/// the gateway default prefixes from the main table when no enabled
/// gateway peer remains.
pub async fn remove_unknown_routes(
	expected: &BTreeSet<IpNet>,
	table: u32,
	has_enabled_gateway: bool,
	dry_run: bool,
) -> Result<Vec<String>> {
	let mut log = Vec::new();

	for dest in table_destinations(table).await? {
		if expected.contains(&dest) {
			continue;
		}
		if !dry_run {
			info!(%dest, "removing unexpected route");
			run_ip(&["route", "del", &dest.to_string(), "table", &table.to_string()]).await?;
		}
		log.push(format!("ip route del {dest} table {table}"));
	}

	if !has_enabled_gateway {
		let main_dests = table_destinations(MAIN_ROUTING_TABLE).await?;
		for dest in GATEWAY_ROUTES.iter() {
			if !main_dests.contains(dest) {
				continue;
			}
			if !dry_run {
				info!(%dest, "removing gateway route");
				run_ip(&[
					"route",
					"del",
					&dest.to_string(),
					"table",
					&MAIN_ROUTING_TABLE.to_string(),
				])
				.await?;
			}
			log.push(format!("ip route del {dest} table {MAIN_ROUTING_TABLE}"));
		}
	}
	Ok(log)
}
