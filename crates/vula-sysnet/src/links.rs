// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{Result, SysnetError};
use crate::ip::{is_not_found, run_ip, run_ip_json};
use crate::model::{AddrEntry, LinkEntry};
use std::net::IpAddr;
use tracing::debug;
use vula_core::constants::DUMMY_LINK_NAME;

async fn get_link(name: &str) -> Result<Option<LinkEntry>> {
	match run_ip_json::<Vec<LinkEntry>>(&["-details", "link", "show", "dev", name]).await {
		Ok(mut entries) => Ok(if entries.is_empty() { None } else { Some(entries.remove(0)) }),
		Err(err) if is_not_found(&err) => Ok(None),
		Err(err) => Err(err),
	}
}

async fn ensure_wireguard_link(name: &str, dry_run: bool) -> Result<Vec<String>> {
	let mut log = Vec::new();
	let link = get_link(name).await?;

	if link.is_none() {
		if !dry_run {
			run_ip(&["link", "add", name, "type", "wireguard"]).await?;
		}
		log.push("# create interface".to_string());
		log.push(format!("ip link add {name} type wireguard"));
	}

	let is_up = match get_link(name).await? {
		Some(link) => link.operstate == "UP" || link.operstate == "UNKNOWN",
		None => false,
	};
	if !is_up {
		if !dry_run {
			run_ip(&["link", "set", "up", name]).await?;
		}
		log.push("# bring up interface".to_string());
		log.push(format!("ip link set up {name}"));
	}
	Ok(log)
}

async fn ensure_dummy_link(name: &str, dry_run: bool) -> Result<Vec<String>> {
	if let Some(link) = get_link(name).await? {
		let kind = link.linkinfo.map(|i| i.info_kind).unwrap_or_default();
		if kind == "dummy" {
			debug!(link = name, "dummy link exists");
			return Ok(Vec::new());
		}
		return Err(SysnetError::Parse(format!(
			"link {name} exists with kind {kind}, expected dummy"
		)));
	}

	if !dry_run {
		run_ip(&["link", "add", "name", name, "type", "dummy"]).await?;
		run_ip(&["link", "set", name, "addrgenmode", "none"]).await?;
		run_ip(&["link", "set", "up", name]).await?;
	}
	Ok(vec![
		format!("ip link add name {name} type dummy"),
		format!("ip link set dev {name} addrgenmode none"),
	])
}

async fn ensure_addr(link: &str, addr: IpAddr, dry_run: bool) -> Result<Vec<String>> {
	let entries: Vec<AddrEntry> = run_ip_json(&["addr", "show", "dev", link]).await?;
	let prefix_len = if addr.is_ipv4() { 32 } else { 128 };
	let present = entries.iter().any(|entry| {
		entry
			.addr_info
			.iter()
			.any(|info| info.local == addr && info.prefixlen == prefix_len)
	});
	if present {
		return Ok(Vec::new());
	}

	let cidr = format!("{addr}/{prefix_len}");
	if !dry_run {
		run_ip(&["addr", "add", &cidr, "dev", link]).await?;
	}
	Ok(vec![format!("ip addr add {cidr} dev {link}")])
}

/// Brings up the WireGuard link and the dummy companion, and assigns the
/// primary IP on the dummy.
pub async fn sync_interfaces(
	wg_link: &str,
	primary_ip: Option<IpAddr>,
	dry_run: bool,
) -> Result<Vec<String>> {
	let mut log = ensure_wireguard_link(wg_link, dry_run).await?;
	log.extend(ensure_dummy_link(DUMMY_LINK_NAME, dry_run).await?);
	if let Some(primary_ip) = primary_ip {
		log.extend(ensure_addr(DUMMY_LINK_NAME, primary_ip, dry_run).await?);
	}
	Ok(log)
}
