// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator-facing rendering of peers and prefs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use console::style;
use std::fmt::Write as _;
use vula_core::{Peer, WgPeerStats};

/// Formats a second count the way `wg show` presents ages.
pub fn format_duration(total_seconds: i64) -> String {
	let total_seconds = total_seconds.max(0);
	let hours = total_seconds / 3600;
	let minutes = (total_seconds % 3600) / 60;
	let seconds = total_seconds % 60;
	format!("{hours}:{minutes:02}:{seconds:02}")
}

/// The `peer show` block for one peer.
pub fn show_peer(peer: &Peer, stats: Option<WgPeerStats>, now: i64) -> String {
	let mut out = String::new();

	let header = if peer.pinned && peer.verified {
		style(peer.name()).green()
	} else {
		style(peer.name()).yellow()
	};
	let _ = writeln!(out, "{}: {}", style("peer").bold(), header);
	let _ = writeln!(out, "  {}: {}", style("id").bold(), peer.id());

	let mut status_parts: Vec<String> = Vec::new();
	status_parts.push(if peer.enabled {
		style("enabled").green().to_string()
	} else {
		style("disabled").red().to_string()
	});
	status_parts.push(if peer.pinned {
		style("pinned").green().to_string()
	} else {
		style("unpinned").yellow().to_string()
	});
	status_parts.push(if peer.verified {
		style("verified").green().to_string()
	} else if peer.pinned {
		style("unverified").red().to_string()
	} else {
		style("unverified").yellow().to_string()
	});
	if peer.use_as_gateway {
		status_parts.push(style("gateway").blue().bold().to_string());
	}
	let _ = writeln!(out, "  {}: {}", style("status").bold(), status_parts.join(" "));

	if let Some(endpoint) = peer.endpoint() {
		let _ = writeln!(out, "  {}: {}", style("endpoint").bold(), endpoint);
	}

	let allowed: Vec<String> = peer.wg_allowed_ips().iter().map(|n| n.to_string()).collect();
	let _ = writeln!(out, "  {}: {}", style("allowed ips").bold(), allowed.join(", "));

	let disabled = peer.ips(false);
	if !disabled.is_empty() {
		let joined: Vec<String> = disabled.iter().map(|ip| ip.to_string()).collect();
		let _ = writeln!(out, "  {}: {}", style("disabled ips").bold(), joined.join(", "));
	}

	let signature_age = format_duration(now - peer.descriptor.valid_start);
	let _ = writeln!(
		out,
		"  {}: {} ago",
		style("latest signature").bold(),
		signature_age
	);

	match stats.as_ref().and_then(|s| s.latest_handshake) {
		Some(handshake) => {
			let _ = writeln!(
				out,
				"  {}: {} ago",
				style("latest handshake").bold(),
				format_duration(now - handshake)
			);
		}
		None => {
			let _ = writeln!(
				out,
				"  {}: {}",
				style("latest handshake").bold(),
				style("none").yellow()
			);
		}
	}

	let (rx, tx) = stats.map(|s| (s.rx_bytes, s.tx_bytes)).unwrap_or((0, 0));
	let _ = writeln!(
		out,
		"  {}: {} received, {} sent",
		style("transfer").bold(),
		rx,
		tx
	);

	let _ = writeln!(
		out,
		"  {}: {}",
		style("wg pubkey").bold(),
		STANDARD.encode(&peer.descriptor.wg_pk)
	);

	let other_names = peer.other_names();
	if !other_names.is_empty() {
		let _ = writeln!(
			out,
			"  {}: {}",
			style("other names").bold(),
			other_names.join(", ")
		);
	}

	out
}
