// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `status` probe: service-manager unit states plus IPC presence,
//! rendered as colorized bracketed prefixes.

use crate::event::now_epoch;
use crate::render::format_duration;
use console::style;
use std::fmt::Write as _;
use vula_core::constants::SYSTEMD_UNITS;
use vula_core::system::UnitInspector;

fn center(text: &str, width: usize) -> String {
	if text.len() >= width {
		return format!("{text:<width$}");
	}
	let pad = width - text.len();
	let left = pad / 2;
	format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

fn status_line(state: &str, text: &str) -> String {
	let label = center(state, 8);
	let colored = match state {
		"active" => style(label).green(),
		"inactive" | "activatable" | "disabled" => style(label).yellow(),
		_ => style(label).red(),
	};
	format!("[{colored}] {text}")
}

/// Queries the three vula units and the organizer's IPC socket, returning
/// one bracketed status line each.
pub async fn status_report(inspector: &dyn UnitInspector, ipc_present: bool) -> String {
	let now = now_epoch();
	let mut out = String::new();

	for unit in SYSTEMD_UNITS {
		let line = match inspector.unit_status(unit).await {
			Ok(status) => {
				let mut text = unit.to_string();
				if status.state == "active" {
					if let Some(since) = status.since_epoch {
						text = format!("{unit:<35} ({})", format_duration(now - since));
					}
				}
				if !status.detail.is_empty() {
					text = format!("{text} ({})", status.detail);
				}
				status_line(&status.state, &text)
			}
			Err(e) => status_line("error", &format!("{unit} ({e})")),
		};
		let _ = writeln!(out, "{line}");
	}

	if ipc_present {
		let _ = writeln!(out, "{}", status_line("active", "organize ipc socket"));
	}

	out
}
