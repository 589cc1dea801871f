// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service-manager inspection via `systemctl show`.

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::process::Command;
use vula_core::system::{UnitInspector, UnitStatus};
use vula_core::{CapError, CapResult};

/// The fields read from one unit.
#[derive(Debug, Default, PartialEq)]
pub struct UnitShow {
	pub active_state: String,
	pub load_state: String,
	pub unit_file_state: String,
	pub state_change_monotonic_usec: Option<u64>,
}

/// Parses `systemctl show -p ...` key=value output.
pub fn parse_unit_show(output: &str) -> UnitShow {
	let mut show = UnitShow::default();
	for line in output.lines() {
		let Some((key, value)) = line.split_once('=') else {
			continue;
		};
		match key {
			"ActiveState" => show.active_state = value.to_string(),
			"LoadState" => show.load_state = value.to_string(),
			"UnitFileState" => show.unit_file_state = value.to_string(),
			"StateChangeTimestampMonotonic" => {
				show.state_change_monotonic_usec = value.parse().ok();
			}
			_ => {}
		}
	}
	show
}

/// Maps the raw fields to the probe's status vocabulary: `disabled` for
/// missing units, `activatable` for loadable-but-inactive ones.
pub fn summarize(show: &UnitShow) -> String {
	if show.load_state == "not-found" {
		return "disabled".to_string();
	}
	if show.active_state != "active"
		&& matches!(show.unit_file_state.as_str(), "enabled" | "static" | "linked")
	{
		return "activatable".to_string();
	}
	show.active_state.clone()
}

fn monotonic_to_epoch(monotonic_usec: u64, uptime_secs: f64, now_epoch: i64) -> Option<i64> {
	if monotonic_usec == 0 {
		return None;
	}
	let seconds_ago = uptime_secs - (monotonic_usec as f64 / 1_000_000.0);
	if seconds_ago < 0.0 {
		return None;
	}
	Some(now_epoch - seconds_ago as i64)
}

pub struct SystemctlInspector;

#[async_trait]
impl UnitInspector for SystemctlInspector {
	async fn unit_status(&self, unit: &str) -> CapResult<UnitStatus> {
		let output = Command::new("systemctl")
			.args([
				"show",
				unit,
				"--property=ActiveState,LoadState,UnitFileState,StateChangeTimestampMonotonic",
			])
			.output()
			.await
			.map_err(|e| CapError::msg(format!("systemctl: {e}")))?;
		if !output.status.success() {
			return Err(CapError::msg(format!(
				"systemctl show {unit} failed: {}",
				String::from_utf8_lossy(&output.stderr).trim()
			)));
		}

		let show = parse_unit_show(&String::from_utf8_lossy(&output.stdout));
		let state = summarize(&show);

		let since_epoch = match show.state_change_monotonic_usec {
			Some(usec) => {
				let uptime = tokio::fs::read_to_string("/proc/uptime").await.ok();
				let uptime_secs = uptime
					.and_then(|s| s.split_whitespace().next().map(str::to_string))
					.and_then(|s| s.parse::<f64>().ok());
				let now = SystemTime::now()
					.duration_since(UNIX_EPOCH)
					.map(|d| d.as_secs() as i64)
					.unwrap_or(0);
				uptime_secs.and_then(|u| monotonic_to_epoch(usec, u, now))
			}
			None => None,
		};

		Ok(UnitStatus {
			state,
			since_epoch,
			detail: String::new(),
		})
	}
}
