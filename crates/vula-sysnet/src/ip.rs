// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{Result, SysnetError};
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::trace;

/// Runs `ip` with the given arguments, returning stdout.
pub async fn run_ip(args: &[&str]) -> Result<String> {
	trace!(?args, "ip");
	let output = Command::new("ip").args(args).output().await?;
	if !output.status.success() {
		return Err(SysnetError::Command {
			command: format!("ip {}", args.join(" ")),
			status: output.status.code().unwrap_or(-1),
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		});
	}
	Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs `ip -json` and deserializes the output.
pub async fn run_ip_json<T: DeserializeOwned>(args: &[&str]) -> Result<T> {
	let mut full = vec!["-json"];
	full.extend_from_slice(args);
	let stdout = run_ip(&full).await?;
	let trimmed = stdout.trim();
	let payload = if trimmed.is_empty() { "[]" } else { trimmed };
	Ok(serde_json::from_str(payload)?)
}

/// True when the command failed because the object does not exist.
pub fn is_not_found(err: &SysnetError) -> bool {
	match err {
		SysnetError::Command { status, stderr, .. } => {
			*status != 0
				&& (stderr.contains("does not exist")
					|| stderr.contains("Cannot find device")
					|| stderr.contains("No such"))
		}
		_ => false,
	}
}
