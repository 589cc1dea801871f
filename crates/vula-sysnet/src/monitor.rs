// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Classifies one `ip monitor` line for the coalescing refresh. The label
/// only feeds log output; precision is not required.
pub fn classify(line: &str) -> &'static str {
	if line.contains(" inet ") || line.contains(" inet6 ") {
		"address"
	} else {
		"route"
	}
}

/// Spawns `ip monitor address route` and forwards one labeled message per
/// change line. The child is killed when the receiver goes away.
pub async fn subscribe() -> Result<mpsc::Receiver<String>> {
	let mut child = Command::new("ip")
		.args(["monitor", "address", "route"])
		.stdout(Stdio::piped())
		.stderr(Stdio::null())
		.kill_on_drop(true)
		.spawn()?;

	let stdout = child
		.stdout
		.take()
		.expect("stdout was requested as piped");
	let (tx, rx) = mpsc::channel(255);

	tokio::spawn(async move {
		let mut lines = BufReader::new(stdout).lines();
		loop {
			match lines.next_line().await {
				Ok(Some(line)) => {
					let label = classify(&line);
					debug!(label, line = line.trim(), "netlink change");
					if tx.send(label.to_string()).await.is_err() {
						break;
					}
				}
				Ok(None) => {
					warn!("ip monitor exited");
					break;
				}
				Err(e) => {
					warn!(error = %e, "ip monitor read failed");
					break;
				}
			}
		}
		drop(child);
	});

	Ok(rx)
}
