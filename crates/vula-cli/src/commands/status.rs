// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::systemd::SystemctlInspector;
use clap::Args;
use std::path::PathBuf;
use vula_core::constants::DEFAULT_ORGANIZE_SOCKET;
use vula_organize::status_report;

#[derive(Args, Default)]
pub struct StatusArgs {
	/// Only print systemd service status
	#[arg(short = 's', long)]
	pub only_systemd: bool,

	/// Organize IPC socket
	#[arg(long, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub socket: PathBuf,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
	let socket = if args.socket.as_os_str().is_empty() {
		PathBuf::from(DEFAULT_ORGANIZE_SOCKET)
	} else {
		args.socket.clone()
	};
	let ipc_present = !args.only_systemd && socket.exists();
	let report = status_report(&SystemctlInspector, ipc_present).await;
	print!("{report}");
	Ok(())
}
