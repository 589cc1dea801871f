// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::Args;
use std::path::PathBuf;
use vula_core::constants::DEFAULT_ORGANIZE_SOCKET;
use vula_ipc::OrganizeClient;

#[derive(Args)]
pub struct RepairArgs {
	/// Print what would be done, without doing it
	#[arg(short = 'n', long)]
	pub dry_run: bool,

	/// Organize IPC socket
	#[arg(long, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub socket: PathBuf,
}

/// `vula repair`: ask the organizer for a full sync and print its log.
pub async fn run_repair(args: RepairArgs) -> anyhow::Result<()> {
	let client = OrganizeClient::new(&args.socket);
	let log = client.sync(args.dry_run).await?;
	if !log.is_empty() {
		println!("{}", log.join("\n"));
	}
	Ok(())
}

#[derive(Args)]
pub struct RediscoverArgs {
	/// Organize IPC socket
	#[arg(long, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub socket: PathBuf,
}

pub async fn run_rediscover(args: RediscoverArgs) -> anyhow::Result<()> {
	let client = OrganizeClient::new(&args.socket);
	println!("Discovering on {}", client.rediscover().await?);
	Ok(())
}

#[derive(Args)]
pub struct ReleaseGatewayArgs {
	/// Organize IPC socket
	#[arg(long, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub socket: PathBuf,
}

/// `vula release-gateway`: stop using vula for the default route. Needed
/// to roam to a non-vula gateway after using a pinned peer as gateway.
pub async fn run_release_gateway(args: ReleaseGatewayArgs) -> anyhow::Result<()> {
	let client = OrganizeClient::new(&args.socket);
	println!("{}", client.release_gateway().await?);
	Ok(())
}
