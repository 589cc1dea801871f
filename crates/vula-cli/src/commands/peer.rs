// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use vula_core::constants::DEFAULT_ORGANIZE_SOCKET;
use vula_ipc::OrganizeClient;

#[derive(Args)]
pub struct PeerCmd {
	/// Organize IPC socket
	#[arg(long, global = true, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub socket: PathBuf,

	#[command(subcommand)]
	pub command: PeerCommands,
}

#[derive(Subcommand)]
pub enum PeerCommands {
	/// Show peer information
	///
	/// With no arguments, all enabled peers are shown. Peer arguments can
	/// be specified as ID, name, or IP.
	Show(PeerShowArgs),
	/// Import peer descriptors
	///
	/// Reads from standard input if a file is not specified. Prints the
	/// result of processing each descriptor.
	Import(PeerImportArgs),
	/// Add and remove peer addresses
	Addr(PeerAddrCmd),
	/// Modify arbitrary peer properties
	///
	/// This is currently the only way to verify peers, enable and disable
	/// them, and enable or disable IP addresses.
	Set(PeerSetArgs),
	/// Remove a peer
	Remove(PeerRemoveArgs),
}

#[derive(Args)]
pub struct PeerShowArgs {
	/// Print peer descriptor(s) instead of status
	#[arg(short = 'D', long)]
	pub descriptor: bool,

	/// Show both enabled and disabled peers
	#[arg(short, long)]
	pub all: bool,

	/// Show only disabled peers
	#[arg(short, long)]
	pub disabled: bool,

	/// Peers to show
	pub peers: Vec<String>,
}

#[derive(Args)]
pub struct PeerImportArgs {
	/// File containing peer descriptors, one per line
	pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct PeerAddrCmd {
	#[command(subcommand)]
	pub command: PeerAddrCommands,
}

#[derive(Subcommand)]
pub enum PeerAddrCommands {
	/// Add an address to a peer
	Add { vk: String, ip: String },
	/// Delete an address from a peer
	Rm { vk: String, ip: String },
}

#[derive(Args)]
pub struct PeerSetArgs {
	/// Peer verify key
	pub vk: String,

	/// Property path followed by the value to set
	#[arg(required = true, num_args = 2..)]
	pub path_and_value: Vec<String>,
}

#[derive(Args)]
pub struct PeerRemoveArgs {
	/// Peer verify key
	pub vk: String,
}

pub async fn run(cmd: PeerCmd) -> anyhow::Result<()> {
	let client = OrganizeClient::new(&cmd.socket);
	match cmd.command {
		PeerCommands::Show(args) => show(&client, args).await,
		PeerCommands::Import(args) => import(&client, args).await,
		PeerCommands::Addr(addr) => match addr.command {
			PeerAddrCommands::Add { vk, ip } => {
				println!("{}", client.peer_addr_add(&vk, &ip).await?);
				Ok(())
			}
			PeerAddrCommands::Rm { vk, ip } => {
				println!("{}", client.peer_addr_del(&vk, &ip).await?);
				Ok(())
			}
		},
		PeerCommands::Set(mut args) => {
			let value = args
				.path_and_value
				.pop()
				.context("a value is required after the path")?;
			println!(
				"{}",
				client.set_peer(&args.vk, &args.path_and_value, &value).await?
			);
			Ok(())
		}
		PeerCommands::Remove(args) => {
			println!("{}", client.remove_peer(&args.vk).await?);
			Ok(())
		}
	}
}

async fn show(client: &OrganizeClient, args: PeerShowArgs) -> anyhow::Result<()> {
	let queries = if args.peers.is_empty() {
		let which = if args.all {
			"all"
		} else if args.disabled {
			"disabled"
		} else {
			"enabled"
		};
		client.peer_ids(which).await?
	} else {
		args.peers.clone()
	};

	if queries.is_empty() {
		bail!("no peers");
	}

	for query in queries {
		if args.descriptor {
			println!("{}", client.peer_descriptor(&query).await?);
		} else {
			println!("{}", client.show_peer(&query).await?);
		}
	}
	Ok(())
}

async fn import(client: &OrganizeClient, args: PeerImportArgs) -> anyhow::Result<()> {
	let content = match args.file {
		Some(path) => tokio::fs::read_to_string(&path)
			.await
			.with_context(|| format!("reading {}", path.display()))?,
		None => {
			let mut buffer = String::new();
			tokio::io::stdin().read_to_string(&mut buffer).await?;
			buffer
		}
	};

	for line in content.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		println!("{}", client.process_descriptor_string(line).await?);
	}
	Ok(())
}
