// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `vula` command: daemons, peer and prefs management, and the
//! status probe. With no arguments it behaves as `vula status`.

mod commands;
mod systemd;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
	name = "vula",
	version,
	about = "vula tools\n\nWith no arguments, runs \"status\"."
)]
struct Cli {
	/// Set log level DEBUG
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Layer 3 mDNS discovery daemon
	Discover(commands::discover::DiscoverArgs),
	/// Maintain routes and wg peer configurations
	Organize(commands::organize::OrganizeArgs),
	/// View and modify peer information
	Peer(commands::peer::PeerCmd),
	/// View and modify preferences
	Prefs(commands::prefs::PrefsCmd),
	/// Layer 3 mDNS publish daemon
	Publish(commands::publish::PublishArgs),
	/// Print status of systemd services and system configuration
	Status(commands::status::StatusArgs),
	/// Ensure that system is configured correctly
	Repair(commands::repair::RepairArgs),
	/// Tell organize to ask discover for more peers
	Rediscover(commands::repair::RediscoverArgs),
	/// Stop using vula for the default route
	ReleaseGateway(commands::repair::ReleaseGatewayArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let default_level = if cli.verbose { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.init();

	match cli.command {
		Some(Commands::Discover(args)) => commands::discover::run(args).await,
		Some(Commands::Organize(args)) => commands::organize::run(args).await,
		Some(Commands::Peer(cmd)) => commands::peer::run(cmd).await,
		Some(Commands::Prefs(cmd)) => commands::prefs::run(cmd).await,
		Some(Commands::Publish(args)) => commands::publish::run(args).await,
		Some(Commands::Status(args)) => commands::status::run(args).await,
		Some(Commands::Repair(args)) => commands::repair::run_repair(args).await,
		Some(Commands::Rediscover(args)) => commands::repair::run_rediscover(args).await,
		Some(Commands::ReleaseGateway(args)) => commands::repair::run_release_gateway(args).await,
		None => commands::status::run(commands::status::StatusArgs::default()).await,
	}
}
