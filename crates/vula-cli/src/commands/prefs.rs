// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::{Args, Subcommand};
use std::path::PathBuf;
use vula_core::constants::DEFAULT_ORGANIZE_SOCKET;
use vula_ipc::OrganizeClient;

#[derive(Args)]
pub struct PrefsCmd {
	/// Organize IPC socket
	#[arg(long, global = true, default_value = DEFAULT_ORGANIZE_SOCKET)]
	pub socket: PathBuf,

	#[command(subcommand)]
	pub command: PrefsCommands,
}

#[derive(Subcommand)]
pub enum PrefsCommands {
	/// Show preferences
	Show,
	/// Set a preference to a value
	Set { pref: String, value: String },
	/// Add a value to a list preference
	Add { pref: String, value: String },
	/// Remove a value from a list preference
	Remove { pref: String, value: String },
}

pub async fn run(cmd: PrefsCmd) -> anyhow::Result<()> {
	let client = OrganizeClient::new(&cmd.socket);
	let output = match cmd.command {
		PrefsCommands::Show => client.show_prefs().await?,
		PrefsCommands::Set { pref, value } => client.set_pref(&pref, &value).await?,
		PrefsCommands::Add { pref, value } => client.add_pref(&pref, &value).await?,
		PrefsCommands::Remove { pref, value } => client.remove_pref(&pref, &value).await?,
	};
	println!("{output}");
	Ok(())
}
