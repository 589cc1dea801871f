// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SysnetError {
	#[error("command `{command}` failed ({status}): {stderr}")]
	Command {
		command: String,
		status: i32,
		stderr: String,
	},

	#[error("could not parse iproute output: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unexpected iproute output: {0}")]
	Parse(String),

	#[error("wireguard device {device}: {source}")]
	WireGuard {
		device: String,
		source: std::io::Error,
	},

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SysnetError>;

impl From<SysnetError> for vula_core::CapError {
	fn from(err: SysnetError) -> Self {
		vula_core::CapError::Other(Box::new(err))
	}
}
