// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
	#[error("io: {0}")]
	Io(#[from] std::io::Error),

	#[error("protocol: {0}")]
	Protocol(#[from] serde_json::Error),

	#[error("connection closed before a response arrived")]
	ConnectionClosed,

	/// The remote side reported an error for this call.
	#[error("{code}: {message}")]
	Remote { code: String, message: String },
}

pub type Result<T> = std::result::Result<T, IpcError>;

impl From<IpcError> for vula_core::CapError {
	fn from(err: IpcError) -> Self {
		vula_core::CapError::Other(Box::new(err))
	}
}
