// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("path {path} escapes base directory {base}")]
	OutsideBaseDir { path: PathBuf, base: PathBuf },

	#[error("state file is malformed: {0}")]
	MalformedState(String),

	#[error("serialization failed: {0}")]
	Serialize(#[from] serde_yaml::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for vula_core::CapError {
	fn from(err: StoreError) -> Self {
		match err {
			StoreError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
				vula_core::CapError::NotFound
			}
			other => vula_core::CapError::Other(Box::new(other)),
		}
	}
}
