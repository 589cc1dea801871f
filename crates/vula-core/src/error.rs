// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Error type crossing the capability trait boundary.
///
/// Adapters keep their own rich error enums; the organizer only needs to
/// report the failure on the originating event, so everything funnels into
/// this one type at the trait seam.
#[derive(Debug, Error)]
pub enum CapError {
	#[error("{0}")]
	Message(String),

	/// The backing resource does not exist yet (state or key file on first
	/// run). Callers fall back to defaults or regeneration.
	#[error("not found")]
	NotFound,

	#[error(transparent)]
	Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl CapError {
	pub fn msg(message: impl Into<String>) -> Self {
		Self::Message(message.into())
	}
}

impl From<std::io::Error> for CapError {
	fn from(err: std::io::Error) -> Self {
		Self::Other(Box::new(err))
	}
}

pub type CapResult<T> = std::result::Result<T, CapError>;
