// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizeError {
	#[error("peer with {key} = '{value}' not found")]
	PeerNotFound { key: &'static str, value: String },

	#[error("no such key in state: {0}")]
	UnknownKey(String),

	#[error("invalid prefs: {0}")]
	InvalidPrefs(String),

	#[error("invalid value: {0}")]
	InvalidValue(String),

	#[error("unknown filter \"{0}\"")]
	UnknownFilter(String),

	#[error(transparent)]
	Parse(#[from] vula_codec::CodecError),

	#[error(transparent)]
	Crypto(#[from] vula_crypto::CryptoError),

	#[error(transparent)]
	Capability(#[from] vula_core::CapError),

	#[error("serialization failed: {0}")]
	Serialize(#[from] serde_yaml::Error),

	/// Invariant violation. The organizer refuses the operation; this is
	/// never recovered from silently.
	#[error("invariant violation: {0}")]
	Bug(String),

	/// Collected trigger failures. State has already committed; the next
	/// sync is expected to converge.
	#[error("{}", .0.join("; "))]
	Compound(Vec<String>),

	#[error("organizer is shutting down")]
	Shutdown,
}

pub type Result<T> = std::result::Result<T, OrganizeError>;
