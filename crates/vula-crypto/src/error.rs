// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
	/// Key material of the wrong size reached a primitive. Programmer
	/// error; treated as fatal by the caller.
	#[error("invalid {what} length: expected {expected} bytes, got {got}")]
	InvalidLength {
		what: &'static str,
		expected: usize,
		got: usize,
	},

	#[error("signature verification failed")]
	BadSignature,

	#[error("key derivation failed: {0}")]
	Derivation(String),

	#[error("key store: {0}")]
	Store(#[from] vula_core::CapError),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
