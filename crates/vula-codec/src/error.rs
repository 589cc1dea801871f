// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
	#[error("field without separator: {0}")]
	MissingSeparator(String),

	#[error("unknown descriptor key: {0}")]
	UnknownKey(String),

	#[error("invalid value for {key}: {reason}")]
	InvalidValue { key: &'static str, reason: String },

	#[error("missing required field: {0}")]
	MissingField(&'static str),

	#[error("unterminated escape sequence")]
	OpenEscape,

	#[error("escape sequence out of range: {0}")]
	EscapeOutOfRange(u32),

	#[error("invalid escape digit: {0}")]
	BadEscapeDigit(char),

	#[error("address field of {len} bytes is not a multiple of {size}")]
	BadAddressBytes { len: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
