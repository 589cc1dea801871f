// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MdnsError {
	#[error("mdns: {0}")]
	Mdns(#[from] mdns_sd::Error),

	#[error("descriptor: {0}")]
	Codec(#[from] vula_codec::CodecError),
}

pub type Result<T> = std::result::Result<T, MdnsError>;

impl From<MdnsError> for vula_core::CapError {
	fn from(err: MdnsError) -> Self {
		vula_core::CapError::Other(Box::new(err))
	}
}
