// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Descriptor wire codecs: the canonical sorted text form used for
//! signatures and IPC, and the mDNS TXT projection with raw-byte address
//! fields.

mod canonical;
mod error;
mod freshness;
mod txt;

pub use canonical::{parse_descriptor, serialize_descriptor, signing_buffer};
pub use error::{CodecError, Result};
pub use freshness::is_fresh;
pub use txt::{decode_txt_escapes, descriptor_from_txt, descriptor_to_txt};
