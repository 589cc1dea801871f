// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Thin mDNS adapters: the discover daemon browsing for peer descriptors
//! and the publish daemon announcing ours, both on the
//! `_opabinia._udp` service in `local.`.

mod discover;
mod error;
mod publish;

pub use discover::{DescriptorSink, Discover};
pub use error::{MdnsError, Result};
pub use publish::Publish;
