// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! On-disk persistence: the organizer state document, the hosts
//! projection, and the key file. Every write goes through the confined
//! atomic writer.

mod atomic;
mod error;
mod hosts_file;
mod key_file;
mod state_file;

pub use atomic::AtomicDir;
pub use error::{StoreError, Result};
pub use hosts_file::HostsFileStore;
pub use key_file::KeyFileStore;
pub use state_file::StateFileStore;
