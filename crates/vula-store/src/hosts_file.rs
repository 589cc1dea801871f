// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::atomic::AtomicDir;
use std::path::PathBuf;
use vula_core::system::HostsStore;
use vula_core::CapResult;

/// World-readable hosts projection, one `address name` line per entry.
pub struct HostsFileStore {
	path: PathBuf,
	writer: AtomicDir,
}

impl HostsFileStore {
	pub fn new(path: impl Into<PathBuf>, writer: AtomicDir) -> Self {
		Self {
			path: path.into(),
			writer,
		}
	}
}

impl HostsStore for HostsFileStore {
	fn write_hosts(&self, entries: &[(String, String)]) -> CapResult<()> {
		let mut content = String::new();
		for (address, name) in entries {
			content.push_str(address);
			content.push(' ');
			content.push_str(name);
			content.push('\n');
		}
		self.writer
			.write(&self.path, content.as_bytes(), 0o644)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::os::unix::fs::PermissionsExt;
	use tempfile::TempDir;

	#[test]
	fn writes_one_line_per_entry_mode_0644() {
		let dir = TempDir::new().unwrap();
		let store = HostsFileStore::new(dir.path().join("hosts"), AtomicDir::new(dir.path()));

		store
			.write_hosts(&[
				("10.89.0.2".into(), "test1.local.".into()),
				("10.89.0.3".into(), "test2.local.".into()),
			])
			.unwrap();

		let content = fs::read_to_string(dir.path().join("hosts")).unwrap();
		assert_eq!(content, "10.89.0.2 test1.local.\n10.89.0.3 test2.local.\n");

		let mode = fs::metadata(dir.path().join("hosts")).unwrap().permissions().mode() & 0o777;
		assert_eq!(mode, 0o644);
	}

	#[test]
	fn empty_projection_truncates_the_file() {
		let dir = TempDir::new().unwrap();
		let store = HostsFileStore::new(dir.path().join("hosts"), AtomicDir::new(dir.path()));
		store.write_hosts(&[("10.0.0.1".into(), "a.local.".into())]).unwrap();
		store.write_hosts(&[]).unwrap();
		assert_eq!(fs::read_to_string(dir.path().join("hosts")).unwrap(), "");
	}
}
