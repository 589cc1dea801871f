// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::atomic::AtomicDir;
use crate::error::StoreError;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};
use vula_core::system::StateStore;
use vula_core::{CapResult, OrganizeState};

/// YAML state document on disk. Loading an absent file yields defaults;
/// a malformed file fails loudly rather than silently resetting state.
pub struct StateFileStore {
	path: PathBuf,
	writer: AtomicDir,
}

impl StateFileStore {
	pub fn new(path: impl Into<PathBuf>, writer: AtomicDir) -> Self {
		Self {
			path: path.into(),
			writer,
		}
	}
}

impl StateStore for StateFileStore {
	fn load(&self) -> CapResult<OrganizeState> {
		debug!(path = %self.path.display(), "loading state file");
		let data = match fs::read_to_string(&self.path) {
			Ok(data) => data,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				info!("no state file, starting from defaults");
				return Ok(OrganizeState::new());
			}
			Err(err) => return Err(StoreError::Io(err).into()),
		};

		let state: OrganizeState = serde_yaml::from_str(&data)
			.map_err(|e| StoreError::MalformedState(e.to_string()))?;
		if !state.event_log.is_empty() {
			info!(entries = state.event_log.len(), "event_log carried forward");
		}
		Ok(state)
	}

	fn save(&self, state: &OrganizeState) -> CapResult<()> {
		let data = serde_yaml::to_string(state).map_err(StoreError::Serialize)?;
		self.writer
			.write(&self.path, data.as_bytes(), 0o600)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::os::unix::fs::PermissionsExt;
	use tempfile::TempDir;
	use vula_core::{CapError, Peer};

	fn store(dir: &TempDir) -> StateFileStore {
		StateFileStore::new(
			dir.path().join("vula-organize.yaml"),
			AtomicDir::new(dir.path()),
		)
	}

	#[test]
	fn absent_file_yields_defaults() {
		let dir = TempDir::new().unwrap();
		let state = store(&dir).load().unwrap();
		assert!(state.peers.is_empty());
		assert!(state.prefs.auto_repair);
	}

	#[test]
	fn save_then_load_round_trips() {
		let dir = TempDir::new().unwrap();
		let s = store(&dir);

		let mut state = OrganizeState::new();
		let mut descriptor = vula_core::Descriptor::default();
		descriptor.hostname = "test.local.".into();
		descriptor.verify_key = vec![5; 32];
		let peer = Peer::from_descriptor(descriptor);
		state.peers.insert(peer.id(), peer);

		s.save(&state).unwrap();
		let loaded = s.load().unwrap();
		assert_eq!(state, loaded);
	}

	#[test]
	fn state_file_mode_is_0600() {
		let dir = TempDir::new().unwrap();
		let s = store(&dir);
		s.save(&OrganizeState::new()).unwrap();
		let mode = fs::metadata(dir.path().join("vula-organize.yaml"))
			.unwrap()
			.permissions()
			.mode() & 0o777;
		assert_eq!(mode, 0o600);
	}

	#[test]
	fn malformed_file_fails_loudly() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("vula-organize.yaml"), "prefs: [not a map").unwrap();
		let err = store(&dir).load().unwrap_err();
		assert!(matches!(err, CapError::Other(_)));
		assert!(err.to_string().contains("malformed"));
	}
}
