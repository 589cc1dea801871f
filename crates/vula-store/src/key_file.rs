// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::atomic::AtomicDir;
use crate::error::StoreError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use vula_core::{CapError, CapResult};
use vula_crypto::{KeyStore, Keys};

/// The 0600 key file. Damaged files are renamed to `<name>_.bad.<epoch>`
/// before regeneration so no key material is ever overwritten.
pub struct KeyFileStore {
	path: PathBuf,
	writer: AtomicDir,
}

impl KeyFileStore {
	pub fn new(path: impl Into<PathBuf>, writer: AtomicDir) -> Self {
		Self {
			path: path.into(),
			writer,
		}
	}

	fn tighten_mode(&self) -> std::io::Result<()> {
		fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
	}
}

impl KeyStore for KeyFileStore {
	fn read(&self) -> CapResult<Keys> {
		match self.tighten_mode() {
			Ok(()) => {}
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				return Err(CapError::NotFound)
			}
			Err(err) => return Err(StoreError::Io(err).into()),
		}

		let data = fs::read_to_string(&self.path).map_err(StoreError::Io)?;
		let keys: Keys = serde_yaml::from_str(&data)
			.map_err(|e| CapError::msg(format!("key file is malformed: {e}")))?;
		debug!(path = %self.path.display(), "loaded key file");
		Ok(keys)
	}

	fn write(&self, keys: &Keys) -> CapResult<()> {
		let data = serde_yaml::to_string(keys).map_err(StoreError::Serialize)?;
		self.writer
			.write(&self.path, data.as_bytes(), 0o600)
			.map_err(Into::into)
	}

	fn move_damaged_aside(&self) -> CapResult<()> {
		let epoch = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs())
			.unwrap_or(0);
		let aside = PathBuf::from(format!("{}_.bad.{}", self.path.display(), epoch));
		warn!(from = %self.path.display(), to = %aside.display(), "moving damaged key file aside");
		match fs::rename(&self.path, &aside) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(StoreError::Io(err).into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;
	use vula_crypto::{load_or_generate, XdhEngine};

	fn store(dir: &TempDir) -> KeyFileStore {
		KeyFileStore::new(dir.path().join("keys.yaml"), AtomicDir::new(dir.path()))
	}

	#[test]
	fn missing_file_reports_not_found() {
		let dir = TempDir::new().unwrap();
		assert!(matches!(store(&dir).read(), Err(CapError::NotFound)));
	}

	#[test]
	fn write_then_read_round_trips_with_0600() {
		let dir = TempDir::new().unwrap();
		let s = store(&dir);
		let keys = Keys::generate(&XdhEngine).unwrap();

		s.write(&keys).unwrap();
		assert_eq!(s.read().unwrap(), keys);

		let mode = fs::metadata(dir.path().join("keys.yaml")).unwrap().permissions().mode() & 0o777;
		assert_eq!(mode, 0o600);
	}

	#[test]
	fn read_tightens_loose_permissions() {
		let dir = TempDir::new().unwrap();
		let s = store(&dir);
		s.write(&Keys::generate(&XdhEngine).unwrap()).unwrap();
		fs::set_permissions(
			dir.path().join("keys.yaml"),
			fs::Permissions::from_mode(0o644),
		)
		.unwrap();

		s.read().unwrap();
		let mode = fs::metadata(dir.path().join("keys.yaml")).unwrap().permissions().mode() & 0o777;
		assert_eq!(mode, 0o600);
	}

	#[test]
	fn corrupt_file_is_renamed_aside_and_regenerated() {
		let dir = TempDir::new().unwrap();
		let s = store(&dir);
		fs::write(dir.path().join("keys.yaml"), "not: [yaml for keys").unwrap();

		let keys = load_or_generate(&s, &XdhEngine).unwrap();
		assert_eq!(s.read().unwrap(), keys);

		let aside = fs::read_dir(dir.path())
			.unwrap()
			.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
			.find(|name| name.contains("_.bad."));
		assert!(aside.is_some(), "damaged file should be renamed aside");
	}
}
