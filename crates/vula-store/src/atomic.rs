// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{Result, StoreError};
use nix::unistd::{chown, geteuid, Gid, Uid};
use std::fs;
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Atomic writer confined to one base directory. Any target outside the
/// directory is refused before any filesystem work happens.
#[derive(Clone, Debug)]
pub struct AtomicDir {
	base: PathBuf,
}

impl AtomicDir {
	pub fn new(base: impl Into<PathBuf>) -> Self {
		Self { base: base.into() }
	}

	pub fn base(&self) -> &Path {
		&self.base
	}

	fn check_confined(&self, path: &Path) -> Result<PathBuf> {
		let mut clean = PathBuf::new();
		for component in path.components() {
			match component {
				Component::CurDir => {}
				Component::ParentDir => {
					return Err(StoreError::OutsideBaseDir {
						path: path.to_path_buf(),
						base: self.base.clone(),
					})
				}
				other => clean.push(other),
			}
		}
		if !clean.starts_with(&self.base) {
			return Err(StoreError::OutsideBaseDir {
				path: path.to_path_buf(),
				base: self.base.clone(),
			});
		}
		Ok(clean)
	}

	/// Writes `data` to `path`: temp file in the same directory, fsync,
	/// chmod, then rename over the target. A previously-good regular file
	/// survives as `<path>.previous`.
	pub fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
		let path = self.check_confined(path)?;
		let dir = path.parent().unwrap_or(&self.base);
		fs::create_dir_all(dir)?;

		let mut tmp = NamedTempFile::new_in(dir)?;
		tmp.write_all(data)?;
		tmp.as_file()
			.set_permissions(fs::Permissions::from_mode(mode))?;
		tmp.as_file().sync_all()?;

		match fs::metadata(&path) {
			Ok(meta) if meta.is_file() => {
				let previous = path.with_extension(previous_extension(&path));
				fs::rename(&path, &previous)?;
			}
			_ => {}
		}

		tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
		chown_like_dir_if_root(&path)?;
		debug!(path = %path.display(), mode = format_args!("{mode:o}"), "wrote file atomically");
		Ok(())
	}
}

fn previous_extension(path: &Path) -> String {
	match path.extension().and_then(|e| e.to_str()) {
		Some(ext) => format!("{ext}.previous"),
		None => "previous".to_string(),
	}
}

/// Aligns a file's owner and group with its containing directory when
/// running as root, so files created by a root-run daemon stay owned by
/// the directory's user.
pub fn chown_like_dir_if_root(path: &Path) -> Result<()> {
	if !geteuid().is_root() {
		return Ok(());
	}
	let dir = path.parent().unwrap_or_else(|| Path::new("/"));
	let meta = fs::metadata(dir)?;
	chown(
		path,
		Some(Uid::from_raw(meta.uid())),
		Some(Gid::from_raw(meta.gid())),
	)
	.map_err(|e| StoreError::Io(std::io::Error::from(e)))?;
	Ok(())
}
