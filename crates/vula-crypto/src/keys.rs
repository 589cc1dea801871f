// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::dh::PqDh;
use crate::error::{CryptoError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::{info, warn};
use vula_core::{CapError, CapResult};
use zeroize::Zeroize;

pub const ED25519_SEED_LEN: usize = 32;
pub const ED25519_PK_LEN: usize = 32;
pub const X25519_KEY_LEN: usize = 32;

/// Secret key bytes: zeroized on drop, redacted in Debug and Display.
/// Serialization emits the real base64 value; the only consumer is the
/// 0600 key file.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
	pub fn new(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	pub fn expose(&self) -> &[u8] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Drop for SecretBytes {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

impl fmt::Debug for SecretBytes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SecretBytes([REDACTED])")
	}
}

impl fmt::Display for SecretBytes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

impl Serialize for SecretBytes {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(&self.0))
	}
}

impl<'de> Deserialize<'de> for SecretBytes {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		STANDARD
			.decode(s.as_bytes())
			.map(Self)
			.map_err(serde::de::Error::custom)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypair {
	pub sk: SecretBytes,
	#[serde(with = "pk_b64")]
	pub pk: Vec<u8>,
}

mod pk_b64 {
	use super::*;

	pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> std::result::Result<Vec<u8>, D::Error> {
		let s = String::deserialize(deserializer)?;
		STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
	}
}

/// The node's three long-lived keypairs. The YAML field names are the
/// on-disk schema; the post-quantum slot keeps the ctidh naming regardless
/// of the engine filling it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keys {
	#[serde(rename = "pq_ctidhP512_sec_key")]
	pub pq_sk: SecretBytes,
	#[serde(rename = "pq_ctidhP512_pub_key", with = "pk_b64")]
	pub pq_pk: Vec<u8>,
	#[serde(rename = "vk_Ed25519_sec_key")]
	pub ed25519_sk: SecretBytes,
	#[serde(rename = "vk_Ed25519_pub_key", with = "pk_b64")]
	pub ed25519_pk: Vec<u8>,
	#[serde(rename = "wg_Curve25519_sec_key")]
	pub wg_sk: SecretBytes,
	#[serde(rename = "wg_Curve25519_pub_key", with = "pk_b64")]
	pub wg_pk: Vec<u8>,
}

impl Keys {
	/// Generates all three keypairs. The post-quantum pair comes from the
	/// injected engine.
	pub fn generate(engine: &dyn PqDh) -> Result<Self> {
		let signing = SigningKey::generate(&mut OsRng);
		let wg_secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
		let wg_public = x25519_dalek::PublicKey::from(&wg_secret);
		let pq = engine.generate()?;

		Ok(Self {
			pq_sk: pq.sk,
			pq_pk: pq.pk,
			ed25519_sk: SecretBytes::new(signing.to_bytes().to_vec()),
			ed25519_pk: signing.verifying_key().to_bytes().to_vec(),
			wg_sk: SecretBytes::new(wg_secret.to_bytes().to_vec()),
			wg_pk: wg_public.as_bytes().to_vec(),
		})
	}

	/// Length checks for the fixed-size slots. The post-quantum slot is
	/// validated by the engine that owns its format.
	pub fn validate(&self, engine: &dyn PqDh) -> Result<()> {
		check_len("ed25519 secret", self.ed25519_sk.expose(), ED25519_SEED_LEN)?;
		check_len("ed25519 public", &self.ed25519_pk, ED25519_PK_LEN)?;
		check_len("wireguard secret", self.wg_sk.expose(), X25519_KEY_LEN)?;
		check_len("wireguard public", &self.wg_pk, X25519_KEY_LEN)?;
		engine.validate(self.pq_sk.expose(), &self.pq_pk)
	}
}

fn check_len(what: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
	if bytes.len() != expected {
		return Err(CryptoError::InvalidLength {
			what,
			expected,
			got: bytes.len(),
		});
	}
	Ok(())
}

/// Persistence surface for the key file.
pub trait KeyStore: Send + Sync {
	fn read(&self) -> CapResult<Keys>;
	fn write(&self, keys: &Keys) -> CapResult<()>;
	/// Renames a damaged key file aside so regeneration never overwrites
	/// evidence.
	fn move_damaged_aside(&self) -> CapResult<()>;
}

/// Loads keys, regenerating on first run. A corrupt or invalid file is
/// moved aside before new keys are written.
pub fn load_or_generate(store: &dyn KeyStore, engine: &dyn PqDh) -> Result<Keys> {
	match store.read() {
		Ok(keys) => match keys.validate(engine) {
			Ok(()) => return Ok(keys),
			Err(err) => {
				warn!(error = %err, "key file failed validation, moving it aside");
				store.move_damaged_aside()?;
			}
		},
		Err(CapError::NotFound) => {
			info!("key file not found, generating keys");
		}
		Err(err) => {
			warn!(error = %err, "key file unreadable, moving it aside");
			store.move_damaged_aside()?;
		}
	}

	let keys = Keys::generate(engine)?;
	store.write(&keys)?;
	Ok(keys)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dh::XdhEngine;
	use proptest::prelude::*;
	use std::sync::Mutex;

	#[derive(Default)]
	struct MemoryKeyStore {
		keys: Mutex<Option<Keys>>,
		moved_aside: Mutex<bool>,
	}

	impl KeyStore for MemoryKeyStore {
		fn read(&self) -> CapResult<Keys> {
			self.keys.lock().unwrap().clone().ok_or(CapError::NotFound)
		}

		fn write(&self, keys: &Keys) -> CapResult<()> {
			*self.keys.lock().unwrap() = Some(keys.clone());
			Ok(())
		}

		fn move_damaged_aside(&self) -> CapResult<()> {
			*self.moved_aside.lock().unwrap() = true;
			*self.keys.lock().unwrap() = None;
			Ok(())
		}
	}

	#[test]
	fn generate_produces_valid_keys() {
		let engine = XdhEngine;
		let keys = Keys::generate(&engine).unwrap();
		keys.validate(&engine).unwrap();
		assert_eq!(keys.ed25519_pk.len(), 32);
		assert_eq!(keys.wg_pk.len(), 32);
	}

	#[test]
	fn load_or_generate_creates_then_reuses() {
		let store = MemoryKeyStore::default();
		let engine = XdhEngine;
		let first = load_or_generate(&store, &engine).unwrap();
		let second = load_or_generate(&store, &engine).unwrap();
		assert_eq!(first, second);
		assert!(!*store.moved_aside.lock().unwrap());
	}

	#[test]
	fn invalid_stored_keys_are_moved_aside() {
		let store = MemoryKeyStore::default();
		let engine = XdhEngine;
		let mut bad = Keys::generate(&engine).unwrap();
		bad.ed25519_pk = vec![0; 7];
		store.write(&bad).unwrap();

		let keys = load_or_generate(&store, &engine).unwrap();
		keys.validate(&engine).unwrap();
		assert!(*store.moved_aside.lock().unwrap());
	}

	#[test]
	fn key_file_yaml_uses_schema_field_names() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let yaml = serde_yaml::to_string(&keys).unwrap();
		for field in [
			"pq_ctidhP512_sec_key",
			"pq_ctidhP512_pub_key",
			"vk_Ed25519_sec_key",
			"vk_Ed25519_pub_key",
			"wg_Curve25519_sec_key",
			"wg_Curve25519_pub_key",
		] {
			assert!(yaml.contains(field), "missing {field} in: {yaml}");
		}
		let back: Keys = serde_yaml::from_str(&yaml).unwrap();
		assert_eq!(keys, back);
	}

	proptest! {
		#[test]
		fn secret_bytes_never_leak_through_debug(bytes in proptest::collection::vec(any::<u8>(), 16..64)) {
			let encoded = STANDARD.encode(&bytes);
			let secret = SecretBytes::new(bytes);
			let debug = format!("{:?}", secret);
			let display = format!("{}", secret);
			prop_assert!(!debug.contains(&encoded));
			prop_assert!(debug.contains("REDACTED"));
			prop_assert_eq!(display, "[REDACTED]");
		}
	}
}
