// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::dh::PqDh;
use crate::error::{CryptoError, Result};
use crate::keys::SecretBytes;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hkdf::Hkdf;
use sha2::Sha512;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

const HKDF_INFO: &[u8] = b"vula-organize-1";

/// Widens a raw shared secret to 64 bytes through SHAKE-256.
pub fn shake256_widen(raw: &[u8]) -> [u8; 64] {
	let mut xof = Shake256::default();
	xof.update(raw);
	let mut reader = xof.finalize_xof();
	let mut out = [0u8; 64];
	reader.read(&mut out);
	out
}

/// HKDF-extract (SHA-512, no salt) followed by expand with the fixed info
/// string, producing the 32-byte WireGuard preshared key.
pub fn hkdf_organize(raw: &[u8]) -> Result<[u8; 32]> {
	let hk = Hkdf::<Sha512>::new(None, raw);
	let mut okm = [0u8; 32];
	hk.expand(HKDF_INFO, &mut okm)
		.map_err(|e| CryptoError::Derivation(e.to_string()))?;
	Ok(okm)
}

/// Per-peer PSK derivation with memoization. The group action is expensive,
/// so results are cached by peer public key behind a mutex that is
/// independent of the event loop.
pub struct PskCache {
	engine: Arc<dyn PqDh>,
	secret: SecretBytes,
	cache: Mutex<HashMap<String, [u8; 32]>>,
}

impl PskCache {
	pub fn new(engine: Arc<dyn PqDh>, secret: SecretBytes) -> Self {
		Self {
			engine,
			secret,
			cache: Mutex::new(HashMap::new()),
		}
	}

	pub fn psk(&self, peer_pk: &[u8]) -> Result<[u8; 32]> {
		let cache_key = STANDARD.encode(peer_pk);
		if let Some(psk) = self.cache.lock().expect("psk cache lock").get(&cache_key) {
			return Ok(*psk);
		}

		debug!(peer = %cache_key, "deriving PSK");
		let raw = self.engine.shared_secret(self.secret.expose(), peer_pk)?;
		let widened = shake256_widen(&raw);
		let psk = hkdf_organize(&widened)?;

		self.cache
			.lock()
			.expect("psk cache lock")
			.insert(cache_key, psk);
		Ok(psk)
	}
}
