// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{CryptoError, Result};
use crate::keys::{Keypair, SecretBytes, X25519_KEY_LEN};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

/// Non-interactive key agreement engine filling the post-quantum slot.
///
/// The descriptor advertises one public key per node and both sides must
/// derive the same raw secret from (own secret, peer public); the PSK
/// pipeline builds on that commutativity. The reference deployment binds
/// CSIDH-512 here; engines are injected at construction like every other
/// external surface.
pub trait PqDh: Send + Sync {
	fn generate(&self) -> Result<Keypair>;

	/// Checks that stored key material fits this engine's format.
	fn validate(&self, sk: &[u8], pk: &[u8]) -> Result<()>;

	/// Raw shared secret between our secret key and a peer's public key.
	fn shared_secret(&self, sk: &[u8], peer_pk: &[u8]) -> Result<Vec<u8>>;
}

/// X25519-backed engine.
pub struct XdhEngine;

fn array32(what: &'static str, bytes: &[u8]) -> Result<[u8; 32]> {
	bytes.try_into().map_err(|_| CryptoError::InvalidLength {
		what,
		expected: X25519_KEY_LEN,
		got: bytes.len(),
	})
}

impl PqDh for XdhEngine {
	fn generate(&self) -> Result<Keypair> {
		let secret = StaticSecret::random_from_rng(OsRng);
		let public = PublicKey::from(&secret);
		Ok(Keypair {
			sk: SecretBytes::new(secret.to_bytes().to_vec()),
			pk: public.as_bytes().to_vec(),
		})
	}

	fn validate(&self, sk: &[u8], pk: &[u8]) -> Result<()> {
		array32("dh secret", sk)?;
		array32("dh public", pk)?;
		Ok(())
	}

	fn shared_secret(&self, sk: &[u8], peer_pk: &[u8]) -> Result<Vec<u8>> {
		let secret = StaticSecret::from(array32("dh secret", sk)?);
		let public = PublicKey::from(array32("dh public", peer_pk)?);
		Ok(secret.diffie_hellman(&public).as_bytes().to_vec())
	}
}
