// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{CryptoError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use vula_core::Descriptor;
use vula_codec::signing_buffer;

pub const SIGNATURE_LEN: usize = 64;
pub const VERIFY_KEY_LEN: usize = 32;

/// Signs the canonical buffer (with `s` omitted) and stores the detached
/// signature in the descriptor.
pub fn sign_descriptor(descriptor: &mut Descriptor, seed: &[u8]) -> Result<()> {
	let seed: [u8; 32] = seed.try_into().map_err(|_| CryptoError::InvalidLength {
		what: "ed25519 seed",
		expected: 32,
		got: seed.len(),
	})?;
	let signing_key = SigningKey::from_bytes(&seed);
	let signature = signing_key.sign(&signing_buffer(descriptor));
	descriptor.signature = signature.to_bytes().to_vec();
	Ok(())
}

/// Verifies the descriptor's signature against its own verify key.
/// Rejects outright on wrong key or signature length.
pub fn verify_descriptor(descriptor: &Descriptor) -> bool {
	if descriptor.verify_key.len() != VERIFY_KEY_LEN
		|| descriptor.signature.len() != SIGNATURE_LEN
	{
		return false;
	}

	let key_bytes: [u8; 32] = match descriptor.verify_key.as_slice().try_into() {
		Ok(bytes) => bytes,
		Err(_) => return false,
	};
	let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
		return false;
	};

	let sig_bytes: [u8; 64] = match descriptor.signature.as_slice().try_into() {
		Ok(bytes) => bytes,
		Err(_) => return false,
	};
	let signature = Signature::from_bytes(&sig_bytes);

	verifying_key
		.verify(&signing_buffer(descriptor), &signature)
		.is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dh::{PqDh, XdhEngine};
	use crate::keys::Keys;
	use vula_codec::parse_descriptor;

	/// A descriptor signed by the reference implementation.
	const SIGNED: &str = "c=cBVKup6b9dM6hfY0pE81fCKPJ6EFVvT7m+Gkt/W7gIHhBl50fdKZzT5feHACzJXDRzhxYicoyi358tREqhcyWw==; dt=86400; e=0; hostname=vula-bookworm-test2.local.; pk=6T2K6Xcmlsr1XQVZTAHrZs/d9v3IadKYI+74559/3Aw=; port=5354; r=; s=PuDfyhWpftSbWUMMydt1Qv7o618KIli9ncxUkcPP8yqaspDXa0jJUnwNwydEpXjVfY96BmVu5Jwba8ahZPzBDA==; v4a=10.89.0.3; v6a=fdff:ffff:ffdf:e436:dfba:4f29:bcbf:6af8,fe80::cc69:7dff:fe6b:9e79,fd54:f27a:17c1:3a61::3; vf=1743985213; vk=Gy+arU0cowJC2vek9EnoGHVSQxUl5Qv1LUrDL/WjGos=;";

	#[test]
	fn reference_signature_verifies() {
		let descriptor = parse_descriptor(SIGNED).unwrap();
		assert!(verify_descriptor(&descriptor));
	}

	#[test]
	fn sign_then_verify_round_trips() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let mut descriptor = parse_descriptor(SIGNED).unwrap();
		descriptor.verify_key = keys.ed25519_pk.clone();

		sign_descriptor(&mut descriptor, keys.ed25519_sk.expose()).unwrap();
		assert!(verify_descriptor(&descriptor));
	}

	#[test]
	fn any_field_mutation_invalidates_the_signature() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let mut descriptor = parse_descriptor(SIGNED).unwrap();
		descriptor.verify_key = keys.ed25519_pk.clone();
		sign_descriptor(&mut descriptor, keys.ed25519_sk.expose()).unwrap();

		let mut tampered = descriptor.clone();
		tampered.port += 1;
		assert!(!verify_descriptor(&tampered));

		let mut tampered = descriptor.clone();
		tampered.hostname.push('x');
		assert!(!verify_descriptor(&tampered));

		let mut tampered = descriptor.clone();
		tampered.valid_start += 1;
		assert!(!verify_descriptor(&tampered));

		let mut tampered = descriptor;
		tampered.v4_addrs.push("10.0.0.9".parse().unwrap());
		assert!(!verify_descriptor(&tampered));
	}

	#[test]
	fn wrong_key_or_signature_length_is_rejected() {
		let mut descriptor = parse_descriptor(SIGNED).unwrap();
		descriptor.verify_key.pop();
		assert!(!verify_descriptor(&descriptor));

		let mut descriptor = parse_descriptor(SIGNED).unwrap();
		descriptor.signature.pop();
		assert!(!verify_descriptor(&descriptor));
	}

	#[test]
	fn foreign_verify_key_fails() {
		let keys = Keys::generate(&XdhEngine).unwrap();
		let mut descriptor = parse_descriptor(SIGNED).unwrap();
		descriptor.verify_key = keys.ed25519_pk;
		assert!(!verify_descriptor(&descriptor));
	}

	#[test]
	fn pq_engine_keypair_feeds_the_descriptor_slot() {
		let pair = XdhEngine.generate().unwrap();
		let mut descriptor = parse_descriptor(SIGNED).unwrap();
		descriptor.pq_pk = pair.pk.clone();
		let keys = Keys::generate(&XdhEngine).unwrap();
		descriptor.verify_key = keys.ed25519_pk.clone();
		sign_descriptor(&mut descriptor, keys.ed25519_sk.expose()).unwrap();
		assert!(verify_descriptor(&descriptor));
	}
}
