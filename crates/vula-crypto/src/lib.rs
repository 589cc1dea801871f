// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key material, descriptor signatures, and PSK derivation.

mod dh;
mod error;
mod keys;
mod psk;
mod sign;

pub use dh::{PqDh, XdhEngine};
pub use error::{CryptoError, Result};
pub use keys::{load_or_generate, KeyStore, Keypair, Keys, SecretBytes};
pub use psk::{hkdf_organize, shake256_widen, PskCache};
pub use sign::{sign_descriptor, verify_descriptor};
