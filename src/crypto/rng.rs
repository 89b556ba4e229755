// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Process-wide randomness source.
//!
//! This is the only module in the crate that produces random bytes. Key
//! modifiers, IVs, nonces, and fresh master secrets all come from here.

use once_cell::sync::Lazy;
use ring::rand::{SecureRandom, SystemRandom};

use super::error::CryptoError;

static RNG: Lazy<SystemRandom> = Lazy::new(SystemRandom::new);

/// Fills `buf` with cryptographically secure random bytes.
pub(crate) fn fill(buf: &mut [u8]) -> Result<(), CryptoError> {
    RNG.fill(buf).map_err(|_| CryptoError::Randomness)
}
