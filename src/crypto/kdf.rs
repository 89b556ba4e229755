// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! SP800-108 counter-mode key derivation.
//!
//! PRF is HMAC-SHA-512. Each block hashes
//! `be32(counter) || label || 0x00 || context || be32(output_bits)` with the
//! counter starting at 1. Per-payload subkeys are derived from a key's master
//! secret with the caller's authenticated-data bytes as the label and the
//! payload's random key modifier plus IV/nonce as the context.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

const PRF_OUTPUT_SIZE: usize = 64;

/// Derives exactly `output_len` bytes from `kdk`.
pub(crate) fn derive(kdk: &[u8], label: &[u8], context: &[u8], output_len: usize) -> Vec<u8> {
    let output_bits = (output_len as u32) * 8;
    let blocks = output_len.div_ceil(PRF_OUTPUT_SIZE);

    let mut output = Vec::with_capacity(blocks * PRF_OUTPUT_SIZE);
    for counter in 1..=blocks as u32 {
        let Ok(mut prf) = HmacSha512::new_from_slice(kdk) else {
            unreachable!("HMAC-SHA-512 accepts keys of any length");
        };
        prf.update(&counter.to_be_bytes());
        prf.update(label);
        prf.update(&[0x00]);
        prf.update(context);
        prf.update(&output_bits.to_be_bytes());
        output.extend_from_slice(&prf.finalize().into_bytes());
    }

    output.truncate(output_len);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_has_exact_length() {
        for len in [1, 16, 32, 63, 64, 65, 96, 128] {
            assert_eq!(derive(b"kdk", b"label", b"context", len).len(), len);
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive(b"kdk", b"label", b"context", 48);
        let b = derive(b"kdk", b"label", b"context", 48);
        assert_eq!(a, b);
    }

    #[test]
    fn label_and_context_are_both_bound() {
        let base = derive(b"kdk", b"label", b"context", 32);
        assert_ne!(base, derive(b"kdk", b"label2", b"context", 32));
        assert_ne!(base, derive(b"kdk", b"label", b"context2", 32));
        assert_ne!(base, derive(b"kdk2", b"label", b"context", 32));
    }

    #[test]
    fn label_context_split_is_unambiguous() {
        // The 0x00 separator keeps (label, context) pairs distinct even when
        // their concatenation is identical.
        let a = derive(b"kdk", b"ab", b"c", 32);
        let b = derive(b"kdk", b"a", b"bc", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn output_length_is_bound_into_the_prf() {
        // The L field makes shorter outputs more than a truncation of longer
        // ones.
        let short = derive(b"kdk", b"label", b"context", 32);
        let long = derive(b"kdk", b"label", b"context", 64);
        assert_ne!(short[..], long[..32]);
    }
}
