// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Protected-payload framing.
//!
//! Every payload starts with a fixed magic header and the 16-byte id of the
//! key that protected it, followed by the encryptor's variant-specific body:
//!
//! ```text
//! ┌───────────┬─────────────┬──────────────────────────────┐
//! │ magic (4) │ key id (16) │ encryptor output (variable)  │
//! └───────────┴─────────────┴──────────────────────────────┘
//! ```
//!
//! All integers are big-endian; the key id is the UUID's big-endian bytes.

use uuid::Uuid;

/// Identifies a protected payload: `09 F0 C9 F0`.
pub const MAGIC_HEADER: [u8; 4] = [0x09, 0xF0, 0xC9, 0xF0];

/// Key id length in bytes.
pub(crate) const KEY_ID_SIZE: usize = 16;

/// Total framing ahead of the encryptor body.
pub(crate) const HEADER_SIZE: usize = MAGIC_HEADER.len() + KEY_ID_SIZE;

/// Splits a payload into its key id and encryptor body.
///
/// Returns `None` on bad magic or truncation; the caller reports both as the
/// uniform cryptographic failure.
pub(crate) fn split(payload: &[u8]) -> Option<(Uuid, &[u8])> {
    if payload.len() < HEADER_SIZE || payload[..MAGIC_HEADER.len()] != MAGIC_HEADER {
        return None;
    }
    let key_id = Uuid::from_slice(&payload[MAGIC_HEADER.len()..HEADER_SIZE]).ok()?;
    Some((key_id, &payload[HEADER_SIZE..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_payload_splits() {
        let id = Uuid::new_v4();
        let mut payload = Vec::new();
        payload.extend_from_slice(&MAGIC_HEADER);
        payload.extend_from_slice(id.as_bytes());
        payload.extend_from_slice(b"body");

        let (parsed_id, body) = split(&payload).unwrap();
        assert_eq!(parsed_id, id);
        assert_eq!(body, b"body");
    }

    #[test]
    fn empty_body_is_allowed_by_framing() {
        let id = Uuid::new_v4();
        let mut payload = Vec::new();
        payload.extend_from_slice(&MAGIC_HEADER);
        payload.extend_from_slice(id.as_bytes());

        let (_, body) = split(&payload).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut payload = vec![0u8; 32];
        payload[..4].copy_from_slice(&[0x09, 0xF0, 0xC9, 0xF1]);
        assert!(split(&payload).is_none());
    }

    #[test]
    fn truncated_header_is_rejected() {
        assert!(split(&[]).is_none());
        assert!(split(&MAGIC_HEADER).is_none());
        assert!(split(&[0x09, 0xF0, 0xC9]).is_none());
    }
}
