//! TON address decoding.
//!
//! A user-friendly ("friendly") address is 36 bytes carried in base64:
//! 1 tag byte + 1 workchain byte + 32-byte account hash + 2-byte CRC16.
//! Everything here is pure: strings in, typed results out, no I/O.

use base64::Engine;

use crate::error::CodecError;

/// Decoded TON friendly address.
///
/// Only constructible from exactly 36 raw bytes via [`FriendlyAddress::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendlyAddress {
    tag: u8,
    pub bounceable: bool,
    pub test_only: bool,
    /// Workchain ID (-1 for masterchain, 0 for basechain; general signed byte).
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl FriendlyAddress {
    /// Decode a base64-encoded friendly address.
    ///
    /// Accepts both standard and URL-safe alphabets, padded or not. Anything
    /// that does not decode to exactly 36 bytes is a `ResolverFormat` error.
    pub fn decode(b64: &str) -> Result<Self, CodecError> {
        let bytes = decode_base64_relaxed(b64)?;

        if bytes.len() != 36 {
            return Err(CodecError::ResolverFormat(bytes.len()));
        }

        let tag = bytes[0];
        let workchain = bytes[1] as i8;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            tag,
            bounceable: tag & 0x11 == 0x11,
            test_only: tag & 0x80 == 0x80,
            workchain,
            hash,
        })
    }

    /// Re-encode as URL-safe base64 with a freshly computed CRC16 trailer.
    ///
    /// For a well-formed input, `encode(decode(s)) == s` byte for byte.
    pub fn encode(&self) -> String {
        let mut data = Vec::with_capacity(36);
        data.push(self.tag);
        data.push(self.workchain as u8);
        data.extend_from_slice(&self.hash);

        let crc = crc16_xmodem(&data);
        data.push((crc >> 8) as u8);
        data.push(crc as u8);

        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&data)
    }

    /// Lower-case hex of the 32-byte account hash, used for equality checks.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Compare against a raw `workchain:hex` address string.
    pub fn equals_raw(&self, workchain: i32, hash_hex: &str) -> bool {
        i32::from(self.workchain) == workchain
            && self.hash_hex().eq_ignore_ascii_case(hash_hex)
    }
}

/// Validate an ADNL address of the form `0:<64 hex chars>`.
///
/// Returns the normalized (lower-case) form.
pub fn decode_adnl_address(s: &str) -> Result<String, CodecError> {
    let rest = s
        .strip_prefix("0:")
        .ok_or_else(|| CodecError::InvalidAdnl(s.to_string()))?;

    if rest.len() != 64 || !rest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CodecError::InvalidAdnl(s.to_string()));
    }

    Ok(format!("0:{}", rest.to_ascii_lowercase()))
}

/// Decode a base64-encoded Ed25519 public key; must be exactly 32 bytes.
pub fn decode_public_key_base64(s: &str) -> Result<[u8; 32], CodecError> {
    let bytes = decode_base64_relaxed(s)?;

    if bytes.len() != 32 {
        return Err(CodecError::InvalidPublicKey(bytes.len()));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Normalize URL-safe base64 to the standard alphabet and pad to a multiple
/// of 4 before decoding.
fn decode_base64_relaxed(s: &str) -> Result<Vec<u8>, CodecError> {
    let mut normalized: String = s
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    base64::engine::general_purpose::STANDARD
        .decode(&normalized)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

/// CRC16-XMODEM, the checksum TON uses for friendly addresses.
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
