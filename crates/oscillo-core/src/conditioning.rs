//! Whitening and bit-mixing primitives for entropy draws.
//!
//! All hashing of raw input bytes lives here. Inputs produce raw bytes; the
//! mixer in [`crate::entropy`] rotates, XORs and whitens them through this
//! module.
//!
//! # Architecture
//!
//! ```text
//! Inputs → Raw Bytes → rotate/XOR (width-bounded) → SHA-256 whitening → Draw
//! ```
//!
//! The combination is a simulation scrambler. It has no proof of
//! cryptographic strength and must not be used where real security
//! guarantees are required.

use sha2::{Digest, Sha256};

/// Widest draw the mixer produces, in bytes.
pub const MAX_DRAW_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// SHA-256 conditioning
// ---------------------------------------------------------------------------

/// SHA-256 chained conditioning: stretches or compresses raw bytes to exactly
/// `n_output` bytes using counter-mode hashing.
///
/// Each 32-byte output block is: SHA-256(state || chunk || counter).
/// State is chained from the previous block's digest.
pub fn sha256_condition_bytes(raw: &[u8], n_output: usize) -> Vec<u8> {
    if raw.is_empty() {
        return vec![0u8; n_output];
    }
    let mut output = Vec::with_capacity(n_output);
    let mut state = [0u8; 32];
    let mut offset = 0;
    let mut counter: u64 = 0;
    while output.len() < n_output {
        let end = (offset + 64).min(raw.len());
        let chunk = &raw[offset..end];
        let mut h = Sha256::new();
        h.update(state);
        h.update(chunk);
        h.update(counter.to_le_bytes());
        state = h.finalize().into();
        output.extend_from_slice(&state);
        offset += 64;
        counter += 1;
        if offset >= raw.len() {
            offset = 0;
        }
    }
    output.truncate(n_output);
    output
}

// ---------------------------------------------------------------------------
// Width-bounded integer mixing
// ---------------------------------------------------------------------------

/// All-ones mask for a `n_bytes` wide draw. Width 0 yields 0.
pub fn width_mask(n_bytes: usize) -> u128 {
    match n_bytes.min(MAX_DRAW_BYTES) {
        0 => 0,
        MAX_DRAW_BYTES => u128::MAX,
        n => (1u128 << (n * 8)) - 1,
    }
}

/// Rotate `value` left by `shift` bits inside a `n_bytes` wide word.
///
/// Bits above the width are discarded before rotating, so the result is
/// always below `256^n_bytes`.
pub fn rotate_left_within(value: u128, shift: u32, n_bytes: usize) -> u128 {
    let width = (n_bytes.min(MAX_DRAW_BYTES) * 8) as u32;
    if width == 0 {
        return 0;
    }
    let mask = width_mask(n_bytes);
    let value = value & mask;
    let shift = shift % width;
    if shift == 0 {
        return value;
    }
    ((value << shift) | (value >> (width - shift))) & mask
}

/// Little-endian integer from the first `n_bytes` of `bytes`.
///
/// Missing trailing bytes are treated as zero.
pub fn u128_from_le(bytes: &[u8], n_bytes: usize) -> u128 {
    let n = n_bytes.min(MAX_DRAW_BYTES);
    let mut buf = [0u8; MAX_DRAW_BYTES];
    let take = n.min(bytes.len());
    buf[..take].copy_from_slice(&bytes[..take]);
    u128::from_le_bytes(buf) & width_mask(n)
}

/// Whiten a combined draw: SHA-256 over its `n_bytes` little-endian bytes,
/// truncated back to `n_bytes`.
pub fn whiten(value: u128, n_bytes: usize) -> u128 {
    let n = n_bytes.min(MAX_DRAW_BYTES);
    if n == 0 {
        return 0;
    }
    let le = (value & width_mask(n)).to_le_bytes();
    let digest = sha256_condition_bytes(&le[..n], n);
    u128_from_le(&digest, n)
}
