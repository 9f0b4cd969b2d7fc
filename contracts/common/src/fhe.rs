//! Opaque-arithmetic capability consumed by the aggregator.
//!
//! The homomorphic engine is an external contract. The aggregator only ever
//! holds [`Handle`]s to values it cannot read; every computation, the
//! identity export used for integrity digests, decryption and proof checks
//! are delegated to the engine through [`FheEngineClient`].
//!
//! ## Decryption round trip
//! ```text
//!  aggregator                         engine (+ its relayer)
//!  ──────────                         ──────────────────────
//!  begin_decrypt([sum, max], self) ─▶ records job, returns request_id
//!                                     ... later, asynchronously ...
//!  complete(request_id, ct, proof) ◀─ relayer delivers cleartexts + proof
//!  verify_proof(request_id, ct, proof) ─▶ bool
//! ```
//!
//! Cleartexts travel as a flat byte string of big-endian `u64` words, one
//! per requested handle, in request order.

use soroban_sdk::{contractclient, Address, Bytes, BytesN, Env, Vec};

use crate::CommonError;

/// Opaque ciphertext handle issued by the engine.
///
/// Contract signatures and `#[contracttype]` fields spell out `BytesN<32>`;
/// Rust-side helpers take `Handle`.
pub type Handle = BytesN<32>;

/// Width in bytes of one encoded cleartext word.
pub const CLEARTEXT_WORD_LEN: u32 = 8;

/// Interface every homomorphic engine deployment must expose.
///
/// `ge` returns a boolean handle; `select` accepts only such handles as its
/// condition. `add` is commutative and associative.
#[contractclient(name = "FheEngineClient")]
pub trait FheEngine {
    /// Encrypt a public constant.
    fn constant(env: Env, value: u64) -> BytesN<32>;

    fn add(env: Env, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    /// Encrypted `lhs >= rhs`.
    fn ge(env: Env, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    fn select(
        env: Env,
        condition: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> BytesN<32>;

    /// Stable, fixed-size identifier of the ciphertext behind `handle`.
    fn export_id(env: Env, handle: BytesN<32>) -> BytesN<32>;

    /// Start an asynchronous decryption. The engine's relayer later calls
    /// `complete(request_id, cleartexts, proof)` on `callback`, from outside
    /// this invocation (the host forbids re-entering the aggregator).
    fn begin_decrypt(env: Env, handles: Vec<BytesN<32>>, callback: Address) -> u64;

    /// Check that `cleartexts` is the authentic decryption for `request_id`.
    fn verify_proof(env: Env, request_id: u64, cleartexts: Bytes, proof: Bytes) -> bool;
}

/// Encode cleartext words in the wire layout expected by `complete`.
pub fn encode_cleartexts(env: &Env, words: &Vec<u64>) -> Bytes {
    let mut out = Bytes::new(env);
    for word in words.iter() {
        out.extend_from_array(&word.to_be_bytes());
    }
    out
}

/// Decode a `(first, second)` cleartext pair.
///
/// Fails with [`CommonError::MalformedCleartext`] unless the payload is
/// exactly two words long.
pub fn decode_cleartext_pair(cleartexts: &Bytes) -> Result<(u64, u64), CommonError> {
    if cleartexts.len() != 2 * CLEARTEXT_WORD_LEN {
        return Err(CommonError::MalformedCleartext);
    }
    Ok((read_word(cleartexts, 0), read_word(cleartexts, 1)))
}

fn read_word(cleartexts: &Bytes, index: u32) -> u64 {
    let start = index * CLEARTEXT_WORD_LEN;
    let mut buf = [0u8; CLEARTEXT_WORD_LEN as usize];
    cleartexts
        .slice(start..start + CLEARTEXT_WORD_LEN)
        .copy_into_slice(&mut buf);
    u64::from_be_bytes(buf)
}
