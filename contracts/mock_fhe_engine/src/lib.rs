//! # Mock FHE Engine
//!
//! Development implementation of [`common::FheEngine`]. Handles reference
//! `u64` cleartexts kept in this contract's own storage, so the aggregator
//! can be exercised end to end without a real homomorphic backend.
//!
//! Nothing here is confidential: anyone can read the storage. Deploy it on
//! test networks and in unit tests only.
//!
//! ## Decryption jobs
//! `begin_decrypt` records a [`DecryptJob`] and returns its id. A relayer
//! (in tests: the test itself) fetches `decryption_payload(id)` and delivers
//! it to the job's callback contract. The proof is
//! `sha256(secret ‖ request_id ‖ cleartexts)`, which `verify_proof`
//! recomputes.
#![no_std]


use common::fhe::{encode_cleartexts, FheEngine};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, panic_with_error, symbol_short, Address,
    Bytes, BytesN, Env, Symbol, Vec,
};

// ── Storage keys ──────────────────────────────────────────────────────────────

const ADMIN: Symbol = symbol_short!("ADMIN");
const INITIALIZED: Symbol = symbol_short!("INIT");
const SECRET: Symbol = symbol_short!("SECRET");
const ID_SALT: Symbol = symbol_short!("ID_SALT");
const HANDLE_CTR: Symbol = symbol_short!("H_CTR");
const VALUE: Symbol = symbol_short!("VALUE");
const JOB_CTR: Symbol = symbol_short!("JOB_CTR");
const JOB: Symbol = symbol_short!("JOB");

const TTL_THRESHOLD: u32 = 5_184_000;
const TTL_EXTEND_TO: u32 = 10_368_000;

// ── Types ─────────────────────────────────────────────────────────────────────

/// A decryption requested through `begin_decrypt`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptJob {
    pub request_id: u64,
    pub handles: Vec<BytesN<32>>,
    pub callback: Address,
    pub requested_at: u64,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum EngineError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    UnknownHandle = 4,
    UnknownRequest = 5,
}

// ── Storage helpers ───────────────────────────────────────────────────────────

fn value_key(handle: &BytesN<32>) -> (Symbol, BytesN<32>) {
    (VALUE, handle.clone())
}

fn job_key(request_id: u64) -> (Symbol, u64) {
    (JOB, request_id)
}

/// Allocate a fresh handle for `value`.
fn store_value(env: &Env, value: u64) -> BytesN<32> {
    let counter: u64 = env
        .storage()
        .instance()
        .get(&HANDLE_CTR)
        .unwrap_or(0u64)
        .saturating_add(1);
    env.storage().instance().set(&HANDLE_CTR, &counter);

    let handle: BytesN<32> = env
        .crypto()
        .sha256(&Bytes::from_array(env, &counter.to_be_bytes()))
        .into();
    let key = value_key(&handle);
    env.storage().persistent().set(&key, &value);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    handle
}

fn load_value(env: &Env, handle: &BytesN<32>) -> u64 {
    match env.storage().persistent().get(&value_key(handle)) {
        Some(value) => value,
        None => panic_with_error!(env, EngineError::UnknownHandle),
    }
}

fn load_job(env: &Env, request_id: u64) -> Option<DecryptJob> {
    env.storage().persistent().get(&job_key(request_id))
}

fn cleartexts_for(env: &Env, job: &DecryptJob) -> Bytes {
    let mut words: Vec<u64> = Vec::new(env);
    for handle in job.handles.iter() {
        words.push_back(load_value(env, &handle));
    }
    encode_cleartexts(env, &words)
}

fn proof_for(env: &Env, request_id: u64, cleartexts: &Bytes) -> Bytes {
    let secret: BytesN<32> = match env.storage().instance().get(&SECRET) {
        Some(secret) => secret,
        None => panic_with_error!(env, EngineError::NotInitialized),
    };
    let mut payload = Bytes::new(env);
    payload.extend_from_array(&secret.to_array());
    payload.extend_from_array(&request_id.to_be_bytes());
    payload.append(cleartexts);
    let digest: BytesN<32> = env.crypto().sha256(&payload).into();
    Bytes::from_array(env, &digest.to_array())
}

// ── Contract ──────────────────────────────────────────────────────────────────

#[contract]
pub struct MockFheEngine;

#[contractimpl]
impl MockFheEngine {
    /// Initialise with an administrator and the secret used to sign
    /// decryption results.
    pub fn initialize(
        env: Env,
        admin: Address,
        proof_secret: BytesN<32>,
    ) -> Result<(), EngineError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(EngineError::AlreadyInitialized);
        }
        env.storage().instance().set(&ADMIN, &admin);
        env.storage().instance().set(&SECRET, &proof_secret);
        env.storage()
            .instance()
            .set(&ID_SALT, &BytesN::from_array(&env, &[0u8; 32]));
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage()
            .instance()
            .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
        Ok(())
    }

    /// Change the salt mixed into `export_id`, so every existing handle
    /// exports a different identifier from now on. Admin only.
    pub fn rotate_identity_salt(
        env: Env,
        admin: Address,
        salt: BytesN<32>,
    ) -> Result<(), EngineError> {
        admin.require_auth();
        let stored: Address = env
            .storage()
            .instance()
            .get(&ADMIN)
            .ok_or(EngineError::NotInitialized)?;
        if stored != admin {
            return Err(EngineError::Unauthorized);
        }
        env.storage().instance().set(&ID_SALT, &salt);
        Ok(())
    }

    /// Plaintext behind a handle. Test helper; a real engine has no such call.
    pub fn reveal(env: Env, handle: BytesN<32>) -> Result<u64, EngineError> {
        env.storage()
            .persistent()
            .get(&value_key(&handle))
            .ok_or(EngineError::UnknownHandle)
    }

    /// The `(cleartexts, proof)` a relayer delivers to the job's callback.
    pub fn decryption_payload(env: Env, request_id: u64) -> Result<(Bytes, Bytes), EngineError> {
        let job = load_job(&env, request_id).ok_or(EngineError::UnknownRequest)?;
        let cleartexts = cleartexts_for(&env, &job);
        let proof = proof_for(&env, request_id, &cleartexts);
        Ok((cleartexts, proof))
    }

    pub fn get_job(env: Env, request_id: u64) -> Option<DecryptJob> {
        load_job(&env, request_id)
    }

    /// Number of decryption jobs issued so far.
    pub fn job_count(env: Env) -> u64 {
        env.storage().instance().get(&JOB_CTR).unwrap_or(0u64)
    }
}

#[contractimpl]
impl FheEngine for MockFheEngine {
    fn constant(env: Env, value: u64) -> BytesN<32> {
        store_value(&env, value)
    }

    // Wraps like an encrypted u64.
    fn add(env: Env, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32> {
        let sum = load_value(&env, &lhs).wrapping_add(load_value(&env, &rhs));
        store_value(&env, sum)
    }

    fn ge(env: Env, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32> {
        let flag = load_value(&env, &lhs) >= load_value(&env, &rhs);
        store_value(&env, u64::from(flag))
    }

    fn select(
        env: Env,
        condition: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> BytesN<32> {
        let chosen = if load_value(&env, &condition) != 0 {
            load_value(&env, &if_true)
        } else {
            load_value(&env, &if_false)
        };
        store_value(&env, chosen)
    }

    fn export_id(env: Env, handle: BytesN<32>) -> BytesN<32> {
        // Unknown handles have no ciphertext to identify.
        load_value(&env, &handle);
        let salt: BytesN<32> = env
            .storage()
            .instance()
            .get(&ID_SALT)
            .unwrap_or(BytesN::from_array(&env, &[0u8; 32]));
        let mut payload = Bytes::new(&env);
        payload.extend_from_array(&salt.to_array());
        payload.extend_from_array(&handle.to_array());
        env.crypto().sha256(&payload).into()
    }

    fn begin_decrypt(env: Env, handles: Vec<BytesN<32>>, callback: Address) -> u64 {
        for handle in handles.iter() {
            load_value(&env, &handle);
        }
        let request_id: u64 = env
            .storage()
            .instance()
            .get(&JOB_CTR)
            .unwrap_or(0u64)
            .saturating_add(1);
        env.storage().instance().set(&JOB_CTR, &request_id);

        let job = DecryptJob {
            request_id,
            handles,
            callback,
            requested_at: env.ledger().timestamp(),
        };
        let key = job_key(request_id);
        env.storage().persistent().set(&key, &job);
        env.storage()
            .persistent()
            .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        request_id
    }

    fn verify_proof(env: Env, request_id: u64, cleartexts: Bytes, proof: Bytes) -> bool {
        let Some(job) = load_job(&env, request_id) else {
            return false;
        };
        // The proof must match both the caller's cleartexts and the job's
        // actual values.
        cleartexts == cleartexts_for(&env, &job) && proof == proof_for(&env, request_id, &cleartexts)
    }
}
