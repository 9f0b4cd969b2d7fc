//! Decryption requests and the asynchronous completion callback.
//!
//! ## Request state machine
//! ```text
//!            complete(ok)
//!  Pending ───────────────▶ Completed
//!     │
//!     └── reject_stale, batch no longer hashes to the snapshot ──▶ Rejected
//! ```
//! Both outcomes are stored and terminal. A failed `complete` rolls back
//! every write, so it cannot record the rejection itself; `reject_stale`
//! does. Once `Rejected`, the request stays rejected even if the hash would
//! match again later.
//!
//! ## Integrity hash
//! `sha256(export_id(sum) ‖ export_id(max) ‖ xdr(this contract))`, taken
//! when the request is made and recomputed from current state on completion.
//!
//! A bad proof leaves the request `Pending`.

use common::{fhe::decode_cleartext_pair, FheEngineClient};
use soroban_sdk::{
    contracttype, log, symbol_short, vec, xdr::ToXdr, Address, Bytes, BytesN, Env, Symbol, Vec,
};

use crate::{
    events, ledger, ledger::Batch, map_common_error, AggregatorError, TTL_EXTEND_TO,
    TTL_THRESHOLD,
};

// ── Storage keys ──────────────────────────────────────────────────────────────

const CONTEXT: Symbol = symbol_short!("DCTX");
const RESULT: Symbol = symbol_short!("RESULT");
const BATCH_REQ: Symbol = symbol_short!("BATCH_REQ");

// ── Types ─────────────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecryptionStatus {
    Pending,
    Completed,
    /// The batch no longer matches the snapshot the request was made for.
    Rejected,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionContext {
    pub request_id: u64,
    pub batch_id: u64,
    pub integrity_hash: BytesN<32>,
    pub status: DecryptionStatus,
    pub requested_by: Address,
    pub requested_at: u64,
    pub completed_at: u64, // 0 until completed
}

impl DecryptionContext {
    /// `Pending → Completed`. Any other starting state is a replay.
    fn into_completed(mut self, now: u64) -> Result<Self, AggregatorError> {
        if self.status != DecryptionStatus::Pending {
            return Err(AggregatorError::ReplayAttempt);
        }
        self.status = DecryptionStatus::Completed;
        self.completed_at = now;
        Ok(self)
    }

    /// `Pending → Rejected`. Any other starting state is a replay.
    fn into_rejected(mut self) -> Result<Self, AggregatorError> {
        if self.status != DecryptionStatus::Pending {
            return Err(AggregatorError::ReplayAttempt);
        }
        self.status = DecryptionStatus::Rejected;
        Ok(self)
    }
}

/// A verified decryption of one batch.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptedAggregate {
    pub request_id: u64,
    pub batch_id: u64,
    pub total: u64,
    pub max: u64,
    pub count: u32,
    pub completed_at: u64,
}

// ── Storage helpers ───────────────────────────────────────────────────────────

fn context_key(request_id: u64) -> (Symbol, u64) {
    (CONTEXT, request_id)
}

fn result_key(batch_id: u64) -> (Symbol, u64) {
    (RESULT, batch_id)
}

fn batch_requests_key(batch_id: u64) -> (Symbol, u64) {
    (BATCH_REQ, batch_id)
}

fn set_persistent<V: soroban_sdk::IntoVal<Env, soroban_sdk::Val>>(
    env: &Env,
    key: &(Symbol, u64),
    value: &V,
) {
    env.storage().persistent().set(key, value);
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn store_context(env: &Env, ctx: &DecryptionContext) {
    set_persistent(env, &context_key(ctx.request_id), ctx);
}

/// Digest of a batch's current handles, bound to this contract.
pub fn integrity_hash(env: &Env, engine: &FheEngineClient, batch: &Batch) -> BytesN<32> {
    let mut payload = Bytes::new(env);
    payload.extend_from_array(&engine.export_id(&batch.sum_handle).to_array());
    payload.extend_from_array(&engine.export_id(&batch.max_handle).to_array());
    payload.append(&env.current_contract_address().to_xdr(env));
    env.crypto().sha256(&payload).into()
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Snapshot `batch` and ask the engine to decrypt `[sum, max]`.
///
/// `batch` must already be validated as closed.
pub fn request(
    env: &Env,
    engine: &FheEngineClient,
    caller: &Address,
    batch: &Batch,
) -> Result<u64, AggregatorError> {
    let integrity_hash = integrity_hash(env, engine, batch);
    let handles = vec![env, batch.sum_handle.clone(), batch.max_handle.clone()];
    let request_id = engine.begin_decrypt(&handles, &env.current_contract_address());

    if env.storage().persistent().has(&context_key(request_id)) {
        log!(
            env,
            "engine reissued decryption request id",
            request_id,
            batch.id
        );
        return Err(AggregatorError::ReplayAttempt);
    }

    store_context(
        env,
        &DecryptionContext {
            request_id,
            batch_id: batch.id,
            integrity_hash,
            status: DecryptionStatus::Pending,
            requested_by: caller.clone(),
            requested_at: env.ledger().timestamp(),
            completed_at: 0,
        },
    );

    let mut ids = batch_requests(env, batch.id);
    ids.push_back(request_id);
    set_persistent(env, &batch_requests_key(batch.id), &ids);

    events::publish_decryption_requested(env, request_id, batch.id);
    Ok(request_id)
}

/// Accept the engine's answer for `request_id`.
///
/// Checked in order: the request is pending, its batch exists, the batch
/// still hashes to the snapshot, the engine vouches for the proof, the
/// cleartexts decode as a `(total, max)` pair.
pub fn complete(
    env: &Env,
    engine: &FheEngineClient,
    request_id: u64,
    cleartexts: &Bytes,
    proof: &Bytes,
) -> Result<DecryptedAggregate, AggregatorError> {
    let ctx = match get_context(env, request_id) {
        Some(ctx) if ctx.status == DecryptionStatus::Pending => ctx,
        _ => {
            log!(env, "replayed or unknown decryption callback", request_id);
            return Err(AggregatorError::ReplayAttempt);
        }
    };

    let batch =
        ledger::get_batch(env, ctx.batch_id).ok_or(AggregatorError::InvalidBatchReference)?;

    if integrity_hash(env, engine, &batch) != ctx.integrity_hash {
        log!(
            env,
            "batch state diverged from decryption snapshot",
            request_id,
            ctx.batch_id
        );
        return Err(AggregatorError::StateMismatch);
    }

    if !engine.verify_proof(&request_id, cleartexts, proof) {
        log!(env, "decryption proof rejected", request_id);
        return Err(AggregatorError::ProofVerificationFailed);
    }

    let now = env.ledger().timestamp();
    let ctx = ctx.into_completed(now)?;
    let (total, max) = decode_cleartext_pair(cleartexts).map_err(|e| {
        log!(env, "undecodable cleartexts", request_id, cleartexts.len());
        map_common_error(e)
    })?;

    store_context(env, &ctx);
    let aggregate = DecryptedAggregate {
        request_id,
        batch_id: ctx.batch_id,
        total,
        max,
        count: batch.count,
        completed_at: now,
    };
    set_persistent(env, &result_key(ctx.batch_id), &aggregate);

    events::publish_decryption_completed(env, request_id, ctx.batch_id, total, max);
    Ok(aggregate)
}

/// Record `Rejected` for a pending request whose batch is gone or no longer
/// hashes to the snapshot. A request that still matches stays `Pending`.
pub fn reject_stale(
    env: &Env,
    engine: &FheEngineClient,
    request_id: u64,
) -> Result<DecryptionStatus, AggregatorError> {
    let ctx = match get_context(env, request_id) {
        Some(ctx) if ctx.status == DecryptionStatus::Pending => ctx,
        _ => return Err(AggregatorError::ReplayAttempt),
    };

    let matches = ledger::get_batch(env, ctx.batch_id)
        .map(|batch| integrity_hash(env, engine, &batch) == ctx.integrity_hash)
        .unwrap_or(false);
    if matches {
        return Ok(DecryptionStatus::Pending);
    }

    log!(env, "decryption request rejected", request_id, ctx.batch_id);
    let ctx = ctx.into_rejected()?;
    store_context(env, &ctx);
    events::publish_decryption_rejected(env, request_id, ctx.batch_id);
    Ok(ctx.status)
}

pub fn status(env: &Env, request_id: u64) -> Option<DecryptionStatus> {
    get_context(env, request_id).map(|ctx| ctx.status)
}

pub fn get_context(env: &Env, request_id: u64) -> Option<DecryptionContext> {
    env.storage().persistent().get(&context_key(request_id))
}

pub fn get_result(env: &Env, batch_id: u64) -> Option<DecryptedAggregate> {
    env.storage().persistent().get(&result_key(batch_id))
}

pub fn batch_requests(env: &Env, batch_id: u64) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&batch_requests_key(batch_id))
        .unwrap_or(Vec::new(env))
}
