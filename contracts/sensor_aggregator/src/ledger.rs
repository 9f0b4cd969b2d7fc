//! Numbered batches and their encrypted running aggregates.
//!
//! Batch ids start at 1 and only grow. At most one batch is open at a time:
//! it is always the one carrying the current id. A batch holds two handles,
//! the running sum of vibration readings and the running maximum of
//! temperature readings. Neither is ever decrypted here; every update is an
//! engine call.
//!
//! ## Accumulation
//! ```text
//! sum' = add(sum, vibration)
//! max' = select(ge(temperature, max), temperature, max)
//! ```
//! Both start from `constant(0)`. Readings are unsigned, so zero is a valid
//! lower bound for the maximum.

use common::{FheEngineClient, Handle};
use soroban_sdk::{contracttype, symbol_short, BytesN, Env, Symbol};

use crate::{TTL_EXTEND_TO, TTL_THRESHOLD};

// ── Storage keys ──────────────────────────────────────────────────────────────

const BATCH_CTR: Symbol = symbol_short!("BATCH_CTR");
const BATCH: Symbol = symbol_short!("BATCH");

// ── Types ─────────────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Batch {
    pub id: u64,
    pub open: bool,
    pub count: u32,
    pub sum_handle: BytesN<32>,
    pub max_handle: BytesN<32>,
    pub opened_at: u64,
    pub closed_at: u64, // 0 while still open
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LedgerError {
    BatchAlreadyOpen,
    BatchNotOpen,
    /// Id 0, or an id that was never issued.
    UnknownBatch,
    /// The batch exists but has not been closed yet.
    BatchStillOpen,
}

// ── Storage helpers ───────────────────────────────────────────────────────────

fn batch_key(id: u64) -> (Symbol, u64) {
    (BATCH, id)
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Last issued batch id, or 0 before the first batch.
pub fn current_batch_id(env: &Env) -> u64 {
    env.storage().instance().get(&BATCH_CTR).unwrap_or(0)
}

pub fn get_batch(env: &Env, id: u64) -> Option<Batch> {
    if id == 0 || id > current_batch_id(env) {
        return None;
    }
    env.storage().persistent().get(&batch_key(id))
}

pub(crate) fn store_batch(env: &Env, batch: &Batch) {
    let key = batch_key(batch.id);
    env.storage().persistent().set(&key, batch);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// The open batch, if there is one.
pub fn current_open_batch(env: &Env) -> Option<Batch> {
    get_batch(env, current_batch_id(env)).filter(|batch| batch.open)
}

/// Open batch `current + 1` with both accumulators at an encrypted zero.
pub fn open_batch(env: &Env, engine: &FheEngineClient) -> Result<Batch, LedgerError> {
    if current_open_batch(env).is_some() {
        return Err(LedgerError::BatchAlreadyOpen);
    }

    let id = current_batch_id(env).saturating_add(1);
    let batch = Batch {
        id,
        open: true,
        count: 0,
        sum_handle: engine.constant(&0),
        max_handle: engine.constant(&0),
        opened_at: env.ledger().timestamp(),
        closed_at: 0,
    };

    store_batch(env, &batch);
    env.storage().instance().set(&BATCH_CTR, &id);
    Ok(batch)
}

/// Close the open batch. There is no way back.
pub fn close_batch(env: &Env) -> Result<Batch, LedgerError> {
    let mut batch = current_open_batch(env).ok_or(LedgerError::BatchNotOpen)?;
    batch.open = false;
    batch.closed_at = env.ledger().timestamp();
    store_batch(env, &batch);
    Ok(batch)
}

/// Fold one reading into `open` and persist it.
pub fn submit(
    env: &Env,
    engine: &FheEngineClient,
    mut open: Batch,
    vibration: &Handle,
    temperature: &Handle,
) -> Result<Batch, LedgerError> {
    if !open.open {
        return Err(LedgerError::BatchNotOpen);
    }

    open.sum_handle = engine.add(&open.sum_handle, vibration);
    let is_new_max = engine.ge(temperature, &open.max_handle);
    open.max_handle = engine.select(&is_new_max, temperature, &open.max_handle);
    open.count = open.count.saturating_add(1);

    store_batch(env, &open);
    Ok(open)
}

/// A batch that may be decrypted: issued and closed.
pub fn closed_batch(env: &Env, id: u64) -> Result<Batch, LedgerError> {
    let batch = get_batch(env, id).ok_or(LedgerError::UnknownBatch)?;
    if batch.open {
        return Err(LedgerError::BatchStillOpen);
    }
    Ok(batch)
}
