//! # Confidential Sensor Aggregation Contract
//!
//! Providers append encrypted readings (vibration, temperature) to the open
//! batch; the owner later asks the homomorphic engine to decrypt a closed
//! batch's aggregates and receives them through the `complete` callback.
//!
//! ## Components
//! ```text
//! access      owner, provider set, pause flag
//! rate_limit  per-address, per-action cooldown
//! ledger      numbered batches, running encrypted sum / max
//! bridge      decrypt requests: snapshot hash, pending contexts, callback
//! ```
//!
//! ## Batch lifecycle
//! 1. `open_batch`: owner opens batch `n + 1`; both accumulators start at
//!    an encrypted zero.
//! 2. `submit`: providers add readings while the batch is open.
//! 3. `close_batch`: owner freezes the batch; there is no reopen.
//! 4. `request_decryption`: owner snapshots the frozen accumulators and
//!    starts an asynchronous decryption.
//! 5. `complete`: the engine's relayer delivers cleartexts and a proof.
//!    The contract re-derives the snapshot hash from current state, checks
//!    the proof, and accepts each request at most once.
//! 6. `reject_stale`: anyone may settle a pending request whose batch no
//!    longer matches its snapshot. The rejection is stored and final.
#![no_std]

pub mod access;
pub mod bridge;
pub mod events;
pub mod ledger;
pub mod rate_limit;

pub use bridge::{DecryptedAggregate, DecryptionContext, DecryptionStatus};
pub use ledger::Batch;
pub use rate_limit::ActionClass;

use common::{pausable, CommonError, FheEngineClient};
use ledger::LedgerError;
use rate_limit::RateLimitError;

use soroban_sdk::{
    contract, contracterror, contractimpl, symbol_short, Address, Bytes, BytesN, Env, Symbol, Vec,
};

// ── Storage keys ──────────────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const ENGINE: Symbol = symbol_short!("ENGINE");

pub(crate) const TTL_THRESHOLD: u32 = 5_184_000;
pub(crate) const TTL_EXTEND_TO: u32 = 10_368_000;

// ── Contract errors ───────────────────────────────────────────────────────────

/// Every failure the aggregator surfaces.
///
/// `ReplayAttempt` and `StateMismatch` are security-relevant: integrators
/// should alert on them rather than treat them as input validation noise.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum AggregatorError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    NotAuthorized = 10,
    PausedState = 40,
    CooldownActive = 41,
    BatchNotOpen = 60,
    BatchAlreadyOpen = 61,
    InvalidBatchReference = 62,
    ReplayAttempt = 70,
    StateMismatch = 71,
    ProofVerificationFailed = 72,
}

fn map_common_error(e: CommonError) -> AggregatorError {
    match e {
        CommonError::NotInitialized => AggregatorError::NotInitialized,
        CommonError::AccessDenied => AggregatorError::NotAuthorized,
        CommonError::MalformedCleartext => AggregatorError::ProofVerificationFailed,
        CommonError::Paused => AggregatorError::PausedState,
    }
}

fn map_ledger_error(e: LedgerError) -> AggregatorError {
    match e {
        LedgerError::BatchAlreadyOpen => AggregatorError::BatchAlreadyOpen,
        LedgerError::BatchNotOpen => AggregatorError::BatchNotOpen,
        LedgerError::UnknownBatch | LedgerError::BatchStillOpen => {
            AggregatorError::InvalidBatchReference
        }
    }
}

fn map_rate_limit_error(e: RateLimitError) -> AggregatorError {
    match e {
        RateLimitError::CooldownActive => AggregatorError::CooldownActive,
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn require_initialized(env: &Env) -> Result<(), AggregatorError> {
    if !env.storage().instance().has(&INITIALIZED) {
        return Err(AggregatorError::NotInitialized);
    }
    Ok(())
}

fn engine_client(env: &Env) -> Result<FheEngineClient<'_>, AggregatorError> {
    let engine: Address = env
        .storage()
        .instance()
        .get(&ENGINE)
        .ok_or(AggregatorError::NotInitialized)?;
    Ok(FheEngineClient::new(env, &engine))
}

fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
}

// ── Contract ──────────────────────────────────────────────────────────────────

#[contract]
pub struct SensorAggregatorContract;

#[contractimpl]
impl SensorAggregatorContract {
    // ── Initialisation ────────────────────────────────────────────────────────

    /// Initialise with the owner, the homomorphic engine contract and the
    /// shared cooldown (seconds) for submissions and decrypt requests.
    pub fn initialize(
        env: Env,
        owner: Address,
        engine: Address,
        cooldown_seconds: u64,
    ) -> Result<(), AggregatorError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(AggregatorError::AlreadyInitialized);
        }

        owner.require_auth();

        access::set_owner(&env, &owner);
        env.storage().instance().set(&ENGINE, &engine);
        rate_limit::set_cooldown(&env, cooldown_seconds);
        env.storage().instance().set(&INITIALIZED, &true);
        extend_instance_ttl(&env);

        Ok(())
    }

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    /// Address of the homomorphic engine this ledger delegates to.
    pub fn get_engine(env: Env) -> Result<Address, AggregatorError> {
        env.storage()
            .instance()
            .get(&ENGINE)
            .ok_or(AggregatorError::NotInitialized)
    }

    // ── Access guard ──────────────────────────────────────────────────────────

    pub fn get_owner(env: Env) -> Result<Address, AggregatorError> {
        access::get_owner(&env).ok_or(AggregatorError::NotInitialized)
    }

    /// Hand the owner role to `new_owner`. Allowed while paused.
    pub fn transfer_ownership(
        env: Env,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), AggregatorError> {
        caller.require_auth();
        access::require_owner(&env, &caller).map_err(map_common_error)?;

        access::set_owner(&env, &new_owner);
        extend_instance_ttl(&env);
        events::publish_ownership_changed(&env, caller, new_owner);
        Ok(())
    }

    /// Grant the provider role. Re-adding an existing provider is a no-op.
    pub fn add_provider(
        env: Env,
        caller: Address,
        provider: Address,
    ) -> Result<(), AggregatorError> {
        caller.require_auth();
        access::require_owner(&env, &caller).map_err(map_common_error)?;

        if access::add_provider(&env, &provider) {
            events::publish_provider_added(&env, provider);
        }
        Ok(())
    }

    /// Revoke the provider role. Removing a non-provider is a no-op.
    pub fn remove_provider(
        env: Env,
        caller: Address,
        provider: Address,
    ) -> Result<(), AggregatorError> {
        caller.require_auth();
        access::require_owner(&env, &caller).map_err(map_common_error)?;

        if access::remove_provider(&env, &provider) {
            events::publish_provider_removed(&env, provider);
        }
        Ok(())
    }

    pub fn is_provider(env: Env, address: Address) -> bool {
        access::is_provider(&env, &address)
    }

    /// Pause or unpause the data plane (`open_batch`, `close_batch`,
    /// `submit`, `request_decryption`). Setting the current value again
    /// emits nothing.
    pub fn set_paused(env: Env, caller: Address, paused: bool) -> Result<(), AggregatorError> {
        caller.require_auth();
        access::require_owner(&env, &caller).map_err(map_common_error)?;

        let previous = pausable::set_paused(&env, paused);
        extend_instance_ttl(&env);
        if previous == paused {
            return Ok(());
        }
        if paused {
            events::publish_paused(&env, caller);
        } else {
            events::publish_unpaused(&env, caller);
        }
        Ok(())
    }

    pub fn is_paused(env: Env) -> bool {
        pausable::is_paused(&env)
    }

    /// Set the cooldown shared by every action class.
    pub fn set_cooldown_seconds(
        env: Env,
        caller: Address,
        seconds: u64,
    ) -> Result<(), AggregatorError> {
        caller.require_auth();
        access::require_owner(&env, &caller).map_err(map_common_error)?;

        let previous = rate_limit::cooldown(&env);
        rate_limit::set_cooldown(&env, seconds);
        extend_instance_ttl(&env);
        events::publish_cooldown_changed(&env, previous, seconds);
        Ok(())
    }

    pub fn get_cooldown(env: Env) -> u64 {
        rate_limit::cooldown(&env)
    }

    /// Timestamp of `address`'s last successful action of `class`.
    pub fn last_action_at(env: Env, address: Address, class: ActionClass) -> Option<u64> {
        rate_limit::last_action(&env, &address, &class)
    }

    // ── Batch ledger ──────────────────────────────────────────────────────────

    /// Open the next batch and return its id.
    pub fn open_batch(env: Env, caller: Address) -> Result<u64, AggregatorError> {
        caller.require_auth();
        require_initialized(&env)?;
        access::require_owner(&env, &caller).map_err(map_common_error)?;
        pausable::require_not_paused(&env).map_err(map_common_error)?;

        let engine = engine_client(&env)?;
        let batch = ledger::open_batch(&env, &engine).map_err(map_ledger_error)?;
        extend_instance_ttl(&env);

        events::publish_batch_opened(&env, batch.id);
        Ok(batch.id)
    }

    /// Close the open batch and return its id. Closing is irreversible.
    pub fn close_batch(env: Env, caller: Address) -> Result<u64, AggregatorError> {
        caller.require_auth();
        require_initialized(&env)?;
        access::require_owner(&env, &caller).map_err(map_common_error)?;
        pausable::require_not_paused(&env).map_err(map_common_error)?;

        let batch = ledger::close_batch(&env).map_err(map_ledger_error)?;

        events::publish_batch_closed(&env, batch.id, batch.count);
        Ok(batch.id)
    }

    /// Fold one encrypted reading into the open batch and return the batch's
    /// new reading count.
    ///
    /// `vibration` feeds the running sum, `temperature` the running maximum.
    /// Both must be handles issued by the configured engine.
    pub fn submit(
        env: Env,
        provider: Address,
        vibration: BytesN<32>,
        temperature: BytesN<32>,
    ) -> Result<u32, AggregatorError> {
        provider.require_auth();
        require_initialized(&env)?;
        pausable::require_not_paused(&env).map_err(map_common_error)?;
        access::require_provider(&env, &provider).map_err(map_common_error)?;

        let open = ledger::current_open_batch(&env).ok_or(AggregatorError::BatchNotOpen)?;
        rate_limit::check_and_record(
            &env,
            &provider,
            &ActionClass::Submission,
            env.ledger().timestamp(),
        )
        .map_err(map_rate_limit_error)?;

        let engine = engine_client(&env)?;
        let batch =
            ledger::submit(&env, &engine, open, &vibration, &temperature).map_err(map_ledger_error)?;

        events::publish_data_submitted(&env, provider, batch.id, batch.count);
        Ok(batch.count)
    }

    /// Id of the most recently opened batch (0 before the first one).
    pub fn current_batch_id(env: Env) -> u64 {
        ledger::current_batch_id(&env)
    }

    pub fn get_batch(env: Env, batch_id: u64) -> Result<Batch, AggregatorError> {
        ledger::get_batch(&env, batch_id).ok_or(AggregatorError::InvalidBatchReference)
    }

    // ── Decryption bridge ─────────────────────────────────────────────────────

    /// Ask the engine to decrypt a closed batch's aggregates.
    ///
    /// Returns the engine-issued request id. The result arrives later
    /// through [`Self::complete`].
    pub fn request_decryption(
        env: Env,
        caller: Address,
        batch_id: u64,
    ) -> Result<u64, AggregatorError> {
        caller.require_auth();
        require_initialized(&env)?;
        access::require_owner(&env, &caller).map_err(map_common_error)?;
        pausable::require_not_paused(&env).map_err(map_common_error)?;

        // An invalid reference is reported as such even during a cooldown.
        let batch = ledger::closed_batch(&env, batch_id).map_err(map_ledger_error)?;
        rate_limit::check_and_record(
            &env,
            &caller,
            &ActionClass::DecryptRequest,
            env.ledger().timestamp(),
        )
        .map_err(map_rate_limit_error)?;

        let engine = engine_client(&env)?;
        bridge::request(&env, &engine, &caller, &batch)
    }

    /// Decryption callback. Anyone may call it; the contract accepts a
    /// result only for a pending request whose batch still hashes to the
    /// requested snapshot and whose proof the engine accepts.
    pub fn complete(
        env: Env,
        request_id: u64,
        cleartexts: Bytes,
        proof: Bytes,
    ) -> Result<DecryptedAggregate, AggregatorError> {
        require_initialized(&env)?;
        let engine = engine_client(&env)?;
        bridge::complete(&env, &engine, request_id, &cleartexts, &proof)
    }

    /// Settle a pending request whose batch no longer matches its snapshot.
    ///
    /// Anyone may call it. Returns `Rejected` once the mismatch is recorded
    /// (the request can then never complete), or `Pending` if the batch
    /// still matches. Settled requests answer `ReplayAttempt`.
    pub fn reject_stale(env: Env, request_id: u64) -> Result<DecryptionStatus, AggregatorError> {
        require_initialized(&env)?;
        let engine = engine_client(&env)?;
        bridge::reject_stale(&env, &engine, request_id)
    }

    /// Stored state of a decrypt request, or `None` if the id is unknown.
    pub fn decryption_status(env: Env, request_id: u64) -> Option<DecryptionStatus> {
        bridge::status(&env, request_id)
    }

    pub fn get_decryption_context(env: Env, request_id: u64) -> Option<DecryptionContext> {
        bridge::get_context(&env, request_id)
    }

    /// Latest accepted decryption of a batch.
    pub fn get_batch_result(env: Env, batch_id: u64) -> Option<DecryptedAggregate> {
        bridge::get_result(&env, batch_id)
    }

    /// Every request id issued for a batch, oldest first.
    pub fn get_batch_requests(env: Env, batch_id: u64) -> Vec<u64> {
        bridge::batch_requests(&env, batch_id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
