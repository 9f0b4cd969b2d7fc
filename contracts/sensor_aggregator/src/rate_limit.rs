//! Per-address, per-action cooldown enforcement.
//!
//! One cooldown duration (seconds) applies to every [`ActionClass`]; each
//! class keeps its own last-action timestamp per address, so a provider's
//! submissions never delay the owner's decrypt requests and vice versa.
//!
//! An address with no recorded action may act immediately. Recording happens
//! inside the triggering invocation, so a failure later in that invocation
//! rolls the timestamp back with everything else.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

use crate::{TTL_EXTEND_TO, TTL_THRESHOLD};

// ── Storage keys ──────────────────────────────────────────────────────────────

const COOLDOWN: Symbol = symbol_short!("COOLDOWN");
const LAST_ACT: Symbol = symbol_short!("LAST_ACT");

// ── Types ─────────────────────────────────────────────────────────────────────

/// Class of rate-limited action.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ActionClass {
    Submission,
    DecryptRequest,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RateLimitError {
    /// `now < last + cooldown` for this address and class.
    CooldownActive,
}

// ── Storage helpers ───────────────────────────────────────────────────────────

fn last_key(address: &Address, class: &ActionClass) -> (Symbol, Address, ActionClass) {
    (LAST_ACT, address.clone(), class.clone())
}

// ── Public API ────────────────────────────────────────────────────────────────

pub fn set_cooldown(env: &Env, seconds: u64) {
    env.storage().instance().set(&COOLDOWN, &seconds);
}

pub fn cooldown(env: &Env) -> u64 {
    env.storage().instance().get(&COOLDOWN).unwrap_or(0u64)
}

pub fn last_action(env: &Env, address: &Address, class: &ActionClass) -> Option<u64> {
    env.storage().persistent().get(&last_key(address, class))
}

/// Whether `address` may perform a `class` action at `now`.
pub fn check(env: &Env, address: &Address, class: &ActionClass, now: u64) -> Result<(), RateLimitError> {
    match last_action(env, address, class) {
        Some(last) if now < last.saturating_add(cooldown(env)) => {
            Err(RateLimitError::CooldownActive)
        }
        _ => Ok(()),
    }
}

/// [`check`], then record `now` as the new last-action time.
pub fn check_and_record(
    env: &Env,
    address: &Address,
    class: &ActionClass,
    now: u64,
) -> Result<(), RateLimitError> {
    check(env, address, class, now)?;

    let key = last_key(address, class);
    env.storage().persistent().set(&key, &now);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    Ok(())
}
