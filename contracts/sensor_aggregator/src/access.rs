//! Owner and provider roles.
//!
//! The owner manages providers, batches and decrypt requests; providers only
//! submit readings. The pause flag itself lives in [`common::pausable`].

use common::CommonError;
use soroban_sdk::{symbol_short, Address, Env, Symbol};

use crate::{TTL_EXTEND_TO, TTL_THRESHOLD};

const OWNER: Symbol = symbol_short!("OWNER");
const PROVIDER: Symbol = symbol_short!("PROVIDER");

fn provider_key(address: &Address) -> (Symbol, Address) {
    (PROVIDER, address.clone())
}

pub fn set_owner(env: &Env, owner: &Address) {
    env.storage().instance().set(&OWNER, owner);
}

pub fn get_owner(env: &Env) -> Option<Address> {
    env.storage().instance().get(&OWNER)
}

/// `NotInitialized` before an owner exists, `AccessDenied` for anyone else.
pub fn require_owner(env: &Env, caller: &Address) -> Result<(), CommonError> {
    let owner = get_owner(env).ok_or(CommonError::NotInitialized)?;
    if *caller != owner {
        return Err(CommonError::AccessDenied);
    }
    Ok(())
}

pub fn require_provider(env: &Env, caller: &Address) -> Result<(), CommonError> {
    if !is_provider(env, caller) {
        return Err(CommonError::AccessDenied);
    }
    Ok(())
}

/// Returns `true` if the address was not a provider before.
pub fn add_provider(env: &Env, address: &Address) -> bool {
    if is_provider(env, address) {
        return false;
    }
    let key = provider_key(address);
    env.storage().persistent().set(&key, &true);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    true
}

/// Returns `true` if the address was a provider before.
pub fn remove_provider(env: &Env, address: &Address) -> bool {
    if !is_provider(env, address) {
        return false;
    }
    env.storage().persistent().remove(&provider_key(address));
    true
}

pub fn is_provider(env: &Env, address: &Address) -> bool {
    let key = provider_key(address);
    let enabled = env.storage().persistent().get(&key).unwrap_or(false);
    if enabled {
        env.storage()
            .persistent()
            .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    enabled
}
