use soroban_sdk::{symbol_short, Env, Symbol};

use crate::CommonError;

const PAUSED: Symbol = symbol_short!("PAUSED");

/// Sets the contract pause state and returns the previous value.
///
/// Callers are responsible for enforcing owner authorization and for
/// emitting their own pause/unpause events; the flag itself is shared by
/// every contract with a pausable data plane.
pub fn set_paused(env: &Env, paused: bool) -> bool {
    let previous = is_paused(env);
    env.storage().instance().set(&PAUSED, &paused);
    previous
}

/// Returns `true` when the contract is paused.
pub fn is_paused(env: &Env) -> bool {
    env.storage().instance().get(&PAUSED).unwrap_or(false)
}

/// Guard: returns `CommonError::Paused` when the contract is paused.
///
/// Place this at the top of every data-plane entry point. Administrative
/// entry points that must stay reachable during an incident do not call it.
pub fn require_not_paused(env: &Env) -> Result<(), CommonError> {
    if is_paused(env) {
        return Err(CommonError::Paused);
    }
    Ok(())
}
