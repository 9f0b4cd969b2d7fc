//! Events emitted by the sensor aggregation contract.

use soroban_sdk::{symbol_short, Address, Env};

// ── Internal helper ───────────────────────────────────────────────────────────

fn emit<T: soroban_sdk::IntoVal<Env, soroban_sdk::Val>>(env: &Env, topic: &str, data: T) {
    #[allow(deprecated)]
    env.events()
        .publish((symbol_short!("SENSOR"), soroban_sdk::Symbol::new(env, topic)), data);
}

// ── Event structs ─────────────────────────────────────────────────────────────

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnershipChangedEvent {
    pub previous_owner: Address,
    pub new_owner: Address,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderChangedEvent {
    pub provider: Address,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseChangedEvent {
    pub caller: Address,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CooldownChangedEvent {
    pub previous_seconds: u64,
    pub new_seconds: u64,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchOpenedEvent {
    pub batch_id: u64,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchClosedEvent {
    pub batch_id: u64,
    pub count: u32,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataSubmittedEvent {
    pub provider: Address,
    pub batch_id: u64,
    pub count: u32,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionRequestedEvent {
    pub request_id: u64,
    pub batch_id: u64,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionCompletedEvent {
    pub request_id: u64,
    pub batch_id: u64,
    pub total: u64,
    pub max: u64,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionRejectedEvent {
    pub request_id: u64,
    pub batch_id: u64,
    pub timestamp: u64,
}

// ── Publishers ────────────────────────────────────────────────────────────────

pub fn publish_ownership_changed(env: &Env, previous_owner: Address, new_owner: Address) {
    emit(
        env,
        "OWN_CHG",
        OwnershipChangedEvent {
            previous_owner,
            new_owner,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_provider_added(env: &Env, provider: Address) {
    emit(
        env,
        "PROV_ADD",
        ProviderChangedEvent {
            provider,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_provider_removed(env: &Env, provider: Address) {
    emit(
        env,
        "PROV_REM",
        ProviderChangedEvent {
            provider,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_paused(env: &Env, caller: Address) {
    emit(
        env,
        "PAUSED",
        PauseChangedEvent {
            caller,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_unpaused(env: &Env, caller: Address) {
    emit(
        env,
        "UNPAUSED",
        PauseChangedEvent {
            caller,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_cooldown_changed(env: &Env, previous_seconds: u64, new_seconds: u64) {
    emit(
        env,
        "COOLDOWN",
        CooldownChangedEvent {
            previous_seconds,
            new_seconds,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_batch_opened(env: &Env, batch_id: u64) {
    emit(
        env,
        "BATCH_OPN",
        BatchOpenedEvent {
            batch_id,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_batch_closed(env: &Env, batch_id: u64, count: u32) {
    emit(
        env,
        "BATCH_CLS",
        BatchClosedEvent {
            batch_id,
            count,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_data_submitted(env: &Env, provider: Address, batch_id: u64, count: u32) {
    emit(
        env,
        "SUBMIT",
        DataSubmittedEvent {
            provider,
            batch_id,
            count,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_decryption_requested(env: &Env, request_id: u64, batch_id: u64) {
    emit(
        env,
        "DEC_REQ",
        DecryptionRequestedEvent {
            request_id,
            batch_id,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_decryption_completed(
    env: &Env,
    request_id: u64,
    batch_id: u64,
    total: u64,
    max: u64,
) {
    emit(
        env,
        "DEC_DONE",
        DecryptionCompletedEvent {
            request_id,
            batch_id,
            total,
            max,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_decryption_rejected(env: &Env, request_id: u64, batch_id: u64) {
    emit(
        env,
        "DEC_REJ",
        DecryptionRejectedEvent {
            request_id,
            batch_id,
            timestamp: env.ledger().timestamp(),
        },
    );
}
