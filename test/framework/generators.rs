//! # Property-Based Test Generators
//!
//! Composable `proptest` strategies for readings, aggregator action
//! sequences, and adversarial decryption callbacks.
//!
//! ## Design Decisions
//!
//! - Generators produce *semantic* values (readings, cooldowns, action
//!   sequences), not raw bytes, so tests exercise the ledger and bridge
//!   rather than argument decoding.
//! - Reading values stay far below `u64::MAX / 64` so sums of generated
//!   sequences never wrap; wrapping is covered by dedicated tests.
//! - Roughly one value in five is a boundary case (0, 1, repeated maxima).

extern crate std;

use proptest::prelude::*;
use soroban_sdk::{Bytes, Env};
use std::vec::Vec;

// ── Scalar Generators ────────────────────────────────────────────────────────

/// Upper bound for generated reading values.
pub const MAX_READING: u64 = 1_000_000_000_000;

/// Strategy for a single reading value, biased toward edge cases.
///
/// Distribution:
///   10% → 0
///   10% → 1
///   10% → MAX_READING
///   70% → uniform in [0, MAX_READING]
pub fn reading_value_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        1 => Just(0u64),
        1 => Just(1u64),
        1 => Just(MAX_READING),
        7 => (0u64..=MAX_READING),
    ]
}

/// Strategy for one `(vibration, temperature)` submission.
pub fn reading_strategy() -> impl Strategy<Value = (u64, u64)> {
    (reading_value_strategy(), reading_value_strategy())
}

/// Strategy for the readings of one batch (1–`max_len` submissions).
pub fn readings_strategy(max_len: usize) -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec(reading_strategy(), 1..=max_len)
}

/// Strategy for cooldown configurations.
pub fn cooldown_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        2 => Just(0u64),
        1 => Just(1u64),
        4 => (1u64..=3_600u64),
        2 => Just(60u64),
        1 => Just(86_400u64),
    ]
}

/// Strategy for time advances in seconds.
pub fn duration_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        1 => Just(0u64),
        1 => Just(1u64),
        3 => (1u64..=120u64),
        3 => (1u64..=3_600u64),
        1 => Just(86_400u64),
    ]
}

// ── Action Generators ────────────────────────────────────────────────────────

/// Every aggregator action the state explorer can perform.
///
/// `provider_index` selects from the explorer's provider pool; `request_index`
/// selects from the request ids issued so far (modular indexing, ignored when
/// none exist).
#[derive(Debug, Clone)]
pub enum AggregatorAction {
    OpenBatch,
    CloseBatch,
    Submit {
        provider_index: usize,
        vibration: u64,
        temperature: u64,
    },
    /// Request decryption of a batch id, valid or not.
    RequestDecryption { batch_id: u64 },
    /// Deliver the engine's genuine answer.
    Relay { request_index: usize },
    /// Deliver a tampered answer.
    ForgedComplete {
        request_index: usize,
        mutation: CallbackMutation,
    },
    AdvanceTime { delta: u64 },
    SetCooldown { seconds: u64 },
    AddProvider { provider_index: usize },
    RemoveProvider { provider_index: usize },
    Pause,
    Unpause,
}

/// Strategy for individual aggregator actions.
///
/// Submissions and time advancement dominate; administration is rare.
pub fn aggregator_action_strategy(num_providers: usize) -> impl Strategy<Value = AggregatorAction> {
    let provider = 0..num_providers;

    prop_oneof![
        8 => Just(AggregatorAction::OpenBatch),
        6 => Just(AggregatorAction::CloseBatch),
        25 => (provider.clone(), reading_strategy()).prop_map(|(p, (v, t))| AggregatorAction::Submit {
            provider_index: p,
            vibration: v,
            temperature: t,
        }),
        8 => (0u64..=6u64).prop_map(|b| AggregatorAction::RequestDecryption { batch_id: b }),
        10 => (0usize..8usize).prop_map(|r| AggregatorAction::Relay { request_index: r }),
        4 => (0usize..8usize, callback_mutation_strategy()).prop_map(|(r, m)| {
            AggregatorAction::ForgedComplete { request_index: r, mutation: m }
        }),
        20 => duration_strategy().prop_map(|d| AggregatorAction::AdvanceTime { delta: d }),
        2 => cooldown_strategy().prop_map(|s| AggregatorAction::SetCooldown { seconds: s }),
        4 => (provider, any::<bool>()).prop_map(|(p, add)| if add {
            AggregatorAction::AddProvider { provider_index: p }
        } else {
            AggregatorAction::RemoveProvider { provider_index: p }
        }),
        4 => any::<bool>().prop_map(|pause| if pause {
            AggregatorAction::Pause
        } else {
            AggregatorAction::Unpause
        }),
    ]
}

/// Strategy for a sequence of 1–`max_len` aggregator actions.
pub fn aggregator_action_sequence(
    num_providers: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<AggregatorAction>> {
    prop::collection::vec(aggregator_action_strategy(num_providers), 1..=max_len)
}

// ── Callback Mutation Support ────────────────────────────────────────────────

/// A tampering applied to an otherwise genuine `complete` call.
///
/// Each variant must be rejected by the contract; the integration tests
/// assert that none of them ever produces a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackMutation {
    /// Flip one bit of the cleartext payload.
    FlipCleartextBit,
    /// Drop the last cleartext word.
    TruncateCleartexts,
    /// Append an extra zero word.
    ExtendCleartexts,
    /// Deliver an empty proof.
    EmptyProof,
    /// Flip one bit of the proof.
    FlipProofBit,
    /// Present the answer under a neighbouring, unissued request id.
    ShiftRequestId,
}

/// Strategy for selecting a callback mutation.
pub fn callback_mutation_strategy() -> impl Strategy<Value = CallbackMutation> {
    prop_oneof![
        Just(CallbackMutation::FlipCleartextBit),
        Just(CallbackMutation::TruncateCleartexts),
        Just(CallbackMutation::ExtendCleartexts),
        Just(CallbackMutation::EmptyProof),
        Just(CallbackMutation::FlipProofBit),
        Just(CallbackMutation::ShiftRequestId),
    ]
}

fn flip_first_bit(bytes: &Bytes) -> Bytes {
    let mut out = bytes.clone();
    if let Some(first) = bytes.get(0) {
        out.set(0, first ^ 0x01);
    }
    out
}

/// Apply a mutation to a genuine `(request_id, cleartexts, proof)` triple.
pub fn mutate_callback(
    env: &Env,
    mutation: CallbackMutation,
    request_id: u64,
    cleartexts: &Bytes,
    proof: &Bytes,
) -> (u64, Bytes, Bytes) {
    match mutation {
        CallbackMutation::FlipCleartextBit => (request_id, flip_first_bit(cleartexts), proof.clone()),
        CallbackMutation::TruncateCleartexts => {
            let len = cleartexts.len();
            (request_id, cleartexts.slice(0..len.saturating_sub(8)), proof.clone())
        }
        CallbackMutation::ExtendCleartexts => {
            let mut longer = cleartexts.clone();
            longer.extend_from_array(&[0u8; 8]);
            (request_id, longer, proof.clone())
        }
        CallbackMutation::EmptyProof => (request_id, cleartexts.clone(), Bytes::new(env)),
        CallbackMutation::FlipProofBit => (request_id, cleartexts.clone(), flip_first_bit(proof)),
        CallbackMutation::ShiftRequestId => {
            (request_id.wrapping_add(1_000), cleartexts.clone(), proof.clone())
        }
    }
}

// ── Historical Pattern Generators ────────────────────────────────────────────

/// Typical operating sequences, used to seed exploration with realistic runs.
#[derive(Debug, Clone)]
pub enum TransactionPattern {
    /// One provider, one batch, decrypted once.
    SingleBatchRoundTrip,
    /// Several providers interleave submissions in one batch.
    MultiProviderBatch,
    /// Batches opened and closed back to back, decrypted out of order.
    BackToBackBatches,
    /// The owner pauses mid-batch, then resumes.
    PausedMidBatch,
    /// The same closed batch is decrypted repeatedly and answers are replayed.
    RepeatedDecryption,
}

/// Generate a concrete action sequence from a transaction pattern.
pub fn pattern_to_actions(pattern: &TransactionPattern, num_providers: usize) -> Vec<AggregatorAction> {
    use AggregatorAction::*;

    match pattern {
        TransactionPattern::SingleBatchRoundTrip => {
            std::vec![
                OpenBatch,
                Submit { provider_index: 0, vibration: 5, temperature: 10 },
                AdvanceTime { delta: 60 },
                Submit { provider_index: 0, vibration: 3, temperature: 20 },
                CloseBatch,
                RequestDecryption { batch_id: 1 },
                Relay { request_index: 0 },
            ]
        }
        TransactionPattern::MultiProviderBatch => {
            let mut actions = std::vec![OpenBatch];
            for round in 0..3u64 {
                for p in 0..num_providers.min(4) {
                    actions.push(Submit {
                        provider_index: p,
                        vibration: round * 10 + p as u64,
                        temperature: 100 - round * 7 - p as u64,
                    });
                }
                actions.push(AdvanceTime { delta: 60 });
            }
            actions.push(CloseBatch);
            actions.push(RequestDecryption { batch_id: 1 });
            actions.push(Relay { request_index: 0 });
            actions
        }
        TransactionPattern::BackToBackBatches => {
            let mut actions = Vec::new();
            for b in 0..3u64 {
                actions.push(OpenBatch);
                actions.push(Submit { provider_index: 0, vibration: b + 1, temperature: 50 - b });
                actions.push(AdvanceTime { delta: 60 });
                actions.push(CloseBatch);
                actions.push(RequestDecryption { batch_id: b + 1 });
                actions.push(AdvanceTime { delta: 60 });
            }
            actions.push(Relay { request_index: 2 });
            actions.push(Relay { request_index: 0 });
            actions.push(Relay { request_index: 1 });
            actions
        }
        TransactionPattern::PausedMidBatch => {
            std::vec![
                OpenBatch,
                Submit { provider_index: 0, vibration: 4, temperature: 4 },
                Pause,
                AdvanceTime { delta: 120 },
                Submit { provider_index: 0, vibration: 9, temperature: 9 },
                CloseBatch,
                Unpause,
                Submit { provider_index: 0, vibration: 1, temperature: 2 },
                CloseBatch,
            ]
        }
        TransactionPattern::RepeatedDecryption => {
            std::vec![
                OpenBatch,
                Submit { provider_index: 0, vibration: 7, temperature: 3 },
                CloseBatch,
                RequestDecryption { batch_id: 1 },
                AdvanceTime { delta: 60 },
                RequestDecryption { batch_id: 1 },
                ForgedComplete { request_index: 0, mutation: CallbackMutation::FlipProofBit },
                Relay { request_index: 1 },
                Relay { request_index: 1 },
                Relay { request_index: 0 },
            ]
        }
    }
}

/// Strategy that selects a transaction pattern.
pub fn transaction_pattern_strategy() -> impl Strategy<Value = TransactionPattern> {
    prop_oneof![
        Just(TransactionPattern::SingleBatchRoundTrip),
        Just(TransactionPattern::MultiProviderBatch),
        Just(TransactionPattern::BackToBackBatches),
        Just(TransactionPattern::PausedMidBatch),
        Just(TransactionPattern::RepeatedDecryption),
    ]
}
