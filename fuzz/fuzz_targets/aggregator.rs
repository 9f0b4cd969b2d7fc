#![no_main]

use arbitrary::Arbitrary;
use common::FheEngineClient;
use libfuzzer_sys::fuzz_target;
use mock_fhe_engine::{MockFheEngine, MockFheEngineClient};
use sensor_aggregator::{
    AggregatorError, DecryptionStatus, SensorAggregatorContract, SensorAggregatorContractClient,
};
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    Address, Bytes, BytesN, Env,
};

/// Actions modelling the aggregator entry points plus tampered callbacks.
///
/// Values are bounded where unbounded input would only exercise trivially
/// rejected paths.
#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    OpenBatch,
    CloseBatch,
    Submit { vibration: u32, temperature: u32 },
    RequestDecryption { batch_id: u8 },
    Relay { request_index: u8 },
    ForgedComplete { request_index: u8, flip_byte: u8, in_proof: bool },
    RejectStale { request_index: u8 },
    Pause,
    Unpause,
    AdvanceTime { delta: u16 },
}

#[derive(Clone, Copy, Default)]
struct Expected {
    sum: u64,
    max: u64,
    count: u32,
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();

    let owner = Address::generate(&env);
    let engine_admin = Address::generate(&env);

    let engine_id = env.register(MockFheEngine, ());
    let engine = MockFheEngineClient::new(&env, &engine_id);
    engine.initialize(&engine_admin, &BytesN::from_array(&env, &[0x11u8; 32]));
    let fhe = FheEngineClient::new(&env, &engine_id);

    let contract_id = env.register(SensorAggregatorContract, ());
    let client = SensorAggregatorContractClient::new(&env, &contract_id);
    if client.try_initialize(&owner, &engine_id, &30u64).is_err() {
        return;
    }

    let mut providers = vec![];
    for _ in 0..3 {
        let p = Address::generate(&env);
        client.add_provider(&owner, &p);
        providers.push(p);
    }

    // Cleartext model of every batch, indexed by id - 1.
    let mut model: Vec<Expected> = vec![];
    let mut requests: Vec<u64> = vec![];

    for (i, action) in actions.into_iter().enumerate() {
        let provider = &providers[i % providers.len()];
        match action {
            FuzzAction::OpenBatch => {
                if client.try_open_batch(&owner).is_ok() {
                    model.push(Expected::default());
                }
            }
            FuzzAction::CloseBatch => {
                let _ = client.try_close_batch(&owner);
            }
            FuzzAction::Submit { vibration, temperature } => {
                let v = fhe.constant(&(vibration as u64));
                let t = fhe.constant(&(temperature as u64));
                if client.try_submit(provider, &v, &t).is_ok() {
                    let id = client.current_batch_id() as usize;
                    let entry = &mut model[id - 1];
                    entry.sum = entry.sum.wrapping_add(vibration as u64);
                    entry.max = entry.max.max(temperature as u64);
                    entry.count += 1;
                }
            }
            FuzzAction::RequestDecryption { batch_id } => {
                if let Ok(Ok(id)) = client.try_request_decryption(&owner, &(batch_id as u64)) {
                    requests.push(id);
                }
            }
            FuzzAction::Relay { request_index } => {
                if requests.is_empty() {
                    continue;
                }
                let id = requests[request_index as usize % requests.len()];
                let (cleartexts, proof) = engine.decryption_payload(&id);
                match client.try_complete(&id, &cleartexts, &proof) {
                    Ok(Ok(result)) => {
                        let expected = model[(result.batch_id - 1) as usize];
                        assert_eq!(result.total, expected.sum, "INVARIANT VIOLATION: sum");
                        assert_eq!(result.max, expected.max, "INVARIANT VIOLATION: max");
                        assert_eq!(result.count, expected.count, "INVARIANT VIOLATION: count");
                    }
                    Err(Ok(AggregatorError::ReplayAttempt)) => {
                        assert_eq!(
                            client.decryption_status(&id),
                            Some(DecryptionStatus::Completed),
                            "INVARIANT VIOLATION: pending request refused as replay"
                        );
                    }
                    other => panic!("INVARIANT VIOLATION: genuine answer refused: {:?}", other),
                }
            }
            FuzzAction::ForgedComplete { request_index, flip_byte, in_proof } => {
                if requests.is_empty() {
                    continue;
                }
                let id = requests[request_index as usize % requests.len()];
                let (cleartexts, proof) = engine.decryption_payload(&id);
                let (cleartexts, proof) = if in_proof {
                    (cleartexts, flip(&proof, flip_byte))
                } else {
                    (flip(&cleartexts, flip_byte), proof)
                };
                assert!(
                    client.try_complete(&id, &cleartexts, &proof).is_err(),
                    "INVARIANT VIOLATION: forged callback accepted"
                );
            }
            FuzzAction::RejectStale { request_index } => {
                if requests.is_empty() {
                    continue;
                }
                let id = requests[request_index as usize % requests.len()];
                match client.try_reject_stale(&id) {
                    Ok(Ok(status)) => assert_eq!(
                        status,
                        DecryptionStatus::Pending,
                        "INVARIANT VIOLATION: untampered request rejected"
                    ),
                    Err(Ok(AggregatorError::ReplayAttempt)) => assert_eq!(
                        client.decryption_status(&id),
                        Some(DecryptionStatus::Completed),
                        "INVARIANT VIOLATION: pending request refused as settled"
                    ),
                    other => panic!("INVARIANT VIOLATION: reject_stale failed: {:?}", other),
                }
            }
            FuzzAction::Pause => {
                let _ = client.try_set_paused(&owner, &true);
            }
            FuzzAction::Unpause => {
                let _ = client.try_set_paused(&owner, &false);
            }
            FuzzAction::AdvanceTime { delta } => {
                let ts = env.ledger().timestamp().saturating_add(delta as u64);
                env.ledger().set_timestamp(ts);
            }
        }

        // ── Post-action invariant checks ──
        let current = client.current_batch_id();
        assert_eq!(current as usize, model.len(), "INVARIANT VIOLATION: batch ids skipped");

        let mut open = 0;
        for id in 1..=current {
            let batch = client.get_batch(&id);
            if batch.open {
                open += 1;
                assert_eq!(id, current, "INVARIANT VIOLATION: stale batch still open");
            }
            assert_eq!(batch.count, model[(id - 1) as usize].count);
        }
        assert!(open <= 1, "INVARIANT VIOLATION: {} batches open", open);

        for id in &requests {
            assert_ne!(
                client.decryption_status(id),
                Some(DecryptionStatus::Rejected),
                "INVARIANT VIOLATION: untampered request rejected"
            );
        }
    }
});

fn flip(bytes: &Bytes, position: u8) -> Bytes {
    let mut out = bytes.clone();
    if bytes.is_empty() {
        return out;
    }
    let index = position as u32 % bytes.len();
    if let Some(b) = bytes.get(index) {
        out.set(index, b ^ 0x80);
    }
    out
}
