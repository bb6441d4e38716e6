//! Integration tests for block-level tracing
//!
//! Covers the `txHash` filter, configuration errors and tracing independent
//! blocks in parallel on the tokio runtime.

use alloy::primitives::{address, Address, Bytes, B256, U256};
use revm::{
    database::{CacheDB, EmptyDB},
    state::AccountInfo,
};
use revm_native_trace::{
    create_evm,
    errors::ConfigError,
    trace_blocks,
    types::{BlockEnv, SimulationBatch, SimulationTx, SpecId},
    TraceError, TraceOptions, TraceResult, TransactionProcessor,
};

const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
const BOB: Address = address!("0000000000000000000000000000000000000b0b");

fn backend() -> CacheDB<EmptyDB> {
    let mut db = CacheDB::new(EmptyDB::default());
    db.insert_account_info(
        ALICE,
        AccountInfo {
            balance: U256::from(1_000_000_000u64),
            ..Default::default()
        },
    );
    db
}

fn transfer(hash: u8, value: u64) -> SimulationTx {
    SimulationTx::call(ALICE, BOB, U256::from(value), Bytes::new())
        .with_hash(B256::with_last_byte(hash))
}

fn batch(number: u64, transactions: Vec<SimulationTx>) -> SimulationBatch {
    SimulationBatch {
        block_env: BlockEnv {
            number,
            timestamp: 1_700_000_000 + number * 12,
            ..Default::default()
        },
        transactions,
    }
}

#[test]
fn test_tx_hash_filter_traces_one_transaction() {
    let mut evm = create_evm(backend(), SpecId::CANCUN);
    let options = TraceOptions::for_tracer("prestateTracer").with_tx_hash(B256::with_last_byte(3));
    let results = evm.trace_transactions(
        batch(1, vec![transfer(1, 10), transfer(2, 20), transfer(3, 30)]),
        &options,
    );

    assert_eq!(results.len(), 1);
    let trace = results.into_iter().next().unwrap().unwrap();
    assert_eq!(trace.tx_hash, B256::with_last_byte(3));
    let TraceResult::Prestate(prestate) = trace.result else {
        panic!("expected a prestate");
    };
    // the two untraced transfers ran first
    assert_eq!(prestate[&ALICE].nonce, 2);
    assert_eq!(prestate[&BOB].balance, U256::from(30));

    // sender, recipient and the default coinbase
    assert_eq!(prestate.len(), 3);
}

#[test]
fn test_unknown_tracer_fails_before_execution() {
    let mut evm = create_evm(backend(), SpecId::CANCUN);
    let results = evm.trace_transactions(
        batch(1, vec![transfer(1, 10)]),
        &TraceOptions::for_tracer("jsTracer"),
    );
    assert_eq!(results.len(), 1);
    assert!(matches!(
        &results[0],
        Err(TraceError::Config(ConfigError::UnknownTracer(name))) if name == "jsTracer"
    ));

    // nothing was executed, so a real trace still starts from nonce 0
    let results = evm.trace_transactions(
        batch(1, vec![transfer(1, 10)]),
        &TraceOptions::for_tracer("prestateTracer"),
    );
    let Ok(trace) = &results[0] else {
        panic!("trace failed: {:?}", results[0]);
    };
    let TraceResult::Prestate(prestate) = &trace.result else {
        panic!("expected a prestate");
    };
    assert_eq!(prestate[&ALICE].nonce, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_trace_blocks_in_parallel() {
    let blocks = vec![
        batch(1, vec![transfer(1, 10), transfer(2, 20)]),
        batch(2, vec![transfer(3, 30)]),
        batch(3, vec![]),
    ];
    let results = trace_blocks(
        backend(),
        SpecId::CANCUN,
        blocks,
        TraceOptions::for_tracer("callTracer"),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].len(), 2);
    assert_eq!(results[1].len(), 1);
    assert!(results[2].is_empty());

    let hashes: Vec<_> = results
        .iter()
        .flatten()
        .map(|trace| trace.as_ref().unwrap().tx_hash)
        .collect();
    assert_eq!(
        hashes,
        vec![
            B256::with_last_byte(1),
            B256::with_last_byte(2),
            B256::with_last_byte(3)
        ]
    );

    // every block starts from the same backend state
    let TraceResult::Call(frame) = &results[1][0].as_ref().unwrap().result else {
        panic!("expected a call frame");
    };
    assert_eq!(frame.from, ALICE);
    assert_eq!(frame.value, Some(U256::from(30)));
    assert_eq!(frame.gas_used, 21_000);
}

#[test]
fn test_trace_blocks_on_current_thread_runtime() {
    let results = tokio_test::block_on(trace_blocks(
        backend(),
        SpecId::SHANGHAI,
        vec![batch(7, vec![transfer(9, 1)])],
        TraceOptions::for_tracer("4byteTracer"),
    ))
    .unwrap();
    let trace = results[0][0].as_ref().unwrap();
    assert_eq!(trace.tx_hash, B256::with_last_byte(9));
    assert_eq!(serde_json::to_string(&trace.result).unwrap(), "{}");
}
