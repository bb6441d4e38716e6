//! Block trace driver
//!
//! Transactions of a block run strictly in sequence. Each one is executed to
//! completion with the event recorder attached, its events are replayed into
//! a fresh tracer, and only then are its state changes committed. Tracing
//! therefore never observes a half-executed transaction, and every tracer
//! sees the world state the way the transaction found it.

use std::sync::Arc;

use crate::{
    errors::{ConfigError, RuntimeError, TraceError},
    evm::{builder::create_evm, TraceEvm},
    inspectors::EventRecorder,
    registry::{create_tracer, is_native_tracer, TraceOptions},
    state::ReplayState,
    traits::{ExecutionTracer, Reset, TransactionProcessor},
    tracers::TxTraceResult,
    types::*,
    utils::block_utils::create_block_env,
};
use revm::{
    context::{ContextTr, TxEnv},
    context_interface::result::{ExecutionResult, ResultAndState},
    database::{CacheDB, Database, DatabaseCommit, DatabaseRef},
    state::EvmState,
    ExecuteEvm, InspectEvm,
};
use tracing::{debug, warn};

/// A transaction that ran but whose state is not yet committed
struct Execution {
    nonce: u64,
    state: EvmState,
    outcome: TransactionSettled,
    events: Vec<ExecutionEvent>,
}

/// Final protocol event built from revm's execution result
fn settlement(result: &ExecutionResult, top_level_error: Option<&ErrorKind>) -> TransactionSettled {
    match result {
        ExecutionResult::Success {
            gas_used,
            output,
            logs,
            ..
        } => TransactionSettled {
            success: true,
            gas_used: *gas_used,
            output: output.data().clone(),
            logs: logs.iter().map(TraceLog::from).collect(),
            error: None,
        },
        ExecutionResult::Revert { gas_used, output } => TransactionSettled {
            success: false,
            gas_used: *gas_used,
            output: output.clone(),
            logs: Vec::new(),
            error: Some(ErrorKind::Revert),
        },
        ExecutionResult::Halt { reason, gas_used } => TransactionSettled {
            success: false,
            gas_used: *gas_used,
            output: Bytes::new(),
            logs: Vec::new(),
            error: Some(
                top_level_error
                    .cloned()
                    .unwrap_or_else(|| ErrorKind::Other(format!("{reason:?}"))),
            ),
        },
    }
}

impl<DB> TraceEvm<CacheDB<DB>, EventRecorder>
where
    DB: DatabaseRef,
{
    /// Run `tx` with the recorder attached, without committing
    fn execute(&mut self, tx: &SimulationTx) -> Result<Execution, TraceError> {
        let nonce = self
            .ctx
            .db()
            .basic(tx.caller)
            .map_err(|e| RuntimeError::AccountAccess(format!("{}: {e}", tx.caller)))?
            .map(|info| info.nonce)
            .unwrap_or_default();

        let tx_env = TxEnv::builder()
            .caller(tx.caller)
            .value(tx.value)
            .data(tx.data.clone())
            .kind(tx.transact_to)
            .nonce(nonce)
            .gas_limit(tx.gas_limit)
            .gas_price(tx.gas_price)
            .build_fill();

        debug!(tx_hash = %tx.hash, caller = %tx.caller, nonce, "executing transaction");
        let ResultAndState { result, state } = self
            .inspect(tx_env, EventRecorder::new())
            .map_err(|e| RuntimeError::ExecutionFailed(format!("{}: {e}", tx.hash)))?;

        let outcome = settlement(&result, self.inspector.top_level_error());
        let mut events = self.inspector.take_events();
        events.push(ExecutionEvent::TransactionSettled(outcome.clone()));
        debug!(
            tx_hash = %tx.hash,
            success = result.is_success(),
            gas_used = result.gas_used(),
            events = events.len(),
            "transaction executed"
        );
        Ok(Execution {
            nonce,
            state,
            outcome,
            events,
        })
    }

    /// Transaction-level facts the tracers start from
    fn tracer_context(&self, tx: &SimulationTx, nonce: u64) -> TracerContext {
        let spec = self.ctx.cfg.spec;
        let (kind, to, created_address) = match tx.transact_to {
            TxKind::Call(to) => (CallKind::Call, Some(to), None),
            TxKind::Create => (CallKind::Create, None, Some(tx.caller.create(nonce))),
        };
        let base_fee = if spec.is_enabled_in(SpecId::LONDON) {
            U256::from(self.ctx.block.basefee)
        } else {
            U256::ZERO
        };
        TracerContext {
            gas_price: U256::from(tx.gas_price),
            gas_limit: tx.gas_limit,
            from: tx.caller,
            to,
            value: tx.value,
            input: tx.data.clone(),
            kind,
            coinbase: Some(self.ctx.block.beneficiary),
            base_fee,
            created_address,
            spec,
            ..Default::default()
        }
    }

    /// Feed the recorded events of `execution` into the requested tracer
    fn replay(
        &mut self,
        tx: &SimulationTx,
        execution: &Execution,
        options: &TraceOptions,
    ) -> Result<TxTraceResult, TraceError> {
        let context = self.tracer_context(tx, execution.nonce);
        let db: &CacheDB<DB> = self.ctx.db();
        let view = ReplayState::new(db, &context, &execution.outcome);

        let mut tracer = create_tracer(&view, options, context)?;
        tracer.handle_events(&execution.events)?;
        debug!(tx_hash = %tx.hash, tracer = tracer.name(), "trace built");
        Ok(TxTraceResult {
            tx_hash: tx.hash,
            result: tracer.build_result()?,
        })
    }

    fn commit(&mut self, state: EvmState) {
        self.ctx.db().commit(state);
    }

    /// Execute `tx`, trace it with the tracer named in `options` and commit it
    ///
    /// The transaction is committed even when tracing fails, so later
    /// transactions of the same block see its effects.
    pub fn trace_transaction(
        &mut self,
        tx: SimulationTx,
        options: &TraceOptions,
    ) -> Result<TxTraceResult, TraceError> {
        let execution = self.execute(&tx)?;
        let traced = self.replay(&tx, &execution, options);
        self.commit(execution.state);
        traced
    }

    /// Execute and commit `tx` without tracing it
    pub fn execute_transaction(&mut self, tx: SimulationTx) -> Result<(), TraceError> {
        let execution = self.execute(&tx)?;
        self.commit(execution.state);
        Ok(())
    }
}

impl<DB> TransactionProcessor for TraceEvm<CacheDB<DB>, EventRecorder>
where
    DB: DatabaseRef,
{
    /// Trace a block of transactions in order
    ///
    /// Transactions filtered out by `options.tx_hash` still execute, so the
    /// traced one sees the state its predecessors left behind. The returned
    /// vector holds one entry per traced transaction.
    fn trace_transactions(
        &mut self,
        batch: SimulationBatch,
        options: &TraceOptions,
    ) -> Vec<Result<TxTraceResult, TraceError>> {
        if !is_native_tracer(&options.tracer) {
            return vec![Err(ConfigError::UnknownTracer(options.tracer.clone()).into())];
        }

        let SimulationBatch {
            block_env,
            transactions,
        } = batch;
        self.set_block(create_block_env(&block_env));

        let mut results = Vec::with_capacity(transactions.len());
        for tx in transactions {
            if options.should_trace(tx.hash) {
                results.push(self.trace_transaction(tx, options));
                continue;
            }
            let tx_hash = tx.hash;
            if let Err(err) = self.execute_transaction(tx) {
                warn!(%tx_hash, %err, "untraced transaction failed to execute");
            }
        }

        self.inspector.reset();
        results
    }
}

/// Trace independent blocks in parallel
///
/// Every block runs on its own blocking task with a fresh `CacheDB` over a
/// clone of `db`, so blocks do not see each other's state changes. Results
/// come back in the order of `blocks`.
pub async fn trace_blocks<DB>(
    db: DB,
    spec: SpecId,
    blocks: Vec<SimulationBatch>,
    options: TraceOptions,
) -> Result<Vec<Vec<Result<TxTraceResult, TraceError>>>, TraceError>
where
    DB: DatabaseRef + Clone + Send + 'static,
{
    let options = Arc::new(options);
    let handles: Vec<_> = blocks
        .into_iter()
        .map(|batch| {
            let db = db.clone();
            let options = Arc::clone(&options);
            tokio::task::spawn_blocking(move || {
                let mut evm = create_evm(db, spec);
                evm.trace_transactions(batch, &options)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let block = handle
            .await
            .map_err(|e| RuntimeError::TaskFailed(e.to_string()))?;
        results.push(block);
    }
    Ok(results)
}
