//! Call tree tracer (`callTracer`)
//!
//! Rebuilds the nested call frames of a transaction from the action events:
//! - One frame per action, children in call order
//! - Gas, output, error and decoded revert reason per frame
//! - Optional log capture, pruned below failed frames
//!
//! The top-level frame takes its gas limit, gas used, output and error from
//! the tracer context, since those are only final at settlement.

use crate::{
    errors::TraceError,
    registry::TraceOptions,
    traits::{ExecutionTracer, TraceOutput},
    tracers::call_stack::{CallStack, StackFrame},
    types::*,
    utils::{error_utils::decode_revert_reason, serde_utils},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// `tracerConfig` recognized by the call tracer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallTracerConfig {
    pub only_top_call: bool,
    pub with_log: bool,
}

impl CallTracerConfig {
    /// Merge the top-level flags with the embedded `tracerConfig`
    ///
    /// A `tracerConfig` that does not deserialize falls back to the defaults
    /// instead of failing the trace.
    pub fn from_options(options: &TraceOptions) -> Self {
        let embedded = match &options.tracer_config {
            Some(value) if !value.is_null() => serde_json::from_value::<Self>(value.clone())
                .unwrap_or_else(|err| {
                    warn!(%err, "malformed callTracer config, falling back to defaults");
                    Self::default()
                }),
            _ => Self::default(),
        };
        Self {
            only_top_call: options.only_top_call || embedded.only_top_call,
            with_log: options.with_log || embedded.with_log,
        }
    }
}

/// A log captured inside a call frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    /// Number of child calls the frame had made when the log was emitted
    #[serde(with = "alloy::serde::quantity")]
    pub position: u64,
}

/// One frame of the call tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    #[serde(rename = "type")]
    pub kind: CallKind,
    pub from: Address,
    #[serde(with = "alloy::serde::quantity")]
    pub gas: u64,
    #[serde(with = "alloy::serde::quantity")]
    pub gas_used: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    pub input: Bytes,
    #[serde(skip_serializing_if = "serde_utils::is_empty_bytes")]
    pub output: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallFrame>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<CallLog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

impl CallFrame {
    pub fn new(
        kind: CallKind,
        from: Address,
        to: Option<Address>,
        value: U256,
        gas: u64,
        input: Bytes,
    ) -> Self {
        Self {
            kind,
            from,
            gas,
            gas_used: 0,
            to,
            input,
            output: Bytes::new(),
            error: None,
            revert_reason: None,
            calls: Vec::new(),
            logs: Vec::new(),
            value: kind.carries_value().then_some(value),
        }
    }

    fn from_action(action: &ActionEntered) -> Self {
        let mut frame = Self::new(
            action.kind,
            action.from,
            action.to,
            action.value,
            action.gas,
            action.input.clone(),
        );
        if frame.to.is_none() && action.kind == CallKind::Create2 {
            if let Some(salt) = action.salt {
                frame.to = Some(action.from.create2_from_code(salt, &action.input));
            }
        }
        frame
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Record a VM failure on this frame
    fn fail(&mut self, error: &ErrorKind, output: Bytes) {
        self.error = Some(error.to_string());
        if error.is_revert() {
            self.revert_reason = decode_revert_reason(&output);
            self.output = output;
        } else {
            self.revert_reason = None;
            self.output = Bytes::new();
        }
        if self.kind.is_create() {
            self.to = None;
        }
    }

    /// Drop the logs of every failed frame and of everything below it
    pub fn prune_failed_logs(&mut self, parent_failed: bool) {
        let failed = parent_failed || self.failed();
        if failed {
            self.logs.clear();
        }
        for call in &mut self.calls {
            call.prune_failed_logs(failed);
        }
    }

    /// Number of frames in this subtree, including this one
    pub fn frame_count(&self) -> usize {
        1 + self.calls.iter().map(CallFrame::frame_count).sum::<usize>()
    }

    /// Deepest nesting level below this frame; 0 for a leaf
    pub fn max_depth(&self) -> usize {
        self.calls
            .iter()
            .map(|call| call.max_depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

impl StackFrame for CallFrame {
    fn attach(&mut self, child: Self) {
        self.calls.push(child);
    }
}

/// Builds a `CallFrame` tree from the execution events
#[derive(Debug, Clone)]
pub struct CallTracer {
    config: CallTracerConfig,
    context: TracerContext,
    stack: CallStack<CallFrame>,
}

impl CallTracer {
    pub fn new(config: CallTracerConfig, context: TracerContext) -> Self {
        debug!(?config, "creating call tracer");
        Self {
            config,
            context,
            stack: CallStack::new(config.only_top_call),
        }
    }

    pub fn config(&self) -> CallTracerConfig {
        self.config
    }

    pub fn context(&self) -> &TracerContext {
        &self.context
    }
}

impl ExecutionTracer for CallTracer {
    fn on_action_entered(&mut self, action: &ActionEntered) -> Result<(), TraceError> {
        trace!(depth = action.depth, kind = %action.kind, "action entered");
        if action.depth == 0 {
            self.context.apply_top_level_entry(action);
        }
        self.stack.enter(action.depth, CallFrame::from_action(action))?;
        Ok(())
    }

    fn on_action_exited(&mut self, exit: &ActionExited) -> Result<(), TraceError> {
        self.stack.exit(|frame| {
            frame.gas_used = frame.gas.saturating_sub(exit.gas_remaining);
            frame.output = exit.output.clone();
            if frame.kind.is_create() {
                if let Some(created) = exit.created {
                    frame.to = Some(created);
                }
            }
        })?;
        if self.stack.depth() == 0 && exit.created.is_some() && self.context.is_creation() {
            self.context.created_address = exit.created;
        }
        Ok(())
    }

    fn on_action_reverted(&mut self, revert: &ActionReverted) -> Result<(), TraceError> {
        self.stack.exit(|frame| {
            frame.gas_used = frame.gas.saturating_sub(revert.gas_remaining);
            frame.fail(&ErrorKind::Revert, revert.output.clone());
        })?;
        Ok(())
    }

    fn on_action_errored(&mut self, errored: &ActionErrored) -> Result<(), TraceError> {
        self.stack.exit(|frame| {
            frame.gas_used = frame.gas;
            frame.fail(&errored.error, Bytes::new());
        })?;
        Ok(())
    }

    fn on_log(&mut self, log: &TraceLog) -> Result<(), TraceError> {
        if !self.config.with_log {
            return Ok(());
        }
        if let Some(frame) = self.stack.current_mut() {
            let position = frame.calls.len() as u64;
            frame.logs.push(CallLog {
                address: log.address,
                topics: log.topics.clone(),
                data: log.data.clone(),
                position,
            });
        }
        Ok(())
    }

    fn on_transaction_settled(&mut self, outcome: &TransactionSettled) -> Result<(), TraceError> {
        if self.stack.depth() != 0 {
            return Err(TraceError::protocol(format!(
                "transaction settled with {} actions still open",
                self.stack.depth()
            )));
        }
        self.context.apply_settlement(outcome);
        Ok(())
    }
}

impl TraceOutput for CallTracer {
    type Output = CallFrame;

    fn get_output(&self) -> Result<CallFrame, TraceError> {
        if self.stack.depth() != 0 {
            return Err(TraceError::protocol(format!(
                "call tree requested with {} actions still open",
                self.stack.depth()
            )));
        }
        let context = &self.context;
        let mut top = match self.stack.root() {
            Some(root) => root.clone(),
            None => CallFrame::new(
                context.kind,
                context.from,
                context.recipient(),
                context.value,
                context.gas_limit,
                context.input.clone(),
            ),
        };

        if context.gas_limit > 0 {
            top.gas = context.gas_limit;
        }
        if context.settled {
            top.gas_used = context.gas_used.min(top.gas);
            top.error = None;
            top.revert_reason = None;
            match &context.error {
                Some(error) => top.fail(error, context.output.clone()),
                None => {
                    top.output = context.output.clone();
                    if top.kind.is_create() && top.to.is_none() {
                        top.to = context.created_address;
                    }
                }
            }
        }

        if self.config.with_log {
            top.prune_failed_logs(false);
        }
        Ok(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const TOKEN: Address = address!("0000000000000000000000000000000000000bbb");

    fn enter(depth: usize, kind: CallKind, to: Address, gas: u64) -> ActionEntered {
        ActionEntered {
            depth,
            kind,
            from: ALICE,
            to: Some(to),
            value: U256::ZERO,
            gas,
            input: Bytes::from_static(&[0xaa, 0xbb, 0xcc, 0xdd]),
            salt: None,
        }
    }

    #[test]
    fn test_config_merge_and_fallback() {
        let options = TraceOptions {
            tracer_config: Some(serde_json::json!({ "withLog": true })),
            only_top_call: true,
            ..Default::default()
        };
        let config = CallTracerConfig::from_options(&options);
        assert!(config.with_log && config.only_top_call);

        let options = TraceOptions {
            tracer_config: Some(serde_json::json!({ "withLog": "yes" })),
            ..Default::default()
        };
        assert_eq!(CallTracerConfig::from_options(&options), CallTracerConfig::default());
    }

    #[test]
    fn test_staticcall_has_no_value() {
        let mut tracer = CallTracer::new(CallTracerConfig::default(), TracerContext::default());
        tracer.on_action_entered(&enter(0, CallKind::Call, TOKEN, 100_000)).unwrap();
        tracer.on_action_entered(&enter(1, CallKind::StaticCall, TOKEN, 50_000)).unwrap();
        tracer
            .on_action_exited(&ActionExited { gas_remaining: 45_000, ..Default::default() })
            .unwrap();
        tracer
            .on_action_exited(&ActionExited { gas_remaining: 80_000, ..Default::default() })
            .unwrap();

        let frame = tracer.get_output().unwrap();
        assert_eq!(frame.value, Some(U256::ZERO));
        assert_eq!(frame.calls[0].value, None);
        assert_eq!(frame.calls[0].gas_used, 5_000);
        let json = serde_json::to_value(&frame.calls[0]).unwrap();
        assert!(json.get("value").is_none());
        assert_eq!(json["type"], "STATICCALL");
        assert_eq!(json["gasUsed"], "0x1388");
    }

    #[test]
    fn test_quantities_serialize_as_hex() {
        let mut frame = CallFrame::new(CallKind::Call, TOKEN, Some(TOKEN), U256::ZERO, 50_000, Bytes::new());
        frame.logs.push(CallLog {
            address: TOKEN,
            topics: Vec::new(),
            data: Bytes::new(),
            position: 0,
        });
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["gas"], "0xc350");
        assert_eq!(json["gasUsed"], "0x0");
        assert_eq!(json["logs"][0]["position"], "0x0");
    }

    #[test]
    fn test_errored_create_clears_target_and_uses_all_gas() {
        let mut tracer = CallTracer::new(CallTracerConfig::default(), TracerContext::default());
        tracer.on_action_entered(&enter(0, CallKind::Call, TOKEN, 100_000)).unwrap();
        tracer
            .on_action_entered(&ActionEntered {
                to: None,
                salt: Some(B256::with_last_byte(1)),
                ..enter(1, CallKind::Create2, TOKEN, 60_000)
            })
            .unwrap();
        tracer
            .on_action_errored(&ActionErrored {
                error: ErrorKind::OutOfGas,
                created: None,
            })
            .unwrap();
        tracer
            .on_action_exited(&ActionExited { gas_remaining: 10_000, ..Default::default() })
            .unwrap();

        let frame = tracer.get_output().unwrap();
        let create = &frame.calls[0];
        assert_eq!(create.to, None);
        assert_eq!(create.gas_used, 60_000);
        assert_eq!(create.error.as_deref(), Some("out of gas"));
        assert_eq!(create.revert_reason, None);
    }

    #[test]
    fn test_output_before_settlement_is_protocol_error() {
        let mut tracer = CallTracer::new(CallTracerConfig::default(), TracerContext::default());
        tracer.on_action_entered(&enter(0, CallKind::Call, TOKEN, 100_000)).unwrap();
        assert!(tracer.get_output().unwrap_err().is_protocol_violation());
        assert!(tracer
            .on_transaction_settled(&TransactionSettled::default())
            .unwrap_err()
            .is_protocol_violation());
    }
}
