//! Tracer registry and trace options
//!
//! Tracers are looked up by their geth names in a table built once, on first
//! use. The table holds constructors only; every trace gets a fresh tracer.

use std::collections::HashMap;

use crate::{
    errors::{ConfigError, TraceError},
    traits::WorldState,
    tracers::{CallTracer, CallTracerConfig, FourByteTracer, PrestateTracer, Tracer},
    types::{TracerContext, B256},
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CALL_TRACER: &str = "callTracer";
pub const PRESTATE_TRACER: &str = "prestateTracer";
pub const FOUR_BYTE_TRACER: &str = "4byteTracer";

/// Options accepted by the `debug_trace*` family
///
/// ```
/// use revm_native_trace::TraceOptions;
///
/// let options = TraceOptions::from_json(r#"{"tracer":"callTracer","tracerConfig":{"withLog":true}}"#).unwrap();
/// assert_eq!(options.tracer, "callTracer");
/// assert!(!options.only_top_call);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceOptions {
    pub tracer: String,
    /// Tracer-specific configuration, parsed by the tracer itself
    pub tracer_config: Option<serde_json::Value>,
    /// Trace only the transaction with this hash
    pub tx_hash: Option<B256>,
    pub only_top_call: bool,
    pub with_log: bool,
}

impl TraceOptions {
    pub fn for_tracer(tracer: impl Into<String>) -> Self {
        Self {
            tracer: tracer.into(),
            ..Default::default()
        }
    }

    /// Parse the options object; malformed JSON is a configuration error
    pub fn from_json(json: &str) -> Result<Self, TraceError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidOptions(e.to_string()).into())
    }

    pub fn with_tx_hash(mut self, tx_hash: B256) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }

    /// Whether the transaction `tx_hash` passes the hash filter
    pub fn should_trace(&self, tx_hash: B256) -> bool {
        self.tx_hash.map_or(true, |wanted| wanted == tx_hash)
    }
}

/// Constructor stored in the registry
pub type TracerConstructor =
    for<'a> fn(&'a dyn WorldState, &TraceOptions, TracerContext) -> Tracer<'a>;

fn new_call_tracer<'a>(
    _state: &'a dyn WorldState,
    options: &TraceOptions,
    context: TracerContext,
) -> Tracer<'a> {
    Tracer::Call(CallTracer::new(CallTracerConfig::from_options(options), context))
}

fn new_prestate_tracer<'a>(
    state: &'a dyn WorldState,
    _options: &TraceOptions,
    context: TracerContext,
) -> Tracer<'a> {
    Tracer::Prestate(PrestateTracer::new(state, context))
}

fn new_four_byte_tracer<'a>(
    _state: &'a dyn WorldState,
    _options: &TraceOptions,
    context: TracerContext,
) -> Tracer<'a> {
    Tracer::FourByte(FourByteTracer::new(context))
}

static TRACERS: Lazy<HashMap<&'static str, TracerConstructor>> = Lazy::new(|| {
    let mut tracers: HashMap<&'static str, TracerConstructor> = HashMap::new();
    tracers.insert(CALL_TRACER, new_call_tracer);
    tracers.insert(PRESTATE_TRACER, new_prestate_tracer);
    tracers.insert(FOUR_BYTE_TRACER, new_four_byte_tracer);
    tracers
});

/// Instantiate the tracer named by `options.tracer`
pub fn create_tracer<'a>(
    state: &'a dyn WorldState,
    options: &TraceOptions,
    context: TracerContext,
) -> Result<Tracer<'a>, TraceError> {
    let constructor = TRACERS
        .get(options.tracer.as_str())
        .ok_or_else(|| ConfigError::UnknownTracer(options.tracer.clone()))?;
    debug!(tracer = %options.tracer, "instantiating native tracer");
    Ok(constructor(state, options, context))
}

pub fn is_native_tracer(name: &str) -> bool {
    TRACERS.contains_key(name)
}

/// Registered tracer names, sorted
pub fn tracer_names() -> Vec<&'static str> {
    let mut names: Vec<_> = TRACERS.keys().copied().collect();
    names.sort_unstable();
    names
}
