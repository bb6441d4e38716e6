//! revm inspectors
//!
//! The only inspector the crate ships is the event recorder, which bridges
//! revm's hooks to the execution event protocol the tracers consume.

pub mod event_recorder;

pub use event_recorder::{error_kind, EventRecorder};
