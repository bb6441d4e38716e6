//! EVM wrapper driving the native tracers
//!
//! `TraceEvm` wraps revm's `MainnetEvm` with the event recorder attached. It
//! derefs to the inner EVM, so everything revm offers stays reachable.
//!
//! ```
//! use revm_native_trace::{create_evm, types::SpecId};
//! use revm::database::EmptyDB;
//!
//! let evm = create_evm(EmptyDB::default(), SpecId::CANCUN);
//! assert!(evm.inspector.events().is_empty());
//! ```

pub use revm::{
    context_interface::ContextTr, database::Database, handler::MainnetContext,
    inspector::Inspector, MainnetEvm,
};
use std::ops::{Deref, DerefMut};

pub mod builder;
pub mod processor;

/// revm `MainnetEvm` with a tracing inspector
pub struct TraceEvm<DB: Database, INSP>(MainnetEvm<MainnetContext<DB>, INSP>);

impl<DB, INSP> TraceEvm<DB, INSP>
where
    DB: Database,
{
    pub fn new(evm: MainnetEvm<MainnetContext<DB>, INSP>) -> Self {
        Self(evm)
    }
}

impl<DB, INSP> Deref for TraceEvm<DB, INSP>
where
    DB: Database,
{
    type Target = MainnetEvm<MainnetContext<DB>, INSP>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<DB, INSP> DerefMut for TraceEvm<DB, INSP>
where
    DB: Database,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
