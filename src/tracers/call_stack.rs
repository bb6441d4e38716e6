//! Call-stack reconstruction from enter/exit events
//!
//! The event protocol only says "an action was entered at depth N" and "the
//! innermost action ended". `CallStack` turns that into a tree: it keeps the
//! open frames on an explicit stack, checks each entry against the number of
//! open actions, and hands every finished frame to its parent.

use crate::errors::TraceError;
use alloy::primitives::Address;

/// A frame that can adopt finished child frames
pub trait StackFrame: Sized {
    fn attach(&mut self, child: Self);
}

#[derive(Debug, Clone)]
pub struct CallStack<F> {
    /// Open frames being tracked, innermost last
    frames: Vec<F>,
    /// Number of open actions, tracked or not
    open: usize,
    only_top_call: bool,
    root: Option<F>,
}

impl<F: StackFrame> CallStack<F> {
    pub fn new(only_top_call: bool) -> Self {
        Self {
            frames: Vec::new(),
            open: 0,
            only_top_call,
            root: None,
        }
    }

    /// Open a new action at `depth`
    ///
    /// Returns whether the frame is tracked; with `only_top_call` everything
    /// below the top-level action is counted but not kept.
    pub fn enter(&mut self, depth: usize, frame: F) -> Result<bool, TraceError> {
        if depth != self.open {
            return Err(TraceError::protocol(format!(
                "action entered at depth {depth} while {} actions are open",
                self.open
            )));
        }
        if depth == 0 && self.root.is_some() {
            return Err(TraceError::protocol(
                "second top-level action in one transaction",
            ));
        }
        self.open += 1;
        if self.only_top_call && depth > 0 {
            return Ok(false);
        }
        self.frames.push(frame);
        Ok(true)
    }

    /// Close the innermost open action
    ///
    /// `finish` runs on the frame before it is attached to its parent (or
    /// becomes the root); it is skipped for untracked frames.
    pub fn exit<R>(&mut self, finish: impl FnOnce(&mut F) -> R) -> Result<Option<R>, TraceError> {
        if self.open == 0 {
            return Err(TraceError::protocol(
                "action terminated without a matching entry",
            ));
        }
        self.open -= 1;
        if self.frames.len() <= self.open {
            return Ok(None);
        }
        let Some(mut frame) = self.frames.pop() else {
            return Ok(None);
        };
        let result = finish(&mut frame);
        match self.frames.last_mut() {
            Some(parent) => parent.attach(frame),
            None => self.root = Some(frame),
        }
        Ok(Some(result))
    }

    /// Number of open actions
    pub fn depth(&self) -> usize {
        self.open
    }

    /// Whether the innermost open action has a tracked frame
    pub fn is_tracking_current(&self) -> bool {
        self.open > 0 && self.frames.len() == self.open
    }

    /// Innermost tracked frame
    pub fn current(&self) -> Option<&F> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut F> {
        if self.is_tracking_current() {
            self.frames.last_mut()
        } else {
            None
        }
    }

    /// The finished top-level frame
    pub fn root(&self) -> Option<&F> {
        self.root.as_ref()
    }

    /// Whether the top-level action has ended
    pub fn is_finished(&self) -> bool {
        self.open == 0 && self.root.is_some()
    }
}

/// Frame that only records which account an action runs against
///
/// Used by tracers that need call boundaries but no tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionScope {
    /// Storage context of the action, `None` while a creation's address is unknown
    pub address: Option<Address>,
}

impl StackFrame for ActionScope {
    fn attach(&mut self, _child: Self) {}
}
