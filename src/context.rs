//! Per-match state threaded through the pattern tree.

use crate::debug::DebugOptions;
use crate::error::MatchError;
use crate::stack::StackTable;

/// Maximum pattern nesting depth before a match is abandoned.
///
/// Every level costs a few native stack frames, and this default stays well
/// inside a 2 MiB thread stack even in debug builds.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Settings for one top-level match.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Deepest allowed nesting of pattern calls.
    pub max_depth: usize,
    /// Debug options in effect before any pattern sets its own.
    pub debug: Option<DebugOptions>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            debug: None,
        }
    }
}

impl MatchConfig {
    pub fn with_debug(mut self, debug: DebugOptions) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// State carried through one top-level match: the named stacks, the debug
/// options in effect, and the current nesting depth.
#[derive(Debug)]
pub struct Context {
    stacks: StackTable,
    debug: Option<DebugOptions>,
    depth: usize,
    max_depth: usize,
}

/// Restores the context when a pattern call returns.
#[must_use]
pub(crate) struct Frame {
    saved_debug: Option<Option<DebugOptions>>,
}

impl Context {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            stacks: StackTable::new(),
            debug: config.debug.clone(),
            depth: 0,
            max_depth: config.max_depth,
        }
    }

    pub fn stacks(&self) -> &StackTable {
        &self.stacks
    }

    pub fn stacks_mut(&mut self) -> &mut StackTable {
        &mut self.stacks
    }

    /// The debug options in effect for the pattern being matched.
    pub fn debug(&self) -> Option<&DebugOptions> {
        self.debug.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enter a pattern call at `position`, installing `debug` for it and its
    /// children when given.
    pub(crate) fn enter(
        &mut self,
        debug: Option<&DebugOptions>,
        position: usize,
    ) -> Result<Frame, MatchError> {
        if self.depth >= self.max_depth {
            return Err(MatchError::RecursionLimit {
                limit: self.max_depth,
                position,
            });
        }
        self.depth += 1;
        let saved_debug = debug.map(|d| self.debug.replace(d.clone()));
        Ok(Frame { saved_debug })
    }

    pub(crate) fn leave(&mut self, frame: Frame) {
        self.depth -= 1;
        if let Some(previous) = frame.saved_debug {
            self.debug = previous;
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(&MatchConfig::default())
    }
}
