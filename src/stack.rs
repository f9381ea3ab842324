//! Named capture stacks with an undo journal.
//!
//! Every push and pop is recorded in a journal. A [`Checkpoint`] is the
//! journal length at some moment; rolling back to it replays the journal in
//! reverse, so a pattern that fails leaves the stacks exactly as it found
//! them while a pattern that succeeds simply keeps its changes.

use std::collections::HashMap;

use crate::capture::{Capture, capture_at};
use crate::error::MatchError;

#[derive(Debug, Clone)]
enum Op {
    Push { stack: String },
    Pop { stack: String, value: Capture },
}

/// A saved position in the stack journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// The named stacks of one top-level match.
#[derive(Debug, Default)]
pub struct StackTable {
    stacks: HashMap<String, Vec<Capture>>,
    journal: Vec<Op>,
}

impl StackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stack: &str, value: Capture) {
        self.stacks.entry(stack.to_string()).or_default().push(value);
        self.journal.push(Op::Push {
            stack: stack.to_string(),
        });
    }

    pub fn extend(&mut self, stack: &str, values: impl IntoIterator<Item = Capture>) {
        for value in values {
            self.push(stack, value);
        }
    }

    /// Pop the top entry of `stack`, if any.
    pub fn pop(&mut self, stack: &str) -> Option<Capture> {
        let value = self.stacks.get_mut(stack)?.pop()?;
        self.journal.push(Op::Pop {
            stack: stack.to_string(),
            value: value.clone(),
        });
        Some(value)
    }

    /// Pop `count` entries, failing without change when the stack is shorter.
    pub fn pop_n(
        &mut self,
        stack: &str,
        count: usize,
        position: usize,
    ) -> Result<Vec<Capture>, MatchError> {
        let available = self.len(stack);
        if available < count {
            return Err(MatchError::StackUnderflow {
                stack: stack.to_string(),
                requested: count,
                available,
                position,
                pattern: None,
            });
        }
        Ok((0..count).filter_map(|_| self.pop(stack)).collect())
    }

    pub fn peek(&self, stack: &str) -> Option<&Capture> {
        self.entries(stack).last()
    }

    /// Entry `index` of `stack`, counting down from the top when negative.
    pub fn get(&self, stack: &str, index: isize) -> Option<&Capture> {
        capture_at(self.entries(stack), index)
    }

    /// Size of `stack`. A stack never pushed to is empty.
    pub fn len(&self, stack: &str) -> usize {
        self.entries(stack).len()
    }

    pub fn contains(&self, stack: &str) -> bool {
        self.stacks.contains_key(stack)
    }

    /// Entries of `stack`, bottom first.
    pub fn entries(&self, stack: &str) -> &[Capture] {
        self.stacks.get(stack).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Journal entries recorded since the last commit.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Keep every change made so far and forget how to undo it. Checkpoints
    /// taken before a commit roll back nothing.
    pub fn commit(&mut self) {
        self.journal.clear();
    }

    /// Undo every push and pop made since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(op) = self.journal.pop() else { break };
            match op {
                Op::Push { stack } => {
                    if let Some(entries) = self.stacks.get_mut(&stack) {
                        entries.pop();
                    }
                }
                Op::Pop { stack, value } => {
                    self.stacks.entry(stack).or_default().push(value);
                }
            }
        }
    }
}
