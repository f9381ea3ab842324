//! Late binding of rule references.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::Pattern;
use super::ast::{Kind, Node, Target};
use crate::error::PatternError;

/// Map each rule to its name. Every rule must be named.
pub fn rule_map(
    rules: impl IntoIterator<Item = Pattern>,
) -> Result<HashMap<String, Pattern>, PatternError> {
    rules
        .into_iter()
        .map(|rule| match rule.name() {
            Some(name) => Ok((name.to_string(), rule.clone())),
            None => Err(PatternError::UnnamedRule),
        })
        .collect()
}

/// Bind every unbound reference reachable from `root` whose name appears in
/// `rules`, following bound references into their targets. Each node is
/// visited once, so cyclic grammars terminate.
///
/// A reference to a rule that encloses it (`root` itself, or a rule on the
/// path from `root` down to the reference) holds that rule weakly; every
/// other binding is strong. Keep `root` alive for as long as it is matched.
///
/// Returns the number of references bound by this call. Binding a reference
/// again to the pattern it already holds is a no-op; binding it to any other
/// pattern is an error.
pub fn bind_references(
    root: &Pattern,
    rules: &HashMap<String, Pattern>,
) -> Result<usize, PatternError> {
    enum Visit {
        Enter(Pattern),
        Leave(*const Node),
    }

    let mut visited: HashSet<*const Node> = HashSet::new();
    let mut on_path: HashSet<*const Node> = HashSet::new();
    let mut pending = vec![Visit::Enter(root.clone())];
    let mut bound = 0;

    while let Some(visit) = pending.pop() {
        let pattern = match visit {
            Visit::Enter(pattern) => pattern,
            Visit::Leave(node) => {
                on_path.remove(&node);
                continue;
            }
        };
        let node = Arc::as_ptr(&pattern.0);
        if !visited.insert(node) {
            continue;
        }
        on_path.insert(node);
        pending.push(Visit::Leave(node));

        let kind = &pattern.node().kind;
        if let Kind::Reference(reference) = kind {
            if let Some(rule) = rules.get(&reference.name) {
                match reference.target() {
                    Some(existing) if existing.ptr_eq(rule) => {}
                    Some(_) => return Err(PatternError::ReferenceRebound(reference.name.clone())),
                    None => {
                        let target = if on_path.contains(&Arc::as_ptr(&rule.0)) {
                            Target::Weak(Arc::downgrade(&rule.0))
                        } else {
                            Target::Strong(rule.clone())
                        };
                        if reference.target.set(target).is_ok() {
                            bound += 1;
                        }
                    }
                }
            }
            pending.extend(reference.target().map(Visit::Enter));
        }
        pending.extend(kind.children().iter().cloned().map(Visit::Enter));
    }
    Ok(bound)
}
