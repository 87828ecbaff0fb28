//! Dependency Graph Walker
//!
//! Depth-first, pre-order collection of an entry item and everything it
//! (transitively) references.
//!
//! ## Rules
//!
//! For every name popped from the walk, in this order:
//! 1. depth beyond `max_depth` (unless `max_depth == -1`) prunes the branch
//! 2. an already visited name prunes the branch
//! 3. an unresolvable name is recorded as missing, logged, and pruned
//!
//! Otherwise the item is recorded and its references are walked at `depth + 1`.
//! The entry starts at depth 1.

use std::collections::HashSet;
use tracing::{debug, warn};

/// An item with named outgoing references
pub trait Dependent {
    fn name(&self) -> &str;

    /// Referenced item names, in discovery order
    fn dependencies(&self) -> Vec<String>;
}

/// Result of one walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk<T> {
    /// Visited items in pre-order, each at most once
    pub items: Vec<T>,
    /// Referenced names that could not be resolved, first-seen order
    pub missing: Vec<String>,
}

impl<T: Dependent> Walk<T> {
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name()).collect()
    }
}

/// Collect `entry` and its dependencies up to `max_depth` (-1 = unlimited).
pub fn collect_with_dependencies<T, R>(entry: &str, mut resolve: R, max_depth: i32) -> Walk<T>
where
    T: Dependent,
    R: FnMut(&str) -> Option<T>,
{
    let mut visited: HashSet<String> = HashSet::new();
    let mut missing: Vec<String> = Vec::new();
    let mut items = Vec::new();

    // Explicit stack keeps deep call chains off the native stack; children are
    // pushed in reverse so they pop in discovery order.
    let mut stack: Vec<(String, i32)> = vec![(entry.to_string(), 1)];

    while let Some((name, depth)) = stack.pop() {
        if max_depth != -1 && depth > max_depth {
            debug!("Depth limit reached at {} (depth {})", name, depth);
            continue;
        }

        if visited.contains(&name) {
            continue;
        }

        let Some(item) = resolve(&name) else {
            warn!("Referenced item not found: {}", name);
            if !missing.contains(&name) {
                missing.push(name);
            }
            continue;
        };

        visited.insert(name);
        stack.extend(
            item.dependencies()
                .into_iter()
                .rev()
                .map(|dep| (dep, depth + 1)),
        );
        items.push(item);
    }

    Walk { items, missing }
}
