//! Referral graph interface
//!
//! A forest: every account has at most one parent and no relation may
//! close a cycle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{LedgerError, Result};

pub trait ReferralGraph {
    fn parent_of(&self, account: &str) -> Option<String>;

    /// Walk up to `depth` ancestors, nearest first.
    fn ancestors(&self, account: &str, depth: usize) -> Vec<String> {
        let mut chain = Vec::with_capacity(depth);
        let mut current = account.to_string();
        while chain.len() < depth {
            match self.parent_of(&current) {
                Some(parent) => {
                    chain.push(parent.clone());
                    current = parent;
                }
                None => break,
            }
        }
        chain
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryReferralGraph {
    parents: HashMap<String, String>,
}

impl InMemoryReferralGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `parent` as the referrer of `child`.
    pub fn add_relation(&mut self, parent: &str, child: &str) -> Result<()> {
        if parent == child {
            return Err(LedgerError::InvalidReferral(format!(
                "{} cannot refer itself",
                child
            )));
        }

        if let Some(existing) = self.parents.get(child) {
            return Err(LedgerError::InvalidReferral(format!(
                "{} already has parent {}",
                child, existing
            )));
        }

        // The new edge closes a cycle iff child is already an ancestor of parent.
        let mut current = parent.to_string();
        while let Some(next) = self.parents.get(&current) {
            if next == child {
                return Err(LedgerError::InvalidReferral(format!(
                    "{} -> {} would create a cycle",
                    parent, child
                )));
            }
            current = next.clone();
        }

        self.parents.insert(child.to_string(), parent.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl ReferralGraph for InMemoryReferralGraph {
    fn parent_of(&self, account: &str) -> Option<String> {
        self.parents.get(account).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_nearest_first() {
        let mut graph = InMemoryReferralGraph::new();
        graph.add_relation("grandpa", "parent").unwrap();
        graph.add_relation("parent", "user").unwrap();

        assert_eq!(graph.parent_of("user"), Some("parent".to_string()));
        assert_eq!(
            graph.ancestors("user", 2),
            vec!["parent".to_string(), "grandpa".to_string()]
        );
        assert_eq!(graph.ancestors("user", 1), vec!["parent".to_string()]);
        assert!(graph.ancestors("grandpa", 2).is_empty());
    }

    #[test]
    fn test_rejects_invalid_relations() {
        let mut graph = InMemoryReferralGraph::new();
        assert!(graph.add_relation("a", "a").is_err());

        graph.add_relation("a", "b").unwrap();
        graph.add_relation("b", "c").unwrap();

        // Second parent
        assert!(graph.add_relation("x", "b").is_err());
        // Cycle a -> b -> c -> a
        assert!(graph.add_relation("c", "a").is_err());

        assert_eq!(graph.len(), 2);
    }
}
