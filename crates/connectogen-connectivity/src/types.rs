// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types for connectivity generation.

Populations are ordered handle sequences; edges are plain records that own
their bound parameter values.
*/

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Opaque node identifier, unique within its population
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Result type for connectivity operations
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Errors that can occur while validating or generating connectivity
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectError {
    /// Structurally invalid rule or parameter combination
    #[error("Validation error: {0}")]
    Validation(String),

    /// Population sizes (or array lengths) incompatible with the rule
    #[error("Cardinality error: {0}")]
    Cardinality(String),

    /// Mutually exclusive flags, or a requirement the populations cannot meet
    #[error("Constraint conflict: {0}")]
    ConstraintConflict(String),

    /// A clipped distribution exhausted its redraw budget
    #[error("Runtime sampling error: {0}")]
    RuntimeSampling(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error category, for callers that branch on the kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Cardinality,
    ConstraintConflict,
    RuntimeSampling,
    Internal,
}

impl ConnectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectError::Validation(_) => ErrorKind::Validation,
            ConnectError::Cardinality(_) => ErrorKind::Cardinality,
            ConnectError::ConstraintConflict(_) => ErrorKind::ConstraintConflict,
            ConnectError::RuntimeSampling(_) => ErrorKind::RuntimeSampling,
            ConnectError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Ordered sequence of node handles
#[derive(Debug, Clone)]
pub struct Population {
    handles: Arc<[NodeHandle]>,
}

impl Population {
    /// Build a population, rejecting duplicate handles
    pub fn new(handles: Vec<NodeHandle>) -> ConnectResult<Self> {
        let mut seen = ahash::AHashSet::with_capacity(handles.len());
        for handle in &handles {
            if !seen.insert(*handle) {
                return Err(ConnectError::Validation(format!(
                    "Duplicate handle {} in population",
                    handle
                )));
            }
        }
        Ok(Self {
            handles: handles.into(),
        })
    }

    /// Contiguous handles `start..start + len`
    ///
    /// # Errors
    ///
    /// Returns a validation error when the last handle would not fit in `u64`.
    pub fn try_range(start: u64, len: usize) -> ConnectResult<Self> {
        let end = u64::try_from(len)
            .ok()
            .and_then(|len| start.checked_add(len))
            .ok_or_else(|| {
                ConnectError::Validation(format!(
                    "Population of {} nodes starting at handle {} exceeds the handle space",
                    len, start
                ))
            })?;
        Ok(Self {
            handles: (start..end).map(NodeHandle).collect(),
        })
    }

    /// Contiguous handles `start..start + len`
    ///
    /// # Panics
    ///
    /// Panics if `start + len` overflows `u64`; use [`Population::try_range`]
    /// for untrusted bounds.
    pub fn range(start: u64, len: usize) -> Self {
        match Self::try_range(start, len) {
            Ok(population) => population,
            Err(e) => panic!("{}", e),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> NodeHandle {
        self.handles[index]
    }

    pub fn handles(&self) -> &[NodeHandle] {
        &self.handles
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.handles.iter().copied()
    }

    /// True when both populations hold the same handles in the same order
    pub fn same_as(&self, other: &Population) -> bool {
        Arc::ptr_eq(&self.handles, &other.handles) || self.handles == other.handles
    }

    /// True when no handle appears in both populations
    pub fn disjoint_from(&self, other: &Population) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let lookup: ahash::AHashSet<NodeHandle> = small.iter().collect();
        !large.iter().any(|h| lookup.contains(&h))
    }

    /// Handle -> position map
    pub(crate) fn position_index(&self) -> AHashMap<NodeHandle, usize> {
        self.iter().enumerate().map(|(i, h)| (h, i)).collect()
    }
}

/// Populations a connection is generated between
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub sources: Population,
    pub targets: Population,
    /// Third-factor population (tripartite only)
    pub third: Option<Population>,
}

impl Endpoints {
    pub fn new(sources: Population, targets: Population) -> Self {
        Self {
            sources,
            targets,
            third: None,
        }
    }

    pub fn with_third(mut self, third: Population) -> Self {
        self.third = Some(third);
        self
    }

    /// Sources and targets hold the same handles in the same order
    pub fn same_population(&self) -> bool {
        self.sources.same_as(&self.targets)
    }
}

/// Role of an edge in the generated network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Primary,
    /// Source -> third-factor node (tripartite only)
    ThirdFactorIn,
    /// Third-factor node -> target (tripartite only)
    ThirdFactorOut,
}

/// Shared parameter name
pub type ParamName = Arc<str>;

/// Generated directed edge with its bound static parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: NodeHandle,
    pub target: NodeHandle,
    pub kind: EdgeKind,
    pub parameters: Vec<(ParamName, f64)>,
}

impl Edge {
    pub fn new(source: NodeHandle, target: NodeHandle) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Primary,
            parameters: Vec::new(),
        }
    }

    /// Bound value of a named parameter
    pub fn get(&self, name: &str) -> Option<f64> {
        self.parameters
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| *v)
    }

    #[inline]
    pub fn is_autapse(&self) -> bool {
        self.source == self.target
    }

    /// Same parameters, direction flipped
    pub(crate) fn mirrored(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
            kind: self.kind,
            parameters: self.parameters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_rejects_duplicates() {
        let result = Population::new(vec![NodeHandle(1), NodeHandle(2), NodeHandle(1)]);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_population_identity() {
        let a = Population::range(0, 5);
        let b = Population::new((0..5).map(NodeHandle).collect()).unwrap();
        let c = Population::range(5, 5);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert!(a.disjoint_from(&c));
        assert!(!a.disjoint_from(&Population::range(4, 3)));
    }

    #[test]
    fn test_range_at_end_of_handle_space() {
        let last = Population::try_range(u64::MAX - 2, 2).unwrap();
        assert_eq!(last.handles(), &[NodeHandle(u64::MAX - 2), NodeHandle(u64::MAX - 1)]);

        let err = Population::try_range(u64::MAX, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(Population::try_range(u64::MAX, 0).unwrap().is_empty());
    }

    #[test]
    fn test_edge_parameters() {
        let mut edge = Edge::new(NodeHandle(3), NodeHandle(4));
        edge.parameters.push((Arc::from("weight"), 0.5));
        assert_eq!(edge.get("weight"), Some(0.5));
        assert_eq!(edge.get("delay"), None);

        let back = edge.mirrored();
        assert_eq!(back.source, NodeHandle(4));
        assert_eq!(back.get("weight"), Some(0.5));
        assert!(!back.is_autapse());
    }
}
