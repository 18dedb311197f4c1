// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Edge emission: autapse/multapse filtering, parameter binding and mirroring.

Samplers hand the emitter raw `Draw`s; the emitter decides which survive and
turns them into `Edge`s with their bound parameters.
*/

use ahash::AHashSet;

use crate::params::{EdgeSlot, ParameterBinder, SynapseSpec};
use crate::rng::Substream;
use crate::types::{ConnectResult, Edge, EdgeKind, Endpoints, NodeHandle};

/// One sampled connection before filtering and binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Draw {
    pub source: NodeHandle,
    pub target: NodeHandle,
    pub kind: EdgeKind,
    /// Canonical position used to index array parameters
    pub slot: usize,
}

impl Draw {
    #[inline]
    pub fn primary(source: NodeHandle, target: NodeHandle, slot: usize) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Primary,
            slot,
        }
    }
}

/// Synapse spec of one edge kind, with the number of array slots it addresses
#[derive(Debug, Clone)]
pub(crate) struct BoundSpec {
    pub spec: SynapseSpec,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeEmitter {
    binder: ParameterBinder,
    primary: BoundSpec,
    third_in: BoundSpec,
    third_out: BoundSpec,
    allow_autapses: bool,
    mirror: bool,
}

impl EdgeEmitter {
    pub fn new(
        binder: ParameterBinder,
        primary: BoundSpec,
        third_in: BoundSpec,
        third_out: BoundSpec,
        allow_autapses: bool,
        mirror: bool,
    ) -> Self {
        Self {
            binder,
            primary,
            third_in,
            third_out,
            allow_autapses,
            mirror,
        }
    }

    /// Filter and bind one row's draws, in draw order
    ///
    /// Autapse filtering applies to primary edges only. With mirroring on,
    /// every edge is followed by its reverse carrying the same parameters.
    pub fn emit(&self, draws: Vec<Draw>, rng: &mut Substream) -> ConnectResult<Vec<Edge>> {
        let mut edges = Vec::with_capacity(draws.len() * if self.mirror { 2 } else { 1 });
        for draw in draws {
            if draw.kind == EdgeKind::Primary && !self.allow_autapses && draw.source == draw.target {
                continue;
            }
            let bound = match draw.kind {
                EdgeKind::Primary => &self.primary,
                EdgeKind::ThirdFactorIn => &self.third_in,
                EdgeKind::ThirdFactorOut => &self.third_out,
            };
            let parameters = if bound.spec.is_empty() {
                Vec::new()
            } else {
                self.binder.bind_all(
                    &bound.spec,
                    EdgeSlot {
                        index: draw.slot,
                        total: bound.total,
                    },
                    rng,
                )?
            };
            let edge = Edge {
                source: draw.source,
                target: draw.target,
                kind: draw.kind,
                parameters,
            };
            if self.mirror {
                let back = edge.mirrored();
                edges.push(edge);
                edges.push(back);
            } else {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    /// Filter externally supplied position pairs
    ///
    /// Drops autapses (by handle) when they are disallowed and repeated pairs
    /// when multapses are disallowed, keeping the first occurrence. Each
    /// survivor keeps its original pair index as `(index, source, target)`.
    pub fn filter_pairs(
        &self,
        pairs: &[(usize, usize)],
        endpoints: &Endpoints,
        allow_multapses: bool,
    ) -> Vec<(usize, usize, usize)> {
        let mut seen = AHashSet::new();
        pairs
            .iter()
            .enumerate()
            .filter(|(_, (s, t))| {
                self.allow_autapses || endpoints.sources.get(*s) != endpoints.targets.get(*t)
            })
            .filter(|(_, pair)| allow_multapses || seen.insert(**pair))
            .map(|(i, (s, t))| (i, *s, *t))
            .collect()
    }
}
