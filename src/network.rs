// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Network description files and output summaries for the `connectogen` tool.
//!
//! A description names the populations by handle range, the rule record and
//! the synapse specs:
//!
//! ```json
//! {
//!   "sources": {"start": 0, "size": 100},
//!   "targets": {"start": 0, "size": 100},
//!   "rule": {"rule": "fixed_indegree", "indegree": 10, "allow_autapses": false},
//!   "synapse": {"weight": {"distribution": "normal", "params": {"mean": 1.0, "std": 0.1}}, "delay": 1.0}
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::connectivity::{
    Connection, ConnectResult, EdgeKind, EdgeSet, Endpoints, NodeHandle, Population, RuleSpec,
    SynapseSpec,
};

/// Contiguous handle range `start..start + size`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationRange {
    #[serde(default)]
    pub start: u64,
    pub size: usize,
}

impl PopulationRange {
    pub fn population(&self) -> ConnectResult<Population> {
        Population::try_range(self.start, self.size)
    }
}

/// Everything needed to generate one connection from a file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkDescription {
    pub sources: PopulationRange,
    pub targets: PopulationRange,
    #[serde(default)]
    pub third: Option<PopulationRange>,
    pub rule: RuleSpec,
    #[serde(default)]
    pub synapse: SynapseSpec,
    #[serde(default)]
    pub third_in: SynapseSpec,
    #[serde(default)]
    pub third_out: SynapseSpec,
}

impl NetworkDescription {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Convert into an engine connection and its endpoints
    pub fn build(&self) -> ConnectResult<(Connection, Endpoints)> {
        let conn = Connection::try_from(self.rule.clone())?
            .with_synapse(self.synapse.clone())
            .with_third_factor(self.third_in.clone(), self.third_out.clone());
        let mut endpoints = Endpoints::new(self.sources.population()?, self.targets.population()?);
        if let Some(third) = &self.third {
            endpoints = endpoints.with_third(third.population()?);
        }
        Ok((conn, endpoints))
    }
}

/// Min / max / mean of a degree distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DegreeStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl DegreeStats {
    /// Stats over every node of `population`, counting nodes with no edges
    fn over(population: &Population, count: impl Fn(NodeHandle) -> usize) -> Self {
        if population.is_empty() {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
            };
        }
        let counts: Vec<usize> = population.iter().map(count).collect();
        Self {
            min: counts.iter().copied().min().unwrap_or(0),
            max: counts.iter().copied().max().unwrap_or(0),
            mean: counts.iter().sum::<usize>() as f64 / counts.len() as f64,
        }
    }
}

/// Summary printed by the tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeSummary {
    pub rule: String,
    pub edges: usize,
    pub primary_edges: usize,
    pub third_factor_edges: usize,
    pub in_degree: DegreeStats,
    pub out_degree: DegreeStats,
}

impl DegreeSummary {
    /// Degree statistics over primary edges
    pub fn from_edges(rule: &str, edges: &EdgeSet, endpoints: &Endpoints) -> Self {
        let mut in_counts: HashMap<NodeHandle, usize> = HashMap::new();
        let mut out_counts: HashMap<NodeHandle, usize> = HashMap::new();
        let mut primary_edges = 0;
        for edge in edges.iter().filter(|e| e.kind == EdgeKind::Primary) {
            *in_counts.entry(edge.target).or_insert(0) += 1;
            *out_counts.entry(edge.source).or_insert(0) += 1;
            primary_edges += 1;
        }

        Self {
            rule: rule.to_string(),
            edges: edges.len(),
            primary_edges,
            third_factor_edges: edges.len() - primary_edges,
            in_degree: DegreeStats::over(&endpoints.targets, |h| {
                in_counts.get(&h).copied().unwrap_or(0)
            }),
            out_degree: DegreeStats::over(&endpoints.sources, |h| {
                out_counts.get(&h).copied().unwrap_or(0)
            }),
        }
    }
}
