// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Rule engine: validation, dispatch and edge generation.

`generate` materializes the whole edge set or fails without partial output.
`stream` validates eagerly, then samples rows on demand.
*/

use std::collections::VecDeque;
#[cfg(feature = "parallel")]
use std::sync::Arc;

use ahash::AHashMap;
use connectogen_config::ConnectogenConfig;
use tracing::{debug, info};

use crate::generator::ConnectionGenerator;
use crate::params::{ParameterBinder, SynapseSpec};
use crate::plan::RowPlan;
use crate::rng::RandomStream;
use crate::rules::{validate_connection, validate_generator, Connection, RuleFlags};
use crate::types::{ConnectError, ConnectResult, Edge, Endpoints, NodeHandle};

/// Tuning knobs for a `RuleEngine`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Worker threads; 0 uses the global rayon pool
    pub workers: usize,
    /// Targets per fixed-total-number partition, and pairs per chunk for
    /// positional rules
    pub partition_size: usize,
    /// Below this many rows, generation stays on the calling thread
    pub parallel_threshold: usize,
    /// Redraw budget for clipped distributions that do not set their own
    pub default_max_redraws: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            partition_size: 64,
            parallel_threshold: 256,
            default_max_redraws: 1000,
        }
    }
}

impl GenerationOptions {
    pub fn from_config(config: &ConnectogenConfig) -> Self {
        Self {
            workers: config.generation.workers,
            partition_size: config.generation.partition_size,
            parallel_threshold: config.generation.parallel_threshold,
            default_max_redraws: config.sampling.max_redraws,
        }
    }
}

/// Materialized output of one generation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeSet {
    edges: Vec<Edge>,
}

impl EdgeSet {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.edges.iter()
    }

    pub fn into_vec(self) -> Vec<Edge> {
        self.edges
    }

    /// (source, target) of every edge, in output order
    pub fn pairs(&self) -> Vec<(NodeHandle, NodeHandle)> {
        self.edges.iter().map(|e| (e.source, e.target)).collect()
    }

    /// Incoming edge count per target handle
    pub fn in_degrees(&self) -> AHashMap<NodeHandle, usize> {
        let mut degrees = AHashMap::new();
        for edge in &self.edges {
            *degrees.entry(edge.target).or_insert(0) += 1;
        }
        degrees
    }

    /// Outgoing edge count per source handle
    pub fn out_degrees(&self) -> AHashMap<NodeHandle, usize> {
        let mut degrees = AHashMap::new();
        for edge in &self.edges {
            *degrees.entry(edge.source).or_insert(0) += 1;
        }
        degrees
    }
}

impl IntoIterator for EdgeSet {
    type Item = Edge;
    type IntoIter = std::vec::IntoIter<Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.into_iter()
    }
}

impl<'a> IntoIterator for &'a EdgeSet {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

/// Lazily sampled edges of one call
///
/// Rows are sampled when the buffer runs dry. After an `Err` item the
/// stream ends.
#[derive(Debug)]
pub struct EdgeStream {
    plan: RowPlan,
    next_row: usize,
    rows: usize,
    buffer: VecDeque<Edge>,
    failed: bool,
}

impl EdgeStream {
    fn new(plan: RowPlan) -> Self {
        let rows = plan.row_count();
        Self {
            plan,
            next_row: 0,
            rows,
            buffer: VecDeque::new(),
            failed: false,
        }
    }
}

impl Iterator for EdgeStream {
    type Item = ConnectResult<Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while self.buffer.is_empty() {
            if self.next_row >= self.rows {
                return None;
            }
            let row = self.next_row;
            self.next_row += 1;
            match self.plan.sample_row(row) {
                Ok(edges) => self.buffer.extend(edges),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Dispatches connections to the samplers and drives edge emission
///
/// The engine keeps no state between calls. Independence of consecutive
/// calls comes from the caller's `RandomStream`, which is advanced once per
/// call.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    options: GenerationOptions,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self {
            options: GenerationOptions::default(),
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }
}

impl RuleEngine {
    /// Create an engine; builds a dedicated worker pool when `workers > 0`
    pub fn new(options: GenerationOptions) -> ConnectResult<Self> {
        if options.partition_size == 0 {
            return Err(ConnectError::Validation(
                "partition_size must be >= 1".to_string(),
            ));
        }

        #[cfg(feature = "parallel")]
        let pool = if options.workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.workers)
                .thread_name(|i| format!("connectogen-worker-{}", i))
                .build()
                .map_err(|e| ConnectError::Internal(format!("Failed to build worker pool: {}", e)))?;
            Some(Arc::new(pool))
        } else {
            None
        };

        debug!(
            target: "connectogen-connectivity",
            "RuleEngine ready: workers={}, partition_size={}, parallel_threshold={}",
            options.workers, options.partition_size, options.parallel_threshold
        );

        Ok(Self {
            options,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    fn binder(&self) -> ParameterBinder {
        ParameterBinder::new(self.options.default_max_redraws)
    }

    /// Run every structural check without sampling
    pub fn validate(&self, conn: &Connection, endpoints: &Endpoints) -> ConnectResult<()> {
        validate_connection(conn, endpoints)
    }

    /// Generate all edges of `conn`, or fail without partial output
    pub fn generate(
        &self,
        conn: &Connection,
        endpoints: &Endpoints,
        rng: &mut RandomStream,
    ) -> ConnectResult<EdgeSet> {
        validate_connection(conn, endpoints)?;
        let stream = rng.advance();
        let plan = RowPlan::for_connection(
            conn,
            endpoints,
            stream,
            self.binder(),
            self.options.partition_size,
        )?;
        let edges = self.run(&plan)?;

        info!(
            target: "connectogen-connectivity",
            "🔗 {}: {} sources x {} targets -> {} edges (seed={}, epoch={})",
            conn.rule,
            endpoints.sources.len(),
            endpoints.targets.len(),
            edges.len(),
            stream.seed(),
            stream.epoch()
        );
        Ok(EdgeSet { edges })
    }

    /// Validate eagerly, then sample rows as the stream is consumed
    pub fn stream(
        &self,
        conn: &Connection,
        endpoints: &Endpoints,
        rng: &mut RandomStream,
    ) -> ConnectResult<EdgeStream> {
        validate_connection(conn, endpoints)?;
        let stream = rng.advance();
        let plan = RowPlan::for_connection(
            conn,
            endpoints,
            stream,
            self.binder(),
            self.options.partition_size,
        )?;
        debug!(
            target: "connectogen-connectivity",
            "Streaming {} over {} rows",
            conn.rule,
            plan.row_count()
        );
        Ok(EdgeStream::new(plan))
    }

    /// Emit edges for externally generated position pairs
    ///
    /// Only cardinality is validated. Autapse and multapse flags still apply;
    /// `make_symmetric` is not supported.
    pub fn generate_from_generator(
        &self,
        generator: &dyn ConnectionGenerator,
        flags: RuleFlags,
        synapse: &SynapseSpec,
        endpoints: &Endpoints,
        rng: &mut RandomStream,
    ) -> ConnectResult<EdgeSet> {
        let pairs = generator.pairs();
        validate_generator(flags, synapse, endpoints, &pairs)?;
        let stream = rng.advance();
        let plan = RowPlan::for_pairs(
            &pairs,
            flags,
            synapse,
            endpoints,
            stream,
            self.binder(),
            self.options.partition_size,
        );
        let edges = self.run(&plan)?;

        info!(
            target: "connectogen-connectivity",
            "🔗 generator: {} pairs supplied -> {} edges",
            pairs.len(),
            edges.len()
        );
        Ok(EdgeSet { edges })
    }

    /// Sample every row and concatenate in row order
    fn run(&self, plan: &RowPlan) -> ConnectResult<Vec<Edge>> {
        let rows = plan.row_count();

        #[cfg(feature = "parallel")]
        {
            if rows >= self.options.parallel_threshold {
                use rayon::prelude::*;
                let sample_all = || {
                    (0..rows)
                        .into_par_iter()
                        .map(|row| plan.sample_row(row))
                        .collect::<ConnectResult<Vec<Vec<Edge>>>>()
                };
                let per_row = match &self.pool {
                    Some(pool) => pool.install(sample_all)?,
                    None => sample_all()?,
                };
                return Ok(per_row.into_iter().flatten().collect());
            }
        }

        let mut edges = Vec::new();
        for row in 0..rows {
            edges.extend(plan.sample_row(row)?);
        }
        Ok(edges)
    }
}
