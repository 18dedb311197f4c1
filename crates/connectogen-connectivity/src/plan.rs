// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Row plans: how a validated connection is cut into independent rows.

A row is a target, a source, a fixed chunk of pairs or a fixed partition of
targets. Each row draws only from its own substreams, so rows can run on any
worker in any order and their outputs are concatenated in row order.
*/

use rand::Rng;

use crate::emitter::{BoundSpec, Draw, EdgeEmitter};
use crate::params::{ParameterBinder, SynapseSpec};
use crate::pools::PoolBuilder;
use crate::rng::{RandomStream, StreamDomain, Substream};
use crate::rules::{array_layouts, Connection, ConnectionRule, RuleFlags, TripartiteParams};
use crate::sampler::{
    bernoulli, hypergeometric_split, multinomial_split, sample_with_replacement,
    sample_without_replacement, CandidateRow, PoissonCounter,
};
use crate::types::{ConnectError, ConnectResult, Edge, EdgeKind, Endpoints, Population};

/// What is sampled for each row
#[derive(Debug, Clone)]
enum RowKind {
    /// Positional pairs, `chunk` per row
    OneToOne { chunk: usize },
    AllToAll,
    Bernoulli { p: f64 },
    /// Unordered pairs {i < j} of one population, mirrored by the emitter
    SymmetricSame { p: f64 },
    Poisson { counter: PoissonCounter },
    Indegree { k: usize, distinct: bool },
    Outdegree { k: usize, distinct: bool },
    /// Fixed partitions of `size` targets with pre-drawn counts
    TotalNumber {
        size: usize,
        distinct: bool,
        counts: Vec<u64>,
        offsets: Vec<usize>,
    },
    Tripartite { params: TripartiteParams, pools: PoolBuilder },
    /// Externally supplied `(index, source, target)` triples
    Pairs {
        pairs: Vec<(usize, usize, usize)>,
        chunk: usize,
    },
}

/// Everything needed to sample any row of one generation call
#[derive(Debug, Clone)]
pub(crate) struct RowPlan {
    endpoints: Endpoints,
    stream: RandomStream,
    emitter: EdgeEmitter,
    kind: RowKind,
    /// Per row, the position of the row's own handle in the candidate
    /// population; only filled when autapses are disallowed
    skips: Option<Vec<Option<usize>>>,
}

impl RowPlan {
    /// Plan a connection that already passed validation
    ///
    /// The fixed-total-number split is drawn here, before any row runs.
    pub fn for_connection(
        conn: &Connection,
        endpoints: &Endpoints,
        stream: RandomStream,
        binder: ParameterBinder,
        partition_size: usize,
    ) -> ConnectResult<Self> {
        let flags = conn.flags;
        let (primary, third_in, third_out) = array_layouts(conn, endpoints);
        let emitter = EdgeEmitter::new(
            binder,
            BoundSpec {
                spec: conn.synapse.clone(),
                total: primary.total()?,
            },
            BoundSpec {
                spec: conn.third_in.clone(),
                total: third_in.total()?,
            },
            BoundSpec {
                spec: conn.third_out.clone(),
                total: third_out.total()?,
            },
            flags.allow_autapses,
            flags.make_symmetric,
        );

        let sources = &endpoints.sources;
        let targets = &endpoints.targets;
        let skips = match conn.rule {
            _ if flags.allow_autapses => None,
            ConnectionRule::FixedOutdegree { .. } => Some(skip_positions(targets, sources)),
            _ => Some(skip_positions(sources, targets)),
        };

        let kind = match conn.rule {
            ConnectionRule::OneToOne => RowKind::OneToOne {
                chunk: partition_size,
            },
            ConnectionRule::AllToAll => RowKind::AllToAll,
            ConnectionRule::PairwiseBernoulli { p } => RowKind::Bernoulli { p },
            ConnectionRule::SymmetricPairwiseBernoulli { p } => {
                if endpoints.same_population() {
                    RowKind::SymmetricSame { p }
                } else {
                    RowKind::Bernoulli { p }
                }
            }
            ConnectionRule::PairwisePoisson {
                pairwise_avg_num_conns,
            } => RowKind::Poisson {
                counter: PoissonCounter::new(pairwise_avg_num_conns)?,
            },
            ConnectionRule::FixedIndegree { indegree } => RowKind::Indegree {
                k: indegree,
                distinct: !flags.allow_multapses,
            },
            ConnectionRule::FixedOutdegree { outdegree } => RowKind::Outdegree {
                k: outdegree,
                distinct: !flags.allow_multapses,
            },
            ConnectionRule::FixedTotalNumber { n } => {
                let (counts, offsets) = split_total(
                    n,
                    sources.len(),
                    targets.len(),
                    skips.as_deref(),
                    partition_size,
                    !flags.allow_multapses,
                    &stream,
                )?;
                RowKind::TotalNumber {
                    size: partition_size,
                    distinct: !flags.allow_multapses,
                    counts,
                    offsets,
                }
            }
            ConnectionRule::TripartiteBernoulliWithPool(params) => {
                let third_len = endpoints.third.as_ref().map_or(0, Population::len);
                RowKind::Tripartite {
                    params,
                    pools: PoolBuilder::new(params.pool_type, params.pool_size, targets.len(), third_len)?,
                }
            }
        };

        Ok(Self {
            endpoints: endpoints.clone(),
            stream,
            emitter,
            kind,
            skips,
        })
    }

    /// Plan externally supplied position pairs
    pub fn for_pairs(
        pairs: &[(usize, usize)],
        flags: RuleFlags,
        synapse: &SynapseSpec,
        endpoints: &Endpoints,
        stream: RandomStream,
        binder: ParameterBinder,
        chunk: usize,
    ) -> Self {
        let emitter = EdgeEmitter::new(
            binder,
            BoundSpec {
                spec: synapse.clone(),
                total: pairs.len(),
            },
            BoundSpec {
                spec: SynapseSpec::default(),
                total: 0,
            },
            BoundSpec {
                spec: SynapseSpec::default(),
                total: 0,
            },
            flags.allow_autapses,
            false,
        );
        let pairs = emitter.filter_pairs(pairs, endpoints, flags.allow_multapses);
        Self {
            endpoints: endpoints.clone(),
            stream,
            emitter,
            kind: RowKind::Pairs { pairs, chunk },
            skips: None,
        }
    }

    pub fn row_count(&self) -> usize {
        let n_s = self.endpoints.sources.len();
        let n_t = self.endpoints.targets.len();
        match &self.kind {
            RowKind::OneToOne { chunk } => n_s.div_ceil(*chunk),
            RowKind::Pairs { pairs, chunk } => pairs.len().div_ceil(*chunk),
            RowKind::Outdegree { .. } => n_s,
            RowKind::TotalNumber { counts, .. } => counts.len(),
            _ => n_t,
        }
    }

    /// Sample, filter and bind one row
    pub fn sample_row(&self, row: usize) -> ConnectResult<Vec<Edge>> {
        let draws = self.draw_row(row)?;
        let mut param_rng = self.stream.substream(StreamDomain::Parameters, row as u64);
        self.emitter.emit(draws, &mut param_rng)
    }

    fn candidates(&self, row: usize, len: usize) -> CandidateRow {
        let skip = self.skips.as_ref().and_then(|s| s[row]);
        CandidateRow::new(len, skip)
    }

    fn draw_row(&self, row: usize) -> ConnectResult<Vec<Draw>> {
        let sources = &self.endpoints.sources;
        let targets = &self.endpoints.targets;
        let n_s = sources.len();
        let mut rng = self.stream.substream(StreamDomain::Pairs, row as u64);

        let draws = match &self.kind {
            RowKind::OneToOne { chunk } => {
                let start = row * chunk;
                (start..(start + chunk).min(n_s))
                    .map(|i| Draw::primary(sources.get(i), targets.get(i), i))
                    .collect()
            }
            RowKind::AllToAll => {
                let target = targets.get(row);
                (0..n_s)
                    .map(|s| Draw::primary(sources.get(s), target, row * n_s + s))
                    .collect()
            }
            RowKind::Bernoulli { p } => {
                let target = targets.get(row);
                let cands = self.candidates(row, n_s);
                let mut draws = Vec::new();
                for c in 0..cands.len() {
                    if bernoulli(&mut rng, *p) {
                        draws.push(Draw::primary(sources.get(cands.resolve(c)), target, draws.len()));
                    }
                }
                draws
            }
            RowKind::SymmetricSame { p } => {
                let mut draws = Vec::new();
                for j in (row + 1)..targets.len() {
                    if bernoulli(&mut rng, *p) {
                        draws.push(Draw::primary(sources.get(row), targets.get(j), draws.len()));
                    }
                }
                draws
            }
            RowKind::Poisson { counter } => {
                let target = targets.get(row);
                let cands = self.candidates(row, n_s);
                let mut draws = Vec::new();
                for c in 0..cands.len() {
                    let source = sources.get(cands.resolve(c));
                    for _ in 0..counter.draw(&mut rng) {
                        draws.push(Draw::primary(source, target, draws.len()));
                    }
                }
                draws
            }
            RowKind::Indegree { k, distinct } => {
                let target = targets.get(row);
                let cands = self.candidates(row, n_s);
                pick(&mut rng, cands.len(), *k, *distinct)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, c)| Draw::primary(sources.get(cands.resolve(c)), target, row * k + i))
                    .collect()
            }
            RowKind::Outdegree { k, distinct } => {
                let source = sources.get(row);
                let cands = self.candidates(row, targets.len());
                pick(&mut rng, cands.len(), *k, *distinct)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, c)| Draw::primary(source, targets.get(cands.resolve(c)), row * k + i))
                    .collect()
            }
            RowKind::TotalNumber {
                size,
                distinct,
                counts,
                offsets,
            } => {
                let first = row * size;
                let rows: Vec<CandidateRow> = (first..(first + size).min(targets.len()))
                    .map(|t| self.candidates(t, n_s))
                    .collect();
                let mut prefix = Vec::with_capacity(rows.len() + 1);
                prefix.push(0usize);
                for r in &rows {
                    prefix.push(prefix[prefix.len() - 1] + r.len());
                }
                let capacity = prefix[rows.len()];

                let mut flat = pick(&mut rng, capacity, counts[row] as usize, *distinct)?;
                flat.sort_unstable();
                flat.into_iter()
                    .enumerate()
                    .map(|(i, f)| {
                        // Last j with prefix[j] <= f
                        let j = prefix.partition_point(|&start| start <= f) - 1;
                        let source = rows[j].resolve(f - prefix[j]);
                        Draw::primary(sources.get(source), targets.get(first + j), offsets[row] + i)
                    })
                    .collect()
            }
            RowKind::Tripartite { params, pools } => self.draw_tripartite(row, params, pools, &mut rng)?,
            RowKind::Pairs { pairs, chunk } => {
                let start = row * chunk;
                pairs[start..(start + chunk).min(pairs.len())]
                    .iter()
                    .map(|&(i, s, t)| Draw::primary(sources.get(s), targets.get(t), i))
                    .collect()
            }
        };
        Ok(draws)
    }

    fn draw_tripartite(
        &self,
        row: usize,
        params: &TripartiteParams,
        pools: &PoolBuilder,
        rng: &mut Substream,
    ) -> ConnectResult<Vec<Draw>> {
        let sources = &self.endpoints.sources;
        let third = self.endpoints.third.as_ref().ok_or_else(|| {
            ConnectError::Internal("Tripartite plan without a third population".to_string())
        })?;
        let target = self.endpoints.targets.get(row);
        let mut pool_rng = self.stream.substream(StreamDomain::Pool, row as u64);
        let pool = pools.pool_for(row, &mut pool_rng)?;

        let cands = self.candidates(row, sources.len());
        let mut draws = Vec::new();
        for c in 0..cands.len() {
            if !bernoulli(rng, params.p_primary) {
                continue;
            }
            let source = sources.get(cands.resolve(c));
            draws.push(Draw::primary(source, target, draws.len()));
            if !pool.is_empty() && bernoulli(rng, params.p_third_if_primary) {
                let picked = third.get(pool[rng.gen_range(0..pool.len())]);
                draws.push(Draw {
                    source,
                    target: picked,
                    kind: EdgeKind::ThirdFactorIn,
                    slot: draws.len(),
                });
                draws.push(Draw {
                    source: picked,
                    target,
                    kind: EdgeKind::ThirdFactorOut,
                    slot: draws.len(),
                });
            }
        }
        Ok(draws)
    }
}

fn pick(rng: &mut Substream, n: usize, k: usize, distinct: bool) -> ConnectResult<Vec<usize>> {
    if distinct {
        sample_without_replacement(rng, n, k)
    } else {
        sample_with_replacement(rng, n, k)
    }
}

/// For each row handle, its position in `from` (if present)
fn skip_positions(from: &Population, rows: &Population) -> Vec<Option<usize>> {
    let index = from.position_index();
    rows.iter().map(|h| index.get(&h).copied()).collect()
}

/// Draw per-partition counts for fixed-total-number and their output offsets
///
/// Partitions are `partition_size` consecutive targets; their capacities are
/// candidate-pair counts. Counts come from the call's split substream.
fn split_total(
    n: u64,
    n_s: usize,
    n_t: usize,
    skips: Option<&[Option<usize>]>,
    partition_size: usize,
    distinct: bool,
    stream: &RandomStream,
) -> ConnectResult<(Vec<u64>, Vec<usize>)> {
    let capacities: Vec<u64> = (0..n_t)
        .step_by(partition_size)
        .map(|first| {
            (first..(first + partition_size).min(n_t))
                .map(|t| {
                    let skip = skips.and_then(|s| s[t]);
                    CandidateRow::new(n_s, skip).len() as u64
                })
                .sum()
        })
        .collect();

    let mut rng = stream.substream(StreamDomain::Split, 0);
    let counts = if distinct {
        hypergeometric_split(&mut rng, n, &capacities)?
    } else {
        multinomial_split(&mut rng, n, &capacities)?
    };

    let mut offsets = Vec::with_capacity(counts.len());
    let mut next = 0usize;
    for count in &counts {
        offsets.push(next);
        next += *count as usize;
    }
    Ok((counts, offsets))
}
