// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connection rules.

A rule is a closed set of variants, each with its own parameter record. The
flat `RuleSpec` record (JSON/TOML) converts into a `ConnectionRule` plus
`RuleFlags`; keys foreign to the selected rule are rejected there.
*/

mod spec;
mod validation;

pub use spec::RuleSpec;
pub(crate) use validation::{array_layouts, validate_connection, validate_generator};

use serde::{Deserialize, Serialize};

use crate::params::SynapseSpec;
use crate::pools::PoolType;

/// Parameters of the tripartite rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripartiteParams {
    pub p_primary: f64,
    pub p_third_if_primary: f64,
    pub pool_type: PoolType,
    pub pool_size: usize,
}

/// Which (source, target) pairs a connection creates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionRule {
    OneToOne,
    AllToAll,
    PairwiseBernoulli { p: f64 },
    SymmetricPairwiseBernoulli { p: f64 },
    PairwisePoisson { pairwise_avg_num_conns: f64 },
    FixedTotalNumber { n: u64 },
    FixedIndegree { indegree: usize },
    FixedOutdegree { outdegree: usize },
    TripartiteBernoulliWithPool(TripartiteParams),
}

impl ConnectionRule {
    /// Snake-case tag used in rule records
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionRule::OneToOne => "one_to_one",
            ConnectionRule::AllToAll => "all_to_all",
            ConnectionRule::PairwiseBernoulli { .. } => "pairwise_bernoulli",
            ConnectionRule::SymmetricPairwiseBernoulli { .. } => "symmetric_pairwise_bernoulli",
            ConnectionRule::PairwisePoisson { .. } => "pairwise_poisson",
            ConnectionRule::FixedTotalNumber { .. } => "fixed_total_number",
            ConnectionRule::FixedIndegree { .. } => "fixed_indegree",
            ConnectionRule::FixedOutdegree { .. } => "fixed_outdegree",
            ConnectionRule::TripartiteBernoulliWithPool(_) => "tripartite_bernoulli_with_pool",
        }
    }

    pub fn is_tripartite(&self) -> bool {
        matches!(self, ConnectionRule::TripartiteBernoulliWithPool(_))
    }
}

impl std::fmt::Display for ConnectionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Flags shared by every rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFlags {
    pub allow_autapses: bool,
    pub allow_multapses: bool,
    pub make_symmetric: bool,
}

impl Default for RuleFlags {
    fn default() -> Self {
        Self {
            allow_autapses: true,
            allow_multapses: true,
            make_symmetric: false,
        }
    }
}

/// A rule together with its flags and the synapse specs bound onto its edges
#[derive(Debug, Clone)]
pub struct Connection {
    pub rule: ConnectionRule,
    pub flags: RuleFlags,
    /// Bound onto primary edges
    pub synapse: SynapseSpec,
    /// Source -> third-factor edges (tripartite only)
    pub third_in: SynapseSpec,
    /// Third-factor -> target edges (tripartite only)
    pub third_out: SynapseSpec,
}

impl Connection {
    pub fn new(rule: ConnectionRule) -> Self {
        Self {
            rule,
            flags: RuleFlags::default(),
            synapse: SynapseSpec::default(),
            third_in: SynapseSpec::default(),
            third_out: SynapseSpec::default(),
        }
    }

    pub fn allow_autapses(mut self, allow: bool) -> Self {
        self.flags.allow_autapses = allow;
        self
    }

    pub fn allow_multapses(mut self, allow: bool) -> Self {
        self.flags.allow_multapses = allow;
        self
    }

    pub fn make_symmetric(mut self, symmetric: bool) -> Self {
        self.flags.make_symmetric = symmetric;
        self
    }

    pub fn with_flags(mut self, flags: RuleFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_synapse(mut self, synapse: SynapseSpec) -> Self {
        self.synapse = synapse;
        self
    }

    pub fn with_third_factor(mut self, third_in: SynapseSpec, third_out: SynapseSpec) -> Self {
        self.third_in = third_in;
        self.third_out = third_out;
        self
    }
}

impl TryFrom<RuleSpec> for Connection {
    type Error = crate::types::ConnectError;

    fn try_from(spec: RuleSpec) -> Result<Self, Self::Error> {
        let flags = spec.flags();
        let rule = ConnectionRule::try_from(spec)?;
        Ok(Connection::new(rule).with_flags(flags))
    }
}
