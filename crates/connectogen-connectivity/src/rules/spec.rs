// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Flat rule record, as read from JSON or TOML

use serde::{Deserialize, Serialize};

use super::{ConnectionRule, RuleFlags, TripartiteParams};
use crate::pools::PoolType;
use crate::types::ConnectError;

fn default_true() -> bool {
    true
}

/// Flat key/value rule record
///
/// Every rule-specific key is optional here; conversion into a
/// `ConnectionRule` checks which keys the selected rule needs and rejects the
/// rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub rule: String,
    #[serde(default = "default_true")]
    pub allow_autapses: bool,
    #[serde(default = "default_true")]
    pub allow_multapses: bool,
    #[serde(default)]
    pub make_symmetric: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairwise_avg_num_conns: Option<f64>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indegree: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdegree: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_primary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_third_if_primary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<PoolType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<i64>,
}

impl RuleSpec {
    /// Record for `rule` with default flags and no rule-specific keys
    pub fn new(rule: &str) -> Self {
        Self {
            rule: rule.to_string(),
            allow_autapses: true,
            allow_multapses: true,
            make_symmetric: false,
            p: None,
            pairwise_avg_num_conns: None,
            n: None,
            indegree: None,
            outdegree: None,
            p_primary: None,
            p_third_if_primary: None,
            pool_type: None,
            pool_size: None,
        }
    }

    pub fn flags(&self) -> RuleFlags {
        RuleFlags {
            allow_autapses: self.allow_autapses,
            allow_multapses: self.allow_multapses,
            make_symmetric: self.make_symmetric,
        }
    }

    /// Rule-specific keys that carry a value
    fn present_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.p.is_some() {
            keys.push("p");
        }
        if self.pairwise_avg_num_conns.is_some() {
            keys.push("pairwise_avg_num_conns");
        }
        if self.n.is_some() {
            keys.push("N");
        }
        if self.indegree.is_some() {
            keys.push("indegree");
        }
        if self.outdegree.is_some() {
            keys.push("outdegree");
        }
        if self.p_primary.is_some() {
            keys.push("p_primary");
        }
        if self.p_third_if_primary.is_some() {
            keys.push("p_third_if_primary");
        }
        if self.pool_type.is_some() {
            keys.push("pool_type");
        }
        if self.pool_size.is_some() {
            keys.push("pool_size");
        }
        keys
    }

    fn reject_foreign_keys(&self, allowed: &[&str]) -> Result<(), ConnectError> {
        let foreign: Vec<&str> = self
            .present_keys()
            .into_iter()
            .filter(|k| !allowed.contains(k))
            .collect();
        if foreign.is_empty() {
            Ok(())
        } else {
            Err(ConnectError::Validation(format!(
                "Rule '{}' does not accept: {}",
                self.rule,
                foreign.join(", ")
            )))
        }
    }

    fn missing(&self, key: &str) -> ConnectError {
        ConnectError::Validation(format!("Rule '{}' requires '{}'", self.rule, key))
    }
}

fn count(key: &str, value: i64) -> Result<u64, ConnectError> {
    u64::try_from(value)
        .map_err(|_| ConnectError::Validation(format!("'{}' must be >= 0, got {}", key, value)))
}

impl TryFrom<RuleSpec> for ConnectionRule {
    type Error = ConnectError;

    fn try_from(spec: RuleSpec) -> Result<Self, Self::Error> {
        let rule = match spec.rule.as_str() {
            "one_to_one" => {
                spec.reject_foreign_keys(&[])?;
                ConnectionRule::OneToOne
            }
            "all_to_all" => {
                spec.reject_foreign_keys(&[])?;
                ConnectionRule::AllToAll
            }
            "pairwise_bernoulli" => {
                spec.reject_foreign_keys(&["p"])?;
                ConnectionRule::PairwiseBernoulli {
                    p: spec.p.ok_or_else(|| spec.missing("p"))?,
                }
            }
            "symmetric_pairwise_bernoulli" => {
                spec.reject_foreign_keys(&["p"])?;
                ConnectionRule::SymmetricPairwiseBernoulli {
                    p: spec.p.ok_or_else(|| spec.missing("p"))?,
                }
            }
            "pairwise_poisson" => {
                spec.reject_foreign_keys(&["pairwise_avg_num_conns"])?;
                ConnectionRule::PairwisePoisson {
                    pairwise_avg_num_conns: spec
                        .pairwise_avg_num_conns
                        .ok_or_else(|| spec.missing("pairwise_avg_num_conns"))?,
                }
            }
            "fixed_total_number" => {
                spec.reject_foreign_keys(&["N"])?;
                ConnectionRule::FixedTotalNumber {
                    n: count("N", spec.n.ok_or_else(|| spec.missing("N"))?)?,
                }
            }
            "fixed_indegree" => {
                spec.reject_foreign_keys(&["indegree"])?;
                let k = count("indegree", spec.indegree.ok_or_else(|| spec.missing("indegree"))?)?;
                ConnectionRule::FixedIndegree {
                    indegree: k as usize,
                }
            }
            "fixed_outdegree" => {
                spec.reject_foreign_keys(&["outdegree"])?;
                let k = count("outdegree", spec.outdegree.ok_or_else(|| spec.missing("outdegree"))?)?;
                ConnectionRule::FixedOutdegree {
                    outdegree: k as usize,
                }
            }
            "tripartite_bernoulli_with_pool" => {
                spec.reject_foreign_keys(&[
                    "p",
                    "p_primary",
                    "p_third_if_primary",
                    "pool_type",
                    "pool_size",
                ])?;
                let p_primary = match (spec.p, spec.p_primary) {
                    (Some(_), Some(_)) => {
                        return Err(ConnectError::Validation(
                            "Give either 'p' or 'p_primary', not both".to_string(),
                        ))
                    }
                    (Some(p), None) | (None, Some(p)) => p,
                    (None, None) => return Err(spec.missing("p_primary")),
                };
                let pool_size = count("pool_size", spec.pool_size.unwrap_or(1))?;
                if pool_size == 0 {
                    return Err(ConnectError::Validation("pool_size must be >= 1".to_string()));
                }
                ConnectionRule::TripartiteBernoulliWithPool(TripartiteParams {
                    p_primary,
                    p_third_if_primary: spec
                        .p_third_if_primary
                        .ok_or_else(|| spec.missing("p_third_if_primary"))?,
                    pool_type: spec.pool_type.unwrap_or(PoolType::Random),
                    pool_size: pool_size as usize,
                })
            }
            other => {
                return Err(ConnectError::Validation(format!(
                    "Unknown connection rule '{}'",
                    other
                )))
            }
        };
        Ok(rule)
    }
}
