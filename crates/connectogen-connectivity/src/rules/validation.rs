// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Structural checks run before any sampling

use ahash::AHashSet;

use super::{Connection, ConnectionRule, RuleFlags};
use crate::params::{ArrayLayout, SynapseSpec};
use crate::pools::PoolBuilder;
use crate::types::{ConnectError, ConnectResult, Endpoints, NodeHandle, Population};

/// Array layouts for the (primary, third_in, third_out) synapse specs
pub(crate) fn array_layouts(conn: &Connection, endpoints: &Endpoints) -> (ArrayLayout, ArrayLayout, ArrayLayout) {
    let n_s = endpoints.sources.len();
    let n_t = endpoints.targets.len();
    let primary = match conn.rule {
        ConnectionRule::OneToOne => ArrayLayout::Flat { len: n_s },
        ConnectionRule::AllToAll => ArrayLayout::Rows {
            rows: n_t,
            width: n_s,
        },
        ConnectionRule::FixedIndegree { indegree } => ArrayLayout::Rows {
            rows: n_t,
            width: indegree,
        },
        ConnectionRule::FixedOutdegree { outdegree } => ArrayLayout::Rows {
            rows: n_s,
            width: outdegree,
        },
        ConnectionRule::FixedTotalNumber { n } => ArrayLayout::Flat { len: n as usize },
        _ => ArrayLayout::Rejected,
    };
    (primary, ArrayLayout::Rejected, ArrayLayout::Rejected)
}

/// Every structural check for a rule-driven connection
pub(crate) fn validate_connection(conn: &Connection, endpoints: &Endpoints) -> ConnectResult<()> {
    let flags = conn.flags;
    let sources = &endpoints.sources;
    let targets = &endpoints.targets;

    match (conn.rule.is_tripartite(), &endpoints.third) {
        (true, None) => {
            return Err(ConnectError::Validation(
                "Tripartite rule needs a third population".to_string(),
            ))
        }
        (false, Some(_)) => {
            return Err(ConnectError::Validation(format!(
                "Rule '{}' does not take a third population",
                conn.rule
            )))
        }
        _ => {}
    }
    if !conn.rule.is_tripartite() && !(conn.third_in.is_empty() && conn.third_out.is_empty()) {
        return Err(ConnectError::Validation(format!(
            "Third-factor synapse specs are only used by the tripartite rule, not '{}'",
            conn.rule
        )));
    }

    check_symmetry(conn, endpoints)?;

    match conn.rule {
        ConnectionRule::OneToOne => {
            if sources.len() != targets.len() {
                return Err(ConnectError::Cardinality(format!(
                    "one_to_one needs equal population sizes, got {} sources and {} targets",
                    sources.len(),
                    targets.len()
                )));
            }
        }
        ConnectionRule::AllToAll => {}
        ConnectionRule::PairwiseBernoulli { p } | ConnectionRule::SymmetricPairwiseBernoulli { p } => {
            probability("p", p)?;
        }
        ConnectionRule::PairwisePoisson {
            pairwise_avg_num_conns,
        } => {
            if !pairwise_avg_num_conns.is_finite() || pairwise_avg_num_conns < 0.0 {
                return Err(ConnectError::Validation(format!(
                    "pairwise_avg_num_conns must be finite and >= 0, got {}",
                    pairwise_avg_num_conns
                )));
            }
            if !flags.allow_multapses {
                return Err(ConnectError::ConstraintConflict(
                    "pairwise_poisson always allows multapses; allow_multapses=false is not supported"
                        .to_string(),
                ));
            }
        }
        ConnectionRule::FixedTotalNumber { n } => {
            let capacity = candidate_pairs(sources, targets, flags);
            if !flags.allow_multapses && n > capacity {
                return Err(ConnectError::ConstraintConflict(format!(
                    "fixed_total_number N={} exceeds the {} distinct pairs available without multapses",
                    n, capacity
                )));
            }
            if n > 0 && capacity == 0 {
                return Err(ConnectError::ConstraintConflict(format!(
                    "fixed_total_number N={} but there are no candidate pairs",
                    n
                )));
            }
        }
        ConnectionRule::FixedIndegree { indegree } => {
            check_degree("indegree", indegree, sources, targets, flags)?;
        }
        ConnectionRule::FixedOutdegree { outdegree } => {
            check_degree("outdegree", outdegree, targets, sources, flags)?;
        }
        ConnectionRule::TripartiteBernoulliWithPool(params) => {
            probability("p_primary", params.p_primary)?;
            probability("p_third_if_primary", params.p_third_if_primary)?;
            let third_len = endpoints.third.as_ref().map_or(0, Population::len);
            PoolBuilder::new(params.pool_type, params.pool_size, targets.len(), third_len)?;
        }
    }

    let (primary, third_in, third_out) = array_layouts(conn, endpoints);
    primary.total()?;
    conn.synapse.check_shape(primary)?;
    conn.third_in.check_shape(third_in)?;
    conn.third_out.check_shape(third_out)?;
    Ok(())
}

/// Checks for externally supplied position pairs: range and array shape only
pub(crate) fn validate_generator(
    flags: RuleFlags,
    synapse: &SynapseSpec,
    endpoints: &Endpoints,
    pairs: &[(usize, usize)],
) -> ConnectResult<()> {
    if endpoints.third.is_some() {
        return Err(ConnectError::Validation(
            "Connection generators do not take a third population".to_string(),
        ));
    }
    if flags.make_symmetric {
        return Err(ConnectError::ConstraintConflict(
            "make_symmetric is not supported for connection generators".to_string(),
        ));
    }
    let (n_s, n_t) = (endpoints.sources.len(), endpoints.targets.len());
    if let Some((i, (s, t))) = pairs
        .iter()
        .enumerate()
        .find(|(_, (s, t))| *s >= n_s || *t >= n_t)
    {
        return Err(ConnectError::Cardinality(format!(
            "Generator pair {} = ({}, {}) is outside {} sources x {} targets",
            i, s, t, n_s, n_t
        )));
    }
    synapse.check_shape(ArrayLayout::Flat { len: pairs.len() })
}

fn probability(name: &str, p: f64) -> ConnectResult<()> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConnectError::Validation(format!(
            "'{}' must be a probability in [0, 1], got {}",
            name, p
        )))
    }
}

fn check_symmetry(conn: &Connection, endpoints: &Endpoints) -> ConnectResult<()> {
    let flags = conn.flags;
    match conn.rule {
        ConnectionRule::SymmetricPairwiseBernoulli { .. } => {
            if !flags.make_symmetric {
                return Err(ConnectError::ConstraintConflict(
                    "symmetric_pairwise_bernoulli requires make_symmetric=true".to_string(),
                ));
            }
            if flags.allow_autapses {
                return Err(ConnectError::ConstraintConflict(
                    "symmetric_pairwise_bernoulli requires allow_autapses=false".to_string(),
                ));
            }
            if !endpoints.same_population() && !endpoints.sources.disjoint_from(&endpoints.targets) {
                return Err(ConnectError::ConstraintConflict(
                    "symmetric_pairwise_bernoulli needs identical or disjoint populations".to_string(),
                ));
            }
        }
        ConnectionRule::OneToOne | ConnectionRule::AllToAll if flags.make_symmetric => {
            if !endpoints.sources.disjoint_from(&endpoints.targets) {
                return Err(ConnectError::ConstraintConflict(format!(
                    "make_symmetric with '{}' needs disjoint populations",
                    conn.rule
                )));
            }
        }
        _ if flags.make_symmetric => {
            return Err(ConnectError::ConstraintConflict(format!(
                "make_symmetric is not supported for '{}'",
                conn.rule
            )));
        }
        _ => {}
    }
    Ok(())
}

/// Number of rows whose own handle also appears in `from`
fn self_candidates(from: &Population, rows: &Population) -> usize {
    let lookup: AHashSet<NodeHandle> = from.iter().collect();
    rows.iter().filter(|h| lookup.contains(h)).count()
}

/// Distinct (source, target) pairs available to a sampled rule
fn candidate_pairs(sources: &Population, targets: &Population, flags: RuleFlags) -> u64 {
    let all = sources.len() as u64 * targets.len() as u64;
    if flags.allow_autapses {
        all
    } else {
        all - self_candidates(sources, targets) as u64
    }
}

/// Every row drawn from `from` must be able to supply `degree` edges
fn check_degree(
    name: &str,
    degree: usize,
    from: &Population,
    rows: &Population,
    flags: RuleFlags,
) -> ConnectResult<()> {
    if degree == 0 || rows.is_empty() {
        return Ok(());
    }
    let excluded = !flags.allow_autapses && self_candidates(from, rows) > 0;
    let available = from.len() - usize::from(excluded && !from.is_empty());
    if available == 0 {
        return Err(ConnectError::ConstraintConflict(format!(
            "{} {} requested but some nodes have no candidates",
            name, degree
        )));
    }
    if !flags.allow_multapses && degree > available {
        return Err(ConnectError::ConstraintConflict(format!(
            "{} {} exceeds the {} candidates available without multapses",
            name, degree, available
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSpec;
    use crate::pools::PoolType;
    use crate::rules::TripartiteParams;
    use crate::types::ErrorKind;

    fn endpoints(n_s: usize, n_t: usize) -> Endpoints {
        Endpoints::new(Population::range(0, n_s), Population::range(1000, n_t))
    }

    fn kind(conn: &Connection, ep: &Endpoints) -> Option<ErrorKind> {
        validate_connection(conn, ep).err().map(|e| e.kind())
    }

    #[test]
    fn test_one_to_one_size_mismatch() {
        let conn = Connection::new(ConnectionRule::OneToOne);
        assert_eq!(kind(&conn, &endpoints(3, 4)), Some(ErrorKind::Cardinality));
        assert_eq!(kind(&conn, &endpoints(4, 4)), None);
    }

    #[test]
    fn test_indegree_limits() {
        let conn = Connection::new(ConnectionRule::FixedIndegree { indegree: 5 }).allow_multapses(false);
        assert_eq!(kind(&conn, &endpoints(5, 3)), None);
        assert_eq!(kind(&conn, &endpoints(4, 3)), Some(ErrorKind::ConstraintConflict));

        // Same population without autapses leaves |S| - 1 candidates
        let same = Endpoints::new(Population::range(0, 5), Population::range(0, 5));
        let conn = conn.allow_autapses(false);
        assert_eq!(kind(&conn, &same), Some(ErrorKind::ConstraintConflict));
        let conn = Connection::new(ConnectionRule::FixedIndegree { indegree: 4 })
            .allow_multapses(false)
            .allow_autapses(false);
        assert_eq!(kind(&conn, &same), None);
    }

    #[test]
    fn test_total_number_capacity() {
        let conn = Connection::new(ConnectionRule::FixedTotalNumber { n: 12 }).allow_multapses(false);
        assert_eq!(kind(&conn, &endpoints(3, 4)), None);
        let conn = Connection::new(ConnectionRule::FixedTotalNumber { n: 13 }).allow_multapses(false);
        assert_eq!(kind(&conn, &endpoints(3, 4)), Some(ErrorKind::ConstraintConflict));

        let same = Endpoints::new(Population::range(0, 3), Population::range(0, 3));
        let conn = Connection::new(ConnectionRule::FixedTotalNumber { n: 7 })
            .allow_multapses(false)
            .allow_autapses(false);
        assert_eq!(kind(&conn, &same), Some(ErrorKind::ConstraintConflict));

        let conn = Connection::new(ConnectionRule::FixedTotalNumber { n: 1 });
        assert_eq!(kind(&conn, &endpoints(0, 3)), Some(ErrorKind::ConstraintConflict));
    }

    #[test]
    fn test_probability_range() {
        let conn = Connection::new(ConnectionRule::PairwiseBernoulli { p: 1.5 });
        assert_eq!(kind(&conn, &endpoints(2, 2)), Some(ErrorKind::Validation));
        let conn = Connection::new(ConnectionRule::PairwiseBernoulli { p: f64::NAN });
        assert_eq!(kind(&conn, &endpoints(2, 2)), Some(ErrorKind::Validation));
    }

    #[test]
    fn test_poisson_rejects_no_multapses() {
        let conn = Connection::new(ConnectionRule::PairwisePoisson {
            pairwise_avg_num_conns: 1.0,
        })
        .allow_multapses(false);
        assert_eq!(kind(&conn, &endpoints(2, 2)), Some(ErrorKind::ConstraintConflict));
    }

    #[test]
    fn test_symmetric_requirements() {
        let same = Endpoints::new(Population::range(0, 4), Population::range(0, 4));
        let rule = ConnectionRule::SymmetricPairwiseBernoulli { p: 0.5 };

        let conn = Connection::new(rule).allow_autapses(false);
        assert_eq!(kind(&conn, &same), Some(ErrorKind::ConstraintConflict));

        let conn = Connection::new(rule).make_symmetric(true);
        assert_eq!(kind(&conn, &same), Some(ErrorKind::ConstraintConflict));

        let conn = Connection::new(rule).make_symmetric(true).allow_autapses(false);
        assert_eq!(kind(&conn, &same), None);

        let overlap = Endpoints::new(Population::range(0, 4), Population::range(2, 4));
        assert_eq!(kind(&conn, &overlap), Some(ErrorKind::ConstraintConflict));

        let conn = Connection::new(ConnectionRule::FixedIndegree { indegree: 1 }).make_symmetric(true);
        assert_eq!(kind(&conn, &endpoints(2, 2)), Some(ErrorKind::ConstraintConflict));
    }

    #[test]
    fn test_third_population_presence() {
        let tripartite = Connection::new(ConnectionRule::TripartiteBernoulliWithPool(TripartiteParams {
            p_primary: 1.0,
            p_third_if_primary: 1.0,
            pool_type: PoolType::Block,
            pool_size: 1,
        }));
        assert_eq!(kind(&tripartite, &endpoints(6, 6)), Some(ErrorKind::Validation));
        let with_third = endpoints(6, 6).with_third(Population::range(5000, 4));
        assert_eq!(kind(&tripartite, &with_third), Some(ErrorKind::Cardinality));

        let plain = Connection::new(ConnectionRule::AllToAll);
        assert_eq!(kind(&plain, &with_third), Some(ErrorKind::Validation));
    }

    #[test]
    fn test_array_shape_checked_up_front() {
        let conn = Connection::new(ConnectionRule::FixedIndegree { indegree: 2 })
            .with_synapse(SynapseSpec::new().with("weight", ParameterSpec::array(vec![1.0; 5])));
        assert_eq!(kind(&conn, &endpoints(4, 3)), Some(ErrorKind::Cardinality));

        let conn = Connection::new(ConnectionRule::PairwiseBernoulli { p: 0.5 })
            .with_synapse(SynapseSpec::new().with("weight", ParameterSpec::array(vec![1.0; 4])));
        assert_eq!(kind(&conn, &endpoints(2, 2)), Some(ErrorKind::Validation));
    }

    #[test]
    fn test_generator_range_check() {
        let ep = endpoints(2, 2);
        let flags = RuleFlags::default();
        let spec = SynapseSpec::new();
        assert!(validate_generator(flags, &spec, &ep, &[(0, 1), (1, 1)]).is_ok());
        let err = validate_generator(flags, &spec, &ep, &[(0, 2)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);
    }
}
