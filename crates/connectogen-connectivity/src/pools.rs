// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Third-factor pools for tripartite connectivity.

A pool is the slice of the third population A from which the third-factor
node of a target's primary edges is picked.
*/

use serde::{Deserialize, Serialize};

use crate::rng::Substream;
use crate::sampler::sample_without_replacement;
use crate::types::{ConnectError, ConnectResult};

/// How pools are assigned to targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolType {
    /// `pool_size` distinct members of A drawn per target
    Random,
    /// Contiguous slices of A assigned by target position
    Block,
}

impl std::fmt::Display for PoolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolType::Random => write!(f, "random"),
            PoolType::Block => write!(f, "block"),
        }
    }
}

/// Builds per-target pools as positions into A
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBuilder {
    pool_type: PoolType,
    pool_size: usize,
    num_targets: usize,
    num_third: usize,
}

impl PoolBuilder {
    /// Check pool parameters against the population sizes
    pub fn new(
        pool_type: PoolType,
        pool_size: usize,
        num_targets: usize,
        num_third: usize,
    ) -> ConnectResult<Self> {
        if pool_size == 0 {
            return Err(ConnectError::Validation("pool_size must be >= 1".to_string()));
        }
        match pool_type {
            PoolType::Random => {
                if pool_size > num_third {
                    return Err(ConnectError::ConstraintConflict(format!(
                        "Random pool_size {} exceeds third population size {}",
                        pool_size, num_third
                    )));
                }
            }
            PoolType::Block => {
                if num_third == 0 {
                    return Err(ConnectError::Cardinality(
                        "Block pools need a non-empty third population".to_string(),
                    ));
                }
                if pool_size == 1 && num_targets % num_third != 0 {
                    return Err(ConnectError::Cardinality(format!(
                        "Block pools with pool_size 1 need |T| ({}) to be a multiple of |A| ({})",
                        num_targets, num_third
                    )));
                }
                if pool_size > 1 {
                    let covered = num_targets.checked_mul(pool_size).ok_or_else(|| {
                        ConnectError::Cardinality(format!(
                            "Block pools with pool_size {} over {} targets overflow the third population index",
                            pool_size, num_targets
                        ))
                    })?;
                    if covered != num_third {
                        return Err(ConnectError::Cardinality(format!(
                            "Block pools with pool_size {} need |T| * pool_size ({}) to equal |A| ({})",
                            pool_size, covered, num_third
                        )));
                    }
                }
            }
        }
        Ok(Self {
            pool_type,
            pool_size,
            num_targets,
            num_third,
        })
    }

    pub fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pool of target `target` as positions into A
    ///
    /// `rng` is only drawn from for random pools and must be the target's
    /// own pool substream.
    pub fn pool_for(&self, target: usize, rng: &mut Substream) -> ConnectResult<Vec<usize>> {
        match self.pool_type {
            PoolType::Random => sample_without_replacement(rng, self.num_third, self.pool_size),
            PoolType::Block if self.pool_size == 1 => {
                let block_len = self.num_targets / self.num_third;
                Ok(vec![target / block_len.max(1)])
            }
            PoolType::Block => {
                let start = target * self.pool_size;
                Ok((start..start + self.pool_size).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RandomStream, StreamDomain};
    use crate::types::ErrorKind;

    fn rng(target: usize) -> Substream {
        RandomStream::new(1).substream(StreamDomain::Pool, target as u64)
    }

    #[test]
    fn test_block_pool_single() {
        let builder = PoolBuilder::new(PoolType::Block, 1, 6, 3).unwrap();
        let pools: Vec<Vec<usize>> = (0..6).map(|t| builder.pool_for(t, &mut rng(t)).unwrap()).collect();
        assert_eq!(pools, vec![vec![0], vec![0], vec![1], vec![1], vec![2], vec![2]]);
    }

    #[test]
    fn test_block_pool_slices() {
        let builder = PoolBuilder::new(PoolType::Block, 2, 3, 6).unwrap();
        assert_eq!(builder.pool_for(0, &mut rng(0)).unwrap(), vec![0, 1]);
        assert_eq!(builder.pool_for(2, &mut rng(2)).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_block_pool_cardinality_errors() {
        let err = PoolBuilder::new(PoolType::Block, 1, 7, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);
        let err = PoolBuilder::new(PoolType::Block, 2, 3, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);
        let err = PoolBuilder::new(PoolType::Block, 1, 3, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);
    }

    #[test]
    fn test_block_pool_size_overflow_is_cardinality() {
        // 4 * (2^62 + 2) wraps to 8 in release arithmetic
        let err = PoolBuilder::new(PoolType::Block, (1usize << 62) + 2, 4, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);
        let err = PoolBuilder::new(PoolType::Block, usize::MAX, 2, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);
    }

    #[test]
    fn test_random_pool_distinct_members() {
        let builder = PoolBuilder::new(PoolType::Random, 4, 10, 9).unwrap();
        for t in 0..10 {
            let pool = builder.pool_for(t, &mut rng(t)).unwrap();
            assert_eq!(pool.len(), 4);
            assert!(pool.windows(2).all(|w| w[0] < w[1]));
            assert!(pool.iter().all(|a| *a < 9));
        }
        let err = PoolBuilder::new(PoolType::Random, 10, 10, 9).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintConflict);
    }

    #[test]
    fn test_pool_type_serde() {
        let t: PoolType = serde_json::from_str("\"block\"").unwrap();
        assert_eq!(t, PoolType::Block);
        assert!(serde_json::from_str::<PoolType>("\"grid\"").is_err());
    }
}
