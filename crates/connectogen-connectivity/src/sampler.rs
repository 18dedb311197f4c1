// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Combinatorial sampling primitives.

Every function here is pure over the generator it is handed. None of them
materializes a full source x target index space.
*/

use ahash::AHashSet;
use rand::Rng;
use rand_distr::{Binomial, Distribution as _, Hypergeometric, Poisson};

use crate::types::{ConnectError, ConnectResult};

/// One Bernoulli(p) trial; `p` must already be validated to [0, 1]
#[inline]
pub fn bernoulli<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen::<f64>() < p
}

/// Poisson(lambda) counter; lambda == 0 always yields 0
#[derive(Debug, Clone)]
pub struct PoissonCounter {
    dist: Option<Poisson<f64>>,
}

impl PoissonCounter {
    pub fn new(lambda: f64) -> ConnectResult<Self> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(ConnectError::Validation(format!(
                "Poisson mean must be finite and >= 0, got {}",
                lambda
            )));
        }
        if lambda == 0.0 {
            return Ok(Self { dist: None });
        }
        let dist = Poisson::new(lambda).map_err(|e| ConnectError::Validation(e.to_string()))?;
        Ok(Self { dist: Some(dist) })
    }

    #[inline]
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match &self.dist {
            Some(d) => d.sample(rng) as u64,
            None => 0,
        }
    }
}

/// `k` independent uniform picks from `0..n`
pub fn sample_with_replacement<R: Rng + ?Sized>(rng: &mut R, n: usize, k: usize) -> ConnectResult<Vec<usize>> {
    if k > 0 && n == 0 {
        return Err(ConnectError::Internal(format!(
            "Cannot draw {} values from an empty range",
            k
        )));
    }
    Ok((0..k).map(|_| rng.gen_range(0..n)).collect())
}

/// `k` distinct values from `0..n`, sorted ascending
///
/// Floyd's combination algorithm: `k` draws and a hash set of size `k`,
/// independent of `n`.
pub fn sample_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    k: usize,
) -> ConnectResult<Vec<usize>> {
    if k > n {
        return Err(ConnectError::Internal(format!(
            "Cannot draw {} distinct values from {}",
            k, n
        )));
    }
    let mut chosen = AHashSet::with_capacity(k);
    let mut out = Vec::with_capacity(k);
    for j in (n - k)..n {
        let t = rng.gen_range(0..=j);
        let pick = if chosen.contains(&t) { j } else { t };
        chosen.insert(pick);
        out.push(pick);
    }
    out.sort_unstable();
    Ok(out)
}

/// Split `n` draws over buckets proportionally to `weights` (multinomial)
///
/// Sequential conditional binomials: bucket i receives
/// Binomial(remaining, w_i / remaining_weight).
pub fn multinomial_split<R: Rng + ?Sized>(rng: &mut R, n: u64, weights: &[u64]) -> ConnectResult<Vec<u64>> {
    let mut remaining_weight: u64 = weights.iter().sum();
    if n > 0 && remaining_weight == 0 {
        return Err(ConnectError::Internal(
            "Multinomial split over zero total weight".to_string(),
        ));
    }
    let mut remaining = n;
    let mut counts = Vec::with_capacity(weights.len());
    for &w in weights {
        let count = if remaining == 0 || w == 0 {
            0
        } else if w >= remaining_weight {
            remaining
        } else {
            let p = (w as f64 / remaining_weight as f64).min(1.0);
            Binomial::new(remaining, p)
                .map_err(|e| ConnectError::Internal(format!("Binomial({}, {}): {}", remaining, p, e)))?
                .sample(rng)
        };
        counts.push(count);
        remaining -= count;
        remaining_weight -= w;
    }
    Ok(counts)
}

/// Split `n` distinct draws over buckets of the given capacities
/// (multivariate hypergeometric); no bucket exceeds its capacity
pub fn hypergeometric_split<R: Rng + ?Sized>(
    rng: &mut R,
    n: u64,
    capacities: &[u64],
) -> ConnectResult<Vec<u64>> {
    let mut remaining_capacity: u64 = capacities.iter().sum();
    if n > remaining_capacity {
        return Err(ConnectError::Internal(format!(
            "Cannot place {} distinct draws in a total capacity of {}",
            n, remaining_capacity
        )));
    }
    let mut remaining = n;
    let mut counts = Vec::with_capacity(capacities.len());
    for &cap in capacities {
        let count = if remaining == 0 || cap == 0 {
            0
        } else if cap >= remaining_capacity {
            remaining
        } else {
            Hypergeometric::new(remaining_capacity, cap, remaining)
                .map_err(|e| {
                    ConnectError::Internal(format!(
                        "Hypergeometric({}, {}, {}): {}",
                        remaining_capacity, cap, remaining, e
                    ))
                })?
                .sample(rng)
        };
        counts.push(count);
        remaining -= count;
        remaining_capacity -= cap;
    }
    Ok(counts)
}

/// Candidate positions of one row: `0..len` with at most one position skipped
///
/// Used to exclude a node's own handle when autapses are disallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRow {
    len: usize,
    skip: Option<usize>,
}

impl CandidateRow {
    pub fn new(len: usize, skip: Option<usize>) -> Self {
        Self {
            len,
            skip: skip.filter(|s| *s < len),
        }
    }

    /// Number of eligible positions
    #[inline]
    pub fn len(&self) -> usize {
        self.len - usize::from(self.skip.is_some())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map candidate number `c` (in `0..self.len()`) to a population position
    #[inline]
    pub fn resolve(&self, c: usize) -> usize {
        match self.skip {
            Some(skip) if c >= skip => c + 1,
            _ => c,
        }
    }
}
