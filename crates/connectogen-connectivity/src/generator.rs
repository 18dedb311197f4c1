// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! External connection generators.
//!
//! A generator supplies pre-computed `(source, target)` position pairs in
//! place of a sampled rule. Only cardinality is validated; autapse and
//! multapse flags are still applied when edges are emitted.

/// Source of pre-computed position pairs into (S, T)
pub trait ConnectionGenerator: Send + Sync {
    fn pairs(&self) -> Vec<(usize, usize)>;
}

impl ConnectionGenerator for Vec<(usize, usize)> {
    fn pairs(&self) -> Vec<(usize, usize)> {
        self.clone()
    }
}

impl ConnectionGenerator for [(usize, usize)] {
    fn pairs(&self) -> Vec<(usize, usize)> {
        self.to_vec()
    }
}

/// Generator backed by a closure
pub struct FnGenerator<F>(pub F);

impl<F> ConnectionGenerator for FnGenerator<F>
where
    F: Fn() -> Vec<(usize, usize)> + Send + Sync,
{
    fn pairs(&self) -> Vec<(usize, usize)> {
        (self.0)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_generator() {
        let ring = FnGenerator(|| (0..4).map(|i| (i, (i + 1) % 4)).collect());
        assert_eq!(ring.pairs(), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
    }

    #[test]
    fn test_slice_generator() {
        let pairs: &[(usize, usize)] = &[(1, 0)];
        assert_eq!(pairs.pairs(), vec![(1, 0)]);
    }
}
