// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deterministic random streams.
//!
//! A `RandomStream` is never drawn from directly. Every unit of work derives
//! its own `Substream` from `(seed, epoch, domain, index)`, so the numbers a
//! row sees do not depend on which worker runs it or in what order.

use connectogen_config::SeedSource;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use xxhash_rust::xxh64::xxh64;

/// Generator handed to a single row of work
pub type Substream = ChaCha8Rng;

/// Purpose of a substream; keeps unrelated draws of one row apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDomain {
    /// Structural draws (which pairs connect)
    Pairs,
    /// Per-edge parameter values
    Parameters,
    /// Tripartite pool membership
    Pool,
    /// Whole-network count split across partitions
    Split,
}

impl StreamDomain {
    const fn tag(self) -> u64 {
        match self {
            StreamDomain::Pairs => 0x5041_4952,
            StreamDomain::Parameters => 0x5041_5241,
            StreamDomain::Pool => 0x504f_4f4c,
            StreamDomain::Split => 0x5350_4c54,
        }
    }
}

/// Seed/epoch pair from which all substreams of one generation call derive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomStream {
    seed: u64,
    epoch: u64,
}

impl RandomStream {
    pub fn new(seed: u64) -> Self {
        Self { seed, epoch: 0 }
    }

    /// Seeded from an externally managed seed source
    pub fn from_source<S: SeedSource + ?Sized>(source: &S) -> Self {
        Self::new(source.global_seed())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Same seed, explicit epoch
    pub fn with_epoch(self, epoch: u64) -> Self {
        Self { epoch, ..self }
    }

    /// Return the stream for the current call and move the counter on, so
    /// consecutive projections drawn from one seed are independent.
    pub fn advance(&mut self) -> RandomStream {
        let current = *self;
        self.epoch = self.epoch.wrapping_add(1);
        current
    }

    /// Independent generator for `(domain, index)`
    pub fn substream(&self, domain: StreamDomain, index: u64) -> Substream {
        let mut key = [0u8; 32];
        key[..8].copy_from_slice(&self.seed.to_le_bytes());
        key[8..16].copy_from_slice(&self.epoch.to_le_bytes());
        key[16..24].copy_from_slice(&domain.tag().to_le_bytes());
        key[24..].copy_from_slice(&index.to_le_bytes());

        let mut seed = [0u8; 32];
        for (lane, chunk) in seed.chunks_exact_mut(8).enumerate() {
            chunk.copy_from_slice(&xxh64(&key, lane as u64).to_le_bytes());
        }
        ChaCha8Rng::from_seed(seed)
    }
}
