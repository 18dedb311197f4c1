// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# connectogen Connectivity

Rule-driven generation of directed edges between node populations:
- Positional rules (one-to-one, all-to-all)
- Probabilistic rules (pairwise Bernoulli/Poisson, fixed total number,
  fixed in/out-degree) with exact degree contracts
- Tripartite third-factor connectivity with random or block pools
- Per-edge parameter binding from scalars, arrays or clipped distributions

## Determinism

Every row of work (a target, a source, a chunk of pairs or a partition of
targets) derives its own substream from the call's `RandomStream`. The output
sequence for a given seed is the same for any number of workers.

## Features

- `parallel` (default): rows are sampled on rayon workers

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod emitter;
pub mod engine;
pub mod generator;
pub mod params;
mod plan;
pub mod pools;
pub mod rng;
pub mod rules;
pub mod sampler;
pub mod types;

pub use engine::{EdgeSet, EdgeStream, GenerationOptions, RuleEngine};
pub use generator::{ConnectionGenerator, FnGenerator};
pub use params::{
    ArrayLayout, Distribution, DistributionSpec, EdgeSlot, ParameterArray, ParameterBinder,
    ParameterSpec, SynapseSpec,
};
pub use pools::{PoolBuilder, PoolType};
pub use rng::{RandomStream, StreamDomain, Substream};
pub use rules::{Connection, ConnectionRule, RuleFlags, RuleSpec, TripartiteParams};
pub use types::{
    ConnectError, ConnectResult, Edge, EdgeKind, Endpoints, ErrorKind, NodeHandle, ParamName,
    Population,
};

// Seed sources are defined alongside configuration
pub use connectogen_config::SeedSource;
