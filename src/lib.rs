//! # connectogen - Network Connectivity Generation
//!
//! connectogen decides *which* directed edges exist between populations of
//! abstract nodes, and *what* static parameters (weight, delay, ...) each
//! edge carries. It simulates nothing.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! connectogen = "0.1"  # Default: parallel row sampling
//! ```
//!
//! ```rust,no_run
//! use connectogen::prelude::*;
//!
//! let engine = RuleEngine::default();
//! let endpoints = Endpoints::new(Population::range(0, 100), Population::range(100, 50));
//! let conn = Connection::new(ConnectionRule::FixedIndegree { indegree: 10 })
//!     .allow_multapses(false)
//!     .with_synapse(SynapseSpec::new().with("weight", 0.5).with("delay", 1.0));
//!
//! let mut rng = RandomStream::new(12345);
//! let edges = engine.generate(&conn, &endpoints, &mut rng)?;
//! assert_eq!(edges.len(), 500);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`parallel`** (default): rows are sampled on rayon workers
//! - **`file-logging`**: rolling JSON log files for the `connectogen` tool
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: connectogen-config                         │
//! │  (TOML config, env/CLI overrides, seed source)          │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: connectogen-observability              │
//! │  (tracing subscriber, per-crate debug flags)            │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: connectogen-connectivity                   │
//! │  (RuleEngine, samplers, pools, parameter binding)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export members
pub use connectogen_config as config;
pub use connectogen_connectivity as connectivity;
pub use connectogen_observability as observability;

pub mod network;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::connectivity::{
        Connection, ConnectionGenerator, ConnectionRule, ConnectError, ConnectResult, Edge,
        EdgeKind, EdgeSet, Endpoints, ErrorKind, GenerationOptions, NodeHandle, ParameterSpec,
        PoolType, Population, RandomStream, RuleEngine, RuleFlags, RuleSpec, SeedSource,
        SynapseSpec, TripartiteParams,
    };
    pub use crate::network::{DegreeSummary, NetworkDescription};
}
