// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Config file -> engine options -> generation -> summary, as the
//! `connectogen` tool runs it.

use std::fs;

use connectogen::config::{load_config, ConnectogenConfig};
use connectogen::prelude::*;
use tempfile::tempdir;

const NETWORK: &str = r#"{
    "sources": {"size": 40},
    "targets": {"start": 40, "size": 30},
    "rule": {"rule": "fixed_indegree", "indegree": 5, "allow_multapses": false},
    "synapse": {
        "weight": {"distribution": "normal", "params": {"mean": 0.5, "std": 1.0},
                   "clip_min": 0.0, "clip_max": 1.0},
        "delay": 2.0
    }
}"#;

#[test]
fn test_config_file_drives_generation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("connectogen.toml");
    fs::write(
        &path,
        r#"
[generation]
seed = 99
workers = 2
partition_size = 8
parallel_threshold = 1

[sampling]
max_redraws = 500
"#,
    )
    .unwrap();

    let config: ConnectogenConfig = load_config(Some(&path), None).unwrap();
    let options = GenerationOptions::from_config(&config);
    assert_eq!(options.partition_size, 8);
    assert_eq!(options.default_max_redraws, 500);

    let (conn, endpoints) = NetworkDescription::from_json(NETWORK).unwrap().build().unwrap();
    let engine = RuleEngine::new(options).unwrap();
    let edges = engine
        .generate(&conn, &endpoints, &mut RandomStream::from_source(&config))
        .unwrap();

    // Same config seed without the file's worker settings gives the same edges
    let reference = RuleEngine::default()
        .generate(&conn, &endpoints, &mut RandomStream::new(99))
        .unwrap();
    assert_eq!(edges, reference);

    for edge in edges.iter() {
        let weight = edge.get("weight").unwrap();
        assert!((0.0..=1.0).contains(&weight));
        assert_eq!(edge.get("delay"), Some(2.0));
    }

    let summary = DegreeSummary::from_edges(conn.rule.name(), &edges, &endpoints);
    assert_eq!(summary.rule, "fixed_indegree");
    assert_eq!(summary.edges, 150);
    assert_eq!(summary.third_factor_edges, 0);
    assert_eq!(summary.in_degree.min, 5);
    assert_eq!(summary.in_degree.max, 5);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["in_degree"]["mean"], 5.0);
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[generation]\npartition_size = 0\n").unwrap();
    assert!(load_config(Some(&path), None).is_err());
}

#[test]
fn test_impossible_clip_fails_at_runtime() {
    let description = NetworkDescription::from_json(
        r#"{
            "sources": {"size": 4},
            "targets": {"size": 4},
            "rule": {"rule": "all_to_all"},
            "synapse": {"weight": {"distribution": "uniform", "params": {"low": 0.0, "high": 1.0},
                                   "clip_min": 5.0, "max_redraws": 10}}
        }"#,
    )
    .unwrap();
    let (conn, endpoints) = description.build().unwrap();
    let engine = RuleEngine::default();
    assert!(engine.validate(&conn, &endpoints).is_ok());
    let err = engine
        .generate(&conn, &endpoints, &mut RandomStream::new(1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuntimeSampling);
}
