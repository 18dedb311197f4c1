// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-edge parameter specifications and binding.

A synapse spec maps parameter names (`weight`, `delay`, ...) to a
`ParameterSpec`: a scalar, an explicit array indexed by edge position, or a
distribution with optional clipping. `ParameterBinder` turns a spec into a
concrete value for one edge.
*/

pub mod distribution;

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use serde::Deserialize;

use crate::types::{ConnectError, ConnectResult, ParamName};

pub use distribution::Distribution;

/// Explicit per-edge values, either flat or given as nested rows
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterArray {
    values: Vec<f64>,
    /// Row lengths when the array was given as nested rows
    row_lens: Option<Vec<usize>>,
}

impl ParameterArray {
    pub fn flat(values: Vec<f64>) -> Self {
        Self {
            values,
            row_lens: None,
        }
    }

    pub fn rows(rows: Vec<Vec<f64>>) -> Self {
        let row_lens = rows.iter().map(Vec::len).collect();
        Self {
            values: rows.into_iter().flatten().collect(),
            row_lens: Some(row_lens),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_nested(&self) -> bool {
        self.row_lens.is_some()
    }
}

/// Distribution with optional inclusive clip window
#[derive(Debug, Clone)]
pub struct DistributionSpec {
    name: String,
    distribution: Distribution,
    clip_min: Option<f64>,
    clip_max: Option<f64>,
    max_redraws: Option<u32>,
}

impl DistributionSpec {
    pub fn new(name: &str, params: &BTreeMap<String, f64>) -> ConnectResult<Self> {
        Ok(Self {
            name: name.to_string(),
            distribution: Distribution::from_name(name, params)?,
            clip_min: None,
            clip_max: None,
            max_redraws: None,
        })
    }

    /// Restrict samples to `[min, max]`; either bound may be open
    pub fn with_clip(mut self, min: Option<f64>, max: Option<f64>) -> ConnectResult<Self> {
        for bound in [min, max].into_iter().flatten() {
            if bound.is_nan() {
                return Err(ConnectError::Validation(format!(
                    "Clip bound for '{}' must not be NaN",
                    self.name
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(ConnectError::Validation(format!(
                    "clip_min ({}) exceeds clip_max ({}) for '{}'",
                    lo, hi, self.name
                )));
            }
        }
        self.clip_min = min;
        self.clip_max = max;
        Ok(self)
    }

    /// Override the engine's default redraw budget
    pub fn with_max_redraws(mut self, max_redraws: u32) -> Self {
        self.max_redraws = Some(max_redraws);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_clipped(&self) -> bool {
        self.clip_min.is_some() || self.clip_max.is_some()
    }

    #[inline]
    fn accepts(&self, value: f64) -> bool {
        self.clip_min.map_or(true, |lo| value >= lo) && self.clip_max.map_or(true, |hi| value <= hi)
    }
}

/// How one parameter of an edge is produced
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawParameter")]
pub enum ParameterSpec {
    Scalar(f64),
    Array(ParameterArray),
    Distribution(DistributionSpec),
}

impl ParameterSpec {
    pub fn scalar(value: f64) -> Self {
        ParameterSpec::Scalar(value)
    }

    pub fn array(values: Vec<f64>) -> Self {
        ParameterSpec::Array(ParameterArray::flat(values))
    }

    pub fn rows(rows: Vec<Vec<f64>>) -> Self {
        ParameterSpec::Array(ParameterArray::rows(rows))
    }

    /// Unclipped distribution
    pub fn distribution(name: &str, params: &[(&str, f64)]) -> ConnectResult<Self> {
        let params = params.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Ok(ParameterSpec::Distribution(DistributionSpec::new(name, &params)?))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ParameterSpec::Array(_))
    }
}

impl From<f64> for ParameterSpec {
    fn from(value: f64) -> Self {
        ParameterSpec::Scalar(value)
    }
}

impl From<DistributionSpec> for ParameterSpec {
    fn from(spec: DistributionSpec) -> Self {
        ParameterSpec::Distribution(spec)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParameter {
    Scalar(f64),
    Flat(Vec<f64>),
    Rows(Vec<Vec<f64>>),
    Distribution(RawDistribution),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDistribution {
    distribution: String,
    #[serde(default)]
    params: BTreeMap<String, f64>,
    clip_min: Option<f64>,
    clip_max: Option<f64>,
    max_redraws: Option<u32>,
}

impl TryFrom<RawParameter> for ParameterSpec {
    type Error = ConnectError;

    fn try_from(raw: RawParameter) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawParameter::Scalar(v) => ParameterSpec::Scalar(v),
            RawParameter::Flat(values) => ParameterSpec::array(values),
            RawParameter::Rows(rows) => ParameterSpec::rows(rows),
            RawParameter::Distribution(raw) => {
                let mut spec = DistributionSpec::new(&raw.distribution, &raw.params)?
                    .with_clip(raw.clip_min, raw.clip_max)?;
                if let Some(max) = raw.max_redraws {
                    spec = spec.with_max_redraws(max);
                }
                ParameterSpec::Distribution(spec)
            }
        })
    }
}

/// Named parameter specs bound onto every edge of one kind
///
/// Fields keep insertion order; deserialized specs are ordered by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "BTreeMap<String, ParameterSpec>")]
pub struct SynapseSpec {
    fields: Vec<(ParamName, ParameterSpec)>,
}

impl SynapseSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field
    pub fn with(mut self, name: &str, spec: impl Into<ParameterSpec>) -> Self {
        let spec = spec.into();
        match self.fields.iter_mut().find(|(n, _)| n.as_ref() == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((Arc::from(name), spec)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, s)| s)
    }

    pub fn fields(&self) -> &[(ParamName, ParameterSpec)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_arrays(&self) -> bool {
        self.fields.iter().any(|(_, s)| s.is_array())
    }

    /// Check every field against the array layout of the rule it is bound to
    pub fn check_shape(&self, layout: ArrayLayout) -> ConnectResult<()> {
        for (name, spec) in &self.fields {
            match spec {
                ParameterSpec::Scalar(v) if !v.is_finite() => {
                    return Err(ConnectError::Validation(format!(
                        "Parameter '{}' must be finite, got {}",
                        name, v
                    )));
                }
                ParameterSpec::Array(array) => layout.check(name, array)?,
                _ => {}
            }
        }
        Ok(())
    }
}

impl From<BTreeMap<String, ParameterSpec>> for SynapseSpec {
    fn from(map: BTreeMap<String, ParameterSpec>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (Arc::from(k), v)).collect(),
        }
    }
}

/// Shape an array parameter must have for a given rule and populations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLayout {
    /// Rule has no canonical edge order; arrays are not accepted
    Rejected,
    /// One value per edge in output order
    Flat { len: usize },
    /// One row per target (or source), `width` values each
    Rows { rows: usize, width: usize },
}

impl ArrayLayout {
    /// Number of values an array must hold
    ///
    /// Fails with `Cardinality` when `rows * width` does not fit in `usize`.
    pub fn total(&self) -> ConnectResult<usize> {
        match *self {
            ArrayLayout::Rejected => Ok(0),
            ArrayLayout::Flat { len } => Ok(len),
            ArrayLayout::Rows { rows, width } => rows.checked_mul(width).ok_or_else(|| {
                ConnectError::Cardinality(format!(
                    "{} rows x {} edges per row overflows the edge index space",
                    rows, width
                ))
            }),
        }
    }

    fn check(&self, name: &str, array: &ParameterArray) -> ConnectResult<()> {
        match *self {
            ArrayLayout::Rejected => Err(ConnectError::Validation(format!(
                "Array parameter '{}' is not supported by this rule",
                name
            ))),
            ArrayLayout::Flat { len } => {
                if array.is_nested() {
                    return Err(ConnectError::Validation(format!(
                        "Array parameter '{}' must be flat for this rule",
                        name
                    )));
                }
                if array.len() != len {
                    return Err(ConnectError::Cardinality(format!(
                        "Array parameter '{}' has {} values, expected {}",
                        name,
                        array.len(),
                        len
                    )));
                }
                Ok(())
            }
            ArrayLayout::Rows { rows, width } => {
                if let Some(row_lens) = &array.row_lens {
                    if row_lens.len() != rows {
                        return Err(ConnectError::Cardinality(format!(
                            "Array parameter '{}' has {} rows, expected {}",
                            name,
                            row_lens.len(),
                            rows
                        )));
                    }
                    if let Some((i, len)) = row_lens.iter().enumerate().find(|(_, l)| **l != width) {
                        return Err(ConnectError::Cardinality(format!(
                            "Array parameter '{}' row {} has {} values, expected {}",
                            name, i, len, width
                        )));
                    }
                } else if array.len() != self.total()? {
                    return Err(ConnectError::Cardinality(format!(
                        "Array parameter '{}' has {} values, expected {} ({} x {})",
                        name,
                        array.len(),
                        self.total()?,
                        rows,
                        width
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Canonical position of an edge among all edges of the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSlot {
    pub index: usize,
    pub total: usize,
}

/// Resolves parameter specs into concrete per-edge values
#[derive(Debug, Clone, Copy)]
pub struct ParameterBinder {
    default_max_redraws: u32,
}

impl Default for ParameterBinder {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ParameterBinder {
    pub fn new(default_max_redraws: u32) -> Self {
        Self {
            default_max_redraws,
        }
    }

    pub fn default_max_redraws(&self) -> u32 {
        self.default_max_redraws
    }

    /// Value of one parameter for the edge at `slot`
    ///
    /// Distribution values are drawn from `rng`; clipped distributions redraw
    /// until the value is in range or the budget is spent.
    pub fn bind<R: Rng + ?Sized>(
        &self,
        name: &str,
        spec: &ParameterSpec,
        slot: EdgeSlot,
        rng: &mut R,
    ) -> ConnectResult<f64> {
        match spec {
            ParameterSpec::Scalar(v) => Ok(*v),
            ParameterSpec::Array(array) => {
                if array.len() != slot.total {
                    return Err(ConnectError::Cardinality(format!(
                        "Array parameter '{}' has {} values but {} edges are addressed",
                        name,
                        array.len(),
                        slot.total
                    )));
                }
                array.values.get(slot.index).copied().ok_or_else(|| {
                    ConnectError::Cardinality(format!(
                        "Edge position {} is outside array parameter '{}' ({} values)",
                        slot.index,
                        name,
                        array.len()
                    ))
                })
            }
            ParameterSpec::Distribution(dist) => {
                let mut value = dist.distribution.sample(rng);
                if !dist.is_clipped() {
                    return Ok(value);
                }
                let budget = dist.max_redraws.unwrap_or(self.default_max_redraws);
                let mut redraws = 0u32;
                while !dist.accepts(value) {
                    if redraws >= budget {
                        return Err(ConnectError::RuntimeSampling(format!(
                            "Parameter '{}' ({}) stayed outside [{}, {}] after {} redraws",
                            name,
                            dist.name,
                            dist.clip_min.map_or("-inf".to_string(), |v| v.to_string()),
                            dist.clip_max.map_or("inf".to_string(), |v| v.to_string()),
                            budget
                        )));
                    }
                    value = dist.distribution.sample(rng);
                    redraws += 1;
                }
                Ok(value)
            }
        }
    }

    /// Bind every field of a synapse spec, in field order
    pub fn bind_all<R: Rng + ?Sized>(
        &self,
        synapse: &SynapseSpec,
        slot: EdgeSlot,
        rng: &mut R,
    ) -> ConnectResult<Vec<(ParamName, f64)>> {
        synapse
            .fields
            .iter()
            .map(|(name, spec)| Ok((Arc::clone(name), self.bind(name, spec, slot, rng)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RandomStream, StreamDomain};
    use crate::types::ErrorKind;

    fn rng() -> crate::rng::Substream {
        RandomStream::new(9).substream(StreamDomain::Parameters, 0)
    }

    fn slot(index: usize, total: usize) -> EdgeSlot {
        EdgeSlot { index, total }
    }

    #[test]
    fn test_scalar_always_same() {
        let binder = ParameterBinder::default();
        let mut rng = rng();
        for i in 0..10 {
            let v = binder
                .bind("weight", &ParameterSpec::scalar(2.5), slot(i, 10), &mut rng)
                .unwrap();
            assert_eq!(v, 2.5);
        }
    }

    #[test]
    fn test_array_indexed_by_position() {
        let binder = ParameterBinder::default();
        let spec = ParameterSpec::array(vec![1.0, 2.0, 3.0]);
        let mut rng = rng();
        assert_eq!(binder.bind("delay", &spec, slot(1, 3), &mut rng).unwrap(), 2.0);

        let err = binder.bind("delay", &spec, slot(1, 4), &mut rng).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);
    }

    #[test]
    fn test_clipped_distribution_stays_in_bounds() {
        let binder = ParameterBinder::default();
        let dist = DistributionSpec::new(
            "normal",
            &[("mean".to_string(), 0.0), ("std".to_string(), 1.0)].into_iter().collect(),
        )
        .unwrap()
        .with_clip(Some(-0.5), Some(0.5))
        .unwrap();
        let spec = ParameterSpec::from(dist);
        let mut rng = rng();
        for i in 0..500 {
            let v = binder.bind("weight", &spec, slot(i, 500), &mut rng).unwrap();
            assert!((-0.5..=0.5).contains(&v), "value {} escaped clip", v);
        }
    }

    #[test]
    fn test_impossible_clip_exhausts_budget() {
        let binder = ParameterBinder::new(5);
        let dist = DistributionSpec::new(
            "uniform",
            &[("low".to_string(), 0.0), ("high".to_string(), 1.0)].into_iter().collect(),
        )
        .unwrap()
        .with_clip(Some(2.0), Some(3.0))
        .unwrap();
        let err = binder
            .bind("weight", &ParameterSpec::from(dist), slot(0, 1), &mut rng())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuntimeSampling);
    }

    #[test]
    fn test_inverted_clip_rejected() {
        let dist = DistributionSpec::new(
            "uniform",
            &[("low".to_string(), 0.0), ("high".to_string(), 1.0)].into_iter().collect(),
        )
        .unwrap();
        let err = dist.with_clip(Some(1.0), Some(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_deserialize_parameter_forms() {
        let spec: SynapseSpec = serde_json::from_str(
            r#"{
                "weight": {"distribution": "uniform", "params": {"low": 0.0, "high": 1.0}, "clip_max": 0.9},
                "delay": 1.5,
                "tau": [1.0, 2.0],
                "rows": [[1.0], [2.0]]
            }"#,
        )
        .unwrap();
        let names: Vec<&str> = spec.fields().iter().map(|(n, _)| n.as_ref()).collect();
        assert_eq!(names, vec!["delay", "rows", "tau", "weight"]);
        assert!(matches!(spec.get("delay"), Some(ParameterSpec::Scalar(v)) if *v == 1.5));
        assert!(matches!(spec.get("rows"), Some(ParameterSpec::Array(a)) if a.is_nested()));
        assert!(matches!(spec.get("weight"), Some(ParameterSpec::Distribution(d)) if d.is_clipped()));
    }

    #[test]
    fn test_deserialize_rejects_bad_distribution() {
        let result: Result<SynapseSpec, _> =
            serde_json::from_str(r#"{"weight": {"distribution": "normal", "params": {"mean": 0.0}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_array_layouts() {
        let flat = SynapseSpec::new().with("weight", ParameterSpec::array(vec![0.0; 6]));
        assert!(flat.check_shape(ArrayLayout::Flat { len: 6 }).is_ok());
        assert!(flat.check_shape(ArrayLayout::Rows { rows: 3, width: 2 }).is_ok());
        assert_eq!(
            flat.check_shape(ArrayLayout::Flat { len: 5 }).unwrap_err().kind(),
            ErrorKind::Cardinality
        );
        assert_eq!(
            flat.check_shape(ArrayLayout::Rejected).unwrap_err().kind(),
            ErrorKind::Validation
        );

        let ragged = SynapseSpec::new().with("weight", ParameterSpec::rows(vec![vec![0.0; 2], vec![0.0; 3]]));
        assert_eq!(
            ragged.check_shape(ArrayLayout::Rows { rows: 2, width: 2 }).unwrap_err().kind(),
            ErrorKind::Cardinality
        );

        let scalars = SynapseSpec::new().with("weight", 1.0).with("delay", 2.0);
        assert!(scalars.check_shape(ArrayLayout::Rejected).is_ok());
    }

    #[test]
    fn test_layout_total_overflow() {
        assert_eq!(ArrayLayout::Rows { rows: 3, width: 2 }.total().unwrap(), 6);
        let huge = ArrayLayout::Rows {
            rows: 4,
            width: usize::MAX / 2,
        };
        assert_eq!(huge.total().unwrap_err().kind(), ErrorKind::Cardinality);
        let flat = SynapseSpec::new().with("weight", ParameterSpec::array(vec![0.0; 6]));
        assert_eq!(flat.check_shape(huge).unwrap_err().kind(), ErrorKind::Cardinality);
    }

    #[test]
    fn test_bind_all_keeps_field_order() {
        let spec = SynapseSpec::new().with("weight", 1.0).with("delay", 2.0).with("weight", 3.0);
        let bound = ParameterBinder::default()
            .bind_all(&spec, slot(0, 1), &mut rng())
            .unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].0.as_ref(), "weight");
        assert_eq!(bound[0].1, 3.0);
        assert_eq!(bound[1].1, 2.0);
    }
}
