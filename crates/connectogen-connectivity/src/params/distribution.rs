// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Distribution descriptors for per-edge parameter sampling.

Descriptors are validated once when built; sampling never fails.
*/

use std::collections::BTreeMap;

use rand::distributions::{Distribution as _, Uniform};
use rand::Rng;
use rand_distr::{Binomial, Exp, Gamma, LogNormal, Normal, Poisson};

use crate::types::{ConnectError, ConnectResult};

/// A validated sampling distribution
#[derive(Debug, Clone)]
pub enum Distribution {
    Uniform(Uniform<f64>),
    /// Inclusive integer range
    UniformInt(Uniform<i64>),
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    Exponential(Exp<f64>),
    Gamma(Gamma<f64>),
    Poisson(Poisson<f64>),
    Binomial(Binomial),
}

impl Distribution {
    /// Build a distribution from its name and parameter record
    ///
    /// Accepted names and keys:
    /// - `uniform {low, high}`
    /// - `uniform_int {low, high}`
    /// - `normal {mean, std}`
    /// - `lognormal {mu, sigma}`
    /// - `exponential {beta}` (scale, mean = beta)
    /// - `gamma {k, theta}`
    /// - `poisson {lambda}`
    /// - `binomial {n, p}`
    pub fn from_name(name: &str, params: &BTreeMap<String, f64>) -> ConnectResult<Self> {
        let mut reader = ParamReader::new(name, params);
        let distribution = match name {
            "uniform" => {
                let low = reader.finite("low")?;
                let high = reader.finite("high")?;
                if low >= high {
                    return Err(invalid(name, format!("low ({}) must be below high ({})", low, high)));
                }
                Distribution::Uniform(Uniform::new(low, high))
            }
            "uniform_int" => {
                let low = reader.integer("low")?;
                let high = reader.integer("high")?;
                if low > high {
                    return Err(invalid(name, format!("low ({}) exceeds high ({})", low, high)));
                }
                Distribution::UniformInt(Uniform::new_inclusive(low, high))
            }
            "normal" => {
                let mean = reader.finite("mean")?;
                let std = reader.non_negative("std")?;
                Distribution::Normal(
                    Normal::new(mean, std).map_err(|e| invalid(name, e.to_string()))?,
                )
            }
            "lognormal" => {
                let mu = reader.finite("mu")?;
                let sigma = reader.non_negative("sigma")?;
                Distribution::LogNormal(
                    LogNormal::new(mu, sigma).map_err(|e| invalid(name, e.to_string()))?,
                )
            }
            "exponential" => {
                let beta = reader.positive("beta")?;
                Distribution::Exponential(
                    Exp::new(1.0 / beta).map_err(|e| invalid(name, e.to_string()))?,
                )
            }
            "gamma" => {
                let k = reader.positive("k")?;
                let theta = reader.positive("theta")?;
                Distribution::Gamma(Gamma::new(k, theta).map_err(|e| invalid(name, e.to_string()))?)
            }
            "poisson" => {
                let lambda = reader.positive("lambda")?;
                Distribution::Poisson(
                    Poisson::new(lambda).map_err(|e| invalid(name, e.to_string()))?,
                )
            }
            "binomial" => {
                let n = reader.integer("n")?;
                let p = reader.probability("p")?;
                if n < 0 {
                    return Err(invalid(name, format!("n must be non-negative, got {}", n)));
                }
                Distribution::Binomial(
                    Binomial::new(n as u64, p).map_err(|e| invalid(name, e.to_string()))?,
                )
            }
            other => {
                return Err(ConnectError::Validation(format!(
                    "Unknown distribution '{}'",
                    other
                )))
            }
        };
        reader.finish()?;
        Ok(distribution)
    }

    /// Draw one value
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Distribution::Uniform(d) => d.sample(rng),
            Distribution::UniformInt(d) => d.sample(rng) as f64,
            Distribution::Normal(d) => d.sample(rng),
            Distribution::LogNormal(d) => d.sample(rng),
            Distribution::Exponential(d) => d.sample(rng),
            Distribution::Gamma(d) => d.sample(rng),
            Distribution::Poisson(d) => d.sample(rng),
            Distribution::Binomial(d) => d.sample(rng) as f64,
        }
    }
}

fn invalid(name: &str, reason: String) -> ConnectError {
    ConnectError::Validation(format!("Distribution '{}': {}", name, reason))
}

/// Tracks which keys were consumed so leftovers can be rejected
struct ParamReader<'a> {
    name: &'a str,
    params: &'a BTreeMap<String, f64>,
    used: Vec<&'static str>,
}

impl<'a> ParamReader<'a> {
    fn new(name: &'a str, params: &'a BTreeMap<String, f64>) -> Self {
        Self {
            name,
            params,
            used: Vec::new(),
        }
    }

    fn finite(&mut self, key: &'static str) -> ConnectResult<f64> {
        self.used.push(key);
        match self.params.get(key) {
            Some(v) if v.is_finite() => Ok(*v),
            Some(v) => Err(invalid(self.name, format!("'{}' must be finite, got {}", key, v))),
            None => Err(invalid(self.name, format!("missing parameter '{}'", key))),
        }
    }

    fn non_negative(&mut self, key: &'static str) -> ConnectResult<f64> {
        let v = self.finite(key)?;
        if v < 0.0 {
            return Err(invalid(self.name, format!("'{}' must be >= 0, got {}", key, v)));
        }
        Ok(v)
    }

    fn positive(&mut self, key: &'static str) -> ConnectResult<f64> {
        let v = self.finite(key)?;
        if v <= 0.0 {
            return Err(invalid(self.name, format!("'{}' must be > 0, got {}", key, v)));
        }
        Ok(v)
    }

    fn probability(&mut self, key: &'static str) -> ConnectResult<f64> {
        let v = self.finite(key)?;
        if !(0.0..=1.0).contains(&v) {
            return Err(invalid(self.name, format!("'{}' must lie in [0, 1], got {}", key, v)));
        }
        Ok(v)
    }

    fn integer(&mut self, key: &'static str) -> ConnectResult<i64> {
        let v = self.finite(key)?;
        if v.fract() != 0.0 {
            return Err(invalid(self.name, format!("'{}' must be an integer, got {}", key, v)));
        }
        Ok(v as i64)
    }

    fn finish(self) -> ConnectResult<()> {
        let unknown: Vec<&str> = self
            .params
            .keys()
            .map(String::as_str)
            .filter(|k| !self.used.iter().any(|u| **u == **k))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(invalid(
                self.name,
                format!("unexpected parameter(s): {}", unknown.join(", ")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RandomStream, StreamDomain};

    fn params(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_uniform_samples_in_range() {
        let dist = Distribution::from_name("uniform", &params(&[("low", 1.0), ("high", 2.0)])).unwrap();
        let mut rng = RandomStream::new(1).substream(StreamDomain::Parameters, 0);
        for _ in 0..1000 {
            let v = dist.sample(&mut rng);
            assert!((1.0..2.0).contains(&v));
        }
    }

    #[test]
    fn test_uniform_int_is_inclusive_integer() {
        let dist =
            Distribution::from_name("uniform_int", &params(&[("low", 1.0), ("high", 3.0)])).unwrap();
        let mut rng = RandomStream::new(2).substream(StreamDomain::Parameters, 0);
        let mut seen = [false; 3];
        for _ in 0..500 {
            let v = dist.sample(&mut rng);
            assert_eq!(v.fract(), 0.0);
            seen[(v as usize) - 1] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_missing_and_unknown_keys() {
        let err = Distribution::from_name("normal", &params(&[("mean", 0.0)])).unwrap_err();
        assert!(err.to_string().contains("missing parameter 'std'"));

        let err = Distribution::from_name(
            "normal",
            &params(&[("mean", 0.0), ("std", 1.0), ("sd", 1.0)]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::Validation);
        assert!(err.to_string().contains("unexpected parameter(s): sd"));

        // Every consumed key is recognized
        assert!(Distribution::from_name("normal", &params(&[("mean", 0.0), ("std", 1.0)])).is_ok());
    }

    #[test]
    fn test_domain_checks() {
        assert!(Distribution::from_name("uniform", &params(&[("low", 2.0), ("high", 2.0)])).is_err());
        assert!(Distribution::from_name("exponential", &params(&[("beta", 0.0)])).is_err());
        assert!(Distribution::from_name("binomial", &params(&[("n", 3.5), ("p", 0.5)])).is_err());
        assert!(Distribution::from_name("binomial", &params(&[("n", 3.0), ("p", 1.5)])).is_err());
        assert!(Distribution::from_name("cauchy", &params(&[])).is_err());
    }

    #[test]
    fn test_exponential_mean_is_beta() {
        let dist = Distribution::from_name("exponential", &params(&[("beta", 4.0)])).unwrap();
        let mut rng = RandomStream::new(3).substream(StreamDomain::Parameters, 0);
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| dist.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 4.0).abs() < 0.2, "mean was {}", mean);
    }
}
