//! Evaluation configuration.
//!
//! Values are layered with `figment`, later layers overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file (`rankeval.toml` in the working directory, or an explicit path)
//! 3. environment variables prefixed with `RANKEVAL_` (e.g. `RANKEVAL_SEED=7`)
//!
//! ```toml
//! randomized_trials = 10000
//! seed = 24301
//! tie_epsilon = 1e-6
//! run_tag = "rankeval"
//! comparison_metrics = ["averagePrecision", "P5", "P10", "P15", "P20"]
//! ```

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::compare::{DEFAULT_RANDOMIZED_TRIALS, DEFAULT_SEED, DEFAULT_TIE_EPSILON};
use crate::error::{Error, Result};
use crate::metric::{MetricKind, DEFAULT_COMPARISON_METRICS};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "rankeval.toml";

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "RANKEVAL_";

/// Tunables of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Rounds of the randomized significance test.
    pub randomized_trials: usize,
    /// Seed of the randomized significance test.
    pub seed: u64,
    /// Differences at or below this are ties in the comparator.
    pub tie_epsilon: f64,
    /// Run tag written into merged ranking files.
    pub run_tag: String,
    /// Metrics reported by a comparison.
    pub comparison_metrics: Vec<String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            randomized_trials: DEFAULT_RANDOMIZED_TRIALS,
            seed: DEFAULT_SEED,
            tie_epsilon: DEFAULT_TIE_EPSILON,
            run_tag: "rankeval".to_string(),
            comparison_metrics: DEFAULT_COMPARISON_METRICS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl EvalConfig {
    /// Loads defaults, then `rankeval.toml` if present, then `RANKEVAL_*` variables.
    pub fn load() -> Result<Self> {
        Self::extract(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file(CONFIG_FILE_NAME))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Like [`EvalConfig::load`] but with an explicit TOML file, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        Self::extract(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Parses a TOML document over the defaults, ignoring the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::extract(Figment::from(Serialized::defaults(Self::default())).merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and metric names.
    pub fn validate(&self) -> Result<()> {
        if self.randomized_trials == 0 {
            return Err(Error::Config(
                "randomized_trials must be at least 1".to_string(),
            ));
        }
        if !self.tie_epsilon.is_finite() || self.tie_epsilon < 0.0 {
            return Err(Error::Config(format!(
                "tie_epsilon must be a non-negative number, got {}",
                self.tie_epsilon
            )));
        }
        if self.run_tag.split_whitespace().count() != 1 {
            return Err(Error::Config(format!(
                "run_tag must be a single non-empty token, got '{}'",
                self.run_tag
            )));
        }
        self.comparison_panel().map(|_| ())
    }

    /// Resolved comparison metrics.
    pub fn comparison_panel(&self) -> Result<Vec<MetricKind>> {
        self.comparison_metrics
            .iter()
            .map(|name| MetricKind::parse(name))
            .collect()
    }
}
