//! Pipeline configuration
//!
//! Defaults come from `PipelineConfig::default()`; a YAML file (schema v1)
//! overrides them, and CLI flags override the file.
//!
//! ```yaml
//! version: 1
//! partitions: 8
//! max_rounds: 60
//! combiner:
//!   enabled: true
//!   watermark: 0.8
//!   max_entries: 1048576
//! input_format: adjacency
//! finish: true
//! ```

mod error;
pub mod io;

pub use error::{ConfigError, ConfigResult};

use io::ConfigFileV1;
use serde::{Deserialize, Serialize};
use starcc_storage::RecordPath;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Single-mode round cap (30 Large/Small pairs).
pub const DEFAULT_MAX_ROUNDS: usize = 60;
pub const DEFAULT_WATERMARK: f64 = 0.8;
pub const DEFAULT_MAX_ENTRIES: usize = 1 << 20;

const MAX_PARTITIONS: usize = 4096;
const MAX_ROUNDS_LIMIT: usize = 10_000;

/// Raw input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// `node<TAB>n1,n2,...`
    Adjacency,
    /// `a b c ...`, all listed nodes mutually connected
    Clique,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Adjacency => "adjacency",
            InputFormat::Clique => "clique",
        }
    }
}

impl std::str::FromStr for InputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s {
            "adjacency" => Ok(InputFormat::Adjacency),
            "clique" => Ok(InputFormat::Clique),
            _ => Err(ConfigError::Custom(format!(
                "Unknown input format '{}'. Valid formats: adjacency, clique",
                s
            ))),
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local dedup settings applied before the shuffle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinerConfig {
    pub enabled: bool,
    /// Pressure ratio above which the dedup set is cleared.
    pub watermark: f64,
    /// Entries per map task that count as full pressure.
    pub max_entries: usize,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watermark: DEFAULT_WATERMARK,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CombinerConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.watermark > 0.0 && self.watermark <= 1.0) {
            return Err(ConfigError::range_with_hint(
                "combiner.watermark",
                self.watermark,
                "0 (exclusive)",
                1,
                "Watermark is a fraction of max_entries",
            ));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::range_with_hint(
                "combiner.max_entries",
                self.max_entries,
                1,
                usize::MAX,
                "Set combiner.enabled: false to turn the combiner off",
            ));
        }
        Ok(())
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Reduce partitions per job.
    pub partitions: usize,
    /// Single-mode round cap; must be even.
    pub max_rounds: usize,
    pub combiner: CombinerConfig,
    /// Forced input format; `None` auto-detects.
    pub input_format: Option<InputFormat>,
    /// Renumber clusters after a valid run.
    pub finish: bool,
    /// Intermediate round directory; `None` means `<output>_work`.
    pub work_dir: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partitions: (num_cpus::get() * 3 / 4).max(1), // 75% of cores
            max_rounds: DEFAULT_MAX_ROUNDS,
            combiner: CombinerConfig::default(),
            input_format: None,
            finish: true,
            work_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file (schema v1) over the defaults.
    pub fn from_yaml(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let mut config = Self::default();
        if let Some(partitions) = file.partitions {
            config.partitions = partitions;
        }
        if let Some(max_rounds) = file.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(combiner) = file.combiner {
            if let Some(enabled) = combiner.enabled {
                config.combiner.enabled = enabled;
            }
            if let Some(watermark) = combiner.watermark {
                config.combiner.watermark = watermark;
            }
            if let Some(max_entries) = combiner.max_entries {
                config.combiner.max_entries = max_entries;
            }
        }
        if file.input_format.is_some() {
            config.input_format = file.input_format;
        }
        if let Some(finish) = file.finish {
            config.finish = finish;
        }
        if file.work_dir.is_some() {
            config.work_dir = file.work_dir;
        }

        config.validate()?;
        Ok(config)
    }

    /// Export as YAML (schema v1).
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            partitions: Some(self.partitions),
            max_rounds: Some(self.max_rounds),
            combiner: Some(io::CombinerFileV1 {
                enabled: Some(self.combiner.enabled),
                watermark: Some(self.combiner.watermark),
                max_entries: Some(self.combiner.max_entries),
            }),
            input_format: self.input_format,
            finish: Some(self.finish),
            work_dir: self.work_dir.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.partitions == 0 || self.partitions > MAX_PARTITIONS {
            return Err(ConfigError::range_with_hint(
                "partitions",
                self.partitions,
                1,
                MAX_PARTITIONS,
                "One reduce task runs per partition",
            ));
        }

        if self.max_rounds < 2 || self.max_rounds > MAX_ROUNDS_LIMIT || self.max_rounds % 2 != 0 {
            return Err(ConfigError::range_with_hint(
                "max_rounds",
                self.max_rounds,
                2,
                MAX_ROUNDS_LIMIT,
                "Rounds run in Large/Small pairs, use an even number",
            ));
        }

        self.combiner.validate()
    }

    /// Intermediate directory for a run writing to `output`.
    pub fn work_dir_for(&self, output: &RecordPath) -> RecordPath {
        match &self.work_dir {
            Some(dir) => RecordPath::new(dir.as_str()),
            None => output.suffix("_work"),
        }
    }
}
