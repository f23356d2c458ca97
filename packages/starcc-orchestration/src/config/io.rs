//! YAML schema types.
//!
//! Every field is optional; absent fields keep the defaults of
//! `PipelineConfig::default()`.

use super::InputFormat;
use serde::{Deserialize, Serialize};

/// YAML Schema v1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub combiner: Option<CombinerFileV1>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_format: Option<InputFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombinerFileV1 {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}
