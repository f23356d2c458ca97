//! Converters between the binary record sets and a line-oriented text form.
//!
//! Pair lines are `node<TAB>neighbor`, cluster lines are space-separated
//! node ids. Each input split becomes one output part.

use crate::error::{OrchestratorError, Result};
use crate::substrate::publish_parts;
use serde::{Deserialize, Serialize};
use starcc_storage::{
    read_record_set, ClusterRecord, EdgeRecord, RecordCodec, RecordPath, RecordStore, TextLine,
};
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationKind {
    #[serde(rename = "pair2text")]
    Pair2Text,
    #[serde(rename = "text2pair")]
    Text2Pair,
    #[serde(rename = "cluster2text")]
    Cluster2Text,
    #[serde(rename = "text2cluster")]
    Text2Cluster,
}

impl TranslationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pair2Text => "pair2text",
            Self::Text2Pair => "text2pair",
            Self::Cluster2Text => "cluster2text",
            Self::Text2Cluster => "text2cluster",
        }
    }
}

impl FromStr for TranslationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pair2text" => Ok(Self::Pair2Text),
            "text2pair" => Ok(Self::Text2Pair),
            "cluster2text" => Ok(Self::Cluster2Text),
            "text2cluster" => Ok(Self::Text2Cluster),
            other => Err(format!(
                "unknown translation '{}' (expected pair2text, text2pair, cluster2text or text2cluster)",
                other
            )),
        }
    }
}

impl fmt::Display for TranslationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate `input` into a new record set at `output`.
///
/// Returns the number of records written.
pub async fn translate(
    store: &dyn RecordStore,
    kind: TranslationKind,
    input: &RecordPath,
    output: &RecordPath,
) -> Result<usize> {
    let (parts, count) = match kind {
        TranslationKind::Pair2Text => to_text::<EdgeRecord>(store, input).await?,
        TranslationKind::Cluster2Text => to_text::<ClusterRecord>(store, input).await?,
        TranslationKind::Text2Pair => from_text::<EdgeRecord>(store, input).await?,
        TranslationKind::Text2Cluster => from_text::<ClusterRecord>(store, input).await?,
    };

    publish_parts(store, output, parts).await?;
    info!("Translated {} records ({}) {} -> {}", count, kind, input, output);
    Ok(count)
}

async fn to_text<R>(store: &dyn RecordStore, input: &RecordPath) -> Result<(Vec<Vec<u8>>, usize)>
where
    R: RecordCodec + fmt::Display,
{
    let splits: Vec<Vec<R>> = read_record_set(store, input).await?;
    let count = splits.iter().map(Vec::len).sum();
    let parts = splits
        .iter()
        .map(|records| {
            let lines: Vec<TextLine> = records.iter().map(|r| TextLine(r.to_string())).collect();
            TextLine::encode_all(&lines)
        })
        .collect();
    Ok((parts, count))
}

async fn from_text<R>(store: &dyn RecordStore, input: &RecordPath) -> Result<(Vec<Vec<u8>>, usize)>
where
    R: RecordCodec + FromStr<Err = starcc_storage::StorageError>,
{
    let splits: Vec<Vec<TextLine>> = read_record_set(store, input).await?;
    let mut count = 0;
    let mut parts = Vec::with_capacity(splits.len());

    for lines in &splits {
        let mut records = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            if line.as_str().trim().is_empty() {
                continue;
            }
            let record = line
                .as_str()
                .parse::<R>()
                .map_err(|e| OrchestratorError::parse(index + 1, e))?;
            records.push(record);
        }
        count += records.len();
        parts.push(R::encode_all(&records));
    }
    Ok((parts, count))
}
