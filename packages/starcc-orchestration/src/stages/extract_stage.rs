use crate::config::InputFormat;
use crate::counters::Counter;
use crate::error::{OrchestratorError, Result};
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageOutput};
use crate::shuffle::Group;
use crate::substrate::{run_job, GroupedJob, MapContext, ReduceContext};
use async_trait::async_trait;
use starcc_storage::{
    data_files, EdgeRecord, NodeId, RecordCodec, RecordPath, RecordStore, TextLine, NO_NEIGHBOR,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Edge Extractor - parses raw text into canonical `(larger, smaller)` edges
/// and counts initial nodes and rows.
pub struct ExtractStage {
    format: InputFormat,
}

impl ExtractStage {
    pub fn new(format: InputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> InputFormat {
        self.format
    }
}

#[async_trait]
impl StageHandler for ExtractStage {
    fn stage_id(&self) -> StageId {
        StageId::Extract
    }

    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutput> {
        let settings = ctx.job_settings();
        info!(
            "ExtractStage: parsing {} input(s) as {}",
            input.inputs.len(),
            self.format
        );

        let edges = run_job(
            ctx.store.as_ref(),
            Arc::new(EdgeJob {
                format: self.format,
            }),
            &input.inputs,
            input.output.as_ref(),
            settings,
        )
        .await?;

        let census = run_job(
            ctx.store.as_ref(),
            Arc::new(CensusJob {
                format: self.format,
            }),
            &input.inputs,
            None,
            settings,
        )
        .await?;

        let mut output = StageOutput::from_report(edges);
        output.counters.incr(
            Counter::NumInitialNodes,
            census.counters.get(Counter::NumInitialNodes),
        );
        output.metrics.duration_ms += census.duration_ms;
        Ok(output)
    }
}

/// Detect the input layout from the first line that holds more than one
/// node id. A tab means adjacency, whitespace without a tab means clique.
pub async fn detect_format(store: &dyn RecordStore, input: &RecordPath) -> Result<InputFormat> {
    for file in data_files(store, input).await? {
        let bytes = store.read(&file).await?;
        let lines = TextLine::decode_all(&bytes)?;
        for line in &lines {
            if let Some(format) = classify_line(line.as_str()) {
                debug!("Detected {} input from {}", format, file);
                return Ok(format);
            }
        }
    }
    Err(OrchestratorError::FormatIndeterminate)
}

fn classify_line(line: &str) -> Option<InputFormat> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    if line.contains('\t') {
        return Some(InputFormat::Adjacency);
    }
    if line.split_whitespace().count() > 1 {
        return Some(InputFormat::Clique);
    }
    None
}

fn parse_node(token: &str, line: usize) -> Result<NodeId> {
    let token = token.trim();
    let id = token
        .parse::<NodeId>()
        .map_err(|e| {
            OrchestratorError::parse(line, format!("invalid node id '{}': {}", token, e))
        })?;
    if id < 0 {
        return Err(OrchestratorError::parse(
            line,
            format!("negative node id {} (ids must be >= 0)", id),
        ));
    }
    Ok(id)
}

/// One parsed input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// A node and its listed neighbors (possibly none)
    Adjacency { node: NodeId, neighbors: Vec<NodeId> },
    /// Mutually connected nodes
    Clique(Vec<NodeId>),
}

impl Row {
    /// Parse `text`; blank lines yield `None`.
    pub fn parse(text: &str, format: InputFormat, line: usize) -> Result<Option<Row>> {
        let text = text.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            return Ok(None);
        }

        match format {
            InputFormat::Adjacency => {
                let (head, tail) = match text.split_once('\t') {
                    Some((head, tail)) => (head, tail),
                    None => (text, ""),
                };
                let node = parse_node(head, line)?;
                let neighbors = tail
                    .split(',')
                    .filter(|token| !token.trim().is_empty())
                    .map(|token| parse_node(token, line))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Row::Adjacency { node, neighbors }))
            }
            InputFormat::Clique => {
                let nodes = text
                    .split_whitespace()
                    .map(|token| parse_node(token, line))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Row::Clique(nodes)))
            }
        }
    }

    /// Every node the row mentions.
    pub fn nodes(&self) -> Vec<NodeId> {
        match self {
            Row::Adjacency { node, neighbors } => {
                let mut nodes = Vec::with_capacity(neighbors.len() + 1);
                nodes.push(*node);
                nodes.extend_from_slice(neighbors);
                nodes
            }
            Row::Clique(nodes) => nodes.clone(),
        }
    }

    /// Canonical edges, `(max, min)`, plus `(node, -1)` markers.
    pub fn edges(&self) -> Vec<EdgeRecord> {
        let mut edges = Vec::new();
        match self {
            Row::Adjacency { node, neighbors } => {
                for &neighbor in neighbors {
                    if neighbor != *node {
                        edges.push(EdgeRecord::new((*node).max(neighbor), (*node).min(neighbor)));
                    }
                }
                // Nothing but self-loops (or no list at all) leaves the node isolated.
                if edges.is_empty() {
                    edges.push(EdgeRecord::isolated(*node));
                }
            }
            Row::Clique(nodes) => {
                for (i, &a) in nodes.iter().enumerate() {
                    for &b in &nodes[i + 1..] {
                        if a != b {
                            edges.push(EdgeRecord::new(a.max(b), a.min(b)));
                        }
                    }
                }
                edges.extend(nodes.iter().map(|&n| EdgeRecord::isolated(n)));
            }
        }
        edges
    }
}

/// Raw text → canonical edges. Identity reduce; duplicates are kept.
struct EdgeJob {
    format: InputFormat,
}

impl GroupedJob for EdgeJob {
    type Input = TextLine;
    type Output = EdgeRecord;

    fn name(&self) -> &'static str {
        "extract-edges"
    }

    fn map(&self, record: &TextLine, ctx: &mut MapContext) -> Result<()> {
        if let Some(row) = Row::parse(record.as_str(), self.format, ctx.line())? {
            ctx.incr(Counter::NumInitialCliques, 1);
            for edge in row.edges() {
                ctx.emit(edge.node, edge.neighbor);
            }
        }
        Ok(())
    }

    fn reduce(&self, group: Group<'_>, ctx: &mut ReduceContext<EdgeRecord>) -> Result<()> {
        for &value in group.values() {
            ctx.emit(EdgeRecord::new(group.node(), value));
        }
        Ok(())
    }
}

/// Counts distinct nodes mentioned anywhere in the input.
struct CensusJob {
    format: InputFormat,
}

impl GroupedJob for CensusJob {
    type Input = TextLine;
    type Output = EdgeRecord;

    fn name(&self) -> &'static str {
        "extract-census"
    }

    fn map(&self, record: &TextLine, ctx: &mut MapContext) -> Result<()> {
        if let Some(row) = Row::parse(record.as_str(), self.format, ctx.line())? {
            for node in row.nodes() {
                ctx.emit(node, NO_NEIGHBOR);
            }
        }
        Ok(())
    }

    fn uses_combiner(&self) -> bool {
        true
    }

    fn reduce(&self, _group: Group<'_>, ctx: &mut ReduceContext<EdgeRecord>) -> Result<()> {
        ctx.incr(Counter::NumInitialNodes, 1);
        Ok(())
    }
}
