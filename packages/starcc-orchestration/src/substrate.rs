//! Local grouped-compute substrate.
//!
//! `run_job` executes one map → (combine) → partition → sort → group →
//! reduce pass over record sets in a `RecordStore`:
//!
//! 1. every data file of every input is one map split, read concurrently
//! 2. splits are mapped in parallel into per-partition buffers
//! 3. each partition is sorted by `(node, neighbor)` and reduced per group
//! 4. output part files go to a `_tmp-<uuid>` sibling that is renamed onto
//!    the output path only after every task succeeded
//!
//! Counters are summed over all tasks and returned in the `JobReport`.

use crate::combiner::DedupCombiner;
use crate::config::CombinerConfig;
use crate::counters::{Counter, Counters};
use crate::error::{OrchestratorError, Result};
use crate::shuffle::{partition_for, Group, NodesPair, SortedPartition};
use rayon::prelude::*;
use starcc_storage::{
    data_files, part_name, NodeId, RecordCodec, RecordPath, RecordStore, StorageError,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// A grouped-compute job: pure map and reduce functions over typed records.
pub trait GroupedJob: Send + Sync + 'static {
    type Input: RecordCodec + Send + 'static;
    type Output: RecordCodec + Send + 'static;

    fn name(&self) -> &'static str;

    /// Route one input record.
    fn map(&self, record: &Self::Input, ctx: &mut MapContext) -> Result<()>;

    /// Whether map output may go through the dedup combiner.
    fn uses_combiner(&self) -> bool {
        false
    }

    /// Reduce one group; values arrive ascending.
    fn reduce(&self, group: Group<'_>, ctx: &mut ReduceContext<Self::Output>) -> Result<()>;
}

/// Per-job execution settings.
#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    pub partitions: usize,
    pub combiner: CombinerConfig,
}

impl JobSettings {
    pub fn new(partitions: usize, combiner: CombinerConfig) -> Self {
        Self {
            partitions: partitions.max(1),
            combiner,
        }
    }
}

/// Result of a successful job.
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub counters: Counters,
    pub output: Option<RecordPath>,
    pub duration_ms: u64,
}

/// Map task state handed to `GroupedJob::map`.
pub struct MapContext {
    buckets: Vec<Vec<NodesPair>>,
    combiner: Option<DedupCombiner>,
    counters: Counters,
    line: usize,
}

impl MapContext {
    fn new(settings: &JobSettings, combine: bool) -> Self {
        let combiner = if combine && settings.combiner.enabled {
            Some(DedupCombiner::from_config(&settings.combiner))
        } else {
            None
        };
        Self {
            buckets: (0..settings.partitions).map(|_| Vec::new()).collect(),
            combiner,
            counters: Counters::new(),
            line: 0,
        }
    }

    pub fn emit(&mut self, node: NodeId, neighbor: NodeId) {
        self.emit_pair(NodesPair::new(node, neighbor));
    }

    pub fn emit_pair(&mut self, pair: NodesPair) {
        self.counters.incr(Counter::MapOutputRecords, 1);
        if let Some(combiner) = self.combiner.as_mut() {
            self.counters.incr(Counter::CombineInputRecords, 1);
            if !combiner.offer(pair) {
                return;
            }
            self.counters.incr(Counter::CombineOutputRecords, 1);
        }
        let partition = partition_for(pair.node, self.buckets.len());
        self.buckets[partition].push(pair);
    }

    pub fn incr(&mut self, counter: Counter, by: u64) {
        self.counters.incr(counter, by);
    }

    /// 1-based index of the record being mapped within its split.
    pub fn line(&self) -> usize {
        self.line
    }

    fn finish(mut self) -> (Vec<Vec<NodesPair>>, Counters) {
        if let Some(combiner) = &self.combiner {
            self.counters.incr(Counter::CombinerClears, combiner.clears());
        }
        (self.buckets, self.counters)
    }
}

/// Reduce task state handed to `GroupedJob::reduce`.
pub struct ReduceContext<O> {
    records: Vec<O>,
    counters: Counters,
}

impl<O> ReduceContext<O> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            counters: Counters::new(),
        }
    }

    pub fn emit(&mut self, record: O) {
        self.records.push(record);
    }

    pub fn incr(&mut self, counter: Counter, by: u64) {
        self.counters.incr(counter, by);
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn into_records(self) -> Vec<O> {
        self.records
    }
}

impl<O> Default for ReduceContext<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `job` over `inputs`, writing to `output` if given.
///
/// A failed job leaves nothing at `output`.
pub async fn run_job<J: GroupedJob>(
    store: &dyn RecordStore,
    job: Arc<J>,
    inputs: &[RecordPath],
    output: Option<&RecordPath>,
    settings: JobSettings,
) -> Result<JobReport> {
    let start = Instant::now();

    let mut files = Vec::new();
    for input in inputs {
        files.extend(data_files(store, input).await?);
    }

    let reads = futures::future::join_all(files.iter().map(|file| store.read(file))).await;
    let mut splits = Vec::with_capacity(files.len());
    for (file, bytes) in files.into_iter().zip(reads) {
        splits.push((file, bytes?));
    }

    debug!(
        "Job {}: {} splits, {} partitions",
        job.name(),
        splits.len(),
        settings.partitions
    );

    let name = job.name();
    let (parts, counters) =
        tokio::task::spawn_blocking(move || execute(job.as_ref(), splits, &settings))
            .await
            .map_err(|e| {
                OrchestratorError::stage_failed(format!("Job {}: task failed: {}", name, e))
            })??;

    if let Some(output) = output {
        publish_parts(store, output, parts).await?;
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!("Job {}: done in {}ms ({})", name, duration_ms, counters);

    Ok(JobReport {
        counters,
        output: output.cloned(),
        duration_ms,
    })
}

type MapOutput = (Vec<Vec<NodesPair>>, Counters);

fn execute<J: GroupedJob>(
    job: &J,
    splits: Vec<(RecordPath, Vec<u8>)>,
    settings: &JobSettings,
) -> Result<(Vec<Vec<u8>>, Counters)> {
    let maps: Vec<MapOutput> = splits
        .par_iter()
        .map(|(file, bytes)| map_split(job, file, bytes, settings))
        .collect::<Result<Vec<_>>>()?;

    // Shuffle
    let mut counters = Counters::new();
    let mut partitions: Vec<Vec<NodesPair>> =
        (0..settings.partitions).map(|_| Vec::new()).collect();
    for (buckets, map_counters) in maps {
        counters.merge(&map_counters);
        for (partition, bucket) in partitions.iter_mut().zip(buckets) {
            partition.extend(bucket);
        }
    }

    let reduced: Vec<(Vec<u8>, Counters)> = partitions
        .into_par_iter()
        .map(|pairs| reduce_partition(job, pairs))
        .collect::<Result<Vec<_>>>()?;

    let mut parts = Vec::with_capacity(reduced.len());
    for (bytes, reduce_counters) in reduced {
        counters.merge(&reduce_counters);
        parts.push(bytes);
    }
    Ok((parts, counters))
}

fn map_split<J: GroupedJob>(
    job: &J,
    file: &RecordPath,
    bytes: &[u8],
    settings: &JobSettings,
) -> Result<MapOutput> {
    let records = J::Input::decode_all(bytes).map_err(|e| {
        StorageError::codec(format!("{} in {}: {}", J::Input::NAME, file, e.message))
    })?;

    let mut ctx = MapContext::new(settings, job.uses_combiner());
    ctx.incr(Counter::MapInputRecords, records.len() as u64);
    for (idx, record) in records.iter().enumerate() {
        ctx.line = idx + 1;
        job.map(record, &mut ctx)?;
    }
    Ok(ctx.finish())
}

fn reduce_partition<J: GroupedJob>(job: &J, pairs: Vec<NodesPair>) -> Result<(Vec<u8>, Counters)> {
    let partition = SortedPartition::new(pairs);
    let mut ctx = ReduceContext::new();
    ctx.incr(Counter::ReduceInputRecords, partition.len() as u64);

    for group in partition.groups() {
        ctx.incr(Counter::ReduceInputGroups, 1);
        job.reduce(group, &mut ctx)?;
    }

    ctx.incr(Counter::ReduceOutputRecords, ctx.records.len() as u64);
    Ok((J::Output::encode_all(&ctx.records), ctx.counters))
}

/// Hidden sibling directory used while a job's output is being written.
pub fn temp_sibling(output: &RecordPath) -> RecordPath {
    let name = format!("_tmp-{}", Uuid::new_v4());
    match output.parent() {
        Some(parent) => parent.join(&name),
        None => RecordPath::new(name),
    }
}

/// Write `part-NNNNN` files and publish them at `output`.
pub async fn publish_parts(
    store: &dyn RecordStore,
    output: &RecordPath,
    parts: Vec<Vec<u8>>,
) -> Result<()> {
    let files = parts
        .into_iter()
        .enumerate()
        .map(|(i, bytes)| (part_name(i), bytes))
        .collect();
    publish_files(store, output, files).await
}

/// Write named files into a temporary sibling, then rename it onto
/// `output`. On failure the temporary directory is removed and `output`
/// is left untouched.
pub async fn publish_files(
    store: &dyn RecordStore,
    output: &RecordPath,
    mut files: Vec<(String, Vec<u8>)>,
) -> Result<()> {
    if files.is_empty() {
        files.push((part_name(0), Vec::new()));
    }

    let tmp = temp_sibling(output);
    let written = async {
        for (name, bytes) in &files {
            store.create(&tmp.join(name), bytes).await?;
        }
        store.rename(&tmp, output).await
    }
    .await;

    if let Err(e) = written {
        if let Err(cleanup) = store.delete_subtree(&tmp).await {
            warn!("Failed to remove temporary output {}: {}", tmp, cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}
