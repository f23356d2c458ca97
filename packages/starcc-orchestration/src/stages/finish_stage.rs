use crate::clusters::Clusters;
use crate::counters::{Counter, Counters};
use crate::error::{OrchestratorError, Result};
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
use crate::substrate::{publish_files, temp_sibling};
use async_trait::async_trait;
use starcc_storage::{ClusterRecord, RecordCodec, RecordPath, RecordStore};
use std::time::Instant;
use tracing::{info, warn};

/// File name of the `index`-th cluster after finishing.
pub fn cluster_file_name(index: usize) -> String {
    format!("cluster_{:05}", index)
}

/// Finishing pass - rewrites a cluster directory as `cluster_00000`,
/// `cluster_00001`, ... in representative order, one cluster per file.
///
/// Purely cosmetic and idempotent. Operates in place on its input.
pub struct FinishStage;

impl FinishStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FinishStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for FinishStage {
    fn stage_id(&self) -> StageId {
        StageId::Finish
    }

    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutput> {
        let start = Instant::now();
        let dir = input
            .inputs
            .first()
            .ok_or_else(|| OrchestratorError::stage_failed("FinishStage: no cluster directory"))?;
        let store = ctx.store.as_ref();

        let mut clusters = Clusters::load(store, dir).await?;
        clusters.sort_by_representative();
        let count = clusters.len() as u64;

        let files: Vec<(String, Vec<u8>)> = clusters
            .iter()
            .enumerate()
            .map(|(i, cluster)| {
                (
                    cluster_file_name(i),
                    ClusterRecord::encode_all(std::slice::from_ref(cluster)),
                )
            })
            .collect();

        let staged = temp_sibling(dir);
        publish_files(store, &staged, files).await?;
        swap_in(store, &staged, dir).await?;

        info!("FinishStage: renumbered {} clusters in {}", count, dir);

        let mut counters = Counters::new();
        counters.incr(Counter::NumClusters, count);
        Ok(StageOutput {
            counters,
            output: Some(dir.clone()),
            metrics: StageMetrics {
                records_in: count,
                records_out: count,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        })
    }
}

/// Replace `target` with `staged`, keeping the old content until the new one
/// is in place.
async fn swap_in(store: &dyn RecordStore, staged: &RecordPath, target: &RecordPath) -> Result<()> {
    let backup = temp_sibling(target);
    if let Err(e) = store.rename(target, &backup).await {
        if let Err(cleanup) = store.delete_subtree(staged).await {
            warn!("Failed to remove staged clusters {}: {}", staged, cleanup);
        }
        return Err(e.into());
    }

    if let Err(e) = store.rename(staged, target).await {
        if let Err(restore) = store.rename(&backup, target).await {
            warn!("Failed to restore {} from {}: {}", target, backup, restore);
        }
        return Err(e.into());
    }

    store.delete_subtree(&backup).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use pretty_assertions::assert_eq;
    use starcc_storage::{write_record_set, MemoryRecordStore};
    use std::sync::Arc;

    async fn names(store: &MemoryRecordStore, dir: &RecordPath) -> Vec<String> {
        store
            .list_children(dir)
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_finish_renumbers_and_is_idempotent() {
        let store = Arc::new(MemoryRecordStore::new());
        let dir = RecordPath::new("run/out");
        write_record_set(
            store.as_ref(),
            &dir,
            vec![
                vec![ClusterRecord::new(vec![5, 6])],
                vec![ClusterRecord::new(vec![1, 3]), ClusterRecord::new(vec![9])],
            ],
        )
        .await
        .unwrap();
        let ctx = StageContext::new(store.clone(), Arc::new(PipelineConfig::default()));

        let output = FinishStage::new()
            .execute(StageInput::new(dir.clone(), None), &ctx)
            .await
            .unwrap();
        assert_eq!(output.counter(Counter::NumClusters), 3);

        let expected = vec!["cluster_00000", "cluster_00001", "cluster_00002"];
        assert_eq!(names(&store, &dir).await, expected);
        let clusters = Clusters::load(store.as_ref(), &dir).await.unwrap();
        assert_eq!(clusters.get(0), Some(&ClusterRecord::new(vec![1, 3])));
        assert_eq!(clusters.get(2), Some(&ClusterRecord::new(vec![9])));

        // Second pass yields the same layout and no leftovers next to it.
        FinishStage::new()
            .execute(StageInput::new(dir.clone(), None), &ctx)
            .await
            .unwrap();
        assert_eq!(names(&store, &dir).await, expected);
        assert_eq!(names(&store, &RecordPath::new("run")).await, vec!["out"]);
        assert_eq!(Clusters::load(store.as_ref(), &dir).await.unwrap(), clusters);
    }
}
