use crate::counters::Counter;
use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageOutput};
use crate::shuffle::Group;
use crate::substrate::{run_job, GroupedJob, MapContext, ReduceContext};
use async_trait::async_trait;
use starcc_storage::{ClusterRecord, EdgeRecord};
use std::sync::Arc;

/// Cluster Materializer - turns the final edge set into one cluster record
/// per representative. Counts `NUM_CLUSTERS` and `NUM_NODES`.
pub struct TerminationStage;

impl TerminationStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminationStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for TerminationStage {
    fn stage_id(&self) -> StageId {
        StageId::Terminate
    }

    async fn execute(&self, input: StageInput, ctx: &StageContext) -> Result<StageOutput> {
        let report = run_job(
            ctx.store.as_ref(),
            Arc::new(TerminationJob),
            &input.inputs,
            input.output.as_ref(),
            ctx.job_settings(),
        )
        .await?;
        Ok(StageOutput::from_report(report))
    }
}

pub struct TerminationJob;

impl GroupedJob for TerminationJob {
    type Input = EdgeRecord;
    type Output = ClusterRecord;

    fn name(&self) -> &'static str {
        "terminate"
    }

    fn map(&self, edge: &EdgeRecord, ctx: &mut MapContext) -> Result<()> {
        if edge.is_isolated() {
            ctx.emit(edge.node, edge.neighbor);
        } else {
            ctx.emit(edge.node.min(edge.neighbor), edge.node.max(edge.neighbor));
        }
        Ok(())
    }

    fn uses_combiner(&self) -> bool {
        true
    }

    fn reduce(&self, group: Group<'_>, ctx: &mut ReduceContext<ClusterRecord>) -> Result<()> {
        let mut members = vec![group.node()];
        members.extend(group.distinct_neighbors());

        ctx.incr(Counter::NumClusters, 1);
        ctx.incr(Counter::NumNodes, members.len() as u64);
        ctx.emit(ClusterRecord::new(members));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use starcc_storage::{NodeId, NO_NEIGHBOR};

    fn reduce(node: NodeId, values: &[NodeId]) -> (Vec<ClusterRecord>, u64, u64) {
        let mut ctx = ReduceContext::new();
        TerminationJob
            .reduce(Group::new(node, values), &mut ctx)
            .unwrap();
        let clusters = ctx.counters().get(Counter::NumClusters);
        let nodes = ctx.counters().get(Counter::NumNodes);
        (ctx.into_records(), clusters, nodes)
    }

    #[test]
    fn test_cluster_from_star() {
        let (out, clusters, nodes) = reduce(1, &[2, 3, 3]);
        assert_eq!(out, vec![ClusterRecord::new(vec![1, 2, 3])]);
        assert_eq!(clusters, 1);
        assert_eq!(nodes, 3);
    }

    #[test]
    fn test_isolated_cluster() {
        let (out, clusters, nodes) = reduce(9, &[NO_NEIGHBOR]);
        assert_eq!(out, vec![ClusterRecord::new(vec![9])]);
        assert_eq!(clusters, 1);
        assert_eq!(nodes, 1);

        // A stray marker does not become a member.
        let (out, _, nodes) = reduce(4, &[NO_NEIGHBOR, 5]);
        assert_eq!(out, vec![ClusterRecord::new(vec![4, 5])]);
        assert_eq!(nodes, 2);
    }
}
