//! Property tests: random graphs against a union-find oracle.

use proptest::prelude::*;
use starcc_orchestration::{
    Clusters, InputFormat, PipelineConfig, PipelineOrchestrator, PipelineReport,
};
use starcc_storage::{MemoryRecordStore, RecordPath, RecordStore};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

struct UnionFind {
    parent: BTreeMap<i32, i32>,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            parent: BTreeMap::new(),
        }
    }

    fn add(&mut self, node: i32) {
        self.parent.entry(node).or_insert(node);
    }

    fn find(&mut self, node: i32) -> i32 {
        let parent = self.parent[&node];
        if parent == node {
            return node;
        }
        let root = self.find(parent);
        self.parent.insert(node, root);
        root
    }

    fn union(&mut self, a: i32, b: i32) {
        self.add(a);
        self.add(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent.insert(ra.max(rb), ra.min(rb));
        }
    }

    fn components(&mut self) -> BTreeSet<Vec<i32>> {
        let nodes: Vec<i32> = self.parent.keys().copied().collect();
        let mut groups: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for node in nodes {
            let root = self.find(node);
            groups.entry(root).or_default().push(node);
        }
        groups.into_values().collect()
    }
}

fn graph() -> impl Strategy<Value = (Vec<(i32, i32)>, Vec<i32>)> {
    (
        prop::collection::vec((0..40i32, 0..40i32), 0..60),
        prop::collection::vec(0..60i32, 0..8),
    )
        .prop_filter("graph must mention a node", |(edges, isolated)| {
            !edges.is_empty() || !isolated.is_empty()
        })
}

fn config(format: InputFormat, partitions: usize, combiner: bool) -> PipelineConfig {
    let mut config = PipelineConfig {
        partitions,
        input_format: Some(format),
        ..Default::default()
    };
    config.combiner.enabled = combiner;
    config
}

fn run(text: String, config: PipelineConfig) -> (Clusters, PipelineReport) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async move {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .create(&RecordPath::new("input.txt"), text.as_bytes())
            .await
            .unwrap();

        let report = PipelineOrchestrator::new(store.clone(), config)
            .unwrap()
            .run(&RecordPath::new("input.txt"), &RecordPath::new("out"))
            .await
            .unwrap();
        let clusters = Clusters::load(store.as_ref(), &RecordPath::new("out"))
            .await
            .unwrap();
        (clusters, report)
    })
}

/// Disjoint cover of the oracle's nodes, keyed by minimum member.
fn assert_matches_oracle(
    clusters: &Clusters,
    oracle: &mut UnionFind,
) -> Result<(), TestCaseError> {
    let mut seen = BTreeSet::new();
    for cluster in clusters.iter() {
        for &member in &cluster.members {
            prop_assert!(seen.insert(member), "node {} in two clusters", member);
        }
        prop_assert_eq!(cluster.representative(), cluster.members.iter().min().copied());
    }
    let expected: BTreeSet<i32> = oracle.parent.keys().copied().collect();
    prop_assert_eq!(&seen, &expected);

    let actual: BTreeSet<Vec<i32>> = clusters.iter().map(|c| c.members.clone()).collect();
    prop_assert_eq!(actual, oracle.components());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn clusters_match_union_find(
        (edges, isolated) in graph(),
        partitions in 1usize..5,
        combiner in any::<bool>(),
    ) {
        let mut oracle = UnionFind::new();
        let mut text = String::new();
        for &(u, v) in &edges {
            oracle.union(u, v);
            text.push_str(&format!("{}\t{}\n", u, v));
        }
        for &n in &isolated {
            oracle.add(n);
            text.push_str(&format!("{}\n", n));
        }

        let settings = config(InputFormat::Adjacency, partitions, combiner);
        let (clusters, report) = run(text, settings);
        prop_assert!(report.partition_ok);
        assert_matches_oracle(&clusters, &mut oracle)?;
    }

    #[test]
    fn clique_clusters_match_union_find(
        cliques in prop::collection::vec(prop::collection::vec(0..30i32, 1..6), 1..12),
        partitions in 1usize..5,
        combiner in any::<bool>(),
        max_entries in 1usize..8,
    ) {
        let mut oracle = UnionFind::new();
        let mut text = String::new();
        for clique in &cliques {
            for &node in clique {
                oracle.add(node);
                oracle.union(clique[0], node);
            }
            let line: Vec<String> = clique.iter().map(|n| n.to_string()).collect();
            text.push_str(&line.join(" "));
            text.push('\n');
        }

        // Tiny budgets force the combiner to clear mid-split.
        let mut settings = config(InputFormat::Clique, partitions, combiner);
        settings.combiner.max_entries = max_entries;

        let (clusters, report) = run(text, settings);
        prop_assert!(report.partition_ok);
        let distinct = oracle.parent.len() as u64;
        prop_assert_eq!(report.initial_nodes, distinct);
        prop_assert_eq!(report.final_nodes, distinct);
        prop_assert_eq!(report.initial_cliques, cliques.len() as u64);
        assert_matches_oracle(&clusters, &mut oracle)?;
    }
}
