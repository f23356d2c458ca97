//! Read-side view over a materialized cluster directory.

use crate::error::Result;
use starcc_storage::{read_record_set, ClusterRecord, NodeId, RecordPath, RecordStore};
use std::fmt;

/// All clusters of a record set, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clusters {
    clusters: Vec<ClusterRecord>,
}

impl Clusters {
    pub async fn load(store: &dyn RecordStore, path: &RecordPath) -> Result<Self> {
        let parts: Vec<Vec<ClusterRecord>> = read_record_set(store, path).await?;
        Ok(Self::from_records(parts.into_iter().flatten().collect()))
    }

    pub fn from_records(clusters: Vec<ClusterRecord>) -> Self {
        Self { clusters }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClusterRecord> {
        self.clusters.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterRecord> {
        self.clusters.iter()
    }

    /// True if any cluster holds `node`.
    pub fn contains(&self, node: NodeId) -> bool {
        self.find(node).is_some()
    }

    /// Index of the first cluster holding `node`.
    pub fn find(&self, node: NodeId) -> Option<usize> {
        self.clusters.iter().position(|c| c.contains(node))
    }

    /// Sum of cluster sizes.
    pub fn total_nodes(&self) -> usize {
        self.clusters.iter().map(ClusterRecord::len).sum()
    }

    pub fn sort_by_representative(&mut self) {
        self.clusters.sort_by_key(|c| c.representative());
    }

    pub fn into_records(self) -> Vec<ClusterRecord> {
        self.clusters
    }
}

impl fmt::Display for Clusters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cluster) in self.clusters.iter().enumerate() {
            let members: Vec<String> = cluster.members.iter().map(|m| m.to_string()).collect();
            writeln!(f, "Cluster[{}] = {{ {} }}", i, members.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starcc_storage::{write_record_set, MemoryRecordStore};

    fn sample() -> Clusters {
        Clusters::from_records(vec![
            ClusterRecord::new(vec![5, 6, 7]),
            ClusterRecord::new(vec![1, 2]),
            ClusterRecord::new(vec![9]),
        ])
    }

    #[test]
    fn test_lookup() {
        let clusters = sample();
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters.find(6), Some(0));
        assert_eq!(clusters.find(2), Some(1));
        assert!(clusters.contains(9));
        assert!(!clusters.contains(3));
        assert_eq!(clusters.total_nodes(), 6);
        assert_eq!(clusters.get(2), Some(&ClusterRecord::new(vec![9])));
        assert_eq!(clusters.get(3), None);
    }

    #[test]
    fn test_display_and_sort() {
        let mut clusters = sample();
        clusters.sort_by_representative();
        assert_eq!(
            clusters.to_string(),
            "Cluster[0] = { 1,2 }\nCluster[1] = { 5,6,7 }\nCluster[2] = { 9 }\n"
        );
    }

    #[tokio::test]
    async fn test_load_concatenates_parts() {
        let store = MemoryRecordStore::new();
        let dir = RecordPath::new("out");
        write_record_set(
            &store,
            &dir,
            vec![
                vec![ClusterRecord::new(vec![3, 4])],
                vec![],
                vec![ClusterRecord::new(vec![1])],
            ],
        )
        .await
        .unwrap();

        let clusters = Clusters::load(&store, &dir).await.unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.find(1), Some(1));
    }
}
