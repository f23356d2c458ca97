//! Job-scoped counters, returned by value from every job.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Counter {
    // Substrate
    MapInputRecords,
    MapOutputRecords,
    CombineInputRecords,
    CombineOutputRecords,
    CombinerClears,
    ReduceInputGroups,
    ReduceInputRecords,
    ReduceOutputRecords,

    // Extractor
    NumInitialNodes,
    NumInitialCliques,

    // Star contractor
    NumChanges,

    // Materializer
    NumClusters,
    NumNodes,

    // Checker
    NumCheckedNodes,
    NumErrors,
}

impl Counter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::MapInputRecords => "MAP_INPUT_RECORDS",
            Counter::MapOutputRecords => "MAP_OUTPUT_RECORDS",
            Counter::CombineInputRecords => "COMBINE_INPUT_RECORDS",
            Counter::CombineOutputRecords => "COMBINE_OUTPUT_RECORDS",
            Counter::CombinerClears => "COMBINER_CLEARS",
            Counter::ReduceInputGroups => "REDUCE_INPUT_GROUPS",
            Counter::ReduceInputRecords => "REDUCE_INPUT_RECORDS",
            Counter::ReduceOutputRecords => "REDUCE_OUTPUT_RECORDS",
            Counter::NumInitialNodes => "NUM_INITIAL_NODES",
            Counter::NumInitialCliques => "NUM_INITIAL_CLIQUES",
            Counter::NumChanges => "NUM_CHANGES",
            Counter::NumClusters => "NUM_CLUSTERS",
            Counter::NumNodes => "NUM_NODES",
            Counter::NumCheckedNodes => "NUM_CHECKED_NODES",
            Counter::NumErrors => "NUM_ERRORS",
        }
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counter values; absent counters read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counters(BTreeMap<Counter, u64>);

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.0.get(&counter).copied().unwrap_or(0)
    }

    pub fn incr(&mut self, counter: Counter, by: u64) {
        if by > 0 {
            *self.0.entry(counter).or_insert(0) += by;
        }
    }

    pub fn merge(&mut self, other: &Counters) {
        for (counter, value) in &other.0 {
            self.incr(*counter, *value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Counter, u64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (counter, value) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", counter, value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incr_and_merge() {
        let mut a = Counters::new();
        a.incr(Counter::NumChanges, 3);
        a.incr(Counter::NumChanges, 0);
        a.incr(Counter::NumErrors, 0);

        let mut b = Counters::new();
        b.incr(Counter::NumChanges, 2);
        b.incr(Counter::NumClusters, 1);

        a.merge(&b);
        assert_eq!(a.get(Counter::NumChanges), 5);
        assert_eq!(a.get(Counter::NumClusters), 1);
        assert_eq!(a.get(Counter::NumErrors), 0);
        assert_eq!(a.to_string(), "NUM_CHANGES=5, NUM_CLUSTERS=1");
    }

    #[test]
    fn test_serializes_as_named_map() {
        let mut c = Counters::new();
        c.incr(Counter::NumInitialNodes, 4);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"NUM_INITIAL_NODES":4}"#);
    }
}
