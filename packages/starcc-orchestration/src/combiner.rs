//! Bounded local dedup applied to map output before the shuffle.
//!
//! The set is cleared whenever the probe reports pressure above the
//! watermark, so some duplicates may pass. Reducers dedup again; the
//! combiner never changes reduce results.

use crate::config::CombinerConfig;
use crate::shuffle::NodesPair;
use std::collections::HashSet;

/// Reports memory pressure for a combiner holding `entries` pairs.
pub trait MemoryProbe: Send + Sync {
    /// Fraction of the budget in use; above the watermark triggers a clear.
    fn ratio(&self, entries: usize) -> f64;
}

/// Fixed entry budget per map task.
#[derive(Debug, Clone, Copy)]
pub struct EntryBudget {
    pub max_entries: usize,
}

impl MemoryProbe for EntryBudget {
    fn ratio(&self, entries: usize) -> f64 {
        entries as f64 / self.max_entries.max(1) as f64
    }
}

pub struct DedupCombiner<P: MemoryProbe = EntryBudget> {
    watermark: f64,
    probe: P,
    seen: HashSet<NodesPair>,
    clears: u64,
}

impl DedupCombiner<EntryBudget> {
    pub fn from_config(config: &CombinerConfig) -> Self {
        Self::new(
            config.watermark,
            EntryBudget {
                max_entries: config.max_entries,
            },
        )
    }
}

impl<P: MemoryProbe> DedupCombiner<P> {
    pub fn new(watermark: f64, probe: P) -> Self {
        Self {
            watermark,
            probe,
            seen: HashSet::new(),
            clears: 0,
        }
    }

    /// Returns true if `pair` should be forwarded to the shuffle.
    pub fn offer(&mut self, pair: NodesPair) -> bool {
        if !self.seen.insert(pair) {
            return false;
        }
        if self.probe.ratio(self.seen.len()) > self.watermark {
            self.seen.clear();
            self.clears += 1;
        }
        true
    }

    /// Times the set was cleared under pressure.
    pub fn clears(&self) -> u64 {
        self.clears
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_repeats_within_budget() {
        let mut combiner = DedupCombiner::new(0.8, EntryBudget { max_entries: 100 });
        let p = NodesPair::new(2, 1);
        assert!(combiner.offer(p));
        assert!(!combiner.offer(p));
        assert!(combiner.offer(NodesPair::new(2, 3)));
        assert!(combiner.offer(NodesPair::new(3, 1)));
        assert_eq!(combiner.len(), 3);
        assert_eq!(combiner.clears(), 0);
    }

    #[test]
    fn test_clears_on_pressure() {
        // 4 entries make 0.8 of the budget; the fifth crosses the watermark.
        let mut combiner = DedupCombiner::new(0.8, EntryBudget { max_entries: 5 });
        for n in 0..5 {
            assert!(combiner.offer(NodesPair::new(n, 0)));
        }
        assert_eq!(combiner.clears(), 1);
        assert!(combiner.is_empty());

        // After the clear a repeat passes again.
        assert!(combiner.offer(NodesPair::new(0, 0)));
    }

    struct AlwaysFull;

    impl MemoryProbe for AlwaysFull {
        fn ratio(&self, _entries: usize) -> f64 {
            1.0
        }
    }

    #[test]
    fn test_saturated_probe_forwards_everything() {
        let mut combiner = DedupCombiner::new(0.5, AlwaysFull);
        let p = NodesPair::new(4, 1);
        assert!(combiner.offer(p));
        assert!(combiner.offer(p));
        assert_eq!(combiner.clears(), 2);
    }

    #[test]
    fn test_from_config() {
        let combiner = DedupCombiner::from_config(&CombinerConfig::default());
        assert!(combiner.is_empty());
        assert_eq!(combiner.clears(), 0);
    }
}
