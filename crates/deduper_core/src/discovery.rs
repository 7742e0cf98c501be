use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::DiscoveredItem;

/// Number of unchanged signals after which a discovery run stops.
pub const MAX_UNCHANGED_ITERATIONS: u32 = 5;

/// How the two "nothing new" signals of an iteration are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConvergenceRule {
    /// Both signals feed one counter, so a single iteration can add two.
    #[default]
    Combined,
    /// Each signal has its own counter; the run stops when either reaches the limit.
    Independent,
}

/// Accumulator and convergence tracker owned by one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryState {
    accumulated: BTreeMap<String, DiscoveredItem>,
    rule: ConvergenceRule,
    max_unchanged: u32,
    last_observed_count: usize,
    unchanged_iterations: u32,
    // Only advanced under `ConvergenceRule::Independent`.
    unchanged_heights: u32,
    iteration: u32,
}

impl DiscoveryState {
    pub fn new(rule: ConvergenceRule, max_unchanged: u32) -> Self {
        Self {
            accumulated: BTreeMap::new(),
            rule,
            max_unchanged,
            last_observed_count: 0,
            unchanged_iterations: 0,
            unchanged_heights: 0,
            iteration: 0,
        }
    }

    /// Advances the 1-based iteration index and returns it.
    pub fn begin_iteration(&mut self) -> u32 {
        self.iteration += 1;
        self.iteration
    }

    /// Merges extracted items; a repeated id replaces the earlier entry.
    /// Returns how many ids were not seen before.
    pub fn merge<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = DiscoveredItem>,
    {
        let mut fresh = 0;
        for item in items {
            if self.accumulated.insert(item.id.clone(), item).is_none() {
                fresh += 1;
            }
        }
        fresh
    }

    /// Compares the accumulated size with the last observation.
    /// Returns true when nothing new arrived.
    pub fn record_item_count(&mut self) -> bool {
        let size = self.accumulated.len();
        if size == self.last_observed_count {
            self.unchanged_iterations += 1;
            true
        } else {
            self.unchanged_iterations = 0;
            self.last_observed_count = size;
            false
        }
    }

    /// Records scroll container heights around a scroll-to-bottom.
    /// Returns true when the content did not grow.
    pub fn record_scroll(&mut self, height_before: u64, height_after: u64) -> bool {
        let unchanged = height_before == height_after;
        match self.rule {
            ConvergenceRule::Combined => {
                if unchanged {
                    self.unchanged_iterations += 1;
                }
            }
            ConvergenceRule::Independent => {
                if unchanged {
                    self.unchanged_heights += 1;
                } else {
                    self.unchanged_heights = 0;
                }
            }
        }
        unchanged
    }

    pub fn is_converged(&self) -> bool {
        match self.rule {
            ConvergenceRule::Combined => self.unchanged_iterations >= self.max_unchanged,
            ConvergenceRule::Independent => {
                self.unchanged_iterations >= self.max_unchanged
                    || self.unchanged_heights >= self.max_unchanged
            }
        }
    }

    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn unchanged_iterations(&self) -> u32 {
        self.unchanged_iterations
    }

    pub fn max_unchanged(&self) -> u32 {
        self.max_unchanged
    }

    pub fn get(&self, id: &str) -> Option<&DiscoveredItem> {
        self.accumulated.get(id)
    }

    /// Consumes the run state, yielding items ordered by id.
    pub fn into_items(self) -> Vec<DiscoveredItem> {
        self.accumulated.into_values().collect()
    }
}

impl Default for DiscoveryState {
    fn default() -> Self {
        Self::new(ConvergenceRule::default(), MAX_UNCHANGED_ITERATIONS)
    }
}
