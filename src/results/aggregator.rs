//! Aggregates live search outcomes into priority-ordered render sections

use super::types::SearchOutcome;
use crate::render::{RenderInstruction, Section, SectionBody};
use tracing::{debug, trace};

/// Aggregator state for the current query cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Dispatched { sequence: u64, pending: usize },
}

/// Turns outcomes into render instructions, one section per provider
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    state: CycleState,
    /// Sections of the current cycle, kept in display order
    sections: Vec<Section>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            state: CycleState::Idle,
            sections: Vec::new(),
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CycleState::Idle
    }

    /// Sections of the current cycle, highest priority first
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Start a new cycle expecting `pending` outcomes.
    ///
    /// Any previous cycle is superseded and its sections dropped.
    pub fn begin_cycle(&mut self, sequence: u64, pending: usize) -> Vec<RenderInstruction> {
        if let CycleState::Dispatched {
            sequence: previous,
            pending: left,
        } = self.state
        {
            debug!(
                "Cycle {} superseded by {} with {} outcomes pending",
                previous, sequence, left
            );
        }

        self.sections.clear();
        self.state = if pending == 0 {
            CycleState::Idle
        } else {
            CycleState::Dispatched { sequence, pending }
        };

        vec![RenderInstruction::Clear]
    }

    /// Consume one live outcome.
    ///
    /// Returns nothing when the outcome does not belong to the current cycle.
    pub fn on_outcome(&mut self, outcome: SearchOutcome) -> Vec<RenderInstruction> {
        let sequence = outcome.sequence();
        if !self.owns(sequence) {
            trace!(
                "Dropping outcome from {} for cycle {}",
                outcome.provider().name,
                sequence
            );
            return Vec::new();
        }

        let section = Self::section_for(outcome);
        self.sections.push(section.clone());
        // Stable: equal priorities keep arrival order
        self.sections.sort_by(|a, b| b.priority.cmp(&a.priority));
        self.settle_one();

        let order = self.sections.iter().map(|s| s.provider.clone()).collect();
        vec![
            RenderInstruction::AppendSection(section),
            RenderInstruction::ReorderByPriority(order),
        ]
    }

    /// Account for a handle of the current cycle that was cancelled
    /// without being superseded by a new cycle.
    pub fn on_cancelled(&mut self, sequence: u64) {
        if self.owns(sequence) {
            self.settle_one();
        }
    }

    fn owns(&self, sequence: u64) -> bool {
        matches!(
            self.state,
            CycleState::Dispatched { sequence: current, .. } if current == sequence
        )
    }

    fn settle_one(&mut self) {
        if let CycleState::Dispatched { sequence, pending } = self.state {
            self.state = if pending <= 1 {
                debug!("Cycle {} settled", sequence);
                CycleState::Idle
            } else {
                CycleState::Dispatched {
                    sequence,
                    pending: pending - 1,
                }
            };
        }
    }

    fn section_for(outcome: SearchOutcome) -> Section {
        match outcome {
            SearchOutcome::Success {
                provider, items, ..
            } => Section {
                provider: provider.name.clone(),
                title: provider.title.clone(),
                priority: provider.priority,
                body: SectionBody::Items(items),
            },
            SearchOutcome::Failure {
                provider, error, ..
            } => Section {
                provider: provider.name.clone(),
                title: provider.title.clone(),
                priority: provider.priority,
                body: SectionBody::Error(error.summary().to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::providers::Provider;
    use crate::results::ResultItem;
    use std::sync::Arc;
    use std::time::Duration;

    fn provider(name: &str, priority: i64) -> Arc<Provider> {
        Arc::new(Provider::new(name, "", priority).unwrap())
    }

    fn success(provider: &Arc<Provider>, sequence: u64, titles: &[&str]) -> SearchOutcome {
        SearchOutcome::Success {
            provider: provider.clone(),
            sequence,
            items: titles
                .iter()
                .map(|t| ResultItem::new(*t, format!("http://{}", t)))
                .collect(),
            elapsed: Duration::from_millis(5),
        }
    }

    fn failure(provider: &Arc<Provider>, sequence: u64, error: ProviderError) -> SearchOutcome {
        SearchOutcome::Failure {
            provider: provider.clone(),
            sequence,
            error,
            elapsed: Duration::from_millis(5),
        }
    }

    fn order(instructions: &[RenderInstruction]) -> Vec<String> {
        match instructions.last() {
            Some(RenderInstruction::ReorderByPriority(order)) => order.clone(),
            other => panic!("expected reorder, got {:?}", other),
        }
    }

    #[test]
    fn test_begin_cycle_clears() {
        let mut aggregator = ResultAggregator::new();
        assert!(aggregator.is_idle());

        let out = aggregator.begin_cycle(1, 2);
        assert_eq!(out, vec![RenderInstruction::Clear]);
        assert_eq!(
            aggregator.state(),
            CycleState::Dispatched {
                sequence: 1,
                pending: 2
            }
        );
    }

    #[test]
    fn test_higher_priority_first_regardless_of_arrival() {
        let a = provider("a", 10);
        let b = provider("b", 5);
        let mut aggregator = ResultAggregator::new();
        aggregator.begin_cycle(1, 2);

        let out = aggregator.on_outcome(success(&b, 1, &["b1"]));
        assert_eq!(order(&out), vec!["b"]);

        let out = aggregator.on_outcome(success(&a, 1, &["a1"]));
        assert!(matches!(out[0], RenderInstruction::AppendSection(ref s) if s.provider == "a"));
        assert_eq!(order(&out), vec!["a", "b"]);
        assert!(aggregator.is_idle());
    }

    #[test]
    fn test_failure_is_isolated() {
        let github = provider("github", 5);
        let slack = provider("slack", 10);
        let mut aggregator = ResultAggregator::new();
        aggregator.begin_cycle(1, 2);

        aggregator.on_outcome(failure(&github, 1, ProviderError::new(500, "timeout")));
        aggregator.on_outcome(success(&slack, 1, &["doc1"]));

        let sections = aggregator.sections();
        assert_eq!(sections[0].provider, "slack");
        assert_eq!(sections[0].items()[0].title, "doc1");
        assert_eq!(sections[1].error(), Some("timeout"));
    }

    #[test]
    fn test_empty_message_is_unknown_error() {
        let github = provider("github", 5);
        let mut aggregator = ResultAggregator::new();
        aggregator.begin_cycle(3, 1);

        let out = aggregator.on_outcome(failure(&github, 3, ProviderError::new(0, "")));
        match out[0] {
            RenderInstruction::AppendSection(ref section) => {
                assert_eq!(section.error(), Some("unknown error"));
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_outcome_from_other_cycle_is_dropped() {
        let a = provider("a", 1);
        let mut aggregator = ResultAggregator::new();
        aggregator.begin_cycle(1, 1);
        aggregator.begin_cycle(2, 1);

        assert!(aggregator.on_outcome(success(&a, 1, &["old"])).is_empty());
        assert!(!aggregator.is_idle());

        assert_eq!(aggregator.on_outcome(success(&a, 2, &["new"])).len(), 2);
        assert!(aggregator.is_idle());
        assert!(aggregator.on_outcome(success(&a, 2, &["again"])).is_empty());
    }

    #[test]
    fn test_equal_priority_keeps_arrival_order() {
        let x = provider("x", 3);
        let y = provider("y", 3);
        let mut aggregator = ResultAggregator::new();
        aggregator.begin_cycle(1, 2);

        aggregator.on_outcome(success(&y, 1, &[]));
        let out = aggregator.on_outcome(success(&x, 1, &[]));
        assert_eq!(order(&out), vec!["y", "x"]);
    }

    #[test]
    fn test_cancelled_handle_settles_cycle() {
        let a = provider("a", 1);
        let mut aggregator = ResultAggregator::new();
        aggregator.begin_cycle(1, 2);

        aggregator.on_outcome(success(&a, 1, &["a1"]));
        aggregator.on_cancelled(7);
        assert!(!aggregator.is_idle());
        aggregator.on_cancelled(1);
        assert!(aggregator.is_idle());
    }
}
