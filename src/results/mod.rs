//! Result types and aggregation
//!
//! Provider results, the outcome of one lookup, and the aggregator that turns
//! outcomes into priority-ordered render sections.

mod aggregator;
mod types;

pub use aggregator::{CycleState, ResultAggregator};
pub use types::*;
