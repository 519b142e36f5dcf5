//! Search orchestration module
//!
//! Fans query tokens out to every provider with latest-wins cancellation and
//! runs the session loop that feeds live outcomes to the aggregator.

mod dispatcher;
mod handle;
mod session;

pub use dispatcher::{Completion, Dispatch, SearchDispatcher};
pub use handle::{HandleState, SearchHandle};
pub use session::{Session, StartError};
