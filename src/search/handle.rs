//! In-flight lookup handles

use crate::providers::Provider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one (provider, sequence) lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Pending,
    Cancelled,
    Completed,
}

/// Tracks one lookup started by the dispatcher
#[derive(Debug)]
pub struct SearchHandle {
    provider: Arc<Provider>,
    sequence: u64,
    state: HandleState,
    cancel: CancellationToken,
}

impl SearchHandle {
    pub(crate) fn new(provider: Arc<Provider>, sequence: u64) -> Self {
        Self {
            provider,
            sequence,
            state: HandleState::Pending,
            cancel: CancellationToken::new(),
        }
    }

    pub fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Neither cancelled nor completed
    pub fn is_live(&self) -> bool {
        self.state == HandleState::Pending
    }

    /// Token observed by the lookup task
    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel if live. Returns whether anything changed.
    pub(crate) fn cancel(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        self.state = HandleState::Cancelled;
        self.cancel.cancel();
        true
    }

    /// Complete if live. Returns whether anything changed.
    pub(crate) fn complete(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        self.state = HandleState::Completed;
        true
    }
}
