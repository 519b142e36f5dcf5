//! Query normalisation
//!
//! Turns raw input events into query tokens. Filters, in order:
//! - only commit events pass (submit click, or the commit key on key-up)
//! - the trimmed text must be at least `min_query_length` characters
//! - a text equal to the previously accepted one is dropped
//! - after an acceptance, everything is ignored for the quiet window
//!
//! The quiet window is a throttle, not a debounce: the first event after the
//! window reopens is accepted straight away.

use crate::config::SearchSettings;
use futures::{future, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Kind of a raw input event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Explicit submit action (search button)
    SubmitClick,
    /// A key was released in the input field
    KeyUp { key: String },
    /// The field content changed without a commit
    Change,
}

/// Raw input event from the input source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Field text at the time of the event
    pub text: String,
    /// What produced the event
    pub kind: EventKind,
}

impl InputEvent {
    pub fn submit(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: EventKind::SubmitClick,
        }
    }

    pub fn key_up(text: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: EventKind::KeyUp { key: key.into() },
        }
    }

    pub fn change(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: EventKind::Change,
        }
    }

    /// Whether this event commits the query
    pub fn is_commit(&self, commit_key: &str) -> bool {
        match &self.kind {
            EventKind::SubmitClick => true,
            EventKind::KeyUp { key } => key == commit_key,
            EventKind::Change => false,
        }
    }
}

/// An accepted query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryToken {
    /// Normalised query text
    pub text: String,
    /// Strictly increasing, starting at 1
    pub sequence: u64,
}

impl QueryToken {
    pub fn new(text: impl Into<String>, sequence: u64) -> Self {
        Self {
            text: text.into(),
            sequence,
        }
    }
}

/// Filters raw input events down to query tokens
#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    min_length: usize,
    commit_key: String,
    quiet_window: Duration,
    window_opens_at: Option<Instant>,
    last_accepted: Option<String>,
    next_sequence: u64,
}

impl QueryNormalizer {
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            min_length: settings.min_query_length,
            commit_key: settings.commit_key.clone(),
            quiet_window: Duration::from_millis(settings.quiet_window_ms),
            window_opens_at: None,
            last_accepted: None,
            next_sequence: 1,
        }
    }

    /// Feed one event now; returns a token if it is accepted
    pub fn accept(&mut self, event: &InputEvent) -> Option<QueryToken> {
        self.accept_at(event, Instant::now())
    }

    /// Feed one event observed at `now`
    pub fn accept_at(&mut self, event: &InputEvent, now: Instant) -> Option<QueryToken> {
        if !event.is_commit(&self.commit_key) {
            return None;
        }

        let text = event.text.trim();
        if text.chars().count() < self.min_length {
            trace!("Dropping short query {:?}", text);
            return None;
        }

        if self.last_accepted.as_deref() == Some(text) {
            trace!("Dropping repeated query {:?}", text);
            return None;
        }

        // Rejected events never move the window
        if let Some(opens_at) = self.window_opens_at {
            if now < opens_at {
                trace!("Dropping query {:?} inside quiet window", text);
                return None;
            }
        }

        let token = QueryToken::new(text, self.next_sequence);
        self.next_sequence += 1;
        self.last_accepted = Some(token.text.clone());
        if !self.quiet_window.is_zero() {
            self.window_opens_at = Some(now + self.quiet_window);
        }
        Some(token)
    }

    /// Lazily normalise a stream of events
    pub fn into_stream<S>(mut self, events: S) -> impl Stream<Item = QueryToken>
    where
        S: Stream<Item = InputEvent>,
    {
        events.filter_map(move |event| future::ready(self.accept(&event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Manually advanced time source
    struct Clock(Instant);

    impl Clock {
        fn now(&self) -> Instant {
            self.0
        }

        fn advance(&mut self, by: Duration) {
            self.0 += by;
        }
    }

    fn normalizer() -> (QueryNormalizer, Clock) {
        (
            QueryNormalizer::new(&SearchSettings::default()),
            Clock(Instant::now()),
        )
    }

    #[test]
    fn test_only_commit_events_pass() {
        let (mut n, mut clock) = normalizer();

        assert!(n.accept_at(&InputEvent::change("hello"), clock.now()).is_none());
        assert!(n.accept_at(&InputEvent::key_up("hello", "a"), clock.now()).is_none());

        let token = n.accept_at(&InputEvent::key_up("hello", "Enter"), clock.now()).unwrap();
        assert_eq!(token, QueryToken::new("hello", 1));

        clock.advance(Duration::from_millis(1500));
        let token = n.accept_at(&InputEvent::submit("world"), clock.now()).unwrap();
        assert_eq!(token.sequence, 2);
    }

    #[test]
    fn test_short_queries_dropped() {
        let (mut n, clock) = normalizer();

        assert!(n.accept_at(&InputEvent::submit("ab"), clock.now()).is_none());
        assert!(n.accept_at(&InputEvent::submit("  ab  "), clock.now()).is_none());
        assert!(n.accept_at(&InputEvent::submit(""), clock.now()).is_none());

        let token = n.accept_at(&InputEvent::submit(" abc "), clock.now()).unwrap();
        assert_eq!(token.text, "abc");
        assert_eq!(token.sequence, 1);
    }

    #[test]
    fn test_length_counts_characters() {
        let (mut n, clock) = normalizer();
        // Two characters, four bytes
        assert!(n.accept_at(&InputEvent::submit("éé"), clock.now()).is_none());
        assert!(n.accept_at(&InputEvent::submit("ééé"), clock.now()).is_some());
    }

    #[test]
    fn test_consecutive_duplicates_dropped() {
        let (mut n, mut clock) = normalizer();

        assert!(n.accept_at(&InputEvent::submit("rust"), clock.now()).is_some());
        clock.advance(Duration::from_secs(2));
        assert!(n.accept_at(&InputEvent::submit("rust"), clock.now()).is_none());
        assert!(n.accept_at(&InputEvent::submit("tokio"), clock.now()).is_some());

        // Not distinct-ever: "rust" is fine again once something else was accepted
        clock.advance(Duration::from_secs(2));
        let token = n.accept_at(&InputEvent::submit("rust"), clock.now()).unwrap();
        assert_eq!(token.sequence, 3);
    }

    #[test]
    fn test_quiet_window_throttles() {
        let (mut n, mut clock) = normalizer();

        assert!(n.accept_at(&InputEvent::submit("foo"), clock.now()).is_some());

        clock.advance(Duration::from_millis(400));
        assert!(n.accept_at(&InputEvent::submit("foobar"), clock.now()).is_none());

        clock.advance(Duration::from_millis(400));
        assert!(n.accept_at(&InputEvent::submit("foobar"), clock.now()).is_none());

        // Window reopened: accepted immediately, not delayed
        clock.advance(Duration::from_millis(400));
        let token = n.accept_at(&InputEvent::submit("foobar"), clock.now()).unwrap();
        assert_eq!(token, QueryToken::new("foobar", 2));
    }

    #[test]
    fn test_rejected_events_do_not_extend_window() {
        let (mut n, mut clock) = normalizer();

        assert!(n.accept_at(&InputEvent::submit("first"), clock.now()).is_some());
        clock.advance(Duration::from_millis(900));
        assert!(n.accept_at(&InputEvent::submit("second"), clock.now()).is_none());
        clock.advance(Duration::from_millis(200));
        assert!(n.accept_at(&InputEvent::submit("third"), clock.now()).is_some());
    }

    #[test]
    fn test_zero_window_disables_throttle() {
        let settings = SearchSettings {
            quiet_window_ms: 0,
            ..Default::default()
        };
        let mut n = QueryNormalizer::new(&settings);
        let clock = Clock(Instant::now());

        assert!(n.accept_at(&InputEvent::submit("one"), clock.now()).is_some());
        assert!(n.accept_at(&InputEvent::submit("two"), clock.now()).is_some());
        assert!(n.accept_at(&InputEvent::submit("three"), clock.now()).is_some());
    }

    #[tokio::test]
    async fn test_stream_adapter() {
        let n = QueryNormalizer::new(&SearchSettings::default());

        let events = futures::stream::iter(vec![
            InputEvent::change("he"),
            InputEvent::submit("he"),
            InputEvent::submit("hello"),
            InputEvent::submit("hello"),
            InputEvent::submit("help"),
        ]);

        let tokens: Vec<QueryToken> = n.into_stream(events).collect().await;
        assert_eq!(tokens, vec![QueryToken::new("hello", 1)]);
    }
}
