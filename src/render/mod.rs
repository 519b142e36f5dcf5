//! Render instructions and sinks
//!
//! The core never draws anything. It emits [`RenderInstruction`]s to a
//! [`RenderSink`] supplied by the caller.

mod terminal;

pub use terminal::TerminalSink;

use crate::results::ResultItem;
use serde::{Deserialize, Serialize};

/// Content of one provider section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionBody {
    Items(Vec<ResultItem>),
    Error(String),
}

/// One provider's block in the result view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Provider name
    pub provider: String,
    /// Provider display title
    pub title: String,
    /// Provider priority, used for ordering
    pub priority: i64,
    pub body: SectionBody,
}

impl Section {
    pub fn is_error(&self) -> bool {
        matches!(self.body, SectionBody::Error(_))
    }

    pub fn items(&self) -> &[ResultItem] {
        match self.body {
            SectionBody::Items(ref items) => items,
            SectionBody::Error(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self.body {
            SectionBody::Error(ref message) => Some(message),
            SectionBody::Items(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// Instruction for the render sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderInstruction {
    /// Drop every displayed section
    Clear,
    /// Append a section at the end
    AppendSection(Section),
    /// Reorder displayed sections to match these provider names
    ReorderByPriority(Vec<String>),
    /// Show a notification outside the sections
    Alert { level: AlertLevel, message: String },
}

/// Consumer of render instructions
pub trait RenderSink: Send {
    fn apply(&mut self, instruction: RenderInstruction);

    /// Called when every provider of the current cycle has answered
    fn cycle_settled(&mut self) {}
}

/// In-memory sink that keeps the resulting view
#[derive(Debug, Clone, Default)]
pub struct RenderedView {
    sections: Vec<Section>,
    alerts: Vec<(AlertLevel, String)>,
    history: Vec<RenderInstruction>,
    settled: usize,
}

impl RenderedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sections as currently displayed
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Displayed provider titles, top to bottom
    pub fn titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    pub fn section(&self, provider: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.provider == provider)
    }

    pub fn alerts(&self) -> &[(AlertLevel, String)] {
        &self.alerts
    }

    /// Every instruction applied so far
    pub fn history(&self) -> &[RenderInstruction] {
        &self.history
    }

    /// Number of cycles that settled
    pub fn settled_cycles(&self) -> usize {
        self.settled
    }
}

impl RenderSink for RenderedView {
    fn apply(&mut self, instruction: RenderInstruction) {
        match instruction {
            RenderInstruction::Clear => self.sections.clear(),
            RenderInstruction::AppendSection(ref section) => self.sections.push(section.clone()),
            RenderInstruction::ReorderByPriority(ref order) => {
                let rank = |s: &Section| {
                    order
                        .iter()
                        .position(|name| *name == s.provider)
                        .unwrap_or(usize::MAX)
                };
                self.sections.sort_by_key(rank);
            }
            RenderInstruction::Alert { level, ref message } => {
                self.alerts.push((level, message.clone()));
            }
        }
        self.history.push(instruction);
    }

    fn cycle_settled(&mut self) {
        self.settled += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(provider: &str, priority: i64) -> Section {
        Section {
            provider: provider.to_string(),
            title: provider.to_uppercase(),
            priority,
            body: SectionBody::Items(vec![ResultItem::new("doc", "http://x")]),
        }
    }

    #[test]
    fn test_view_applies_instructions() {
        let mut view = RenderedView::new();
        view.apply(RenderInstruction::AppendSection(section("github", 5)));
        view.apply(RenderInstruction::AppendSection(section("slack", 10)));
        assert_eq!(view.titles(), vec!["GITHUB", "SLACK"]);

        view.apply(RenderInstruction::ReorderByPriority(vec![
            "slack".to_string(),
            "github".to_string(),
        ]));
        assert_eq!(view.titles(), vec!["SLACK", "GITHUB"]);

        view.apply(RenderInstruction::Clear);
        assert!(view.sections().is_empty());
        assert_eq!(view.history().len(), 4);
    }

    #[test]
    fn test_section_accessors() {
        let ok = section("slack", 1);
        assert!(!ok.is_error());
        assert_eq!(ok.items().len(), 1);

        let failed = Section {
            body: SectionBody::Error("timeout".to_string()),
            ..section("github", 1)
        };
        assert!(failed.is_error());
        assert_eq!(failed.error(), Some("timeout"));
        assert!(failed.items().is_empty());
    }
}
