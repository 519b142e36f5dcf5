//! Plain-text sink for the command line

use super::{AlertLevel, RenderInstruction, RenderSink, RenderedView, SectionBody};
use std::io::Write;

/// Prints the ordered view to a writer.
///
/// The whole view is redrawn whenever a section lands, so fast providers show
/// up without waiting for slow ones. A summary line marks the settled cycle.
pub struct TerminalSink<W: Write + Send> {
    view: RenderedView,
    out: W,
}

impl TerminalSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            view: RenderedView::new(),
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_view(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "--")?;
        for section in self.view.sections() {
            writeln!(self.out, "== {}", section.title)?;
            match section.body {
                SectionBody::Items(ref items) if items.is_empty() => {
                    writeln!(self.out, "   (no results)")?;
                }
                SectionBody::Items(ref items) => {
                    for (i, item) in items.iter().enumerate() {
                        let date = item
                            .timestamp
                            .map(|t| format!(" ({})", t.format("%Y-%m-%d")))
                            .unwrap_or_default();
                        writeln!(self.out, "{:>3}. {}{}", i + 1, item.title, date)?;
                        writeln!(self.out, "     {}", item.link)?;
                    }
                }
                SectionBody::Error(ref message) => {
                    writeln!(self.out, "   error: {}", message)?;
                }
            }
        }
        self.out.flush()
    }

    fn print_summary(&mut self) -> std::io::Result<()> {
        let failed = self.view.sections().iter().filter(|s| s.is_error()).count();
        writeln!(
            self.out,
            "-- {} providers answered, {} failed\n",
            self.view.sections().len(),
            failed
        )?;
        self.out.flush()
    }
}

impl<W: Write + Send> RenderSink for TerminalSink<W> {
    fn apply(&mut self, instruction: RenderInstruction) {
        if let RenderInstruction::Alert { level, ref message } = instruction {
            let label = match level {
                AlertLevel::Warning => "warning",
                AlertLevel::Critical => "critical",
            };
            // Best effort: nowhere left to report a failing terminal
            let _ = writeln!(self.out, "[{}] {}", label, message);
        }
        let redraw = matches!(instruction, RenderInstruction::ReorderByPriority(_));
        self.view.apply(instruction);

        // Every appended section is followed by a reorder
        if redraw {
            if let Err(e) = self.print_view() {
                tracing::warn!("Failed to print results: {}", e);
            }
        }
    }

    fn cycle_settled(&mut self) {
        self.view.cycle_settled();
        if let Err(e) = self.print_summary() {
            tracing::warn!("Failed to print results: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Section;
    use crate::results::ResultItem;

    fn slack() -> Section {
        Section {
            provider: "slack".to_string(),
            title: "Slack".to_string(),
            priority: 10,
            body: SectionBody::Items(vec![ResultItem::new("doc1", "http://x")]),
        }
    }

    fn github() -> Section {
        Section {
            provider: "github".to_string(),
            title: "Github".to_string(),
            priority: 5,
            body: SectionBody::Error("timeout".to_string()),
        }
    }

    fn order(names: &[&str]) -> RenderInstruction {
        RenderInstruction::ReorderByPriority(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_redraws_as_sections_arrive() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.apply(RenderInstruction::Clear);
        sink.apply(RenderInstruction::AppendSection(github()));
        sink.apply(order(&["github"]));

        let out = String::from_utf8(sink.out.clone()).unwrap();
        assert!(out.contains("== Github"));
        assert!(out.contains("error: timeout"));
        assert!(!out.contains("providers answered"));

        sink.apply(RenderInstruction::AppendSection(slack()));
        sink.apply(order(&["slack", "github"]));
        sink.cycle_settled();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let last = out.rfind("--\n").unwrap();
        let slack = out[last..].find("== Slack").unwrap();
        let github = out[last..].find("== Github").unwrap();
        assert!(slack < github);
        assert!(out.contains("  1. doc1"));
        assert!(out.ends_with("-- 2 providers answered, 1 failed\n\n"));
    }

    #[test]
    fn test_append_alone_does_not_redraw() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.apply(RenderInstruction::AppendSection(slack()));
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_alerts_print_immediately() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.apply(RenderInstruction::Alert {
            level: AlertLevel::Critical,
            message: "no available provider to search".to_string(),
        });
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "[critical] no available provider to search\n");
    }
}
