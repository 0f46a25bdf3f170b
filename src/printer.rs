use std::io::{self, IsTerminal, Write};

use crossterm::style::{Color, Stylize};

use crate::models::{GroupReport, RunReport, TestOutcome, TestStatus};

/// Presents a finished run.
pub trait ReportPrinter {
    fn print(&mut self, report: &RunReport) -> io::Result<()>;
}

/// Plain terminal output: one summary per group, then its numbered cases.
pub struct ConsolePrinter<W: Write> {
    out: W,
    color: bool,
}

impl ConsolePrinter<io::Stdout> {
    /// Colored when stdout is a terminal and `NO_COLOR` is unset.
    pub fn stdout() -> Self {
        let stdout = io::stdout();
        let color = stdout.is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { out: stdout, color }
    }
}

impl<W: Write> ConsolePrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        self.paint(text, Color::DarkGrey)
    }

    fn print_group(&mut self, group: &GroupReport) -> io::Result<()> {
        let status = if group.count(TestStatus::Failed) > 0 {
            TestStatus::Failed
        } else if group.count(TestStatus::Skipped) > 0 {
            TestStatus::Skipped
        } else {
            TestStatus::Passed
        };
        let count = group.outcomes.len();
        let noun = if count == 1 { "test" } else { "tests" };

        let icon = self.paint(status.icon(), status.color());
        let timing = self.dim(&format!(
            "total {} · avg {}",
            format_ms(group.total_duration_ms()),
            format_ms(group.average_duration_ms())
        ));
        writeln!(
            self.out,
            " {} {} ({} {}) {}",
            icon, group.description, count, noun, timing
        )?;
        let id = self.dim(&format!("id {}", group.id));
        writeln!(self.out, "   {}", id)?;

        for (index, outcome) in group.outcomes.iter().enumerate() {
            self.print_outcome(index + 1, outcome)?;
        }
        Ok(())
    }

    fn print_outcome(&mut self, number: usize, outcome: &TestOutcome) -> io::Result<()> {
        let icon = self.paint(outcome.status.icon(), outcome.status.color());
        let duration = match outcome.status {
            TestStatus::Skipped => String::new(),
            _ => format!(" {}", self.dim(&format_ms(outcome.duration_ms))),
        };
        writeln!(
            self.out,
            "   {:>3}. {} {}{}",
            number, icon, outcome.description, duration
        )?;

        if let Some(failure) = &outcome.failure {
            for line in failure.message.lines() {
                let line = self.paint(line, Color::Red);
                writeln!(self.out, "          {}", line)?;
            }
            if let Some(stack) = &failure.stack {
                for line in stack.lines() {
                    let line = self.dim(line);
                    writeln!(self.out, "          {}", line)?;
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> ReportPrinter for ConsolePrinter<W> {
    fn print(&mut self, report: &RunReport) -> io::Result<()> {
        for group in &report.group_reports {
            self.print_group(group)?;
            writeln!(self.out)?;
        }

        let summary = report.summary();
        let mut counts = vec![self.paint(&format!("{} passed", summary.passed), Color::Green)];
        if summary.failed > 0 {
            counts.push(self.paint(&format!("{} failed", summary.failed), Color::Red));
        }
        if summary.skipped > 0 {
            counts.push(self.dim(&format!("{} skipped", summary.skipped)));
        }
        writeln!(
            self.out,
            " Tests     {} ({})",
            counts.join(" | "),
            summary.total
        )?;
        writeln!(self.out, " Duration  {}", format_ms(summary.duration_ms))?;
        self.out.flush()
    }
}

/// `850.25ms`, or seconds once past one.
pub fn format_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format!("{:.2}ms", ms)
    }
}
