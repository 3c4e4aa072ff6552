//! Progress reporting and display
//!
//! The pipeline reports through [`ProgressReporter`] so it stays independent of
//! how (or whether) progress is shown.

use std::{sync::Arc, time::Instant};

/// Stage of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    FetchingIssue,
    ParsingPayload,
    LocatingSchema,
    LoadingSchema,
    UpdatingDescriptions,
    SavingSchema,
    WritingOutputs,
}

/// Final counts shown in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub table_name: String,
    pub updated_count: usize,
    pub total_fields: usize,
}

pub trait ProgressReporter: Send + Sync {
    /// A line that is not tied to a stage.
    fn log_info(&self, message: &str);

    /// A stage has started.
    fn set_phase(&self, phase: Phase);

    /// A stage finished; `message` describes what it produced.
    fn step_done(&self, message: &str);

    fn log_warn(&self, message: &str);

    /// The run failed; printed once, with the error chain.
    fn log_error(&self, message: &str);

    fn finish(&self, summary: &Summary);
}

/// A no-op reporter for when progress display is disabled.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn log_info(&self, _message: &str) {}
    fn set_phase(&self, _phase: Phase) {}
    fn step_done(&self, _message: &str) {}
    fn log_warn(&self, _message: &str) {}
    fn log_error(&self, _message: &str) {}
    fn finish(&self, _summary: &Summary) {}
}

fn phase_message(phase: &Phase) -> &'static str {
    match phase {
        Phase::FetchingIssue => "Fetching issue...",
        Phase::ParsingPayload => "Parsing issue body...",
        Phase::LocatingSchema => "Locating schema...",
        Phase::LoadingSchema => "Loading schema...",
        Phase::UpdatingDescriptions => "Updating descriptions...",
        Phase::SavingSchema => "Saving schema...",
        Phase::WritingOutputs => "Writing step outputs...",
    }
}

fn print_summary(started: Instant, summary: &Summary) {
    eprintln!();
    eprintln!(
        "✅ Successfully updated {}/{} columns!",
        summary.updated_count, summary.total_fields
    );
    eprintln!("   📄 Table:    {}", summary.table_name);
    eprintln!("   ⏱️  Duration: {:.2}s", started.elapsed().as_secs_f64());
}

/// Plain line-per-step output for CI logs.
pub struct SimpleReporter {
    started: Instant,
}

impl SimpleReporter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SimpleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SimpleReporter {
    fn log_info(&self, message: &str) {
        eprintln!("{message}");
    }

    fn set_phase(&self, _phase: Phase) {}

    fn step_done(&self, message: &str) {
        eprintln!("✓ {message}");
    }

    fn log_warn(&self, message: &str) {
        eprintln!("⚠️  {message}");
    }

    fn log_error(&self, message: &str) {
        eprintln!("✗ {message}");
    }

    fn finish(&self, summary: &Summary) {
        print_summary(self.started, summary);
    }
}

/// Spinner for interactive terminals.
pub struct FancyReporter {
    spinner: indicatif::ProgressBar,
    started: Instant,
}

impl FancyReporter {
    pub fn new() -> Self {
        let spinner = indicatif::ProgressBar::new_spinner();
        spinner.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        Self {
            spinner,
            started: Instant::now(),
        }
    }
}

impl Default for FancyReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for FancyReporter {
    fn log_info(&self, message: &str) {
        self.spinner.println(message);
    }

    fn set_phase(&self, phase: Phase) {
        self.spinner.set_message(phase_message(&phase));
    }

    fn step_done(&self, message: &str) {
        self.spinner
            .println(format!("{} {message}", console::style("✓").green()));
    }

    fn log_warn(&self, message: &str) {
        self.spinner
            .println(format!("{} {message}", console::style("⚠").yellow()));
    }

    fn log_error(&self, message: &str) {
        self.spinner.finish_and_clear();
        eprintln!("{} {message}", console::style("✗").red());
    }

    fn finish(&self, summary: &Summary) {
        self.spinner.finish_and_clear();
        print_summary(self.started, summary);
    }
}

/// Create an appropriate reporter based on terminal capabilities.
pub fn create_reporter() -> Arc<dyn ProgressReporter> {
    if console::Term::stderr().is_term() {
        Arc::new(FancyReporter::new())
    } else {
        Arc::new(SimpleReporter::new())
    }
}
