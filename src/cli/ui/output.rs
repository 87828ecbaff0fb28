use console::style;

use crate::ai::UsageSnapshot;
use crate::pipeline::{PipelineReport, StepOutcome};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn skipped(&self, message: &str) {
        println!("{} {}", style("-").dim(), style(message).dim());
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// One line per step, grouped by phase
    pub fn report(&self, report: &PipelineReport) {
        let mut current = None;

        for record in &report.steps {
            if current != Some(record.phase) {
                self.section(&record.phase.to_string());
                current = Some(record.phase);
            }

            let line = format!(
                "{:<24} {:>7.2}s",
                record.step,
                record.elapsed.as_secs_f64()
            );
            match &record.outcome {
                StepOutcome::Completed => self.success(&line),
                StepOutcome::Skipped => self.skipped(&format!("{:<24} disabled", record.step)),
                StepOutcome::Failed(reason) => self.error(&format!("{} {}", line, reason)),
            }
        }

        println!(
            "\n{} artifacts, {} completed, {} skipped, {} failed",
            report.published.len(),
            report.completed(),
            report.skipped(),
            report.failed()
        );
    }

    pub fn usage(&self, usage: &UsageSnapshot) {
        println!(
            "{} LLM calls ({} failed), {} input / {} output tokens",
            usage.calls, usage.failures, usage.input_tokens, usage.output_tokens
        );
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
