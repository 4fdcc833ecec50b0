//! `klass selftest`: run the bundled suite and report.

use crate::output::{self, StyledOutput};
use crate::suite;
use klass_test::{JsonReporter, Reporter, RunnerOptions, TestResult, TestResults, TestRunner, TestStatus};
use std::io;

/// Arguments for the selftest command.
pub struct SelftestArgs {
    pub filters: Vec<String>,
    pub reporter: String,
    pub color: String,
    pub show_stack: bool,
}

pub fn execute(args: SelftestArgs) -> anyhow::Result<i32> {
    let classes = suite::classes()
        .map_err(|e| anyhow::anyhow!("failed to build the self-test suite: {}", e))?;
    let options = RunnerOptions {
        filters: args.filters,
        show_stack: args.show_stack,
        ..RunnerOptions::default()
    };

    let runner = TestRunner::new();
    let results = match args.reporter.as_str() {
        "json" => {
            let mut reporter = JsonReporter::new(io::stdout().lock());
            runner.run(&classes, &options, &mut reporter)?
        }
        _ => {
            let out = StyledOutput::new(output::resolve_color_choice(Some(&args.color)));
            let mut reporter = ConsoleReporter::new(out);
            runner.run(&classes, &options, &mut reporter)?
        }
    };

    Ok(results.exit_code())
}

// ── Default Reporter ─────────────────────────────────────────────────────

struct ConsoleReporter {
    out: StyledOutput,
}

impl ConsoleReporter {
    fn new(out: StyledOutput) -> Self {
        Self { out }
    }

    fn print_failure_details(&mut self, results: &TestResults) {
        let failed: Vec<&TestResult> = results
            .results
            .iter()
            .filter(|r| r.status != TestStatus::Pass)
            .collect();
        if failed.is_empty() {
            return;
        }

        self.out.newline();
        self.out.bold("Failures:");
        self.out.newline();
        for (i, result) in failed.iter().enumerate() {
            self.out.newline();
            self.out.plain(&format!("  {}) ", i + 1));
            self.out.bold(&result.name);
            self.out.newline();
            for line in result.message.as_deref().unwrap_or_default().lines() {
                self.out.error(&format!("     {}", line));
                self.out.newline();
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn start(&mut self, total: usize) -> io::Result<()> {
        if total == 0 {
            self.out.warning("No tests matched.");
            self.out.newline();
        }
        Ok(())
    }

    fn record(&mut self, result: &TestResult) -> io::Result<()> {
        match result.status {
            TestStatus::Pass => self.out.pass_badge(),
            TestStatus::Fail => self.out.fail_badge(),
            TestStatus::Error => self.out.error_badge(),
        }
        self.out.plain(&format!(" {}", result.name));
        self.out.dim(&format!(" ({:.2}ms)", result.duration_ms));
        self.out.newline();
        Ok(())
    }

    fn finish(&mut self, results: &TestResults) -> io::Result<()> {
        self.print_failure_details(results);

        self.out.newline();
        self.out.dim("──────────────────────────────────────────");
        self.out.newline();

        let summary = format!(
            "{} tests, {} failures, {} errors",
            results.total(),
            results.failures(),
            results.errors()
        );
        if results.exit_code() == 0 {
            self.out.success(&summary);
        } else {
            self.out.error(&summary);
        }
        self.out.dim(&format!(" ({:.0}ms)", results.total_duration_ms()));
        self.out.newline();
        self.out.flush();
        Ok(())
    }
}
