//! Test discovery and execution.
//!
//! Discovery is by naming convention: [`AutoRunner::filter`] keeps classes
//! whose name ends with a suffix and [`AutoRunner::test_methods`] picks the
//! instance methods starting with a prefix. [`TestRunner`] runs each test
//! method on a fresh instance, wrapped in `setup`/`teardown` when the class
//! responds to them, and collects results into a shared [`TestResults`].

use std::error::Error as _;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use klass_core::{Class, Error, Object};
use log::debug;
use parking_lot::Mutex;

use crate::assertions::AssertionFailedError;

// ── Options ──────────────────────────────────────────────────────────────

/// Options for discovering and running tests.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Class-name suffix marking a test case
    pub suffix: String,
    /// Method-name prefix marking a test
    pub prefix: String,
    /// Substring filters matched against `Class#method`; empty runs all
    pub filters: Vec<String>,
    /// Include the error's cause chain in failure messages
    pub show_stack: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            suffix: "Test".to_string(),
            prefix: "test".to_string(),
            filters: Vec::new(),
            show_stack: true,
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// Outcome of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    /// Every assertion held
    Pass,
    /// An assertion failed
    Fail,
    /// Something other than an assertion went wrong
    Error,
}

impl TestStatus {
    /// Lowercase wire name (`pass`, `fail`, `error`)
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Error => "error",
        }
    }
}

/// Result of a single test method.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Full test name (`Class#method`)
    pub name: String,
    /// Outcome
    pub status: TestStatus,
    /// Failure or error message
    pub message: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: f64,
}

/// Collected results from a run.
#[derive(Debug, Clone, Default)]
pub struct TestResults {
    /// Individual test results in execution order
    pub results: Vec<TestResult>,
}

impl TestResults {
    /// Number of passed tests.
    pub fn passed(&self) -> usize {
        self.count(TestStatus::Pass)
    }

    /// Number of failed tests.
    pub fn failures(&self) -> usize {
        self.count(TestStatus::Fail)
    }

    /// Number of tests that errored.
    pub fn errors(&self) -> usize {
        self.count(TestStatus::Error)
    }

    /// Total number of tests that ran.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Total duration in milliseconds.
    pub fn total_duration_ms(&self) -> f64 {
        self.results.iter().map(|r| r.duration_ms).sum()
    }

    /// 0 when nothing failed or errored, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failures() + self.errors() == 0 {
            0
        } else {
            1
        }
    }

    fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Shared handle for collecting test results.
pub type SharedTestResults = Arc<Mutex<TestResults>>;

/// Create a new shared test results collector.
pub fn new_results() -> SharedTestResults {
    Arc::new(Mutex::new(TestResults::default()))
}

// ── Reporting ────────────────────────────────────────────────────────────

/// Receives progress while a run is in flight.
pub trait Reporter {
    /// Called once before the first test with the number of tests to run
    fn start(&mut self, _total: usize) -> io::Result<()> {
        Ok(())
    }

    /// Called after each test
    fn record(&mut self, result: &TestResult) -> io::Result<()>;

    /// Called once after the last test
    fn finish(&mut self, results: &TestResults) -> io::Result<()>;
}

// ── Discovery ────────────────────────────────────────────────────────────

/// Convention-based test discovery.
pub struct AutoRunner;

impl AutoRunner {
    /// Classes whose name ends with `suffix`, in the given order.
    ///
    /// Anonymous classes are never test cases.
    pub fn filter(classes: &[Class], suffix: &str) -> Vec<Class> {
        classes
            .iter()
            .filter(|class| class.name().is_some_and(|name| name.ends_with(suffix)))
            .cloned()
            .collect()
    }

    /// Test method names of `class` (own and inherited) starting with `prefix`
    pub fn test_methods(class: &Class, prefix: &str) -> Vec<String> {
        class
            .instance_methods(true)
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect()
    }

    /// Whether `name` passes the filters (an empty filter list passes all)
    pub fn matches(filters: &[String], name: &str) -> bool {
        filters.is_empty() || filters.iter().any(|f| name.contains(f.as_str()))
    }
}

// ── Execution ────────────────────────────────────────────────────────────

/// Runs discovered tests and collects results.
pub struct TestRunner {
    results: SharedTestResults,
}

impl TestRunner {
    /// Runner with a fresh results collector
    pub fn new() -> Self {
        Self::with_results(new_results())
    }

    /// Runner recording into an existing collector
    pub fn with_results(results: SharedTestResults) -> Self {
        Self { results }
    }

    /// Shared handle to the collected results
    pub fn results(&self) -> SharedTestResults {
        self.results.clone()
    }

    /// Run every matching test of every test case in `classes`.
    ///
    /// Returns a snapshot of all results recorded so far. Only reporter I/O
    /// can fail the run itself; test failures are results.
    pub fn run(
        &self,
        classes: &[Class],
        options: &RunnerOptions,
        reporter: &mut dyn Reporter,
    ) -> io::Result<TestResults> {
        let mut plan = Vec::new();
        for class in AutoRunner::filter(classes, &options.suffix) {
            for method in AutoRunner::test_methods(&class, &options.prefix) {
                let name = format!("{}#{}", class.display_name(), method);
                if AutoRunner::matches(&options.filters, &name) {
                    plan.push((class.clone(), method, name));
                }
            }
        }
        debug!("running {} tests", plan.len());

        reporter.start(plan.len())?;
        for (class, method, name) in plan {
            let result = run_one(&class, &method, name, options);
            reporter.record(&result)?;
            self.results.lock().results.push(result);
        }

        let snapshot = self.results.lock().clone();
        reporter.finish(&snapshot)?;
        Ok(snapshot)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn run_one(class: &Class, method: &str, name: String, options: &RunnerOptions) -> TestResult {
    let start = Instant::now();
    let outcome = class
        .new_instance(&[])
        .and_then(|case| run_phases(&case, method));

    let (status, message) = match outcome {
        Ok(()) => (TestStatus::Pass, None),
        Err(err) if AssertionFailedError::is_failure(&err) => {
            (TestStatus::Fail, Some(describe(&err, options.show_stack)))
        }
        Err(err) => (TestStatus::Error, Some(describe(&err, options.show_stack))),
    };
    debug!("{} {}", status.as_str(), name);

    TestResult {
        name,
        status,
        message,
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}

/// `setup`, the test, then `teardown` even when the test failed. The first
/// error wins.
fn run_phases(case: &Object, method: &str) -> Result<(), Error> {
    let mut outcome = Ok(());
    if case.respond_to("setup") {
        outcome = case.send("setup", &[]).map(drop);
    }
    if outcome.is_ok() {
        outcome = case.send(method, &[]).map(drop);
    }
    if case.respond_to("teardown") {
        let teardown = case.send("teardown", &[]).map(drop);
        if outcome.is_ok() {
            outcome = teardown;
        }
    }
    outcome
}

fn describe(err: &Error, show_stack: bool) -> String {
    let mut message = err.to_string();
    if show_stack {
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
    }
    message
}
