//! Klass Test
//!
//! An xUnit-style test framework whose test cases are ordinary klass
//! classes: a test case is a class named `...Test` whose `test*` instance
//! methods are run one per fresh instance, with optional `setup` and
//! `teardown`.
//!
//! - `assertions`: `AssertionFailedError` and the assertion helpers
//! - `case`: the shared `TestCase` base class exposing assertions as methods
//! - `runner`: discovery (`AutoRunner`), execution (`TestRunner`) and results
//! - `bridge`: the line-oriented JSON status protocol and its consumer

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod assertions;
pub mod bridge;
pub mod case;
pub mod runner;

pub use assertions::{
    assert_equal, assert_kind_of, assert_not_equal, assert_raise, assert_respond_to, assert_true,
    flunk, AssertionFailedError,
};
pub use bridge::{BridgeConsole, BridgeError, JsonReporter, Status, StatusEnvelope};
pub use case::TestCase;
pub use runner::{
    new_results, AutoRunner, Reporter, RunnerOptions, SharedTestResults, TestResult, TestResults,
    TestRunner, TestStatus,
};
