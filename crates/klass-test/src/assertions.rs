//! Assertion helpers.
//!
//! Every helper returns `klass_core::Result<()>` so it can be `?`-propagated
//! straight out of a method body. A failed assertion travels as
//! `Error::Raised(AssertionFailedError)`, which the runner tells apart from
//! any other error.

use klass_core::{Error, Module, Result, Value};
use thiserror::Error;

/// Raised by a failing assertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AssertionFailedError {
    /// What was expected and what happened instead
    pub message: String,
}

impl AssertionFailedError {
    /// Create from any displayable message
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// Whether `error` is an assertion failure (rather than an error)
    pub fn is_failure(error: &Error) -> bool {
        error.downcast_ref::<AssertionFailedError>().is_some()
    }
}

fn failure(message: String) -> Error {
    Error::raise(AssertionFailedError::new(message))
}

/// Fail unconditionally
pub fn flunk(message: &str) -> Result<()> {
    Err(failure(message.to_string()))
}

/// Fail unless `condition` holds
pub fn assert_true(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(failure(message.to_string()))
    }
}

/// Fail unless `actual == expected`
pub fn assert_equal(expected: &Value, actual: &Value) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(failure(format!(
            "<{}> expected but was <{}>",
            show(expected),
            show(actual)
        )))
    }
}

/// Fail if `actual == expected`
pub fn assert_not_equal(expected: &Value, actual: &Value) -> Result<()> {
    if expected != actual {
        Ok(())
    } else {
        Err(failure(format!(
            "<{}> expected to be != to <{}>",
            show(expected),
            show(actual)
        )))
    }
}

/// Fail unless `value` has `module` among its ancestors
pub fn assert_kind_of(module: &Module, value: &Value) -> Result<()> {
    if value.is_a(module) {
        Ok(())
    } else {
        Err(failure(format!(
            "<{}> expected to be a kind of {} but was {}",
            show(value),
            module.display_name(),
            value.type_name()
        )))
    }
}

/// Fail unless `value` responds to `name`
pub fn assert_respond_to(value: &Value, name: &str) -> Result<()> {
    if value.respond_to(name) {
        Ok(())
    } else {
        Err(failure(format!(
            "<{}> expected to respond to <{}>",
            show(value),
            name
        )))
    }
}

/// Fail unless `block` returns an error.
///
/// Assertion failures inside the block count as errors being raised too, so
/// nested assertions can be checked.
pub fn assert_raise<T>(block: impl FnOnce() -> Result<T>) -> Result<()> {
    match block() {
        Err(_) => Ok(()),
        Ok(_) => Err(failure("expected an error but nothing was raised".into())),
    }
}

fn show(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{:?}", &**s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klass_core::Class;

    #[test]
    fn test_passing_assertions() {
        assert!(assert_true(true, "unused").is_ok());
        assert!(assert_equal(&Value::from(1), &Value::from(1.0)).is_ok());
        assert!(assert_not_equal(&Value::from("a"), &Value::from("b")).is_ok());
        assert!(assert_raise(|| flunk("inner")).is_ok());
    }

    #[test]
    fn test_equal_failure_message() {
        let err = assert_equal(&Value::from("jcoglan"), &Value::from(26)).unwrap_err();
        assert!(AssertionFailedError::is_failure(&err));
        assert_eq!(err.to_string(), "<\"jcoglan\"> expected but was <26>");
    }

    #[test]
    fn test_kind_of_and_respond_to() {
        let base = Class::new(Some("Base"));
        base.define("run", |_| Ok(Value::Nil));
        let other = Class::new(Some("Other"));
        let value = Value::from(base.new_instance(&[]).unwrap());

        assert!(assert_kind_of(&base, &value).is_ok());
        assert!(assert_respond_to(&value, "run").is_ok());

        let err = assert_kind_of(&other, &value).unwrap_err();
        assert_eq!(
            err.to_string(),
            "<#<Base>> expected to be a kind of Other but was object"
        );
        assert!(assert_respond_to(&Value::from(3), "run").is_err());
    }

    #[test]
    fn test_raise_fails_on_success() {
        let err = assert_raise(|| Ok(Value::Nil)).unwrap_err();
        assert!(AssertionFailedError::is_failure(&err));
        assert!(!AssertionFailedError::is_failure(&Error::Argument("x".into())));
    }
}
