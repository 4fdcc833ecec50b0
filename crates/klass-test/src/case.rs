//! The `TestCase` base class.
//!
//! Test classes created through [`TestCase::create`] inherit the assertion
//! helpers as ordinary instance methods, so test bodies can either call the
//! Rust helpers directly or `send("assert_equal", ...)` to themselves.

use klass_core::{Class, MethodBody, Result, Value};

use crate::assertions::{
    assert_equal, assert_kind_of, assert_not_equal, assert_respond_to, assert_true, flunk,
};

thread_local! {
    static BASE: Class = build_base();
}

/// Entry point for building test classes.
pub struct TestCase;

impl TestCase {
    /// The shared base class (one per thread)
    pub fn base() -> Class {
        BASE.with(Class::clone)
    }

    /// Create a test class named `name` inheriting from the base class
    pub fn create(name: &str, body: MethodBody) -> Result<Class> {
        Class::create(Some(name), Some(Self::base().as_module()), body)
    }
}

fn build_base() -> Class {
    let base = Class::new(Some("TestCase"));

    base.define("assert", |call| {
        let message = call.arg(1);
        assert_true(
            call.arg(0).is_truthy(),
            message.as_str().unwrap_or("assertion failed"),
        )?;
        Ok(Value::Nil)
    });
    base.define("assert_equal", |call| {
        assert_equal(&call.arg(0), &call.arg(1))?;
        Ok(Value::Nil)
    });
    base.define("assert_not_equal", |call| {
        assert_not_equal(&call.arg(0), &call.arg(1))?;
        Ok(Value::Nil)
    });
    base.define("assert_kind_of", |call| {
        assert_kind_of(call.module_arg(0)?, &call.arg(1))?;
        Ok(Value::Nil)
    });
    base.define("assert_respond_to", |call| {
        assert_respond_to(&call.arg(0), call.str_arg(1)?)?;
        Ok(Value::Nil)
    });
    base.define("flunk", |call| {
        let message = call.arg(0);
        flunk(message.as_str().unwrap_or("flunked"))?;
        Ok(Value::Nil)
    });

    base
}
