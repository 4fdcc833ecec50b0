//! The bundled self-test suite: core behaviors written as klass test cases.

use std::cell::RefCell;
use std::rc::Rc;

use klass_core::{Class, Error, IncludeOptions, MethodBody, Module, Result, Value};
use klass_test::{assert_equal, assert_kind_of, assert_raise, assert_respond_to, assert_true, TestCase};

/// Every test case in the suite, in run order
pub fn classes() -> Result<Vec<Class>> {
    Ok(vec![bootstrap_test()?, mixin_test()?, hook_test()?])
}

fn nil(result: Result<()>) -> Result<Value> {
    result.map(|_| Value::Nil)
}

fn person(superclass: Option<&Module>) -> Result<Class> {
    Class::create(
        Some("Klass"),
        superclass,
        MethodBody::new()
            .method("initialize", |call| {
                let this = call.this()?;
                this.set("name", call.arg(0));
                this.set("age", call.arg(1));
                Ok(Value::Nil)
            })
            .method("sayHello", |call| {
                Ok(Value::from(format!("Hello, {}", call.this()?.get("name"))))
            }),
    )
}

fn tagged(name: &str, tag: &'static str) -> Module {
    let module = Module::new(Some(name));
    module.define("tag", move |_| Ok(Value::from(tag)));
    module
}

// ── Bootstrap ────────────────────────────────────────────────────────────

fn bootstrap_test() -> Result<Class> {
    TestCase::create(
        "BootstrapTest",
        MethodBody::new()
            .method("test_empty_class", |_| {
                let klass = Class::create(None, None, MethodBody::new())?;
                let object = klass.new_instance(&[])?;
                assert_true(object.field_count() == 0, "fresh object has fields")?;
                nil(assert_kind_of(&klass, &Value::from(object)))
            })
            .method("test_initialize_with_arguments", |_| {
                let object = person(None)?.new_instance(&[Value::from("jcoglan"), Value::from(26)])?;
                assert_equal(&Value::from("jcoglan"), &object.get("name"))?;
                nil(assert_equal(&Value::from(26), &object.get("age")))
            })
            .method("test_instance_methods", |_| {
                let object = person(None)?.new_instance(&[Value::from("jcoglan")])?;
                nil(assert_equal(
                    &Value::from("Hello, jcoglan"),
                    &object.send("sayHello", &[])?,
                ))
            })
            .method("test_subclass", |_| {
                let parent = person(None)?;
                let sub = Class::create(
                    None,
                    Some(parent.as_module()),
                    MethodBody::new().method("sayBye", |call| {
                        Ok(Value::from(format!("Bye, {}", call.this()?.get("name"))))
                    }),
                )?;
                let object = Value::from(sub.new_instance(&[Value::from("jcoglan")])?);
                assert_respond_to(&object, "sayHello")?;
                assert_kind_of(&parent, &object)?;
                nil(assert_equal(
                    &Value::from("Bye, jcoglan"),
                    &object.send("sayBye", &[])?,
                ))
            })
            .method("test_module_is_not_a_superclass", |_| {
                let module = Module::new(Some("Plain"));
                nil(assert_raise(|| person(Some(&module))))
            }),
    )
}

// ── Mixins ───────────────────────────────────────────────────────────────

fn mixin_test() -> Result<Class> {
    TestCase::create(
        "MixinTest",
        MethodBody::new()
            .method("test_later_include_wins", |_| {
                let klass = Class::new(Some("Host"));
                klass.include(&tagged("A", "a"))?.include(&tagged("B", "b"))?;
                let object = klass.new_instance(&[])?;
                nil(assert_equal(&Value::from("b"), &object.send("tag", &[])?))
            })
            .method("test_reinclude_promotes", |_| {
                let a = tagged("A", "a");
                let klass = Class::new(Some("Host"));
                klass.include(&a)?.include(&tagged("B", "b"))?.include(&a)?;
                let object = klass.new_instance(&[])?;
                nil(assert_equal(&Value::from("a"), &object.send("tag", &[])?))
            })
            .method("test_reopened_module", |_| {
                let module = Module::new(Some("Late"));
                let klass = Class::new(Some("Host"));
                klass.include(&module)?;
                let object = Value::from(klass.new_instance(&[])?);
                assert_true(!object.respond_to("late"), "method visible too early")?;
                module.define("late", |_| Ok(Value::from(true)));
                nil(assert_equal(&Value::from(true), &object.send("late", &[])?))
            })
            .method("test_super_through_mixin", |_| {
                let base = Class::new(Some("Base"));
                base.define("describe", |_| Ok(Value::from("base")));
                let mixin = Module::new(Some("Mixin"));
                mixin.define("describe", |call| {
                    Ok(Value::from(format!("mixin({})", call.call_super(&[])?)))
                });
                let child = Class::subclass(Some("Child"), &base)?;
                child.include(&mixin)?;
                let object = child.new_instance(&[])?;
                nil(assert_equal(
                    &Value::from("mixin(base)"),
                    &object.send("describe", &[])?,
                ))
            })
            .method("test_inclusion_cycle", |_| {
                let a = Module::new(Some("A"));
                let b = Module::new(Some("B"));
                a.include(&b)?;
                match b.include(&a) {
                    Err(Error::Resolution(_)) => Ok(Value::Nil),
                    other => nil(assert_true(
                        false,
                        &format!("expected a resolution error, got {:?}", other.map(|_| ())),
                    )),
                }
            }),
    )
}

// ── Hooks ────────────────────────────────────────────────────────────────

fn hook_test() -> Result<Class> {
    TestCase::create(
        "HookTest",
        MethodBody::new()
            .method("test_included", |_| {
                let seen = Rc::new(RefCell::new(Vec::new()));
                let mixin = Module::new(Some("Tracked"));
                let log = seen.clone();
                mixin.define_singleton("included", move |call| {
                    log.borrow_mut().push(call.arg(0));
                    Ok(Value::Nil)
                });
                let log = seen.clone();
                let host = Class::new(Some("Host"));
                host.include_with(
                    &mixin,
                    IncludeOptions::new().on_included(move |base| {
                        log.borrow_mut().push(Value::from(base.clone()));
                        Ok(())
                    }),
                )?;
                let host = Value::from(host);
                let result = nil(assert_equal(
                    &Value::list([host.clone(), host]),
                    &Value::list(seen.borrow().iter().cloned()),
                ));
                result
            })
            .method("test_extended", |_| {
                let helpers = Module::new(Some("Helpers"));
                helpers.define("help", |_| Ok(Value::from("helped")));
                let object = Class::new(Some("Widget")).new_instance(&[])?;
                object.extend(&helpers)?;
                nil(assert_equal(&Value::from("helped"), &object.send("help", &[])?))
            })
            .method("test_inherited", |_| {
                let seen = Rc::new(RefCell::new(Vec::new()));
                let base = Class::new(Some("Base"));
                let log = seen.clone();
                base.define_singleton("inherited", move |call| {
                    log.borrow_mut().push(call.arg(0));
                    Ok(Value::Nil)
                });
                let child = Class::subclass(Some("Child"), &base)?;
                let result = nil(assert_equal(
                    &Value::list([Value::from(child)]),
                    &Value::list(seen.borrow().iter().cloned()),
                ));
                result
            }),
    )
}
