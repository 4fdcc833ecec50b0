//! Bootstrap scenarios: the small set of behaviors every other feature
//! builds on (anonymous classes, initializers, inheritance, reopening).

use klass_core::{Class, Error, MethodBody, Module, Value};

fn person_body() -> MethodBody {
    MethodBody::new()
        .method("initialize", |call| {
            let this = call.this()?;
            this.set("name", call.arg(0));
            this.set("age", call.arg(1));
            Ok(Value::Nil)
        })
        .method("sayHello", |call| {
            Ok(Value::from(format!("Hello, {}", call.this()?.get("name"))))
        })
}

#[test]
fn test_empty_class_instantiates_without_fields() {
    let klass = Class::create(None, None, MethodBody::new()).unwrap();
    let object = klass.new_instance(&[]).unwrap();

    assert_eq!(object.field_count(), 0);
    assert_eq!(object.class(), &klass);
    assert!(object.is_a(&klass));
}

#[test]
fn test_initializer_receives_constructor_arguments() {
    let klass = Class::create(None, None, person_body()).unwrap();
    let object = klass
        .new_instance(&[Value::from("jcoglan"), Value::from(26)])
        .unwrap();

    assert_eq!(object.get("name"), Value::from("jcoglan"));
    assert_eq!(object.get("age"), Value::Int(26));
}

#[test]
fn test_named_class_with_methods() {
    let klass = Class::create(Some("Klass"), None, person_body()).unwrap();
    let object = klass
        .new_instance(&[Value::from("jcoglan"), Value::from(26)])
        .unwrap();

    assert_eq!(klass.name(), Some("Klass"));
    assert_eq!(object.to_string(), "#<Klass>");
    assert_eq!(
        object.send("sayHello", &[]).unwrap(),
        Value::from("Hello, jcoglan")
    );
}

#[test]
fn test_subclass_inherits_and_adds() {
    let klass = Class::create(Some("Klass"), None, person_body()).unwrap();
    let sub = Class::create(
        None,
        Some(klass.as_module()),
        MethodBody::new().method("sayBye", |call| {
            Ok(Value::from(format!("Bye, {}", call.this()?.get("name"))))
        }),
    )
    .unwrap();

    let object = sub
        .new_instance(&[Value::from("jcoglan"), Value::from(26)])
        .unwrap();
    assert_eq!(sub.superclass(), Some(klass.clone()));
    assert_eq!(
        object.send("sayHello", &[]).unwrap(),
        Value::from("Hello, jcoglan")
    );
    assert_eq!(
        object.send("sayBye", &[]).unwrap(),
        Value::from("Bye, jcoglan")
    );
    assert!(!klass.new_instance(&[]).unwrap().respond_to("sayBye"));
}

#[test]
fn test_reopened_module_visible_to_existing_instances() {
    let greeting = Module::new(Some("Greeting"));
    let klass = Class::new(Some("Klass"));
    klass.include(&greeting).unwrap();

    let before = klass.new_instance(&[]).unwrap();
    assert!(!before.respond_to("greet"));

    greeting.define("greet", |_| Ok(Value::from("hi")));
    assert!(before.respond_to("greet"));
    assert_eq!(before.send("greet", &[]).unwrap(), Value::from("hi"));
}

#[test]
fn test_initializer_failure_propagates() {
    let klass = Class::create(
        Some("Strict"),
        None,
        MethodBody::new().method("initialize", |call| {
            call.int_arg(0)?;
            Ok(Value::Nil)
        }),
    )
    .unwrap();

    let err = klass.new_instance(&[Value::from("nope")]).unwrap_err();
    assert!(matches!(err, Error::Argument(_)));
    assert!(klass.new_instance(&[Value::from(1)]).is_ok());
}

#[test]
fn test_missing_method_is_distinct_from_failing_method() {
    let klass = Class::create(
        Some("Klass"),
        None,
        MethodBody::new().method("fail", |_| {
            Err(Error::raise(std::io::Error::new(
                std::io::ErrorKind::Other,
                "inner failure",
            )))
        }),
    )
    .unwrap();
    let object = klass.new_instance(&[]).unwrap();

    let missing = object.send("nothing", &[]).unwrap_err();
    assert!(missing.is_method_missing());
    assert_eq!(
        missing.to_string(),
        "NoMethodError: undefined method 'nothing' for #<Klass>"
    );

    let failed = object.send("fail", &[]).unwrap_err();
    assert!(!failed.is_method_missing());
    assert_eq!(failed.to_string(), "inner failure");
    assert!(failed.downcast_ref::<std::io::Error>().is_some());
}
