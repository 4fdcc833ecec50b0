//! Declarative method bodies for `Module::create` and `Class::create`.

use crate::error::Result;
use crate::method::{Call, Method};
use crate::module::Module;
use crate::value::Value;

/// A set of definitions applied to a module in one go.
///
/// Mixins listed with `include` and `extend` are applied before any method,
/// then instance methods, then module-level (singleton) methods, each group
/// in the order it was written.
#[derive(Clone, Default)]
pub struct MethodBody {
    includes: Vec<Module>,
    extends: Vec<Module>,
    methods: Vec<(String, Method)>,
    singleton_methods: Vec<(String, Method)>,
}

impl MethodBody {
    /// Empty body
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance method
    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Call<'_>) -> Result<Value> + 'static,
    {
        self.methods.push((name.to_string(), Method::new(f)));
        self
    }

    /// Add a method callable on the module itself
    pub fn singleton_method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Call<'_>) -> Result<Value> + 'static,
    {
        self.singleton_methods.push((name.to_string(), Method::new(f)));
        self
    }

    /// Mix `module` into the target
    pub fn include(mut self, module: &Module) -> Self {
        self.includes.push(module.clone());
        self
    }

    /// Extend the target itself with `module`
    pub fn extend(mut self, module: &Module) -> Self {
        self.extends.push(module.clone());
        self
    }

    /// Number of instance methods in the body
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the body defines nothing at all
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
            && self.singleton_methods.is_empty()
            && self.includes.is_empty()
            && self.extends.is_empty()
    }

    pub(crate) fn apply(self, target: &Module) -> Result<()> {
        for module in &self.includes {
            target.include(module)?;
        }
        for module in &self.extends {
            target.extend(module)?;
        }
        for (name, method) in self.methods {
            target.define_method(&name, method);
        }
        for (name, method) in self.singleton_methods {
            target.define_singleton_method(&name, method);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;

    #[test]
    fn test_body_applies_everything() {
        let greet = Module::new(Some("Greet"));
        greet.define("hello", |_| Ok(Value::from("hello")));
        let meta = Module::new(Some("Meta"));
        meta.define("kind", |_| Ok(Value::from("meta")));

        let body = MethodBody::new()
            .include(&greet)
            .extend(&meta)
            .method("own", |_| Ok(Value::from("own")))
            .singleton_method("build", |_| Ok(Value::from("built")));
        assert_eq!(body.len(), 1);
        assert!(!body.is_empty());

        let klass = Class::create(Some("Thing"), None, body).unwrap();
        let obj = klass.new_instance(&[]).unwrap();
        assert_eq!(obj.send("hello", &[]).unwrap(), Value::from("hello"));
        assert_eq!(obj.send("own", &[]).unwrap(), Value::from("own"));
        assert_eq!(klass.send("kind", &[]).unwrap(), Value::from("meta"));
        assert_eq!(klass.send("build", &[]).unwrap(), Value::from("built"));
    }

    #[test]
    fn test_body_failure_propagates() {
        let m = Module::new(Some("Loop"));
        let body = MethodBody::new().include(&m);
        // a module cannot be created including a class
        let host = Class::new(Some("Host"));
        let err = Module::create(Some("Bad"), MethodBody::new().include(&host));
        assert!(err.is_err());
        assert!(Module::create(Some("Fine"), body).is_ok());
    }
}
