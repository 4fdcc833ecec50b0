//! Instances: objects bound to a class, plus per-object extensions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use crate::class::Class;
use crate::error::Result;
use crate::method::{BoundMethod, Call, Method};
use crate::module::{extend_receiver, Module, ModuleKind};
use crate::resolve;
use crate::value::Value;

/// Global counter for generating unique object and module IDs
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique ID
pub(crate) fn generate_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

struct ObjectData {
    id: u64,
    class: Class,
    fields: RefCell<FxHashMap<String, Value>>,
    singleton: RefCell<Option<Module>>,
}

/// An instance of a class.
///
/// Objects never copy methods: every `send` walks the class graph (and the
/// object's own singleton module, once it has one) at call time.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

impl Object {
    /// Create an object with no fields set
    pub(crate) fn allocate(class: Class) -> Self {
        Object(Rc::new(ObjectData {
            id: generate_object_id(),
            class,
            fields: RefCell::new(FxHashMap::default()),
            singleton: RefCell::new(None),
        }))
    }

    /// Unique object ID
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// The class this object was instantiated from
    pub fn class(&self) -> &Class {
        &self.0.class
    }

    // ── Fields ───────────────────────────────────────────────────────────

    /// Field value, `nil` when unset
    pub fn get(&self, name: &str) -> Value {
        self.0.fields.borrow().get(name).cloned().unwrap_or_default()
    }

    /// Set a field
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.0.fields.borrow_mut().insert(name.to_string(), value.into());
    }

    /// Check whether a field has been set
    pub fn has_field(&self, name: &str) -> bool {
        self.0.fields.borrow().contains_key(name)
    }

    /// Names of set fields, sorted
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.fields.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of set fields
    pub fn field_count(&self) -> usize {
        self.0.fields.borrow().len()
    }

    // ── Dispatch ─────────────────────────────────────────────────────────

    /// Send `name` with `args`, resolving through singleton extensions,
    /// the class, its mixins and its superclasses.
    pub fn send(&self, name: &str, args: &[Value]) -> Result<Value> {
        resolve::dispatch(&Value::Object(self.clone()), Some(self.root()), name, args)
    }

    /// Whether `send(name)` would find an implementation
    pub fn respond_to(&self, name: &str) -> bool {
        resolve::responds(Some(self.root()), name)
    }

    /// Resolve `name` now for a later call
    pub fn method(&self, name: &str) -> Result<BoundMethod> {
        resolve::bind(Value::Object(self.clone()), Some(self.root()), name)
    }

    /// Whether `module` is anywhere in this object's ancestor chain
    pub fn is_a(&self, module: &Module) -> bool {
        resolve::lineage(&self.root()).contains(module)
    }

    /// Full lookup chain, most specific first
    pub fn ancestors(&self) -> Vec<Module> {
        resolve::lineage(&self.root())
            .iter()
            .filter(|m| m.kind() != ModuleKind::Singleton)
            .cloned()
            .collect()
    }

    // ── Singleton behavior ───────────────────────────────────────────────

    /// Mix `module` into this object only
    pub fn extend(&self, module: &Module) -> Result<&Self> {
        extend_receiver(&self.singleton(), Value::Object(self.clone()), module)?;
        Ok(self)
    }

    /// Define a method on this object only
    pub fn define_singleton<F>(&self, name: &str, f: F) -> &Self
    where
        F: Fn(&Call<'_>) -> Result<Value> + 'static,
    {
        self.singleton().define_method(name, Method::new(f));
        self
    }

    /// Methods defined on or extended into this object only
    pub fn singleton_methods(&self) -> Vec<String> {
        match self.0.singleton.borrow().as_ref() {
            Some(singleton) => {
                let mut names = singleton.instance_methods(false);
                for module in singleton.included_modules().iter().rev() {
                    for name in module.instance_methods(true) {
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
                names
            }
            None => Vec::new(),
        }
    }

    /// Modules this object was extended with, in extension order
    pub fn extensions(&self) -> Vec<Module> {
        self.0
            .singleton
            .borrow()
            .as_ref()
            .map(Module::included_modules)
            .unwrap_or_default()
    }

    fn root(&self) -> Module {
        match self.0.singleton.borrow().as_ref() {
            Some(singleton) => singleton.clone(),
            None => self.0.class.as_module().clone(),
        }
    }

    fn singleton(&self) -> Module {
        if let Some(singleton) = self.0.singleton.borrow().as_ref() {
            return singleton.clone();
        }
        let singleton = Module::with_kind(
            Some(format!("#<Class:{}>", self)),
            ModuleKind::Singleton,
        );
        singleton.set_parent_link(Some(self.0.class.as_module().clone()));
        *self.0.singleton.borrow_mut() = Some(singleton.clone());
        singleton
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Object {}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}>", self.0.class.display_name())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}:{}>", self.0.class.display_name(), self.0.id)
    }
}
