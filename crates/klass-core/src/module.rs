//! Modules: named or anonymous bundles of methods that can be mixed into
//! classes, other modules, or single receivers.
//!
//! A `Module` is a shared handle. Cloning it clones the reference, and
//! equality is identity, so a module included in several places is one and
//! the same metaobject everywhere; later edits are seen by every includer.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use log::debug;
use rustc_hash::FxHashSet;

use crate::body::MethodBody;
use crate::error::{Error, Result};
use crate::method::{BoundMethod, Call, Method};
use crate::method_table::MethodTable;
use crate::object::generate_object_id;
use crate::resolve::{self, LookupCache};
use crate::value::Value;

/// What a module handle stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModuleKind {
    Module,
    Class,
    /// Per-receiver module holding singleton methods and extensions
    Singleton,
}

pub(crate) struct ModuleData {
    id: u64,
    name: Option<String>,
    kind: ModuleKind,
    methods: RefCell<MethodTable>,
    includes: RefCell<Vec<Module>>,
    /// Superclass for classes; the attached-to module for singletons
    parent: RefCell<Option<Module>>,
    singleton: RefCell<Option<Module>>,
    subclasses: RefCell<Vec<Weak<ModuleData>>>,
    cache: RefCell<LookupCache>,
}

/// Hook run once after a successful inclusion, with the includer.
pub type IncludedHook = Box<dyn FnOnce(&Module) -> Result<()>>;

/// Directives accepted by [`Module::include_with`].
///
/// Only recognized directives have fields; anything else simply cannot be
/// passed, so nothing is ever rejected for being unknown.
#[derive(Default)]
pub struct IncludeOptions {
    on_included: Option<IncludedHook>,
}

impl IncludeOptions {
    /// No directives
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` with the includer once the inclusion succeeded
    pub fn on_included<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Module) -> Result<()> + 'static,
    {
        self.on_included = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for IncludeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeOptions")
            .field("on_included", &self.on_included.is_some())
            .finish()
    }
}

/// A module handle.
#[derive(Clone)]
pub struct Module(pub(crate) Rc<ModuleData>);

impl Module {
    /// Create an empty module
    pub fn new(name: Option<&str>) -> Self {
        Self::with_kind(name.map(str::to_string), ModuleKind::Module)
    }

    /// Create a module and apply `body` to it
    pub fn create(name: Option<&str>, body: MethodBody) -> Result<Self> {
        let module = Self::new(name);
        body.apply(&module)?;
        Ok(module)
    }

    pub(crate) fn with_kind(name: Option<String>, kind: ModuleKind) -> Self {
        Module(Rc::new(ModuleData {
            id: generate_object_id(),
            name,
            kind,
            methods: RefCell::new(MethodTable::new()),
            includes: RefCell::new(Vec::new()),
            parent: RefCell::new(None),
            singleton: RefCell::new(None),
            subclasses: RefCell::new(Vec::new()),
            cache: RefCell::new(LookupCache::default()),
        }))
    }

    // ── Identity ─────────────────────────────────────────────────────────

    /// Unique id (shared sequence with objects)
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Name given at creation, if any
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Name, or a marker for anonymous modules and classes
    pub fn display_name(&self) -> String {
        match (&self.0.name, self.0.kind) {
            (Some(name), _) => name.clone(),
            (None, ModuleKind::Class) => "(anonymous class)".to_string(),
            (None, ModuleKind::Module) => "(anonymous module)".to_string(),
            (None, ModuleKind::Singleton) => "(singleton)".to_string(),
        }
    }

    /// Whether this handle is a class
    pub fn is_class(&self) -> bool {
        self.0.kind == ModuleKind::Class
    }

    pub(crate) fn kind(&self) -> ModuleKind {
        self.0.kind
    }

    // ── Method table ─────────────────────────────────────────────────────

    /// Define (or overwrite) an instance method
    pub fn define<F>(&self, name: &str, f: F) -> &Self
    where
        F: Fn(&Call<'_>) -> Result<Value> + 'static,
    {
        self.define_method(name, Method::new(f))
    }

    /// Define (or overwrite) an instance method from an existing implementation
    pub fn define_method(&self, name: &str, method: Method) -> &Self {
        self.0.methods.borrow_mut().define(name, method);
        self
    }

    /// Remove an instance method defined directly on this module
    pub fn remove_method(&self, name: &str) -> Option<Method> {
        self.0.methods.borrow_mut().remove(name)
    }

    /// Make `new_name` call whatever `old_name` resolves to right now
    pub fn alias_method(&self, new_name: &str, old_name: &str) -> Result<&Self> {
        let method = self
            .instance_method(old_name)
            .ok_or_else(|| Error::method_missing(self.display_name(), old_name))?;
        Ok(self.define_method(new_name, method))
    }

    /// Instance method `name` as resolved through this module's ancestors
    pub fn instance_method(&self, name: &str) -> Option<Method> {
        resolve::lineage(self).find(name, 0).map(|(_, method)| method)
    }

    /// Instance method names.
    ///
    /// With `inherited`, every name reachable through the ancestors, once,
    /// in resolution order; otherwise only this module's own definitions.
    pub fn instance_methods(&self, inherited: bool) -> Vec<String> {
        if !inherited {
            return self.0.methods.borrow().names().to_vec();
        }

        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for module in resolve::lineage(self).iter() {
            for name in module.0.methods.borrow().names() {
                if seen.insert(name.clone()) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    pub(crate) fn lookup_own(&self, name: &str) -> Option<Method> {
        self.0.methods.borrow().lookup(name)
    }

    // ── Composition ──────────────────────────────────────────────────────

    /// Mix `other` into this module
    pub fn include(&self, other: &Module) -> Result<&Self> {
        self.include_with(other, IncludeOptions::default())
    }

    /// Mix `other` into this module with directives.
    ///
    /// Re-including a module already in the list moves it to the end, which
    /// gives it priority over everything included before it. After the
    /// inclusion the `on_included` directive runs, then `other`'s own
    /// `included` singleton method if it has one.
    pub fn include_with(&self, other: &Module, options: IncludeOptions) -> Result<&Self> {
        self.attach(other)?;

        if let Some(hook) = options.on_included {
            hook(self)?;
        }
        if other.respond_to("included") {
            other.send("included", &[Value::Module(self.clone())])?;
        }
        Ok(self)
    }

    /// Add `other`'s methods to this module as a receiver (class-level
    /// methods for a class), leaving its instances untouched.
    ///
    /// A module cannot extend itself or anything that includes it: its
    /// singleton would then own a path back to the module.
    pub fn extend(&self, other: &Module) -> Result<&Self> {
        if other == self || other.includes_transitively(self) {
            return Err(Error::Resolution(format!(
                "extending {} with {} would make it extend itself",
                self.display_name(),
                other.display_name()
            )));
        }
        extend_receiver(&self.singleton(), Value::Module(self.clone()), other)?;
        Ok(self)
    }

    /// Define a method callable on this module itself
    pub fn define_singleton<F>(&self, name: &str, f: F) -> &Self
    where
        F: Fn(&Call<'_>) -> Result<Value> + 'static,
    {
        self.define_singleton_method(name, Method::new(f))
    }

    /// Define a module-level method from an existing implementation
    pub fn define_singleton_method(&self, name: &str, method: Method) -> &Self {
        self.singleton().define_method(name, method);
        self
    }

    /// Whether `other` is mixed in anywhere in this module's ancestors
    pub fn includes(&self, other: &Module) -> bool {
        other != self && !other.is_class() && resolve::lineage(self).contains(other)
    }

    /// Modules directly included here, in inclusion order
    pub fn included_modules(&self) -> Vec<Module> {
        self.0.includes.borrow().clone()
    }

    /// Linearized lookup chain for instances, most specific first
    pub fn ancestors(&self) -> Vec<Module> {
        resolve::lineage(self)
            .iter()
            .filter(|m| m.kind() != ModuleKind::Singleton)
            .cloned()
            .collect()
    }

    pub(crate) fn attach(&self, other: &Module) -> Result<()> {
        match other.kind() {
            ModuleKind::Class => {
                return Err(Error::Definition(format!(
                    "cannot include class {} into {}; classes can only be subclassed",
                    other.display_name(),
                    self.display_name()
                )))
            }
            ModuleKind::Singleton => {
                return Err(Error::Definition(format!(
                    "cannot include singleton module into {}",
                    self.display_name()
                )))
            }
            ModuleKind::Module => {}
        }

        if other == self || other.includes_transitively(self) {
            return Err(Error::Resolution(format!(
                "including {} into {} would make it include itself",
                other.display_name(),
                self.display_name()
            )));
        }

        {
            let mut includes = self.0.includes.borrow_mut();
            includes.retain(|m| m != other);
            includes.push(other.clone());
        }
        resolve::invalidate();
        debug!("included {} into {}", other.display_name(), self.display_name());
        Ok(())
    }

    fn includes_transitively(&self, target: &Module) -> bool {
        let mut seen = FxHashSet::default();
        let mut pending = vec![self.clone()];
        while let Some(module) = pending.pop() {
            for included in module.0.includes.borrow().iter() {
                if included == target {
                    return true;
                }
                if seen.insert(included.id()) {
                    pending.push(included.clone());
                }
            }
        }
        false
    }

    // ── Dispatch with the module as receiver ─────────────────────────────

    /// Send `name` to this module (its singleton methods and extensions)
    pub fn send(&self, name: &str, args: &[Value]) -> Result<Value> {
        resolve::dispatch(&Value::Module(self.clone()), self.receiver_root(), name, args)
    }

    /// Whether the module itself responds to `name`
    pub fn respond_to(&self, name: &str) -> bool {
        resolve::responds(self.receiver_root(), name)
    }

    /// Resolve a module-level method for a later call
    pub fn method(&self, name: &str) -> Result<BoundMethod> {
        resolve::bind(Value::Module(self.clone()), self.receiver_root(), name)
    }

    /// Module-level method names (own singleton methods and extensions)
    pub fn singleton_methods(&self) -> Vec<String> {
        match self.receiver_root() {
            Some(root) => root.instance_methods(true),
            None => Vec::new(),
        }
    }

    /// Where resolution starts when this module is the receiver.
    ///
    /// A class without its own singleton inherits its superclass's
    /// class-level methods.
    pub(crate) fn receiver_root(&self) -> Option<Module> {
        if let Some(singleton) = self.0.singleton.borrow().clone() {
            return Some(singleton);
        }
        match self.kind() {
            ModuleKind::Class => self.parent_link().and_then(|sup| sup.receiver_root()),
            _ => None,
        }
    }

    /// This module's singleton, created on first use.
    pub(crate) fn singleton(&self) -> Module {
        if let Some(singleton) = self.0.singleton.borrow().clone() {
            return singleton;
        }

        let singleton = Module::with_kind(
            Some(format!("#<Class:{}>", self.display_name())),
            ModuleKind::Singleton,
        );
        if self.is_class() {
            if let Some(sup) = self.parent_link() {
                singleton.set_parent_link(Some(sup.singleton()));
            }
        }
        *self.0.singleton.borrow_mut() = Some(singleton.clone());
        resolve::invalidate();
        singleton
    }

    pub(crate) fn existing_singleton(&self) -> Option<Module> {
        self.0.singleton.borrow().clone()
    }

    // ── Graph plumbing ───────────────────────────────────────────────────

    pub(crate) fn parent_link(&self) -> Option<Module> {
        self.0.parent.borrow().clone()
    }

    pub(crate) fn set_parent_link(&self, parent: Option<Module>) {
        *self.0.parent.borrow_mut() = parent;
        resolve::invalidate();
    }

    pub(crate) fn subclass_refs(&self) -> Ref<'_, Vec<Weak<ModuleData>>> {
        self.0.subclasses.borrow()
    }

    pub(crate) fn add_subclass(&self, sub: &Module) {
        let mut subs = self.0.subclasses.borrow_mut();
        subs.retain(|w| w.strong_count() > 0);
        subs.push(Rc::downgrade(&sub.0));
    }

    pub(crate) fn remove_subclass(&self, sub: &Module) {
        self.0
            .subclasses
            .borrow_mut()
            .retain(|w| w.upgrade().map(|m| !Rc::ptr_eq(&m, &sub.0)).unwrap_or(false));
    }

    pub(crate) fn cache(&self) -> &RefCell<LookupCache> {
        &self.0.cache
    }
}

/// Mix `other` into a receiver's singleton and run the `extended` hook.
pub(crate) fn extend_receiver(singleton: &Module, receiver: Value, other: &Module) -> Result<()> {
    singleton.attach(other)?;
    debug!("extended {} with {}", receiver, other.display_name());
    if other.respond_to("extended") {
        other.send("extended", &[receiver])?;
    }
    Ok(())
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Module {}

impl Hash for Module {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            ModuleKind::Module => "Module",
            ModuleKind::Class => "Class",
            ModuleKind::Singleton => "Singleton",
        };
        write!(f, "{}({})", kind, self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn returns(s: &'static str) -> impl Fn(&Call<'_>) -> Result<Value> {
        move |_| Ok(Value::from(s))
    }

    #[test]
    fn test_anonymous_and_named() {
        assert_eq!(Module::new(Some("Enumerable")).display_name(), "Enumerable");
        assert_eq!(Module::new(None).display_name(), "(anonymous module)");
        assert!(Module::new(None).name().is_none());
        assert!(!Module::new(None).is_class());
    }

    #[test]
    fn test_identity_not_name() {
        let a = Module::new(Some("Same"));
        let b = Module::new(Some("Same"));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_self_inclusion_is_resolution_error() {
        let m = Module::new(Some("M"));
        let err = m.include(&m).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[test]
    fn test_transitive_inclusion_cycle() {
        let a = Module::new(Some("A"));
        let b = Module::new(Some("B"));
        let c = Module::new(Some("C"));
        a.include(&b).unwrap();
        b.include(&c).unwrap();
        assert!(matches!(c.include(&a), Err(Error::Resolution(_))));
        assert!(c.included_modules().is_empty());
    }

    #[test]
    fn test_reinclusion_moves_to_end() {
        let a = Module::new(Some("A"));
        let b = Module::new(Some("B"));
        let m = Module::new(Some("M"));
        m.include(&a).unwrap().include(&b).unwrap().include(&a).unwrap();
        assert_eq!(m.included_modules(), vec![b, a]);
    }

    #[test]
    fn test_instance_methods_own_and_inherited() {
        let base = Module::new(Some("Base"));
        base.define("a", returns("a")).define("shared", returns("base"));
        let m = Module::new(Some("M"));
        m.define("b", returns("b")).define("shared", returns("m"));
        m.include(&base).unwrap();

        assert_eq!(m.instance_methods(false), vec!["b", "shared"]);
        assert_eq!(m.instance_methods(true), vec!["b", "shared", "a"]);
    }

    #[test]
    fn test_alias_method() {
        let m = Module::new(Some("M"));
        m.define("greet", returns("hi"));
        m.alias_method("hello", "greet").unwrap();
        let greet = m.instance_method("greet").unwrap();
        assert!(m.instance_method("hello").unwrap().ptr_eq(&greet));
        assert!(m.alias_method("x", "missing").unwrap_err().is_method_missing());
    }

    #[test]
    fn test_module_singleton_methods() {
        let m = Module::new(Some("Util"));
        assert!(!m.respond_to("helper"));
        m.define_singleton("helper", returns("ok"));
        assert_eq!(m.send("helper", &[]).unwrap(), Value::from("ok"));
        assert_eq!(m.singleton_methods(), vec!["helper"]);
        // instance methods are untouched
        assert!(m.instance_method("helper").is_none());
    }

    #[test]
    fn test_included_hook_and_option() {
        let seen = Rc::new(Cell::new(0));
        let m = Module::new(Some("Tracked"));
        let counter = seen.clone();
        m.define_singleton("included", move |call| {
            assert!(call.module_arg(0).is_ok());
            counter.set(counter.get() + 10);
            Ok(Value::Nil)
        });

        let base = Module::new(Some("Base"));
        let counter = seen.clone();
        base.include_with(
            &m,
            IncludeOptions::new().on_included(move |includer| {
                assert_eq!(includer.name(), Some("Base"));
                counter.set(counter.get() + 1);
                Ok(())
            }),
        )
        .unwrap();
        assert_eq!(seen.get(), 11);
    }

    #[test]
    fn test_extended_hook() {
        let target = Module::new(Some("Target"));
        let ext = Module::new(Some("Ext"));
        ext.define("shout", returns("HEY"));
        ext.define_singleton("extended", |call| {
            let receiver = call.module_arg(0)?;
            receiver.define_singleton("marked", |_| Ok(Value::Bool(true)));
            Ok(Value::Nil)
        });

        target.extend(&ext).unwrap();
        assert_eq!(target.send("shout", &[]).unwrap(), Value::from("HEY"));
        assert_eq!(target.send("marked", &[]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_extend_rejects_self_and_includers() {
        let m = Module::new(Some("M"));
        m.define("greet", returns("hi"));
        assert!(matches!(m.extend(&m), Err(Error::Resolution(_))));
        assert!(!m.respond_to("greet"));

        let outer = Module::new(Some("Outer"));
        outer.include(&m).unwrap();
        assert!(matches!(m.extend(&outer), Err(Error::Resolution(_))));
        assert!(m.singleton().included_modules().is_empty());

        let other = Module::new(Some("Other"));
        other.define("greet", returns("hello"));
        m.extend(&other).unwrap();
        assert_eq!(m.send("greet", &[]).unwrap(), Value::from("hello"));
    }

    #[test]
    fn test_includes_is_transitive() {
        let a = Module::new(Some("A"));
        let b = Module::new(Some("B"));
        let c = Module::new(Some("C"));
        a.include(&b).unwrap();
        b.include(&c).unwrap();
        assert!(a.includes(&c));
        assert!(!c.includes(&a));
        assert!(!a.includes(&a));
    }
}
