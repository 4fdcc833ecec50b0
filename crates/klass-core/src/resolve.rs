//! Resolution engine
//!
//! Turns a receiver's module graph into a linear ancestor chain and finds
//! method implementations along it.
//!
//! ## Linearization
//!
//! The chain reads most specific first:
//!
//! 1. the module itself,
//! 2. its included modules, last included first, each expanded recursively,
//! 3. its parent link (a class's superclass, or what a singleton module is
//!    attached to), expanded the same way.
//!
//! A module reached more than once keeps only its lowest position. It is
//! built in reverse, least specific first, expanding every module once, so
//! a graph of shared mixins costs time linear in its edges. Because
//! `include` moves a re-included module to the end of the include list,
//! re-inclusion promotes it, while a module shared by several mixins still
//! sits below every module that includes it.
//!
//! ## Caching
//!
//! Every mutation of a method table or of the module graph advances a
//! process-wide generation. Each module caches its chain, and the position
//! of names already resolved through it, tagged with the generation they
//! were computed at. A stale tag throws the cache away.

use std::iter;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::method::{BoundMethod, Call, Method};
use crate::module::Module;
use crate::value::Value;

/// Global resolution generation
static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Current resolution generation
pub fn generation() -> u64 {
    GENERATION.load(Ordering::Relaxed)
}

/// Invalidate every cached chain and lookup
pub(crate) fn invalidate() {
    GENERATION.fetch_add(1, Ordering::Relaxed);
}

/// Per-module resolution cache.
///
/// Holds the chain without its owner so the cache never keeps the owning
/// module alive.
#[derive(Debug, Default)]
pub(crate) struct LookupCache {
    generation: u64,
    tail: Option<Rc<[Module]>>,
    hits: FxHashMap<String, Option<usize>>,
}

/// A linearized ancestor chain, most specific first.
#[derive(Clone)]
pub struct Lineage {
    head: Module,
    tail: Rc<[Module]>,
}

impl Lineage {
    /// The module the chain was computed for
    pub fn head(&self) -> &Module {
        &self.head
    }

    /// Module at `index` (0 is the head)
    pub fn get(&self, index: usize) -> Option<&Module> {
        match index {
            0 => Some(&self.head),
            n => self.tail.get(n - 1),
        }
    }

    /// Number of modules in the chain
    pub fn len(&self) -> usize {
        self.tail.len() + 1
    }

    /// A chain always contains its head
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate most specific first
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        iter::once(&self.head).chain(self.tail.iter())
    }

    /// Whether `module` appears anywhere in the chain
    pub fn contains(&self, module: &Module) -> bool {
        self.iter().any(|m| m == module)
    }

    /// Find the first implementation of `name` at or after `start`.
    pub fn find(&self, name: &str, start: usize) -> Option<(usize, Method)> {
        if start == 0 {
            if let Some(hit) = self.cached_hit(name) {
                return hit.and_then(|i| {
                    self.get(i)
                        .and_then(|m| m.lookup_own(name))
                        .map(|method| (i, method))
                });
            }
        }

        let found = self
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(i, m)| m.lookup_own(name).map(|method| (i, method)));

        if start == 0 {
            self.record_hit(name, found.as_ref().map(|(i, _)| *i));
        }
        found
    }

    fn cached_hit(&self, name: &str) -> Option<Option<usize>> {
        let cache = self.head.cache().borrow();
        if !self.is_current(&cache) {
            return None;
        }
        cache.hits.get(name).copied()
    }

    fn record_hit(&self, name: &str, index: Option<usize>) {
        let mut cache = self.head.cache().borrow_mut();
        if self.is_current(&cache) {
            cache.hits.insert(name.to_string(), index);
        }
    }

    fn is_current(&self, cache: &LookupCache) -> bool {
        cache.generation == generation()
            && cache
                .tail
                .as_ref()
                .map(|tail| Rc::ptr_eq(tail, &self.tail))
                .unwrap_or(false)
    }
}

/// Chain for `root`, served from its cache when still current.
pub(crate) fn lineage(root: &Module) -> Lineage {
    let current = generation();
    {
        let cache = root.cache().borrow();
        if cache.generation == current {
            if let Some(tail) = &cache.tail {
                return Lineage {
                    head: root.clone(),
                    tail: tail.clone(),
                };
            }
        }
    }

    let chain = linearize(root);
    trace!(
        "rebuilt chain for {} ({} modules, generation {})",
        root.display_name(),
        chain.len(),
        current
    );
    let tail: Rc<[Module]> = chain.into_iter().skip(1).collect();

    *root.cache().borrow_mut() = LookupCache {
        generation: current,
        tail: Some(tail.clone()),
        hits: FxHashMap::default(),
    };

    Lineage {
        head: root.clone(),
        tail,
    }
}

/// Compute the chain for `root` without touching any cache.
pub(crate) fn linearize(root: &Module) -> Vec<Module> {
    let mut seen = FxHashSet::default();
    let mut chain = Vec::new();
    collect(root, &mut seen, &mut chain);
    chain.reverse();
    chain
}

/// Least specific first: the parent link, then the includes in inclusion
/// order, then the module itself. Each module is expanded once.
fn collect(module: &Module, seen: &mut FxHashSet<u64>, chain: &mut Vec<Module>) {
    if !seen.insert(module.id()) {
        return;
    }
    if let Some(parent) = module.parent_link() {
        collect(&parent, seen, chain);
    }
    for included in module.included_modules().iter() {
        collect(included, seen, chain);
    }
    chain.push(module.clone());
}

/// Resolve `name` starting at `root` and invoke it with `receiver` as `this`.
pub(crate) fn dispatch(
    receiver: &Value,
    root: Option<Module>,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let Some(root) = root else {
        debug!("no method chain for {} (sending '{}')", receiver, name);
        return Err(Error::method_missing(receiver, name));
    };

    let chain = lineage(&root);
    match chain.find(name, 0) {
        Some((position, method)) => {
            let call = Call {
                receiver,
                name,
                args,
                lineage: &chain,
                position,
            };
            method.invoke(&call)
        }
        None => {
            debug!("method '{}' missing for {}", name, receiver);
            Err(Error::method_missing(receiver, name))
        }
    }
}

/// Whether resolution from `root` would find `name`
pub(crate) fn responds(root: Option<Module>, name: &str) -> bool {
    root.map(|root| lineage(&root).find(name, 0).is_some())
        .unwrap_or(false)
}

/// Resolve `name` now and package it with its receiver for a later call.
pub(crate) fn bind(receiver: Value, root: Option<Module>, name: &str) -> Result<BoundMethod> {
    let Some(root) = root else {
        return Err(Error::method_missing(&receiver, name));
    };
    let chain = lineage(&root);
    match chain.find(name, 0) {
        Some((position, method)) => Ok(BoundMethod::new(receiver, name, chain, position, method)),
        None => Err(Error::method_missing(&receiver, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;

    fn names(chain: &[Module]) -> Vec<String> {
        chain.iter().map(|m| m.display_name()).collect()
    }

    #[test]
    fn test_linearize_reverse_inclusion_order() {
        let a = Module::new(Some("A"));
        let b = Module::new(Some("B"));
        let c = Class::new(Some("C"));
        c.include(&a).unwrap();
        c.include(&b).unwrap();

        assert_eq!(names(&linearize(&c)), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_linearize_shared_base_sits_below_includers() {
        let base = Module::new(Some("Base"));
        let a = Module::new(Some("A"));
        let b = Module::new(Some("B"));
        a.include(&base).unwrap();
        b.include(&base).unwrap();
        let c = Class::new(Some("C"));
        c.include(&a).unwrap();
        c.include(&b).unwrap();

        assert_eq!(names(&linearize(&c)), vec!["C", "B", "A", "Base"]);
    }

    #[test]
    fn test_linearize_superclass_keeps_shared_module_low() {
        let m = Module::new(Some("M"));
        let base = Class::new(Some("Base"));
        base.include(&m).unwrap();
        let sub = Class::subclass(Some("Sub"), &base).unwrap();
        sub.include(&m).unwrap();

        assert_eq!(names(&linearize(&sub)), vec!["Sub", "Base", "M"]);
    }

    #[test]
    fn test_linearize_diamond_ladder() {
        // Every rung includes the two rungs below it.
        let rungs: Vec<Module> = (0..64)
            .map(|i| Module::new(Some(format!("M{}", i).as_str())))
            .collect();
        for i in 1..rungs.len() {
            rungs[i].include(&rungs[i - 1]).unwrap();
            if i >= 2 {
                rungs[i].include(&rungs[i - 2]).unwrap();
            }
        }
        let top = rungs.last().unwrap();
        top.define("answer", |_| Ok(Value::Int(42)));
        rungs[0].define("base", |_| Ok(Value::Int(0)));
        let c = Class::new(Some("C"));
        c.include(top).unwrap();

        let expected: Vec<String> = std::iter::once("C".to_string())
            .chain((0..64).rev().map(|i| format!("M{}", i)))
            .collect();
        assert_eq!(names(&linearize(&c)), expected);

        let obj = c.new_instance(&[]).unwrap();
        assert_eq!(obj.send("answer", &[]).unwrap(), Value::Int(42));
        assert_eq!(obj.send("base", &[]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_lineage_follows_graph_edits() {
        let a = Module::new(Some("A"));
        let b = Module::new(Some("B"));
        let c = Class::new(Some("C"));
        c.include(&a).unwrap();
        assert_eq!(lineage(&c).len(), 2);

        a.include(&b).unwrap();
        let chain = lineage(&c);
        assert_eq!(chain.len(), 3);
        assert!(chain.contains(&b));
        assert_eq!(chain.head(), &*c);
    }

    #[test]
    fn test_find_from_offset() {
        let a = Module::new(Some("A"));
        a.define("f", |_| Ok(Value::from("A")));
        let c = Class::new(Some("C"));
        c.define("f", |_| Ok(Value::from("C")));
        c.include(&a).unwrap();

        let chain = lineage(&c);
        assert_eq!(chain.find("f", 0).map(|(i, _)| i), Some(0));
        assert_eq!(chain.find("f", 1).map(|(i, _)| i), Some(1));
        assert!(chain.find("f", 2).is_none());
        assert!(chain.find("g", 0).is_none());
    }

    #[test]
    fn test_cached_miss_is_dropped_after_define() {
        let c = Class::new(Some("C"));
        let chain = lineage(&c);
        assert!(chain.find("late", 0).is_none());

        c.define("late", |_| Ok(Value::Bool(true)));
        let chain = lineage(&c);
        assert!(chain.find("late", 0).is_some());
    }
}
