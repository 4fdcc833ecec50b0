//! Classes: modules with a superclass and an instantiation protocol.

use std::fmt;
use std::ops::Deref;

use log::{debug, trace};

use crate::body::MethodBody;
use crate::error::{Error, Result};
use crate::module::{Module, ModuleKind};
use crate::object::Object;
use crate::value::Value;

/// A class handle.
///
/// Derefs to [`Module`], so defining methods, including mixins and
/// introspection work the same on classes as on modules.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Class(Module);

impl Class {
    /// Create a root class with no methods
    pub fn new(name: Option<&str>) -> Self {
        Class(Module::with_kind(name.map(str::to_string), ModuleKind::Class))
    }

    /// Create a class, optionally subclassing `superclass`, and apply `body`.
    ///
    /// `superclass` must itself be a class; modules are included, never
    /// subclassed. When the superclass responds to `inherited` it is told
    /// about the new class once the body has been applied.
    pub fn create(
        name: Option<&str>,
        superclass: Option<&Module>,
        body: MethodBody,
    ) -> Result<Self> {
        let superclass = superclass.map(Self::require_class).transpose()?;

        let class = Self::new(name);
        class.link_superclass(superclass.as_ref());
        body.apply(&class)?;

        if let Some(sup) = &superclass {
            sup.notify_inherited(&class)?;
        }
        Ok(class)
    }

    /// Create an empty subclass of `parent`
    pub fn subclass(name: Option<&str>, parent: &Class) -> Result<Self> {
        Self::create(name, Some(parent.as_module()), MethodBody::new())
    }

    /// The direct superclass
    pub fn superclass(&self) -> Option<Class> {
        self.0.parent_link().map(Class)
    }

    /// Replace the superclass.
    ///
    /// Fails when `superclass` is not a class or when this class would become
    /// its own ancestor.
    pub fn set_superclass(&self, superclass: Option<&Module>) -> Result<()> {
        let superclass = superclass.map(Self::require_class).transpose()?;

        if let Some(new_sup) = &superclass {
            let mut current = Some(new_sup.clone());
            while let Some(class) = current {
                if &class == self {
                    return Err(Error::Definition(format!(
                        "{} cannot be a superclass of itself",
                        self.display_name()
                    )));
                }
                current = class.superclass();
            }
        }

        self.link_superclass(superclass.as_ref());
        debug!(
            "{} now inherits from {}",
            self.display_name(),
            superclass
                .as_ref()
                .map(|s| s.display_name())
                .unwrap_or_else(|| "nothing".to_string())
        );

        if let Some(sup) = &superclass {
            sup.notify_inherited(self)?;
        }
        Ok(())
    }

    /// Live direct subclasses
    pub fn subclasses(&self) -> Vec<Class> {
        self.0
            .subclass_refs()
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|data| Class(Module(data)))
            .collect()
    }

    /// Allocate an instance and run `initialize` with `args` if resolvable.
    ///
    /// Without an initializer the object is returned with no fields set.
    /// Anything the initializer raises propagates unchanged.
    pub fn new_instance(&self, args: &[Value]) -> Result<Object> {
        let object = Object::allocate(self.clone());
        if object.respond_to("initialize") {
            object.send("initialize", args)?;
        } else {
            trace!("{} has no initializer", self.display_name());
        }
        Ok(object)
    }

    /// The underlying module handle
    pub fn as_module(&self) -> &Module {
        &self.0
    }

    /// Convert into the underlying module handle
    pub fn into_module(self) -> Module {
        self.0
    }

    fn require_class(module: &Module) -> Result<Class> {
        Class::try_from(module.clone())
    }

    fn link_superclass(&self, superclass: Option<&Class>) {
        if let Some(old) = self.superclass() {
            old.0.remove_subclass(&self.0);
        }

        self.0.set_parent_link(superclass.map(|s| s.0.clone()));
        if let Some(sup) = superclass {
            sup.0.add_subclass(&self.0);
        }

        // Class-level methods follow the superclass chain.
        if let Some(singleton) = self.0.existing_singleton() {
            singleton.set_parent_link(superclass.map(|s| s.0.singleton()));
        }
    }

    fn notify_inherited(&self, subclass: &Class) -> Result<()> {
        if self.respond_to("inherited") {
            self.send("inherited", &[Value::from(subclass.clone())])?;
        }
        Ok(())
    }
}

impl Deref for Class {
    type Target = Module;

    fn deref(&self) -> &Module {
        &self.0
    }
}

impl AsRef<Module> for Class {
    fn as_ref(&self) -> &Module {
        &self.0
    }
}

impl TryFrom<Module> for Class {
    type Error = Error;

    fn try_from(module: Module) -> Result<Self> {
        if module.is_class() {
            Ok(Class(module))
        } else {
            Err(Error::Definition(format!(
                "{} is not a class and cannot be subclassed",
                module.display_name()
            )))
        }
    }
}

impl From<Class> for Module {
    fn from(class: Class) -> Self {
        class.0
    }
}

impl PartialEq<Module> for Class {
    fn eq(&self, other: &Module) -> bool {
        &self.0 == other
    }
}

impl PartialEq<Class> for Module {
    fn eq(&self, other: &Class) -> bool {
        self == &other.0
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display_name())
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_module_cannot_be_subclassed() {
        let m = Module::new(Some("Comparable"));
        let err = Class::create(Some("Bad"), Some(&m), MethodBody::new()).unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
        assert!(Class::try_from(m).is_err());
    }

    #[test]
    fn test_superclass_cycle_rejected() {
        let a = Class::new(Some("A"));
        let b = Class::subclass(Some("B"), &a).unwrap();
        let c = Class::subclass(Some("C"), &b).unwrap();

        assert!(matches!(a.set_superclass(Some(a.as_module())), Err(Error::Definition(_))));
        assert!(matches!(a.set_superclass(Some(c.as_module())), Err(Error::Definition(_))));
        assert!(a.superclass().is_none());
    }

    #[test]
    fn test_reparent_changes_resolution() {
        let left = Class::new(Some("Left"));
        left.define("side", |_| Ok(Value::from("left")));
        let right = Class::new(Some("Right"));
        right.define("side", |_| Ok(Value::from("right")));

        let child = Class::subclass(Some("Child"), &left).unwrap();
        let obj = child.new_instance(&[]).unwrap();
        assert_eq!(obj.send("side", &[]).unwrap(), Value::from("left"));

        child.set_superclass(Some(right.as_module())).unwrap();
        assert_eq!(obj.send("side", &[]).unwrap(), Value::from("right"));
        assert!(left.subclasses().is_empty());
        assert_eq!(right.subclasses(), vec![child.clone()]);
    }

    #[test]
    fn test_subclasses_are_weak() {
        let base = Class::new(Some("Base"));
        {
            let _temp = Class::subclass(Some("Temp"), &base).unwrap();
            assert_eq!(base.subclasses().len(), 1);
        }
        assert!(base.subclasses().is_empty());
    }

    #[test]
    fn test_inherited_hook() {
        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let base = Class::new(Some("Base"));
        let log = seen.clone();
        base.define_singleton("inherited", move |call| {
            log.borrow_mut().push(call.module_arg(0)?.display_name());
            Ok(Value::Nil)
        });

        Class::subclass(Some("First"), &base).unwrap();
        let second = Class::subclass(Some("Second"), &base).unwrap();
        // a grandchild triggers the hook inherited at class level
        Class::subclass(Some("Third"), &second).unwrap();

        assert_eq!(*seen.borrow(), vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_class_methods_inherited() {
        let finder = Module::new(Some("Finder"));
        finder.define("find", |call| {
            Ok(Value::from(format!("found in {}", call.receiver())))
        });
        let base = Class::new(Some("Record"));
        base.extend(&finder).unwrap();
        let user = Class::subclass(Some("User"), &base).unwrap();

        assert_eq!(user.send("find", &[]).unwrap(), Value::from("found in User"));
        // instances do not see class-level methods
        let record = base.new_instance(&[]).unwrap();
        assert!(!record.respond_to("find"));
    }

    #[test]
    fn test_subclass_singleton_created_after_parent_extension() {
        let base = Class::new(Some("Base"));
        let child = Class::subclass(Some("Child"), &base).unwrap();
        child.define_singleton("own", |_| Ok(Value::from("own")));
        base.define_singleton("shared", |_| Ok(Value::from("shared")));

        assert_eq!(child.send("own", &[]).unwrap(), Value::from("own"));
        assert_eq!(child.send("shared", &[]).unwrap(), Value::from("shared"));
        assert!(!base.respond_to("own"));
    }

    #[test]
    fn test_including_a_class_is_rejected() {
        let host = Class::new(Some("Host"));
        let other = Class::new(Some("Other"));
        assert!(matches!(host.include(&other), Err(Error::Definition(_))));
    }
}
