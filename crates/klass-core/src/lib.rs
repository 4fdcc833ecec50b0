//! Klass Core
//!
//! A runtime metaobject protocol: classes and modules with mixin composition
//! and late-bound method resolution.
//!
//! - **Modules** (`module`): named or anonymous bundles of methods, mixed in
//!   by reference
//! - **Classes** (`class`): modules with a superclass and `new_instance`
//! - **Resolution** (`resolve`): ancestor linearization and lookup, with
//!   generation-checked caches so redefinition is always visible
//! - **Objects** (`object`): instances with fields and per-object extensions
//!
//! # Example
//!
//! ```rust,ignore
//! use klass_core::{Class, MethodBody, Value};
//!
//! let klass = Class::create(Some("Klass"), None, MethodBody::new()
//!     .method("initialize", |call| {
//!         let this = call.this()?;
//!         this.set("name", call.arg(0));
//!         Ok(Value::Nil)
//!     })
//!     .method("sayHello", |call| {
//!         Ok(Value::from(format!("Hello, {}", call.this()?.get("name"))))
//!     }))?;
//!
//! let object = klass.new_instance(&[Value::from("jcoglan")])?;
//! assert_eq!(object.send("sayHello", &[])?, Value::from("Hello, jcoglan"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod body;
mod class;
mod error;
mod method;
mod method_table;
mod module;
mod object;
pub mod resolve;
mod value;

pub use body::MethodBody;
pub use class::Class;
pub use error::{Error, Result};
pub use method::{BoundMethod, Call, Method, MethodFn};
pub use method_table::MethodTable;
pub use module::{IncludeOptions, IncludedHook, Module};
pub use object::Object;
pub use resolve::Lineage;
pub use value::Value;
