//! Method implementations and the call frame handed to them.

use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::module::Module;
use crate::object::Object;
use crate::resolve::Lineage;
use crate::value::Value;

/// Signature of a method body.
pub type MethodFn = dyn Fn(&Call<'_>) -> Result<Value>;

/// A callable method implementation.
///
/// Cloning shares the implementation; `ptr_eq` tells whether two table
/// entries hold the same body (aliases do).
#[derive(Clone)]
pub struct Method(Rc<MethodFn>);

impl Method {
    /// Wrap a closure as a method
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Call<'_>) -> Result<Value> + 'static,
    {
        Method(Rc::new(f))
    }

    /// Run the body against a call frame
    pub fn invoke(&self, call: &Call<'_>) -> Result<Value> {
        (self.0)(call)
    }

    /// Identity comparison of implementations
    pub fn ptr_eq(&self, other: &Method) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Everything a running method can see: its receiver, arguments and the
/// position in the receiver's ancestor chain it was resolved from.
pub struct Call<'a> {
    pub(crate) receiver: &'a Value,
    pub(crate) name: &'a str,
    pub(crate) args: &'a [Value],
    pub(crate) lineage: &'a Lineage,
    pub(crate) position: usize,
}

impl<'a> Call<'a> {
    /// The receiver (`this`)
    pub fn receiver(&self) -> &Value {
        self.receiver
    }

    /// The receiver as an object; fails for class-level calls
    pub fn this(&self) -> Result<&Object> {
        self.receiver.as_object().ok_or_else(|| {
            Error::Argument(format!(
                "'{}' expects an object receiver, got {}",
                self.name,
                self.receiver.type_name()
            ))
        })
    }

    /// Name the method was invoked under
    pub fn name(&self) -> &str {
        self.name
    }

    /// All arguments
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Argument at `index`, `nil` when absent
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// String argument at `index`
    pub fn str_arg(&self, index: usize) -> Result<&str> {
        match self.args.get(index) {
            Some(Value::Str(s)) => Ok(&**s),
            other => Err(self.arg_error(index, "string", other)),
        }
    }

    /// Integer argument at `index`
    pub fn int_arg(&self, index: usize) -> Result<i64> {
        match self.args.get(index) {
            Some(Value::Int(i)) => Ok(*i),
            other => Err(self.arg_error(index, "integer", other)),
        }
    }

    /// Module (or class) argument at `index`
    pub fn module_arg(&self, index: usize) -> Result<&Module> {
        match self.args.get(index) {
            Some(Value::Module(m)) => Ok(m),
            other => Err(self.arg_error(index, "module", other)),
        }
    }

    /// The module whose table supplied the running method
    pub fn owner(&self) -> &Module {
        self.lineage.get(self.position).unwrap_or_else(|| self.lineage.head())
    }

    /// Continue resolution of the same name past the current owner.
    pub fn call_super(&self, args: &[Value]) -> Result<Value> {
        match self.lineage.find(self.name, self.position + 1) {
            Some((position, method)) => {
                let call = Call {
                    receiver: self.receiver,
                    name: self.name,
                    args,
                    lineage: self.lineage,
                    position,
                };
                method.invoke(&call)
            }
            None => Err(Error::method_missing(
                format!("super from {}", self.owner().display_name()),
                self.name,
            )),
        }
    }

    /// `call_super` forwarding the current arguments
    pub fn call_super_with_args(&self) -> Result<Value> {
        self.call_super(self.args)
    }

    /// Whether a super implementation exists for this call
    pub fn has_super(&self) -> bool {
        self.lineage.find(self.name, self.position + 1).is_some()
    }

    /// Send another message to the receiver (fresh resolution)
    pub fn send(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.receiver.send(name, args)
    }

    fn arg_error(&self, index: usize, expected: &str, got: Option<&Value>) -> Error {
        Error::Argument(format!(
            "'{}' expects a {} at position {}, got {}",
            self.name,
            expected,
            index,
            got.map(Value::type_name).unwrap_or("nothing")
        ))
    }
}

/// A method resolved against a receiver, callable later.
///
/// The resolution is captured at creation time, like a bound method object.
#[derive(Clone)]
pub struct BoundMethod {
    receiver: Value,
    name: String,
    lineage: Lineage,
    position: usize,
    method: Method,
}

impl BoundMethod {
    pub(crate) fn new(
        receiver: Value,
        name: &str,
        lineage: Lineage,
        position: usize,
        method: Method,
    ) -> Self {
        Self {
            receiver,
            name: name.to_string(),
            lineage,
            position,
            method,
        }
    }

    /// Invoke with `args`
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let call = Call {
            receiver: &self.receiver,
            name: &self.name,
            args,
            lineage: &self.lineage,
            position: self.position,
        };
        self.method.invoke(&call)
    }

    /// The bound receiver
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module that supplied the implementation
    pub fn owner(&self) -> &Module {
        self.lineage.get(self.position).unwrap_or_else(|| self.lineage.head())
    }

    /// The underlying implementation
    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#<Method {}#{}>",
            self.owner().display_name(),
            self.name
        )
    }
}
