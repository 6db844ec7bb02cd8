//! Values on either side of the bridge.
//!
//! [`ScriptValue`] is what the script engine hands out: primitives inline and
//! objects as [`ObjectRef`] handles into the engine's heap. [`HostValue`] is
//! the host runtime's view: primitives, native objects and opaque host data.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::NativeObject;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one script engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(u64);

impl EngineId {
    /// Allocate a fresh, process-unique engine id.
    pub fn next() -> Self {
        EngineId(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying u64 value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an object living in a script engine's heap.
///
/// The generation detects handles that outlived their object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    engine: EngineId,
    index: u32,
    generation: u32,
}

impl ObjectRef {
    /// Create an object handle.
    pub const fn new(engine: EngineId, index: u32, generation: u32) -> Self {
        Self {
            engine,
            index,
            generation,
        }
    }

    /// The engine owning the object.
    pub const fn engine(self) -> EngineId {
        self.engine
    }

    /// Heap slot index.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Heap slot generation.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Identity of a script symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Kind of a script object, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Ordinary object, including instances of bound classes.
    Plain,
    /// Callable object.
    Function,
    /// Indexed array object.
    Array,
}

/// A value produced or consumed by the script engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A number. Scripts have a single floating-point number type.
    Number(f64),
    /// A string.
    String(String),
    /// A symbol. Has no host representation.
    Symbol(SymbolId),
    /// An object (plain, function or array).
    Object(ObjectRef),
    /// Any engine value kind the bridge does not know about.
    Other(&'static str),
}

impl ScriptValue {
    /// Script-side name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Symbol(_) => "symbol",
            ScriptValue::Object(_) => "object",
            ScriptValue::Other(kind) => kind,
        }
    }

    /// Check if this is `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, ScriptValue::Undefined)
    }

    /// Check if this is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, ScriptValue::Null)
    }

    /// The object handle, if this is an object.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            ScriptValue::Object(object) => Some(*object),
            _ => None,
        }
    }

    /// The number, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<ObjectRef> for ScriptValue {
    fn from(object: ObjectRef) -> Self {
        ScriptValue::Object(object)
    }
}

/// A value in the host runtime.
#[derive(Clone)]
pub enum HostValue {
    /// Host null.
    Null,
    /// The host's distinguished "undefined" singleton.
    Undefined,
    /// A boxed boolean.
    Boolean(bool),
    /// A boxed integer.
    Integer(i64),
    /// A boxed floating-point number.
    Number(f64),
    /// A character.
    Char(char),
    /// A host string.
    String(String),
    /// A native object.
    Native(Arc<dyn NativeObject>),
    /// A non-owning handle to a native object.
    ///
    /// Once the target is gone the handle is non-null but logically null.
    WeakNative(Weak<dyn NativeObject>),
    /// Host data with no script representation.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl HostValue {
    /// Wrap a native object.
    pub fn native<T: NativeObject>(object: Arc<T>) -> Self {
        HostValue::Native(object)
    }

    /// Check for either null form: `Null` or a cleared weak handle.
    pub fn is_null(&self) -> bool {
        match self {
            HostValue::Null => true,
            HostValue::WeakNative(weak) => weak.strong_count() == 0,
            _ => false,
        }
    }

    /// Check if this is the undefined singleton.
    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    /// The native object, if this is a native or a live weak handle.
    pub fn as_native(&self) -> Option<Arc<dyn NativeObject>> {
        match self {
            HostValue::Native(native) => Some(Arc::clone(native)),
            HostValue::WeakNative(weak) => weak.upgrade(),
            _ => None,
        }
    }

    /// Host-side name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Undefined => "undefined",
            HostValue::Boolean(_) => "boolean",
            HostValue::Integer(_) => "integer",
            HostValue::Number(_) => "number",
            HostValue::Char(_) => "char",
            HostValue::String(_) => "string",
            HostValue::Native(_) | HostValue::WeakNative(_) => "native",
            HostValue::Opaque(_) => "opaque",
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("Null"),
            HostValue::Undefined => f.write_str("Undefined"),
            HostValue::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            HostValue::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            HostValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            HostValue::Char(c) => f.debug_tuple("Char").field(c).finish(),
            HostValue::String(s) => f.debug_tuple("String").field(s).finish(),
            HostValue::Native(native) => f
                .debug_tuple("Native")
                .field(&native.linkage().class())
                .finish(),
            HostValue::WeakNative(weak) => f
                .debug_tuple("WeakNative")
                .field(&weak.upgrade().and_then(|n| n.linkage().class()))
                .finish(),
            HostValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Undefined, HostValue::Undefined) => true,
            (HostValue::Boolean(a), HostValue::Boolean(b)) => a == b,
            (HostValue::Integer(a), HostValue::Integer(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::Char(a), HostValue::Char(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Native(a), HostValue::Native(b)) => Arc::ptr_eq(a, b),
            (HostValue::WeakNative(a), HostValue::WeakNative(b)) => Weak::ptr_eq(a, b),
            (HostValue::Opaque(a), HostValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Boolean(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Integer(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<char> for HostValue {
    fn from(value: char) -> Self {
        HostValue::Char(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}
