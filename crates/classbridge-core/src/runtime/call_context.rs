//! Call context bridging the script engine and native Rust functions.

use std::sync::Arc;

use crate::convert::{FromScript, IntoScript};
use crate::engine::EngineScope;
use crate::error::NativeError;
use crate::native::{NativeClass, NativeObject, downcast_native};
use crate::{ObjectRef, ScriptValue};

static UNDEFINED: ScriptValue = ScriptValue::Undefined;

/// Context for native function calls.
///
/// Gives a native callable its receiver, its arguments and the engine scope
/// it runs in, and collects the return value.
///
/// ## Typed Argument Access
///
/// ```ignore
/// let x: i32 = ctx.arg(0)?;
/// let label: String = ctx.arg(1)?;
/// ```
///
/// ## Receiver Access
///
/// ```ignore
/// let widget = ctx.this_as::<Widget>()?;
/// ctx.set_return(widget.width());
/// ```
pub struct CallContext<'a> {
    scope: &'a mut dyn EngineScope,
    this: Option<ObjectRef>,
    args: &'a [ScriptValue],
    ret: ScriptValue,
}

impl<'a> CallContext<'a> {
    /// Create a new call context. The return value starts as `undefined`.
    pub fn new(
        scope: &'a mut dyn EngineScope,
        this: Option<ObjectRef>,
        args: &'a [ScriptValue],
    ) -> Self {
        Self {
            scope,
            this,
            args,
            ret: ScriptValue::Undefined,
        }
    }

    /// The engine scope the call runs in.
    pub fn scope(&mut self) -> &mut (dyn EngineScope + 'a) {
        &mut *self.scope
    }

    /// Get the number of arguments.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// All arguments.
    pub fn args(&self) -> &[ScriptValue] {
        self.args
    }

    /// Get a raw argument. Missing arguments read as `undefined`.
    pub fn arg_value(&self, index: usize) -> &ScriptValue {
        self.args.get(index).unwrap_or(&UNDEFINED)
    }

    /// Get a typed argument value.
    pub fn arg<T: FromScript>(&self, index: usize) -> Result<T, NativeError> {
        T::from_script(self.arg_value(index))
            .map_err(|source| NativeError::Argument { index, source })
    }

    /// The receiver object, for method calls.
    pub fn this(&self) -> Option<ObjectRef> {
        self.this
    }

    /// The native object paired with the receiver.
    pub fn this_native(&self) -> Result<Arc<dyn NativeObject>, NativeError> {
        let this = self
            .this
            .ok_or_else(|| NativeError::invalid_this("no receiver"))?;
        self.scope
            .linkage(this)
            .and_then(|slot| slot.native())
            .ok_or_else(|| NativeError::invalid_this("receiver is not paired with a native object"))
    }

    /// The receiver's native object as class `T`.
    ///
    /// A subclass receiver is viewed through its embedded base object, so
    /// members inherited through the prototype chain work on it.
    pub fn this_as<T: NativeClass>(&self) -> Result<Arc<T>, NativeError> {
        downcast_native::<T>(self.this_native()?).ok_or_else(|| {
            NativeError::invalid_this(format!("receiver is not a {}", T::CANONICAL_NAME))
        })
    }

    /// Set a typed return value.
    pub fn set_return<T: IntoScript>(&mut self, value: T) {
        self.ret = value.into_script();
    }

    /// The current return value.
    pub fn return_value(&self) -> &ScriptValue {
        &self.ret
    }

    /// Consume the context, yielding the return value.
    pub fn into_return(self) -> ScriptValue {
        self.ret
    }
}
