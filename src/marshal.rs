//! Value conversion between the host and script engines.
//!
//! ## Script to host
//!
//! | Script value | Host value |
//! |---|---|
//! | undefined | the host's `undefined` singleton |
//! | null | [`HostValue::Null`] |
//! | boolean, number, string | the same primitive |
//! | object paired with a native | that native |
//! | unpaired function | a [`ScriptFunction`] paired with it |
//! | unpaired array | a [`ScriptArray`] paired with it |
//! | other unpaired object | a [`GenericObject`] paired with it |
//! | symbol, anything else | error |
//!
//! ## Host to script
//!
//! Tested in order: null (including a cleared weak native), string, char
//! (as a one-character string), integer and number, boolean, native object.
//! Anything else becomes `undefined`.

use std::sync::Arc;

use classbridge_core::{
    BindingError, EngineScope, HostValue, MarshalError, NativeObject, ObjectKind, ObjectRef,
    Ownership, ProvisionalObject, ScriptValue, fatal,
};
use classbridge_registry::ClassBindingRegistry;

use crate::pairing::ObjectPairing;
use crate::wrappers::{GenericObject, ScriptArray, ScriptFunction};

/// Converts values over one registry.
#[derive(Clone)]
pub struct ValueMarshaller<'r> {
    registry: &'r ClassBindingRegistry,
}

impl<'r> ValueMarshaller<'r> {
    /// Marshaller for classes of `registry`.
    pub fn new(registry: &'r ClassBindingRegistry) -> Self {
        Self { registry }
    }

    /// Convert a script value to a host value.
    ///
    /// Aborts on values with no host representation.
    pub fn to_host(&self, scope: &mut dyn EngineScope, value: &ScriptValue) -> HostValue {
        self.try_to_host(scope, value)
            .unwrap_or_else(|err| fatal(err))
    }

    /// Fallible form of [`ValueMarshaller::to_host`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn try_to_host(
        &self,
        scope: &mut dyn EngineScope,
        value: &ScriptValue,
    ) -> Result<HostValue, MarshalError> {
        match value {
            ScriptValue::Undefined => Ok(self.registry.host().undefined()),
            ScriptValue::Null => Ok(HostValue::Null),
            ScriptValue::Boolean(b) => Ok(HostValue::Boolean(*b)),
            ScriptValue::Number(n) => Ok(HostValue::Number(*n)),
            ScriptValue::String(s) => Ok(HostValue::String(s.clone())),
            ScriptValue::Object(object) => self.object_to_host(scope, *object),
            ScriptValue::Symbol(_) => Err(MarshalError::UnsupportedSymbol),
            ScriptValue::Other(kind) => Err(MarshalError::UnexpectedKind(*kind)),
        }
    }

    fn object_to_host(
        &self,
        scope: &mut dyn EngineScope,
        object: ObjectRef,
    ) -> Result<HostValue, MarshalError> {
        let kind = scope.object_kind(object).ok_or(MarshalError::StaleObject)?;
        if let Some(native) = scope.linkage(object).and_then(|slot| slot.native()) {
            return Ok(HostValue::Native(native));
        }

        let wrapper: Arc<dyn NativeObject> = match kind {
            ObjectKind::Function => Arc::new(ScriptFunction::new()),
            ObjectKind::Array => Arc::new(ScriptArray::new()),
            ObjectKind::Plain => Arc::new(GenericObject::new()),
        };
        let provisional = ProvisionalObject::hold(scope, object, Ownership::Native);
        ObjectPairing::new(self.registry).pair_in_scope(scope, &wrapper, Some(provisional))?;
        Ok(HostValue::Native(wrapper))
    }

    /// Convert a host value to a script value.
    ///
    /// Aborts if a native object cannot be represented on this engine.
    pub fn to_script(&self, scope: &mut dyn EngineScope, value: &HostValue) -> ScriptValue {
        self.try_to_script(scope, value)
            .unwrap_or_else(|err| fatal(err))
    }

    /// Fallible form of [`ValueMarshaller::to_script`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn try_to_script(
        &self,
        scope: &mut dyn EngineScope,
        value: &HostValue,
    ) -> Result<ScriptValue, BindingError> {
        if value.is_null() {
            return Ok(ScriptValue::Null);
        }
        Ok(match value {
            HostValue::String(s) => ScriptValue::String(s.clone()),
            HostValue::Char(c) => ScriptValue::String(c.to_string()),
            HostValue::Integer(i) => ScriptValue::Number(*i as f64),
            HostValue::Number(n) => ScriptValue::Number(*n),
            HostValue::Boolean(b) => ScriptValue::Boolean(*b),
            HostValue::Native(native) => self.native_to_script(scope, native)?,
            HostValue::WeakNative(weak) => match weak.upgrade() {
                Some(native) => self.native_to_script(scope, &native)?,
                None => ScriptValue::Null,
            },
            HostValue::Null | HostValue::Undefined | HostValue::Opaque(_) => {
                ScriptValue::Undefined
            }
        })
    }

    /// The script object of a native, pairing it on this engine if it was
    /// never paired.
    fn native_to_script(
        &self,
        scope: &mut dyn EngineScope,
        native: &Arc<dyn NativeObject>,
    ) -> Result<ScriptValue, BindingError> {
        let engine = scope.engine_id();
        match native.linkage().record() {
            Some(record) if record.engine == engine => {
                if scope.is_alive(record.object) {
                    Ok(ScriptValue::Object(record.object))
                } else {
                    Err(BindingError::StalePairing(self.class_name(native.as_ref())))
                }
            }
            Some(record) => Err(BindingError::ForeignEngine {
                paired: record.engine,
                requested: engine,
            }),
            None => ObjectPairing::new(self.registry)
                .pair_in_scope(scope, native, None)
                .map(ScriptValue::Object),
        }
    }

    fn class_name(&self, native: &dyn NativeObject) -> String {
        let Some(class) = native.linkage().class() else {
            return String::from("<unlinked>");
        };
        self.registry
            .get_hash(class)
            .map(|descriptor| descriptor.canonical_name().to_owned())
            .unwrap_or_else(|| class.to_string())
    }
}
