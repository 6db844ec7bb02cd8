//! Built-in wrapper classes.
//!
//! Script values with no native counterpart cross into the host as one of
//! these views. Each is paired with its script object and keeps it alive
//! while the host holds the view.
//!
//! Every operation has an `*_in` form taking the engine scope, for use while
//! the engine lock is already held (inside native callables). The plain
//! form acquires the lock of the engine the view is paired with.

use classbridge_core::{
    BindingError, BridgeError, Classification, EngineScope, Linkage, MarshalError, NativeClass,
    ObjectRef, ScriptValue, fatal,
};
use classbridge_macros::NativeClass;
use classbridge_registry::{BindingBuilder, ClassBindingRegistry, ClassRegistration};

/// Register the root class and the wrapper classes.
pub(crate) fn register_builtins(registry: &ClassBindingRegistry) {
    let root = registry.config().root_class.clone();
    let native_only = |builder: &mut BindingBuilder| {
        builder.create_from_native_only(true);
    };
    let registrations = [
        ClassRegistration::abstract_class(root.as_str()),
        ClassRegistration::of::<ScriptFunction>(Classification::Wrapper)
            .with_base(root.as_str())
            .with_initializer(native_only),
        ClassRegistration::of::<ScriptArray>(Classification::Wrapper)
            .with_base(root.as_str())
            .with_initializer(native_only),
        ClassRegistration::of::<GenericObject>(Classification::Wrapper)
            .with_base(root.as_str())
            .with_initializer(native_only),
    ];
    for registration in registrations {
        if let Err(err) = registry.register(registration) {
            fatal(err);
        }
    }
}

/// The script object a view is paired with on the scope's engine.
fn paired_object(
    linkage: &Linkage,
    scope: &dyn EngineScope,
    class: &str,
) -> Result<ObjectRef, BindingError> {
    let record = linkage
        .record()
        .ok_or_else(|| BindingError::StalePairing(class.to_owned()))?;
    if record.engine != scope.engine_id() {
        return Err(BindingError::ForeignEngine {
            paired: record.engine,
            requested: scope.engine_id(),
        });
    }
    Ok(record.object)
}

/// Run `f` inside the engine a view is paired with.
fn with_engine<R>(
    linkage: &Linkage,
    class: &str,
    f: impl FnOnce(&mut dyn EngineScope) -> Result<R, BridgeError>,
) -> Result<R, BridgeError> {
    let engine = linkage
        .record()
        .and_then(|record| record.engine_handle.upgrade())
        .ok_or_else(|| BindingError::StalePairing(class.to_owned()))?;
    let mut scope = engine.enter();
    f(&mut *scope)
}

// ============================================================================
// ScriptFunction
// ============================================================================

/// Host view of a script function.
#[derive(NativeClass)]
#[bridge(name = "classbridge.ScriptFunction")]
pub struct ScriptFunction {
    linkage: Linkage,
}

impl ScriptFunction {
    pub(crate) fn new() -> Self {
        Self {
            linkage: Linkage::of::<Self>(),
        }
    }

    /// The paired function object.
    pub fn object(&self) -> Option<ObjectRef> {
        self.linkage.record().map(|record| record.object)
    }

    /// Call the function.
    pub fn call(
        &self,
        this: Option<ObjectRef>,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, BridgeError> {
        with_engine(&self.linkage, Self::CANONICAL_NAME, |scope| {
            self.call_in(scope, this, args)
        })
    }

    /// Call the function inside a held scope.
    pub fn call_in(
        &self,
        scope: &mut dyn EngineScope,
        this: Option<ObjectRef>,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, BridgeError> {
        let function = paired_object(&self.linkage, scope, Self::CANONICAL_NAME)?;
        Ok(scope.call_function(function, this, args)?)
    }
}

// ============================================================================
// ScriptArray
// ============================================================================

/// Host view of a script array.
#[derive(NativeClass)]
#[bridge(name = "classbridge.ScriptArray")]
pub struct ScriptArray {
    linkage: Linkage,
}

impl ScriptArray {
    pub(crate) fn new() -> Self {
        Self {
            linkage: Linkage::of::<Self>(),
        }
    }

    /// The paired array object.
    pub fn object(&self) -> Option<ObjectRef> {
        self.linkage.record().map(|record| record.object)
    }

    /// Number of elements.
    pub fn len(&self) -> Result<usize, BridgeError> {
        with_engine(&self.linkage, Self::CANONICAL_NAME, |scope| self.len_in(scope))
    }

    /// Check if the array has no elements.
    pub fn is_empty(&self) -> Result<bool, BridgeError> {
        self.len().map(|len| len == 0)
    }

    /// Element at `index`, `undefined` when out of range.
    pub fn get(&self, index: usize) -> Result<ScriptValue, BridgeError> {
        with_engine(&self.linkage, Self::CANONICAL_NAME, |scope| self.get_in(scope, index))
    }

    /// Elements in `start..end`, clamped to the array.
    pub fn range(&self, start: usize, end: usize) -> Result<Vec<ScriptValue>, BridgeError> {
        with_engine(&self.linkage, Self::CANONICAL_NAME, |scope| {
            self.range_in(scope, start, end)
        })
    }

    /// Write the element at `index`, growing the array as needed.
    pub fn set(&self, index: usize, value: ScriptValue) -> Result<(), BridgeError> {
        with_engine(&self.linkage, Self::CANONICAL_NAME, |scope| {
            self.set_in(scope, index, value)
        })
    }

    /// [`ScriptArray::len`] inside a held scope.
    pub fn len_in(&self, scope: &mut dyn EngineScope) -> Result<usize, BridgeError> {
        let array = paired_object(&self.linkage, scope, Self::CANONICAL_NAME)?;
        Ok(scope
            .array_length(array)
            .ok_or(MarshalError::StaleObject)?)
    }

    /// [`ScriptArray::get`] inside a held scope.
    pub fn get_in(
        &self,
        scope: &mut dyn EngineScope,
        index: usize,
    ) -> Result<ScriptValue, BridgeError> {
        let array = paired_object(&self.linkage, scope, Self::CANONICAL_NAME)?;
        if scope.array_length(array).is_none() {
            return Err(MarshalError::StaleObject.into());
        }
        Ok(scope
            .array_get(array, index)
            .unwrap_or(ScriptValue::Undefined))
    }

    /// [`ScriptArray::range`] inside a held scope.
    pub fn range_in(
        &self,
        scope: &mut dyn EngineScope,
        start: usize,
        end: usize,
    ) -> Result<Vec<ScriptValue>, BridgeError> {
        let array = paired_object(&self.linkage, scope, Self::CANONICAL_NAME)?;
        let len = scope
            .array_length(array)
            .ok_or(MarshalError::StaleObject)?;
        let end = end.min(len);
        let start = start.min(end);
        Ok((start..end)
            .filter_map(|index| scope.array_get(array, index))
            .collect())
    }

    /// [`ScriptArray::set`] inside a held scope.
    pub fn set_in(
        &self,
        scope: &mut dyn EngineScope,
        index: usize,
        value: ScriptValue,
    ) -> Result<(), BridgeError> {
        let array = paired_object(&self.linkage, scope, Self::CANONICAL_NAME)?;
        if scope.array_set(array, index, value) {
            Ok(())
        } else {
            Err(MarshalError::StaleObject.into())
        }
    }
}

// ============================================================================
// GenericObject
// ============================================================================

/// Host view of a plain script object.
#[derive(NativeClass)]
#[bridge(name = "classbridge.GenericObject")]
pub struct GenericObject {
    #[bridge(linkage)]
    link: Linkage,
}

impl GenericObject {
    pub(crate) fn new() -> Self {
        Self {
            link: Linkage::of::<Self>(),
        }
    }

    /// The paired object.
    pub fn object(&self) -> Option<ObjectRef> {
        self.link.record().map(|record| record.object)
    }

    /// Read a property.
    pub fn get(&self, name: &str) -> Result<ScriptValue, BridgeError> {
        with_engine(&self.link, Self::CANONICAL_NAME, |scope| self.get_in(scope, name))
    }

    /// Write a property.
    pub fn set(&self, name: &str, value: ScriptValue) -> Result<(), BridgeError> {
        with_engine(&self.link, Self::CANONICAL_NAME, |scope| self.set_in(scope, name, value))
    }

    /// Own property names in insertion order.
    pub fn keys(&self) -> Result<Vec<String>, BridgeError> {
        with_engine(&self.link, Self::CANONICAL_NAME, |scope| self.keys_in(scope))
    }

    /// [`GenericObject::get`] inside a held scope.
    pub fn get_in(
        &self,
        scope: &mut dyn EngineScope,
        name: &str,
    ) -> Result<ScriptValue, BridgeError> {
        let object = paired_object(&self.link, scope, Self::CANONICAL_NAME)?;
        Ok(scope.get_property(object, name)?)
    }

    /// [`GenericObject::set`] inside a held scope.
    pub fn set_in(
        &self,
        scope: &mut dyn EngineScope,
        name: &str,
        value: ScriptValue,
    ) -> Result<(), BridgeError> {
        let object = paired_object(&self.link, scope, Self::CANONICAL_NAME)?;
        Ok(scope.set_property(object, name, value)?)
    }

    /// [`GenericObject::keys`] inside a held scope.
    pub fn keys_in(&self, scope: &mut dyn EngineScope) -> Result<Vec<String>, BridgeError> {
        let object = paired_object(&self.link, scope, Self::CANONICAL_NAME)?;
        Ok(scope.property_names(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classbridge_core::runtime::MemoryEngine;

    #[test]
    fn unpaired_views_report_stale_pairing() {
        let array = ScriptArray::new();
        assert_eq!(
            array.len().unwrap_err(),
            BridgeError::Binding(BindingError::StalePairing(
                ScriptArray::CANONICAL_NAME.to_owned()
            ))
        );
        assert!(GenericObject::new().keys().is_err());
        assert!(ScriptFunction::new().call(None, Vec::new()).is_err());
    }

    #[test]
    fn view_rejects_scope_of_another_engine() {
        let engine = MemoryEngine::new();
        let other = MemoryEngine::new();
        let object = GenericObject::new();
        {
            let mut scope = engine.lock();
            let plain = scope.new_object();
            let persistent = scope.persist(plain);
            let record = classbridge_core::PairingRecord {
                engine: scope.engine_id(),
                engine_handle: scope.engine_handle(),
                object: plain,
                ownership: classbridge_core::Ownership::Native,
                persistent: Some(persistent),
                external_bytes: 0,
            };
            assert!(object.link.set_record(record).is_ok());
        }

        let mut scope = other.lock();
        let err = object.keys_in(&mut scope).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Binding(BindingError::ForeignEngine { .. })
        ));
    }
}
