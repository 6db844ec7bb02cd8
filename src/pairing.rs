//! The object pairing protocol.
//!
//! Pairs one native object with exactly one script object. Pairing happens
//! in two ways:
//!
//! - Script-initiated: script code calls a registered constructor. The
//!   constructor callback installed on every template runs
//!   [`ObjectPairing::construct_from_script`], which allocates the native
//!   through the class factory. The script object owns the native.
//! - Host-initiated: the host already has a native object and needs its
//!   script counterpart ([`ObjectPairing::pair_existing_native_object`]). The
//!   native owns the script object through a persistent handle.
//!
//! Either way [`ObjectPairing::pair_in_scope`] does the work, and setting the
//! linkage on both sides is its last step.

use std::sync::Arc;

use classbridge_core::{
    BindingError, CallContext, ConstructorCall, ConstructorCallback, EngineId, EngineScope,
    InternalSlot, NativeClass, NativeObject, ObjectRef, Ownership, PairingRecord,
    ProvisionalObject, ScriptEngine, ScriptException, ScriptValue, TypeHash, downcast_native,
    fatal,
};
use classbridge_registry::{
    ClassBindingDescriptor, ClassBindingRegistry, ConstructorData, EngineClassBinding,
    FactoryContext,
};

/// Pairing operations over one registry.
#[derive(Clone, Copy)]
pub struct ObjectPairing<'r> {
    registry: &'r ClassBindingRegistry,
}

impl<'r> ObjectPairing<'r> {
    /// Pairing operations for classes of `registry`.
    pub fn new(registry: &'r ClassBindingRegistry) -> Self {
        Self { registry }
    }

    /// The constructor callback to install on every template.
    ///
    /// Finds the class through the template's [`ConstructorData`] and runs
    /// [`ObjectPairing::construct_from_script`].
    pub fn constructor_callback() -> ConstructorCallback {
        Arc::new(construct_callback)
    }

    /// Construct a native object for a script constructor call.
    ///
    /// Classes that may only be created from native code, and classes
    /// without a factory, throw a `TypeError` before anything is allocated.
    /// The in-progress object `this` is held by a temporary handle while the
    /// factory runs; pairing adopts it and releases the handle. The class's
    /// constructor hook then runs with the construction arguments.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn construct_from_script(
        &self,
        scope: &mut dyn EngineScope,
        binding: &Arc<EngineClassBinding>,
        this: ObjectRef,
        args: &[ScriptValue],
    ) -> Result<(), ScriptException> {
        let descriptor = binding.descriptor().unwrap_or_else(|| {
            fatal(BindingError::DetachedBinding(
                binding.class_name().to_owned(),
            ))
        });

        if binding.create_from_native_only() {
            return Err(ScriptException::type_error(format!(
                "{} can only be created from native code",
                descriptor.simple_name()
            )));
        }
        let Some(factory) = descriptor.factory() else {
            return Err(ScriptException::type_error(format!(
                "{} is abstract and cannot be constructed",
                descriptor.simple_name()
            )));
        };

        let provisional = ProvisionalObject::hold(scope, this, Ownership::Script);
        let context = FactoryContext {
            binding,
            provisional: &provisional,
            args,
        };
        let native = match factory(&context) {
            Ok(native) => native,
            Err(err) => {
                scope.release(provisional.persistent);
                return Err(err.into());
            }
        };
        let produced = native.linkage().class();
        if !produced.is_some_and(|class| self.registry.is_subclass_hash(class, binding.class())) {
            scope.release(provisional.persistent);
            let produced = match produced {
                Some(class) => self
                    .registry
                    .get_hash(class)
                    .map(|descriptor| descriptor.canonical_name().to_owned())
                    .unwrap_or_else(|| class.to_string()),
                None => String::from("<unlinked>"),
            };
            return Err(ScriptException::type_error(format!(
                "factory of {} produced a {}",
                descriptor.canonical_name(),
                produced
            )));
        }

        let object = self
            .pair_in_scope(scope, &native, Some(provisional))
            .unwrap_or_else(|err| fatal(err));

        if let Some(hook) = descriptor.constructor_hook() {
            let mut ctx = CallContext::new(&mut *scope, Some(object), args);
            hook(&native, &mut ctx)?;
        }
        Ok(())
    }

    /// Pair a native object created by the host with a script object on
    /// `engine`.
    ///
    /// Acquires the engine's execution lock. Aborts on a broken native
    /// object or a repeated pairing.
    pub fn pair_existing_native_object(
        &self,
        native: &Arc<dyn NativeObject>,
        engine: &dyn ScriptEngine,
        provisional: Option<ProvisionalObject>,
    ) -> ObjectRef {
        let result = {
            let mut scope = engine.enter();
            self.pair_in_scope(&mut *scope, native, provisional)
        };
        result.unwrap_or_else(|err| fatal(err))
    }

    /// Pair `native` with a script object on the scope's engine.
    ///
    /// With a provisional object, that object is adopted with the
    /// provisional's ownership and its temporary handle is released.
    /// Otherwise a fresh instance of the class's template is created and the
    /// native owns it.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn pair_in_scope(
        &self,
        scope: &mut dyn EngineScope,
        native: &Arc<dyn NativeObject>,
        provisional: Option<ProvisionalObject>,
    ) -> Result<ObjectRef, BindingError> {
        let adopted = provisional.as_ref().map(|provisional| provisional.object);
        let (descriptor, binding) = match self.check_pairable(scope, native, adopted) {
            Ok(checked) => checked,
            Err(err) => {
                if let Some(provisional) = provisional {
                    scope.release(provisional.persistent);
                }
                return Err(err);
            }
        };

        let linkage = native.linkage();
        let (object, ownership) = match provisional {
            Some(provisional) => (provisional.object, provisional.ownership),
            None => (scope.new_instance(binding.template()), Ownership::Native),
        };

        let (slot, persistent) = match ownership {
            Ownership::Native => (
                InternalSlot::Linked(Arc::downgrade(native)),
                Some(scope.persist(object)),
            ),
            Ownership::Script => (InternalSlot::Owned(Arc::clone(native)), None),
        };
        if let Some(provisional) = provisional {
            scope.release(provisional.persistent);
        }

        let external_bytes = self.registry.config().external_cost(descriptor.footprint());
        let record = PairingRecord {
            engine: scope.engine_id(),
            engine_handle: scope.engine_handle(),
            object,
            ownership,
            persistent,
            external_bytes,
        };
        if linkage.set_record(record).is_err() {
            // Paired on another engine since the check above.
            if let Some(handle) = persistent {
                scope.release(handle);
            }
            return Err(BindingError::AlreadyPaired(
                descriptor.canonical_name().to_owned(),
            ));
        }
        if external_bytes > 0 {
            scope.adjust_external_memory(external_bytes as i64);
        }
        scope.set_linkage(object, Some(slot));

        tracing::trace!(
            target: "classbridge::pairing",
            class = descriptor.canonical_name(),
            engine = %scope.engine_id(),
            ?ownership,
            external_bytes,
            "paired native object"
        );
        Ok(object)
    }

    /// Everything that can refuse a pairing, checked before any handle or
    /// object changes hands.
    fn check_pairable(
        &self,
        scope: &mut dyn EngineScope,
        native: &Arc<dyn NativeObject>,
        adopted: Option<ObjectRef>,
    ) -> Result<(Arc<ClassBindingDescriptor>, Arc<EngineClassBinding>), BindingError> {
        let linkage = native.linkage();
        let class = linkage.class().ok_or(BindingError::UnlinkedHostObject)?;
        let descriptor = self
            .registry
            .get_hash(class)
            .ok_or_else(|| BindingError::UnknownClass(class.to_string()))?;
        if linkage.is_paired() {
            return Err(BindingError::AlreadyPaired(
                descriptor.canonical_name().to_owned(),
            ));
        }
        if adopted.is_some_and(|object| scope.linkage(object).is_some_and(|slot| slot.is_live())) {
            return Err(BindingError::ObjectAlreadyLinked(
                descriptor.canonical_name().to_owned(),
            ));
        }

        let binding = self.registry.try_resolve_descriptor(&descriptor, scope)?;
        Ok((descriptor, binding))
    }

    /// The native object paired with a script value.
    ///
    /// Empty for non-objects and for objects never paired.
    pub fn unwrap_root(
        &self,
        scope: &dyn EngineScope,
        value: &ScriptValue,
    ) -> Option<Arc<dyn NativeObject>> {
        let object = value.as_object()?;
        scope.linkage(object)?.native()
    }

    /// The native object paired with a script value, as class `T`.
    ///
    /// A native of a subclass yields its embedded `T`. Empty if the paired
    /// native is neither a `T` nor built on one.
    pub fn unwrap<T: NativeClass>(
        &self,
        scope: &dyn EngineScope,
        value: &ScriptValue,
    ) -> Option<Arc<T>> {
        downcast_native::<T>(self.unwrap_root(scope, value)?)
    }

    /// The paired native object if its class is `canonical_name` or a
    /// subclass of it.
    pub fn unwrap_as(
        &self,
        scope: &dyn EngineScope,
        value: &ScriptValue,
        canonical_name: &str,
    ) -> Option<Arc<dyn NativeObject>> {
        let native = self.unwrap_root(scope, value)?;
        let class = native.linkage().class()?;
        self.registry
            .is_subclass_hash(class, TypeHash::from_name(canonical_name))
            .then_some(native)
    }

    /// The script object paired with `native` on `engine`.
    pub fn script_object_of(
        &self,
        native: &dyn NativeObject,
        engine: EngineId,
    ) -> Option<ObjectRef> {
        native
            .linkage()
            .record()
            .filter(|record| record.engine == engine)
            .map(|record| record.object)
    }
}

fn construct_callback(
    scope: &mut dyn EngineScope,
    call: &ConstructorCall,
) -> Result<(), ScriptException> {
    let Some(data) = call.data.downcast_ref::<ConstructorData>() else {
        return Err(ScriptException::type_error("illegal constructor"));
    };
    let Some(registry) = data.registry.upgrade() else {
        return Err(ScriptException::error("class registry has been dropped"));
    };
    let binding = registry
        .try_resolve_hash(data.class, scope)
        .unwrap_or_else(|err| fatal(err));
    ObjectPairing::new(&registry).construct_from_script(scope, &binding, call.this, &call.args)
}
