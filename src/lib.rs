//! classbridge
//!
//! Exposes native host classes to embedded script engines.
//!
//! A [`Bridge`] owns a [`ClassBindingRegistry`]. Classes are registered once
//! and materialized lazily on every engine that needs them; native objects
//! are paired one-to-one with script objects, and values cross between the
//! two sides through the [`ValueMarshaller`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use classbridge::{Bridge, ClassRegistration, Linkage, NativeClass};
//! use classbridge::runtime::{MemoryEngine, MemoryHost};
//!
//! #[derive(NativeClass)]
//! #[bridge(name = "app.Widget")]
//! struct Widget {
//!     linkage: Linkage,
//! }
//!
//! let bridge = Bridge::new(Arc::new(MemoryHost::new()));
//! bridge
//!     .register_class(
//!         ClassRegistration::wrapper("app.Widget")
//!             .with_base("classbridge.NativeObject")
//!             .with_constructor(|_ctx| Ok(Widget { linkage: Linkage::of::<Widget>() })),
//!     )
//!     .unwrap();
//!
//! let engine = MemoryEngine::new();
//! let widget = Arc::new(Widget { linkage: Linkage::of::<Widget>() });
//! let object = bridge.pair_existing_native_object(&widget, engine.as_ref(), None);
//! ```
//!
//! # Modules
//!
//! - [`pairing`]: The object pairing protocol
//! - [`marshal`]: Value conversion in both directions
//! - [`wrappers`]: Host views of unpaired script functions, arrays and objects

use std::sync::{Arc, OnceLock};

pub mod marshal;
pub mod pairing;
pub mod wrappers;

pub use classbridge_core::*;
pub use classbridge_macros::NativeClass;
pub use classbridge_registry::{
    BindingBuilder, BoundAccessor, BoundMethod, ClassBindingDescriptor, ClassBindingRegistry,
    ClassHierarchy, ClassRegistration, ConstructorData, ConstructorHook, EngineClassBinding,
    Factory, FactoryContext, Initializer, Registered,
};
pub use marshal::ValueMarshaller;
pub use pairing::ObjectPairing;
pub use wrappers::{GenericObject, ScriptArray, ScriptFunction};

static GLOBAL: OnceLock<Bridge> = OnceLock::new();

/// Entry point tying the registry, pairing and marshalling together.
pub struct Bridge {
    registry: Arc<ClassBindingRegistry>,
}

impl Bridge {
    /// Create a bridge with the default configuration.
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self::with_config(host, BridgeConfig::default())
    }

    /// Create a bridge.
    ///
    /// Registers the root class and the built-in wrapper classes.
    pub fn with_config(host: Arc<dyn HostRuntime>, config: BridgeConfig) -> Self {
        let registry =
            ClassBindingRegistry::new(host, config, ObjectPairing::constructor_callback());
        wrappers::register_builtins(&registry);
        Self { registry }
    }

    /// Install the process-wide bridge.
    ///
    /// The first call creates it; later calls return the installed bridge
    /// and drop their arguments.
    pub fn install(host: Arc<dyn HostRuntime>, config: BridgeConfig) -> &'static Bridge {
        GLOBAL.get_or_init(|| {
            tracing::info!(target: "classbridge", root = %config.root_class, "installing bridge");
            Self::with_config(host, config)
        })
    }

    /// The process-wide bridge, if installed.
    pub fn global() -> Option<&'static Bridge> {
        GLOBAL.get()
    }

    /// The class registry.
    pub fn registry(&self) -> &Arc<ClassBindingRegistry> {
        &self.registry
    }

    /// Pairing operations.
    pub fn pairing(&self) -> ObjectPairing<'_> {
        ObjectPairing::new(&self.registry)
    }

    /// Value conversions.
    pub fn marshaller(&self) -> ValueMarshaller<'_> {
        ValueMarshaller::new(&self.registry)
    }

    /// Register a native class. See [`ClassBindingRegistry::register`].
    pub fn register_class(
        &self,
        registration: ClassRegistration,
    ) -> Result<Registered, RegistrationError> {
        self.registry.register(registration)
    }

    /// The binding of `name` on the scope's engine, built if needed.
    pub fn resolve_for_engine(
        &self,
        name: &str,
        scope: &mut dyn EngineScope,
    ) -> Arc<EngineClassBinding> {
        self.registry.resolve_for_engine(name, scope)
    }

    /// Pair a host-created native with a script object on `engine`.
    pub fn pair_existing_native_object<T: NativeObject>(
        &self,
        native: &Arc<T>,
        engine: &dyn ScriptEngine,
        provisional: Option<ProvisionalObject>,
    ) -> ObjectRef {
        let native: Arc<dyn NativeObject> = native.clone();
        self.pairing()
            .pair_existing_native_object(&native, engine, provisional)
    }

    /// The native object paired with a script value, as class `T`.
    pub fn unwrap<T: NativeClass>(
        &self,
        scope: &dyn EngineScope,
        value: &ScriptValue,
    ) -> Option<Arc<T>> {
        self.pairing().unwrap(scope, value)
    }

    /// The native object paired with a script value.
    pub fn unwrap_root(
        &self,
        scope: &dyn EngineScope,
        value: &ScriptValue,
    ) -> Option<Arc<dyn NativeObject>> {
        self.pairing().unwrap_root(scope, value)
    }

    /// Convert a script value to a host value.
    pub fn to_host(&self, scope: &mut dyn EngineScope, value: &ScriptValue) -> HostValue {
        self.marshaller().to_host(scope, value)
    }

    /// Convert a host value to a script value.
    pub fn to_script(&self, scope: &mut dyn EngineScope, value: &HostValue) -> ScriptValue {
        self.marshaller().to_script(scope, value)
    }

    /// Remove every binding built on `engine`.
    ///
    /// Holds the engine lock while the bindings are removed. Returns how
    /// many were removed.
    pub fn teardown_engine(&self, engine: &dyn ScriptEngine) -> usize {
        let _scope = engine.enter();
        self.registry.teardown_engine(engine.id())
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("root_class", &self.registry.config().root_class)
            .field("classes", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MemoryHost;

    #[test]
    fn bridge_registers_builtins() {
        let bridge = Bridge::new(Arc::new(MemoryHost::new()));
        let registry = bridge.registry();

        assert_eq!(registry.len(), 4);
        assert!(registry.contains("classbridge.NativeObject"));
        assert!(
            registry.is_subclass_of(ScriptFunction::CANONICAL_NAME, "classbridge.NativeObject")
        );
        assert!(format!("{bridge:?}").contains("classes: 4"));
    }
}
