//! Engine-independent class descriptors.
//!
//! A [`ClassRegistration`] is the builder handed to the registry; a
//! successful registration turns it into a [`ClassBindingDescriptor`]. The
//! descriptor is created once and only ever gains or loses per-engine
//! bindings afterwards.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use classbridge_core::{
    CallContext, Classification, EngineId, NativeClass, NativeError, NativeObject,
    ProvisionalObject, ScriptValue, TypeHash,
};

use crate::binding::{BindingBuilder, EngineClassBinding};

/// Inputs of a factory call.
pub struct FactoryContext<'a> {
    /// Binding of the class being constructed, on the constructing engine.
    pub binding: &'a Arc<EngineClassBinding>,
    /// The script object under construction.
    pub provisional: &'a ProvisionalObject,
    /// Construction arguments.
    pub args: &'a [ScriptValue],
}

/// Allocates a native instance for script-initiated construction.
pub type Factory =
    Arc<dyn Fn(&FactoryContext<'_>) -> Result<Arc<dyn NativeObject>, NativeError> + Send + Sync>;

/// Registers explicit members once per engine.
pub type Initializer = Arc<dyn Fn(&mut BindingBuilder) + Send + Sync>;

/// Runs after a script-constructed native has been paired.
pub type ConstructorHook = Arc<
    dyn Fn(&Arc<dyn NativeObject>, &mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync,
>;

/// A class registration request.
///
/// # Example
///
/// ```ignore
/// let registration = ClassRegistration::wrapper("app.Widget")
///     .with_base("classbridge.NativeObject")
///     .with_constructor(|_ctx| Ok(Widget::default()))
///     .with_initializer(|b| {
///         b.method("draw", draw);
///     });
/// ```
pub struct ClassRegistration {
    pub(crate) name: String,
    pub(crate) classification: Result<Classification, u8>,
    pub(crate) base: Option<String>,
    pub(crate) factory: Option<Factory>,
    pub(crate) initializer: Option<Initializer>,
    pub(crate) constructor_hook: Option<ConstructorHook>,
    pub(crate) footprint: usize,
}

impl ClassRegistration {
    /// Register `name` with the given classification.
    pub fn new(classification: Classification, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classification: Ok(classification),
            base: None,
            factory: None,
            initializer: None,
            constructor_hook: None,
            footprint: 0,
        }
    }

    /// Register a wrapper class.
    pub fn wrapper(name: impl Into<String>) -> Self {
        Self::new(Classification::Wrapper, name)
    }

    /// Register an abstract class.
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self::new(Classification::Abstract, name)
    }

    /// Register with a raw classification code.
    ///
    /// Unknown codes are refused at registration.
    pub fn from_raw(code: u8, name: impl Into<String>) -> Self {
        let mut registration = Self::new(Classification::Abstract, name);
        registration.classification = Classification::try_from(code).map_err(|_| code);
        registration
    }

    /// Register native class `T`, taking its name and footprint.
    pub fn of<T: NativeClass>(classification: Classification) -> Self {
        Self::new(classification, T::CANONICAL_NAME).with_footprint(T::FOOTPRINT)
    }

    /// Canonical name being registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the base class. An empty name means no base.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.base = (!base.is_empty()).then_some(base);
        self
    }

    /// Set the initializer.
    pub fn with_initializer<F>(mut self, initializer: F) -> Self
    where
        F: Fn(&mut BindingBuilder) + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(initializer));
        self
    }

    /// Set a factory returning any native object.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&FactoryContext<'_>) -> Result<Arc<dyn NativeObject>, NativeError>
            + Send
            + Sync
            + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Set a factory producing a `T`.
    pub fn with_constructor<T, F>(self, constructor: F) -> Self
    where
        T: NativeObject,
        F: Fn(&FactoryContext<'_>) -> Result<T, NativeError> + Send + Sync + 'static,
    {
        self.with_factory(move |ctx: &FactoryContext<'_>| {
            let native: Arc<dyn NativeObject> = Arc::new(constructor(ctx)?);
            Ok(native)
        })
    }

    /// Set the post-construction hook.
    pub fn with_constructor_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<dyn NativeObject>, &mut CallContext<'_>) -> Result<(), NativeError>
            + Send
            + Sync
            + 'static,
    {
        self.constructor_hook = Some(Arc::new(hook));
        self
    }

    /// Set the instance footprint reported as external memory.
    pub fn with_footprint(mut self, footprint: usize) -> Self {
        self.footprint = footprint;
        self
    }
}

impl fmt::Debug for ClassRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistration")
            .field("name", &self.name)
            .field("classification", &self.classification)
            .field("base", &self.base)
            .field("footprint", &self.footprint)
            .finish_non_exhaustive()
    }
}

/// Registration record of one native class.
pub struct ClassBindingDescriptor {
    canonical_name: String,
    type_hash: TypeHash,
    classification: Classification,
    base: Option<Arc<ClassBindingDescriptor>>,
    factory: Option<Factory>,
    initializer: Option<Initializer>,
    constructor_hook: Option<ConstructorHook>,
    footprint: usize,
    engine_bindings: Mutex<Vec<Arc<EngineClassBinding>>>,
}

impl ClassBindingDescriptor {
    pub(crate) fn new(
        registration: ClassRegistration,
        classification: Classification,
        base: Option<Arc<ClassBindingDescriptor>>,
    ) -> Self {
        Self {
            type_hash: TypeHash::from_name(&registration.name),
            canonical_name: registration.name,
            classification,
            base,
            factory: registration.factory,
            initializer: registration.initializer,
            constructor_hook: registration.constructor_hook,
            footprint: registration.footprint,
            engine_bindings: Mutex::new(Vec::new()),
        }
    }

    fn bindings(&self) -> MutexGuard<'_, Vec<Arc<EngineClassBinding>>> {
        self.engine_bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Canonical class name.
    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    /// Last segment of the canonical name, used as the script class name.
    pub fn simple_name(&self) -> &str {
        self.canonical_name
            .rsplit(['.', '/', '$'])
            .next()
            .unwrap_or(&self.canonical_name)
    }

    /// Hash of the canonical name.
    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    /// Class kind.
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Immediate base, absent for the root.
    pub fn base(&self) -> Option<&Arc<ClassBindingDescriptor>> {
        self.base.as_ref()
    }

    /// Factory for script-initiated construction.
    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    /// Per-engine initializer.
    pub fn initializer(&self) -> Option<&Initializer> {
        self.initializer.as_ref()
    }

    /// Post-construction hook.
    pub fn constructor_hook(&self) -> Option<&ConstructorHook> {
        self.constructor_hook.as_ref()
    }

    /// Instance footprint in bytes.
    pub fn footprint(&self) -> usize {
        self.footprint
    }

    /// Descriptors from the root down to this class.
    pub fn lineage(self: &Arc<Self>) -> Vec<Arc<ClassBindingDescriptor>> {
        let mut lineage = vec![Arc::clone(self)];
        let mut current = self.base.clone();
        while let Some(descriptor) = current {
            current = descriptor.base.clone();
            lineage.push(descriptor);
        }
        lineage.reverse();
        lineage
    }

    /// This class's binding on `engine`, if built.
    pub fn binding_for(&self, engine: EngineId) -> Option<Arc<EngineClassBinding>> {
        self.bindings()
            .iter()
            .find(|binding| binding.engine() == engine)
            .cloned()
    }

    /// Snapshot of all live bindings, in creation order.
    pub fn engine_bindings(&self) -> Vec<Arc<EngineClassBinding>> {
        self.bindings().clone()
    }

    /// Append a binding unless one for the same engine already exists.
    ///
    /// Returns the binding that ended up stored.
    pub(crate) fn attach(&self, binding: Arc<EngineClassBinding>) -> Arc<EngineClassBinding> {
        let mut bindings = self.bindings();
        if let Some(existing) = bindings.iter().find(|b| b.engine() == binding.engine()) {
            return Arc::clone(existing);
        }
        bindings.push(Arc::clone(&binding));
        binding
    }

    /// Remove the binding for `engine`. Returns how many were removed.
    pub(crate) fn detach_engine(&self, engine: EngineId) -> usize {
        let mut bindings = self.bindings();
        let before = bindings.len();
        bindings.retain(|binding| binding.engine() != engine);
        before - bindings.len()
    }
}

impl fmt::Debug for ClassBindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBindingDescriptor")
            .field("canonical_name", &self.canonical_name)
            .field("classification", &self.classification)
            .field("base", &self.base.as_ref().map(|b| b.canonical_name()))
            .field("footprint", &self.footprint)
            .field("engine_bindings", &self.bindings().len())
            .finish()
    }
}
