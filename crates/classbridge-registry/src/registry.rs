//! The class binding registry.
//!
//! Holds one [`ClassBindingDescriptor`] per registered class and builds
//! per-engine [`EngineClassBinding`]s on demand.
//!
//! ## Locking
//!
//! The descriptor table sits behind one mutex. It is never held while
//! calling into an engine, an initializer or the host: resolution snapshots
//! what it needs and releases the lock first. Resolution itself runs inside
//! an [`EngineScope`], which already serializes everything per engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use classbridge_core::{
    BindingError, BridgeConfig, BridgeError, Classification, ConstructorCallback, EngineId,
    EngineScope, HostRuntime, RegistrationError, TemplateId, TemplateSpec, TypeHash, fatal,
};
use rustc_hash::FxHashMap;

use crate::binding::{BindingBuilder, EngineClassBinding};
use crate::descriptor::{ClassBindingDescriptor, ClassRegistration};
use crate::hierarchy::ClassHierarchy;
use crate::wiring::wire_members;

/// Opaque data attached to every constructor template.
///
/// The constructor callback uses it to find its way back to the class being
/// constructed.
#[derive(Debug)]
pub struct ConstructorData {
    /// The registry that built the template.
    pub registry: Weak<ClassBindingRegistry>,
    /// The class the template belongs to.
    pub class: TypeHash,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone)]
pub enum Registered {
    /// A new descriptor was created.
    Created(Arc<ClassBindingDescriptor>),
    /// The name was already registered; the original descriptor is returned
    /// unchanged.
    AlreadyRegistered(Arc<ClassBindingDescriptor>),
}

impl Registered {
    /// The registered descriptor.
    pub fn descriptor(&self) -> &Arc<ClassBindingDescriptor> {
        match self {
            Registered::Created(descriptor) | Registered::AlreadyRegistered(descriptor) => {
                descriptor
            }
        }
    }

    /// Check if this registration created the descriptor.
    pub fn is_new(&self) -> bool {
        matches!(self, Registered::Created(_))
    }
}

#[derive(Default)]
struct RegistryState {
    descriptors: FxHashMap<TypeHash, Arc<ClassBindingDescriptor>>,
    hierarchy: ClassHierarchy,
}

/// Registry of native classes exposed to script engines.
pub struct ClassBindingRegistry {
    host: Arc<dyn HostRuntime>,
    config: BridgeConfig,
    constructor: ConstructorCallback,
    self_ref: Weak<ClassBindingRegistry>,
    state: Mutex<RegistryState>,
}

impl ClassBindingRegistry {
    /// Create an empty registry.
    ///
    /// `constructor` is installed on every template this registry builds.
    pub fn new(
        host: Arc<dyn HostRuntime>,
        config: BridgeConfig,
        constructor: ConstructorCallback,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            host,
            config,
            constructor,
            self_ref: self_ref.clone(),
            state: Mutex::new(RegistryState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The host runtime.
    pub fn host(&self) -> &Arc<dyn HostRuntime> {
        &self.host
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a class.
    ///
    /// Refusals are returned. A rootless class is a broken setup and aborts.
    pub fn register(
        &self,
        registration: ClassRegistration,
    ) -> Result<Registered, RegistrationError> {
        match self.try_register(registration) {
            Ok(registered) => Ok(registered),
            Err(BridgeError::Registration(err)) => Err(err),
            Err(err) => fatal(err),
        }
    }

    /// Register a class, returning every failure.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn try_register(
        &self,
        registration: ClassRegistration,
    ) -> Result<Registered, BridgeError> {
        let hash = TypeHash::from_name(&registration.name);
        let mut state = self.state();

        if let Some(existing) = state.descriptors.get(&hash) {
            tracing::debug!(
                target: "classbridge::registry",
                class = %registration.name,
                "class already registered"
            );
            return Ok(Registered::AlreadyRegistered(Arc::clone(existing)));
        }

        let classification = match registration.classification {
            Ok(classification) => classification,
            Err(code) => {
                return Err(refuse(RegistrationError::InvalidClassification {
                    class: registration.name,
                    code,
                }));
            }
        };

        let base = match registration.base.as_deref() {
            Some(base_name) => {
                let Some(base) = state.descriptors.get(&TypeHash::from_name(base_name)) else {
                    return Err(refuse(RegistrationError::MissingBase {
                        class: registration.name.clone(),
                        base: base_name.to_owned(),
                    }));
                };
                let base_is_root = self.config.is_root(base.canonical_name());
                if !classification.can_extend(base.classification(), base_is_root) {
                    return Err(refuse(RegistrationError::IncompatibleClassification {
                        class: registration.name.clone(),
                        classification,
                        base: base.canonical_name().to_owned(),
                        base_classification: base.classification(),
                    }));
                }
                Some(Arc::clone(base))
            }
            None if self.config.is_root(&registration.name) => {
                if classification != Classification::Abstract {
                    return Err(refuse(RegistrationError::NonAbstractRoot {
                        class: registration.name,
                        classification,
                    }));
                }
                None
            }
            None => return Err(BindingError::RootlessClass(registration.name).into()),
        };

        let base_hash = base.as_ref().map(|base| base.type_hash());
        let descriptor = Arc::new(ClassBindingDescriptor::new(
            registration,
            classification,
            base,
        ));
        state.descriptors.insert(hash, Arc::clone(&descriptor));
        state.hierarchy.add_class(hash, base_hash);

        tracing::debug!(
            target: "classbridge::registry",
            class = descriptor.canonical_name(),
            classification = %classification,
            base = descriptor.base().map(|base| base.canonical_name()),
            "registered class"
        );
        Ok(Registered::Created(descriptor))
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Look up a descriptor by canonical name.
    pub fn get(&self, name: &str) -> Option<Arc<ClassBindingDescriptor>> {
        self.get_hash(TypeHash::from_name(name))
    }

    /// Look up a descriptor by class hash.
    pub fn get_hash(&self, class: TypeHash) -> Option<Arc<ClassBindingDescriptor>> {
        self.state().descriptors.get(&class).cloned()
    }

    /// Check if a class is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.state()
            .descriptors
            .contains_key(&TypeHash::from_name(name))
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.state().descriptors.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.state().descriptors.is_empty()
    }

    /// Check if `derived` is `base` or one of its subclasses.
    pub fn is_subclass_of(&self, derived: &str, base: &str) -> bool {
        self.is_subclass_hash(TypeHash::from_name(derived), TypeHash::from_name(base))
    }

    /// Hash form of [`ClassBindingRegistry::is_subclass_of`].
    pub fn is_subclass_hash(&self, derived: TypeHash, base: TypeHash) -> bool {
        self.state().hierarchy.is_subclass(derived, base)
    }

    /// All transitive subclasses of a class.
    pub fn subclasses_of(&self, name: &str) -> Vec<Arc<ClassBindingDescriptor>> {
        let state = self.state();
        state
            .hierarchy
            .descendants(TypeHash::from_name(name))
            .into_iter()
            .filter_map(|class| state.descriptors.get(&class).cloned())
            .collect()
    }

    /// Descriptors from the root down to `name`.
    pub fn lineage(&self, name: &str) -> Option<Vec<Arc<ClassBindingDescriptor>>> {
        self.get(name).map(|descriptor| descriptor.lineage())
    }

    /// Every binding built on `engine`.
    pub fn bindings_for_engine(&self, engine: EngineId) -> Vec<Arc<EngineClassBinding>> {
        self.descriptors()
            .iter()
            .filter_map(|descriptor| descriptor.binding_for(engine))
            .collect()
    }

    fn descriptors(&self) -> Vec<Arc<ClassBindingDescriptor>> {
        self.state().descriptors.values().cloned().collect()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// The binding of `name` on the scope's engine, building it if needed.
    ///
    /// Aborts if the class is not registered or its members cannot be wired.
    pub fn resolve_for_engine(
        &self,
        name: &str,
        scope: &mut dyn EngineScope,
    ) -> Arc<EngineClassBinding> {
        self.try_resolve_for_engine(name, scope)
            .unwrap_or_else(|err| fatal(err))
    }

    /// Fallible form of [`ClassBindingRegistry::resolve_for_engine`].
    pub fn try_resolve_for_engine(
        &self,
        name: &str,
        scope: &mut dyn EngineScope,
    ) -> Result<Arc<EngineClassBinding>, BindingError> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| BindingError::UnknownClass(name.to_owned()))?;
        self.try_resolve_descriptor(&descriptor, scope)
    }

    /// Resolve by class hash.
    pub fn try_resolve_hash(
        &self,
        class: TypeHash,
        scope: &mut dyn EngineScope,
    ) -> Result<Arc<EngineClassBinding>, BindingError> {
        let descriptor = self
            .get_hash(class)
            .ok_or_else(|| BindingError::UnknownClass(class.to_string()))?;
        self.try_resolve_descriptor(&descriptor, scope)
    }

    /// Resolve a descriptor on the scope's engine.
    ///
    /// Ancestors without a binding on the engine are built first, root first,
    /// so every template can inherit from its parent's.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn try_resolve_descriptor(
        &self,
        descriptor: &Arc<ClassBindingDescriptor>,
        scope: &mut dyn EngineScope,
    ) -> Result<Arc<EngineClassBinding>, BindingError> {
        let engine = scope.engine_id();
        if let Some(binding) = descriptor.binding_for(engine) {
            return Ok(binding);
        }

        let mut worklist = Vec::new();
        let mut resolved = None;
        let mut current = Some(Arc::clone(descriptor));
        while let Some(class) = current {
            if let Some(binding) = class.binding_for(engine) {
                resolved = Some(binding);
                break;
            }
            current = class.base().cloned();
            worklist.push(class);
        }

        while let Some(class) = worklist.pop() {
            let parent = resolved.as_ref().map(|binding| binding.template());
            resolved = Some(self.build_binding(&class, parent, scope)?);
        }

        resolved.ok_or_else(|| BindingError::UnknownClass(descriptor.canonical_name().to_owned()))
    }

    fn build_binding(
        &self,
        class: &Arc<ClassBindingDescriptor>,
        parent_template: Option<TemplateId>,
        scope: &mut dyn EngineScope,
    ) -> Result<Arc<EngineClassBinding>, BindingError> {
        let engine = scope.engine_id();
        let template = scope.create_template(TemplateSpec {
            class_name: class.simple_name().to_owned(),
            callback: Arc::clone(&self.constructor),
            data: Arc::new(ConstructorData {
                registry: self.self_ref.clone(),
                class: class.type_hash(),
            }),
        });
        if let Some(parent) = parent_template {
            scope.inherit(template, parent);
        }
        scope.set_internal_slot_count(template, 1);

        let mut builder = BindingBuilder::new(class.canonical_name(), engine);
        if let Some(initializer) = class.initializer() {
            initializer(&mut builder);
        }
        wire_members(
            self.host.as_ref(),
            &self.config,
            class.canonical_name(),
            &mut builder,
        )?;
        for (name, member) in builder.template_members() {
            scope.set_template_member(template, &name, member);
        }

        let binding = Arc::new(builder.build(Arc::downgrade(class), template, parent_template));
        let binding = class.attach(binding);
        tracing::debug!(
            target: "classbridge::resolve",
            class = class.canonical_name(),
            engine = %engine,
            template = template.0,
            members = binding.member_count(),
            "built engine binding"
        );
        Ok(binding)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Drop every binding built on `engine`.
    ///
    /// Bindings on other engines are untouched. Returns how many were removed.
    pub fn teardown_engine(&self, engine: EngineId) -> usize {
        let removed: usize = self
            .descriptors()
            .iter()
            .map(|descriptor| descriptor.detach_engine(engine))
            .sum();
        tracing::info!(
            target: "classbridge::teardown",
            engine = %engine,
            removed,
            "engine bindings removed"
        );
        removed
    }
}

fn refuse(err: RegistrationError) -> BridgeError {
    tracing::warn!(target: "classbridge::registry", error = %err, "registration refused");
    err.into()
}
