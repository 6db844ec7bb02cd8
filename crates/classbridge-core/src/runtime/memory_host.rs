//! In-memory reference host runtime.
//!
//! [`MemoryHost`] keeps two tables: native callables keyed by
//! `(class, name, is_static)`, and binding providers keyed by class name.
//! [`StaticBindings`] is a provider built from lists, the shape a code
//! generator or a hand-written table would produce.

use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;

use crate::TypeHash;
use crate::error::NativeError;
use crate::host::{AccessorBinding, BindingProvider, FunctionBinding, HostRuntime};

use super::{CallContext, NativeFn};

type CallableKey = (String, String, bool);

/// Reference host runtime.
#[derive(Default)]
pub struct MemoryHost {
    callables: RwLock<FxHashMap<CallableKey, NativeFn>>,
    classes: RwLock<FxHashMap<String, Arc<dyn BindingProvider>>>,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a native method of `class`.
    pub fn define_method<F>(&self, class: &str, name: &str, is_static: bool, f: F) -> &Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        let id = TypeHash::from_member(TypeHash::from_name(class), name, is_static);
        self.callables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (class.to_owned(), name.to_owned(), is_static),
                NativeFn::new(id, f),
            );
        self
    }

    /// Define a class carrying binding metadata.
    pub fn define_class(&self, name: &str, provider: impl BindingProvider + 'static) -> &Self {
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), Arc::new(provider));
        self
    }
}

impl HostRuntime for MemoryHost {
    fn find_class(&self, name: &str) -> Option<Arc<dyn BindingProvider>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn resolve_callable(&self, class: &str, name: &str, is_static: bool) -> Option<NativeFn> {
        self.callables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(class.to_owned(), name.to_owned(), is_static))
            .cloned()
    }
}

/// Binding metadata from fixed lists.
///
/// # Example
///
/// ```
/// use classbridge_core::runtime::StaticBindings;
/// use classbridge_core::BindingProvider;
///
/// let bindings = StaticBindings::new()
///     .function("resize", "nativeResize", false)
///     .accessor("width", Some("getWidth"), Some("setWidth"), false);
/// assert_eq!(bindings.functions().len(), 1);
/// assert_eq!(bindings.accessors()[0].property, "width");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticBindings {
    functions: Vec<FunctionBinding>,
    accessors: Vec<AccessorBinding>,
}

impl StaticBindings {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function binding.
    pub fn function(mut self, property: &str, native: &str, is_static: bool) -> Self {
        self.functions.push(FunctionBinding {
            property: property.to_owned(),
            native: native.to_owned(),
            is_static,
        });
        self
    }

    /// Add an accessor binding.
    pub fn accessor(
        mut self,
        property: &str,
        getter: Option<&str>,
        setter: Option<&str>,
        is_static: bool,
    ) -> Self {
        self.accessors.push(AccessorBinding {
            property: property.to_owned(),
            getter: getter.map(str::to_owned),
            setter: setter.map(str::to_owned),
            is_static,
        });
        self
    }
}

impl BindingProvider for StaticBindings {
    fn functions(&self) -> Vec<FunctionBinding> {
        self.functions.clone()
    }

    fn accessors(&self) -> Vec<AccessorBinding> {
        self.accessors.clone()
    }
}
