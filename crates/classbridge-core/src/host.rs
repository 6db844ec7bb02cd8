//! Host runtime collaborator interface.
//!
//! The registry discovers script-visible members of a class through a
//! [`BindingProvider`]: a companion class found by name (the canonical name
//! plus a fixed suffix, see [`BridgeConfig::binding_class_name`]). Each
//! provider lists functions and accessors by native name; the names are then
//! resolved to callables with [`HostRuntime::resolve_callable`].
//!
//! [`BridgeConfig::binding_class_name`]: crate::BridgeConfig::binding_class_name

use std::sync::Arc;

use crate::HostValue;
use crate::runtime::NativeFn;

/// A script-visible function backed by a native method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBinding {
    /// Script-visible property name.
    pub property: String,
    /// Native method name.
    pub native: String,
    /// Installed on the constructor rather than the prototype.
    pub is_static: bool,
}

/// A script-visible property backed by native getter/setter methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorBinding {
    /// Script-visible property name.
    pub property: String,
    /// Native getter name.
    pub getter: Option<String>,
    /// Native setter name.
    pub setter: Option<String>,
    /// Installed on the constructor rather than the prototype.
    pub is_static: bool,
}

/// Source of reflective binding metadata for one class.
pub trait BindingProvider: Send + Sync {
    /// Function bindings, in declaration order.
    fn functions(&self) -> Vec<FunctionBinding>;

    /// Accessor bindings, in declaration order.
    fn accessors(&self) -> Vec<AccessorBinding>;
}

/// The host runtime.
pub trait HostRuntime: Send + Sync {
    /// Find a class by name, returning its binding metadata.
    fn find_class(&self, name: &str) -> Option<Arc<dyn BindingProvider>>;

    /// Resolve a native method of `class` by name.
    fn resolve_callable(&self, class: &str, name: &str, is_static: bool) -> Option<NativeFn>;

    /// The host's "undefined" singleton.
    fn undefined(&self) -> HostValue {
        HostValue::Undefined
    }
}
