//! classbridge registry
//!
//! Turns native class registrations into script-visible types.
//!
//! ## Modules
//!
//! - [`descriptor`]: Registration requests and class descriptors
//! - [`binding`]: Per-engine bindings and their builder
//! - [`hierarchy`]: Inheritance graph of registered classes
//! - [`wiring`]: Members discovered through host binding classes
//! - [`registry`]: The registry and lazy per-engine resolution

pub mod binding;
pub mod descriptor;
pub mod hierarchy;
pub mod registry;
pub mod wiring;

pub use binding::{BindingBuilder, BoundAccessor, BoundMethod, EngineClassBinding};
pub use descriptor::{
    ClassBindingDescriptor, ClassRegistration, ConstructorHook, Factory, FactoryContext,
    Initializer,
};
pub use hierarchy::ClassHierarchy;
pub use registry::{ClassBindingRegistry, ConstructorData, Registered};
pub use wiring::wire_members;
