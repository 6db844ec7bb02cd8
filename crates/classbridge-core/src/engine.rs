//! Script engine collaborator interface.
//!
//! The bridge never touches an engine's internals. It works through two
//! traits:
//!
//! - [`ScriptEngine`]: the shareable engine instance. Its only job is handing
//!   out an exclusive [`EngineScope`] and accepting deferred releases.
//! - [`EngineScope`]: everything that reads or mutates engine state. Holding a
//!   scope means holding the engine's execution lock, so template
//!   construction, pairing and marshalling of live values all happen inside
//!   one.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use bitflags::bitflags;

use crate::error::ScriptException;
use crate::native::{InternalSlot, Ownership};
use crate::runtime::NativeFn;
use crate::{EngineId, ObjectKind, ObjectRef, ScriptValue, SymbolId};

/// Identifies a constructor template within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u32);

/// A strong handle keeping a script object alive until released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistentHandle {
    /// The object kept alive.
    pub object: ObjectRef,
    /// Engine-assigned handle id.
    pub id: u64,
}

/// Callback run when script code invokes a template's constructor.
///
/// Receives the instance being constructed; returning an error makes the
/// construction throw.
pub type ConstructorCallback = Arc<
    dyn Fn(&mut dyn EngineScope, &ConstructorCall) -> Result<(), ScriptException> + Send + Sync,
>;

/// Arguments of a constructor callback.
pub struct ConstructorCall {
    /// The instance under construction.
    pub this: ObjectRef,
    /// Construction arguments.
    pub args: Vec<ScriptValue>,
    /// The opaque data the template was created with.
    pub data: Arc<dyn Any + Send + Sync>,
}

/// Everything needed to create a constructor template.
pub struct TemplateSpec {
    /// Script-visible class name.
    pub class_name: String,
    /// Constructor callback.
    pub callback: ConstructorCallback,
    /// Opaque data handed to every callback invocation.
    pub data: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for TemplateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSpec")
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

bitflags! {
    /// Modifiers of a template member.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemberFlags: u8 {
        /// Installed on the constructor instead of the prototype.
        const STATIC = 0x01;
        /// Accessor without a setter.
        const READ_ONLY = 0x02;
    }
}

/// A member installed on a constructor template.
#[derive(Debug, Clone)]
pub enum TemplateMember {
    /// A callable method.
    Method {
        /// The native implementation.
        function: NativeFn,
        /// Member flags.
        flags: MemberFlags,
    },
    /// A property backed by native getter/setter functions.
    Accessor {
        /// Getter, if readable.
        getter: Option<NativeFn>,
        /// Setter, if writable.
        setter: Option<NativeFn>,
        /// Member flags.
        flags: MemberFlags,
    },
}

impl TemplateMember {
    /// Member flags.
    pub fn flags(&self) -> MemberFlags {
        match self {
            TemplateMember::Method { flags, .. } | TemplateMember::Accessor { flags, .. } => *flags,
        }
    }

    /// Check if the member lives on the constructor.
    pub fn is_static(&self) -> bool {
        self.flags().contains(MemberFlags::STATIC)
    }
}

/// A script object held by a temporary strong handle until it is paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionalObject {
    /// The script object.
    pub object: ObjectRef,
    /// Temporary handle, released once the pairing adopts the object.
    pub persistent: PersistentHandle,
    /// Ownership the pairing will use.
    pub ownership: Ownership,
}

impl ProvisionalObject {
    /// Hold `object` until it is paired.
    pub fn hold(scope: &mut dyn EngineScope, object: ObjectRef, ownership: Ownership) -> Self {
        Self {
            object,
            persistent: scope.persist(object),
            ownership,
        }
    }
}

/// Release queued by a dropped native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRelease {
    /// The formerly paired script object.
    pub object: ObjectRef,
    /// Strong handle to release, for native ownership.
    pub persistent: Option<PersistentHandle>,
    /// External memory to give back.
    pub external_bytes: usize,
}

/// A script engine instance.
pub trait ScriptEngine: Send + Sync {
    /// The engine's identity.
    fn id(&self) -> EngineId;

    /// Acquire the engine's execution lock.
    ///
    /// Blocks while another scope is alive. Scopes are not reentrant.
    fn enter(&self) -> Box<dyn EngineScope + '_>;

    /// Queue a release to be applied on the next [`ScriptEngine::enter`].
    ///
    /// Must not block on the execution lock.
    fn schedule_release(&self, release: PendingRelease);
}

/// Exclusive access to a script engine.
pub trait EngineScope {
    /// The engine's identity.
    fn engine_id(&self) -> EngineId;

    /// Non-owning handle to the engine, stored in pairing records.
    fn engine_handle(&self) -> Weak<dyn ScriptEngine>;

    // ---- templates ---------------------------------------------------------

    /// Create a constructor template.
    fn create_template(&mut self, spec: TemplateSpec) -> TemplateId;

    /// Number of internal slots on instances of `template`.
    fn set_internal_slot_count(&mut self, template: TemplateId, count: usize);

    /// Make `template`'s prototype inherit from `parent`'s.
    fn inherit(&mut self, template: TemplateId, parent: TemplateId);

    /// Install a member on a template.
    fn set_template_member(&mut self, template: TemplateId, name: &str, member: TemplateMember);

    /// The template's parent, if it inherits.
    fn template_parent(&self, template: TemplateId) -> Option<TemplateId>;

    /// The template's script-visible class name.
    fn template_class_name(&self, template: TemplateId) -> Option<String>;

    /// Internal slot count of instances of `template`.
    fn template_slot_count(&self, template: TemplateId) -> usize;

    /// The template an object was instantiated from.
    fn template_of(&self, object: ObjectRef) -> Option<TemplateId>;

    /// Instantiate a template without running its constructor callback.
    fn new_instance(&mut self, template: TemplateId) -> ObjectRef;

    // ---- values ------------------------------------------------------------

    /// Create an empty plain object.
    fn new_object(&mut self) -> ObjectRef;

    /// Create an array.
    fn new_array(&mut self, elements: Vec<ScriptValue>) -> ObjectRef;

    /// Create a function backed by a native callable.
    fn new_function(&mut self, name: &str, function: NativeFn) -> ObjectRef;

    /// Create a symbol.
    fn new_symbol(&mut self, description: &str) -> SymbolId;

    /// The kind of a live object, `None` if it has been collected.
    fn object_kind(&self, object: ObjectRef) -> Option<ObjectKind>;

    /// Check if an object is still alive.
    fn is_alive(&self, object: ObjectRef) -> bool {
        self.object_kind(object).is_some()
    }

    // ---- properties and calls ---------------------------------------------

    /// Read a property, running accessors along the prototype chain.
    fn get_property(&mut self, object: ObjectRef, name: &str)
    -> Result<ScriptValue, ScriptException>;

    /// Write a property, running accessors along the prototype chain.
    fn set_property(
        &mut self,
        object: ObjectRef,
        name: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptException>;

    /// Own property names in insertion order.
    fn property_names(&self, object: ObjectRef) -> Vec<String>;

    /// Length of an array, `None` for non-arrays.
    fn array_length(&self, array: ObjectRef) -> Option<usize>;

    /// Read an array element, `None` if out of range.
    fn array_get(&self, array: ObjectRef, index: usize) -> Option<ScriptValue>;

    /// Write an array element, growing the array with `undefined` as needed.
    ///
    /// Returns false for non-arrays.
    fn array_set(&mut self, array: ObjectRef, index: usize, value: ScriptValue) -> bool;

    /// Call a function object.
    fn call_function(
        &mut self,
        function: ObjectRef,
        this: Option<ObjectRef>,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, ScriptException>;

    // ---- linkage -----------------------------------------------------------

    /// Read an object's internal linkage slot.
    fn linkage(&self, object: ObjectRef) -> Option<InternalSlot>;

    /// Write an object's internal linkage slot.
    ///
    /// Returns false if the object is gone.
    fn set_linkage(&mut self, object: ObjectRef, slot: Option<InternalSlot>) -> bool;

    // ---- references and accounting ----------------------------------------

    /// Keep an object alive until the handle is released.
    fn persist(&mut self, object: ObjectRef) -> PersistentHandle;

    /// Release a persistent handle.
    fn release(&mut self, handle: PersistentHandle);

    /// Adjust external memory attributed to script objects.
    ///
    /// Returns the new total.
    fn adjust_external_memory(&mut self, delta: i64) -> i64;
}
