//! Native objects and their linkage to script objects.
//!
//! Every native object that can cross into a script engine embeds a
//! [`Linkage`]. The linkage names the object's registered class and, once the
//! object is paired, holds the [`PairingRecord`] describing its script
//! counterpart.
//!
//! ## Ownership
//!
//! A pairing has exactly one strong edge:
//!
//! - [`Ownership::Native`]: the record holds a persistent handle keeping the
//!   script object alive; the script object's internal slot holds a `Weak`
//!   back to the native.
//! - [`Ownership::Script`]: the script object's internal slot owns the native;
//!   the record holds no handle. Collecting the script object drops the slot,
//!   which drops the native and releases its record.
//!
//! Records are released when the native is dropped. The release is queued on
//! the engine with [`ScriptEngine::schedule_release`] since the drop may run
//! while that engine is locked.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use crate::engine::{PendingRelease, PersistentHandle, ScriptEngine};
use crate::{EngineId, ObjectRef, TypeHash};

/// A host object that can be paired with a script object.
///
/// Usually implemented with `#[derive(NativeClass)]`.
pub trait NativeObject: Any + Send + Sync {
    /// The object's linkage field.
    fn linkage(&self) -> &Linkage;

    /// Convert to `Any` for downcasting.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// View the object as an instance of `class`, its own class or one of
    /// its native base classes.
    ///
    /// A subclass embeds its base object and forwards requests for ancestor
    /// classes to it. The default offers the object itself and leaves the
    /// class check to the downcast.
    fn upcast(self: Arc<Self>, class: TypeHash) -> Option<Arc<dyn Any + Send + Sync>> {
        let _ = class;
        Some(self.into_any())
    }
}

/// A concrete native class with a canonical name.
pub trait NativeClass: NativeObject + Sized {
    /// Globally unique class name, the registry key.
    const CANONICAL_NAME: &'static str;

    /// Bytes reported to the script collector for each paired instance.
    const FOOTPRINT: usize = std::mem::size_of::<Self>();

    /// Hash of [`Self::CANONICAL_NAME`].
    fn class_hash() -> TypeHash {
        TypeHash::from_name(Self::CANONICAL_NAME)
    }
}

/// View a native object as class `T`.
///
/// Succeeds for an object of class `T` and for a subclass embedding a `T`
/// as its base. Returns `None` for any other class.
pub fn downcast_native<T: NativeClass>(object: Arc<dyn NativeObject>) -> Option<Arc<T>> {
    object.upcast(T::class_hash())?.downcast::<T>().ok()
}

/// Which side of a pairing owns the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The native keeps the script object alive.
    Native,
    /// The script object keeps the native alive.
    Script,
}

/// State of an established pairing.
pub struct PairingRecord {
    /// Engine holding the script object.
    pub engine: EngineId,
    /// Handle used to queue the release.
    pub engine_handle: Weak<dyn ScriptEngine>,
    /// The paired script object.
    pub object: ObjectRef,
    /// Which side owns the other.
    pub ownership: Ownership,
    /// Strong handle to the script object, for native ownership.
    pub persistent: Option<PersistentHandle>,
    /// External memory reported to the engine for this pairing.
    pub external_bytes: usize,
}

impl fmt::Debug for PairingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingRecord")
            .field("engine", &self.engine)
            .field("object", &self.object)
            .field("ownership", &self.ownership)
            .field("persistent", &self.persistent)
            .field("external_bytes", &self.external_bytes)
            .finish_non_exhaustive()
    }
}

/// The linkage field embedded in every native object.
#[derive(Default)]
pub struct Linkage {
    class: OnceLock<TypeHash>,
    record: OnceLock<PairingRecord>,
}

impl Linkage {
    /// Linkage for an object of the given canonical class.
    pub fn new(canonical_name: &str) -> Self {
        Self::for_class(TypeHash::from_name(canonical_name))
    }

    /// Linkage for an object of class `T`.
    pub fn of<T: NativeClass>() -> Self {
        Self::for_class(T::class_hash())
    }

    /// Linkage for an object with the given class hash.
    pub fn for_class(class: TypeHash) -> Self {
        let linkage = Self::unset();
        // A fresh OnceLock always accepts the first value.
        let _ = linkage.class.set(class);
        linkage
    }

    /// Linkage with no class. Pairing such an object is a fatal error.
    pub fn unset() -> Self {
        Self {
            class: OnceLock::new(),
            record: OnceLock::new(),
        }
    }

    /// The object's class, if set.
    pub fn class(&self) -> Option<TypeHash> {
        self.class.get().copied()
    }

    /// Set the class of an object created with [`Linkage::unset`].
    ///
    /// Returns false if a class was already set.
    pub fn bind_class(&self, class: TypeHash) -> bool {
        self.class.set(class).is_ok()
    }

    /// The pairing record, once paired.
    pub fn record(&self) -> Option<&PairingRecord> {
        self.record.get()
    }

    /// Check if the object has been paired.
    pub fn is_paired(&self) -> bool {
        self.record.get().is_some()
    }

    /// Store the pairing record.
    ///
    /// A record is set exactly once; a second call hands the record back.
    pub fn set_record(&self, record: PairingRecord) -> Result<(), PairingRecord> {
        self.record.set(record)
    }
}

impl fmt::Debug for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linkage")
            .field("class", &self.class())
            .field("record", &self.record())
            .finish()
    }
}

impl Drop for Linkage {
    fn drop(&mut self) {
        let Some(record) = self.record.take() else {
            return;
        };
        if let Some(engine) = record.engine_handle.upgrade() {
            engine.schedule_release(PendingRelease {
                object: record.object,
                persistent: record.persistent,
                external_bytes: record.external_bytes,
            });
        }
    }
}

/// Content of a script object's internal linkage slot.
#[derive(Clone)]
pub enum InternalSlot {
    /// The script object owns the native.
    Owned(Arc<dyn NativeObject>),
    /// Back-reference to a native that owns the script object.
    Linked(Weak<dyn NativeObject>),
}

impl InternalSlot {
    /// The paired native object, if still alive.
    pub fn native(&self) -> Option<Arc<dyn NativeObject>> {
        match self {
            InternalSlot::Owned(native) => Some(Arc::clone(native)),
            InternalSlot::Linked(native) => native.upgrade(),
        }
    }

    /// Check if the slot still refers to a live native.
    pub fn is_live(&self) -> bool {
        match self {
            InternalSlot::Owned(_) => true,
            InternalSlot::Linked(native) => native.strong_count() > 0,
        }
    }
}

impl fmt::Debug for InternalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalSlot::Owned(_) => f.write_str("Owned(..)"),
            InternalSlot::Linked(weak) => f
                .debug_struct("Linked")
                .field("live", &(weak.strong_count() > 0))
                .finish(),
        }
    }
}
