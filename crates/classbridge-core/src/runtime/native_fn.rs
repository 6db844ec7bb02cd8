//! Native function storage and callable trait.

use std::fmt;
use std::sync::Arc;

use crate::TypeHash;
use crate::error::NativeError;

use super::CallContext;

/// Type-erased native function.
///
/// Wraps any callable implementing [`NativeCallable`] so functions of
/// different shapes are stored uniformly. The callable sits behind an `Arc`;
/// clones share it.
#[derive(Clone)]
pub struct NativeFn {
    /// Identity of the function, usually a member hash of its owning class.
    pub id: TypeHash,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    /// Create a new NativeFn from a closure with a specific ID.
    pub fn new<F>(id: TypeHash, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self {
            id,
            inner: Arc::new(f),
        }
    }

    /// Create a NativeFn from any callable.
    pub fn from_callable<C>(id: TypeHash, callable: C) -> Self
    where
        C: NativeCallable + Send + Sync + 'static,
    {
        Self {
            id,
            inner: Arc::new(callable),
        }
    }

    /// Call this native function with the given context.
    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        self.inner.call(ctx)
    }

    /// The same callable under a different ID.
    pub fn with_id(&self, id: TypeHash) -> Self {
        Self {
            id,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Check if two functions share the same callable.
    pub fn same_callable(&self, other: &NativeFn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Trait for callable native functions.
///
/// The `call` method receives a [`CallContext`] giving access to the
/// receiver, the arguments and the engine, and holding the return value.
pub trait NativeCallable {
    /// Call this function with the given context.
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), NativeError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        (self)(ctx)
    }
}
