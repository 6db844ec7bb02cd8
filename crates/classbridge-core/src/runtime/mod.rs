//! Native callables and the in-memory reference runtime.
//!
//! ## Key Types
//!
//! - [`NativeFn`]: Type-erased callable wrapper for native functions
//! - [`CallContext`]: Bridge between the engine and Rust for function calls
//! - [`ObjectHeap`]: Generational arena backing [`MemoryEngine`]
//! - [`MemoryEngine`] / [`MemoryScope`]: Reference script engine
//! - [`MemoryHost`] / [`StaticBindings`]: Reference host runtime

mod call_context;
mod memory_engine;
mod memory_host;
mod native_fn;
mod object_heap;

pub use call_context::CallContext;
pub use memory_engine::{MemoryEngine, MemoryScope};
pub use memory_host::{MemoryHost, StaticBindings};
pub use native_fn::{NativeCallable, NativeFn};
pub use object_heap::{HeapHandle, ObjectHeap};
