//! classbridge proc macros
//!
//! # Macros
//!
//! - `#[derive(NativeClass)]` - Implement `NativeObject` and `NativeClass`
//!
//! # Example
//!
//! ```ignore
//! use classbridge::{Linkage, NativeClass};
//!
//! #[derive(NativeClass)]
//! #[bridge(name = "app.Widget")]
//! pub struct Widget {
//!     linkage: Linkage,
//!     pub width: u32,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive;

/// Derive `NativeObject` and `NativeClass` for a struct.
///
/// # Attributes
///
/// - `#[bridge(name = "...")]` - Canonical class name (default: struct name)
///
/// # Field Attributes
///
/// - `#[bridge(linkage)]` - The field holding the object's `Linkage`.
///   Without it, a field named `linkage` is used.
/// - `#[bridge(base)]` - An `Arc` of the registered base class's native
///   object. Lets the object be viewed as its base class.
///
/// # Example
///
/// ```ignore
/// #[derive(NativeClass)]
/// #[bridge(name = "app.Counter")]
/// pub struct Counter {
///     #[bridge(linkage)]
///     link: Linkage,
///     count: AtomicU32,
/// }
///
/// #[derive(NativeClass)]
/// #[bridge(name = "app.LapCounter")]
/// pub struct LapCounter {
///     linkage: Linkage,
///     #[bridge(base)]
///     counter: Arc<Counter>,
/// }
/// ```
#[proc_macro_derive(NativeClass, attributes(bridge))]
pub fn derive_native_class(input: TokenStream) -> TokenStream {
    derive::derive_native_class_impl(input)
}
