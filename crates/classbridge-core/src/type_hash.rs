//! Deterministic hash-based class identity.
//!
//! [`TypeHash`] is a 64-bit hash computed from a canonical class name (or a
//! class plus member name). Identity never depends on registration order, so
//! a descriptor, its engine bindings and every native object's linkage can all
//! refer to a class by the same value.
//!
//! # Examples
//!
//! ```
//! use classbridge_core::TypeHash;
//!
//! let widget = TypeHash::from_name("app.Widget");
//! assert_eq!(widget, TypeHash::from_name("app.Widget"));
//!
//! let draw = TypeHash::from_member(widget, "draw", false);
//! let draw_static = TypeHash::from_member(widget, "draw", true);
//! assert_ne!(draw, draw_static);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Classes, instance members, static members and accessors hash into separate
/// domains so a class named `x` never collides with a member named `x`.
pub mod hash_constants {
    /// Domain marker for class hashes
    pub const CLASS: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for instance member hashes
    pub const MEMBER: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for static member hashes
    pub const STATIC_MEMBER: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for accessor hashes
    pub const ACCESSOR: u64 = 0x3e9f5d2a8c7b1403;

    /// Separator mixed between owner and member
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
}

/// A deterministic 64-bit hash identifying a class or one of its members.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a class hash from its canonical name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::CLASS ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a member hash from the owning class and the script-visible name.
    ///
    /// Static and instance members with the same name get different hashes.
    #[inline]
    pub fn from_member(owner: TypeHash, name: &str, is_static: bool) -> Self {
        let domain = if is_static {
            hash_constants::STATIC_MEMBER
        } else {
            hash_constants::MEMBER
        };
        let hash = (domain ^ owner.0)
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(xxh64(name.as_bytes(), 0));
        TypeHash(hash)
    }

    /// Create an accessor hash from the owning class and the property name.
    #[inline]
    pub fn from_accessor(owner: TypeHash, name: &str, is_static: bool) -> Self {
        let member = Self::from_member(owner, name, is_static);
        TypeHash(member.0 ^ hash_constants::ACCESSOR)
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_hash_determinism() {
        let a = TypeHash::from_name("app.Widget");
        let b = TypeHash::from_name("app.Widget");
        assert_eq!(a, b);
    }

    #[test]
    fn class_hash_uniqueness() {
        let names = ["app.Widget", "app.Button", "app.widget", "Widget", ""];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(TypeHash::from_name(a), TypeHash::from_name(b), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn member_hash_includes_owner() {
        let widget = TypeHash::from_name("app.Widget");
        let button = TypeHash::from_name("app.Button");
        assert_ne!(
            TypeHash::from_member(widget, "draw", false),
            TypeHash::from_member(button, "draw", false)
        );
    }

    #[test]
    fn static_and_instance_members_differ() {
        let widget = TypeHash::from_name("app.Widget");
        assert_ne!(
            TypeHash::from_member(widget, "count", false),
            TypeHash::from_member(widget, "count", true)
        );
    }

    #[test]
    fn accessor_differs_from_method() {
        let widget = TypeHash::from_name("app.Widget");
        assert_ne!(
            TypeHash::from_member(widget, "label", false),
            TypeHash::from_accessor(widget, "label", false)
        );
    }

    #[test]
    fn member_does_not_collide_with_class() {
        let owner = TypeHash::from_name("x");
        assert_ne!(TypeHash::from_member(owner, "x", false), owner);
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("app.Widget").is_empty());
    }

    #[test]
    fn hash_display() {
        let hash = TypeHash(0x1234);
        assert_eq!(format!("{hash}"), "0x0000000000001234");
        assert_eq!(format!("{hash:?}"), "TypeHash(0x0000000000001234)");
    }
}
