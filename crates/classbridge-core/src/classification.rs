//! Class classification.
//!
//! Every registered class is one of three kinds. Only [`Classification::Abstract`]
//! and [`Classification::Wrapper`] are produced by the built-in classes; the
//! persistent kind is representable so host registrations that carry it can
//! round-trip through the registry.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// How a native class is presented to scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Classification {
    /// No script presence of its own; exists only as a base.
    Abstract = 0,
    /// Native-owned; the script object is a thin view.
    Wrapper = 1,
    /// Value-like class whose state lives on the script side.
    Persistent = 2,
}

impl Classification {
    /// Whether a class of this kind may extend `base`.
    ///
    /// The abstract root is a valid base for every kind. Otherwise the base
    /// must have the same classification, which also means a `Wrapper` base
    /// only ever has `Wrapper` descendants.
    pub fn can_extend(self, base: Classification, base_is_root: bool) -> bool {
        base_is_root || self == base
    }

    /// Lowercase name used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Abstract => "abstract",
            Classification::Wrapper => "wrapper",
            Classification::Persistent => "persistent",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
