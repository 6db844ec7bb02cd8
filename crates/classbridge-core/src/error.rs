//! Unified error types for classbridge.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError (top-level wrapper)
//! ├── RegistrationError - refused class registrations (configuration errors)
//! ├── BindingError      - broken binding setup (invariant errors, fatal)
//! ├── MarshalError      - values with no counterpart on the other side (fatal)
//! ├── ScriptException   - catchable by script code
//! └── NativeError       - failures raised by native callables
//! ```
//!
//! Configuration errors are returned to the caller, who may retry with a
//! corrected registration. Binding and marshalling errors mean the binding
//! setup itself is wrong; the public entry points hand them to [`fatal`].
//! Script exceptions surface to script code and never abort the process.

use std::fmt;

use thiserror::Error;

use crate::{Classification, EngineId};

// ============================================================================
// Script Exceptions
// ============================================================================

/// Script-visible error class of a [`ScriptException`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Generic `Error`.
    Error,
    /// `TypeError`, used for construction-policy violations.
    TypeError,
    /// `RangeError`.
    RangeError,
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExceptionKind::Error => "Error",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::RangeError => "RangeError",
        })
    }
}

/// An exception thrown into script code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScriptException {
    /// Script-visible error class.
    pub kind: ExceptionKind,
    /// Human readable message.
    pub message: String,
}

impl ScriptException {
    /// Create an exception of the given kind.
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a generic `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Error, message)
    }

    /// Create a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    /// Create a `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::RangeError, message)
    }
}

// ============================================================================
// Native Callable Errors
// ============================================================================

/// Errors converting a script value into a Rust value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value has a different type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type name.
        expected: &'static str,
        /// The actual value type name.
        actual: &'static str,
    },

    /// The number does not fit the target integer type.
    #[error("number {value} does not fit in {target_type}")]
    OutOfRange {
        /// The number that was converted.
        value: f64,
        /// The target Rust type.
        target_type: &'static str,
    },
}

/// Errors raised by native callables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// An argument could not be converted.
    #[error("argument {index}: {source}")]
    Argument {
        /// Argument position.
        index: usize,
        /// Underlying conversion failure.
        source: ConversionError,
    },

    /// The receiver is missing or not of the expected class.
    #[error("invalid receiver: {0}")]
    InvalidThis(String),

    /// The callable threw a script exception.
    #[error(transparent)]
    Exception(#[from] ScriptException),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl NativeError {
    /// Create an `InvalidThis` error.
    pub fn invalid_this(msg: impl Into<String>) -> Self {
        NativeError::InvalidThis(msg.into())
    }

    /// Create an `Other` error.
    pub fn other(msg: impl Into<String>) -> Self {
        NativeError::Other(msg.into())
    }
}

impl From<NativeError> for ScriptException {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::Exception(exception) => exception,
            NativeError::Argument { .. } | NativeError::InvalidThis(_) => {
                ScriptException::type_error(err.to_string())
            }
            NativeError::Other(msg) => ScriptException::error(msg),
        }
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Refused class registrations.
///
/// No descriptor is created or modified when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// The named base class has not been registered yet.
    #[error("class '{class}' extends unregistered base '{base}'")]
    MissingBase {
        /// The class being registered.
        class: String,
        /// The missing base.
        base: String,
    },

    /// The base class has a classification this class may not extend.
    #[error("{classification} class '{class}' cannot extend {base_classification} class '{base}'")]
    IncompatibleClassification {
        /// The class being registered.
        class: String,
        /// Its classification.
        classification: Classification,
        /// The resolved base.
        base: String,
        /// The base's classification.
        base_classification: Classification,
    },

    /// A raw classification code outside the known kinds.
    #[error("class '{class}' has unknown classification code {code}")]
    InvalidClassification {
        /// The class being registered.
        class: String,
        /// The raw code.
        code: u8,
    },

    /// The root class must be abstract.
    #[error("root class '{class}' must be abstract, not {classification}")]
    NonAbstractRoot {
        /// The configured root class.
        class: String,
        /// The classification it was registered with.
        classification: Classification,
    },
}

// ============================================================================
// Binding Errors
// ============================================================================

/// Broken binding setup.
///
/// These are programmer errors. Public entry points pass them to [`fatal`];
/// the `try_*` variants return them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    /// A class name that was never registered.
    #[error("class '{0}' is not registered")]
    UnknownClass(String),

    /// A class other than the root registered without a base.
    #[error("class '{0}' has no base class and is not the root class")]
    RootlessClass(String),

    /// A native object whose linkage carries no class.
    #[error("native object has no class linkage")]
    UnlinkedHostObject,

    /// A native object that is already paired.
    #[error("native object of class '{0}' is already paired")]
    AlreadyPaired(String),

    /// A script object that is already linked to a live native object.
    #[error("script object is already linked to a native object of class '{0}'")]
    ObjectAlreadyLinked(String),

    /// Binding metadata names a callable the host cannot resolve.
    #[error("class '{class}' binds '{property}' to unknown native callable '{native}'")]
    UnresolvedCallable {
        /// The class whose metadata was read.
        class: String,
        /// Script-visible property.
        property: String,
        /// Native callable name.
        native: String,
    },

    /// A binding whose descriptor no longer exists.
    #[error("binding for '{0}' outlived its descriptor")]
    DetachedBinding(String),

    /// The paired script object no longer exists.
    #[error("script object paired with '{0}' has been released")]
    StalePairing(String),

    /// A native object paired with one engine used on another.
    #[error("native object is paired with engine {paired}, not engine {requested}")]
    ForeignEngine {
        /// Engine the object is paired with.
        paired: EngineId,
        /// Engine it was used with.
        requested: EngineId,
    },
}

// ============================================================================
// Marshalling Errors
// ============================================================================

/// Values that have no representation on the other side.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    /// Script symbols have no host representation.
    #[error("symbols cannot be converted to host values")]
    UnsupportedSymbol,

    /// A script value kind outside the conversion table.
    #[error("unexpected script value kind '{0}'")]
    UnexpectedKind(&'static str),

    /// An object reference to a collected script object.
    #[error("script object has been collected")]
    StaleObject,

    /// Wrapping the value required pairing, which failed.
    #[error(transparent)]
    Binding(#[from] BindingError),
}

// ============================================================================
// Unified Error
// ============================================================================

/// Top-level error type for classbridge.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// A refused registration.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A broken binding setup.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// An unconvertible value.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// A script exception.
    #[error(transparent)]
    Exception(#[from] ScriptException),

    /// A native callable failure.
    #[error(transparent)]
    Native(#[from] NativeError),
}

impl BridgeError {
    /// Check if this is a registration error.
    pub fn is_registration(&self) -> bool {
        matches!(self, BridgeError::Registration(_))
    }

    /// Check if this error should abort rather than be handled.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Binding(_) | BridgeError::Marshal(_))
    }
}

/// Abort on a broken binding setup.
///
/// Continuing would corrupt the registry or duplicate script-visible types,
/// so the error is logged and the thread panics.
#[track_caller]
pub fn fatal(err: impl Into<BridgeError>) -> ! {
    let err = err.into();
    tracing::error!(target: "classbridge", error = %err, "fatal binding error");
    panic!("classbridge: {err}")
}
