//! classbridge core
//!
//! Foundation types shared by the registry and the pairing protocol.
//!
//! ## Modules
//!
//! - [`type_hash`]: Deterministic class and member identity
//! - [`classification`]: Class kinds and their inheritance rules
//! - [`error`]: Error taxonomy and the fatal-error path
//! - [`values`]: Script and host values
//! - [`native`]: Native objects, linkage fields and pairing records
//! - [`engine`]: Script engine collaborator traits
//! - [`host`]: Host runtime collaborator traits
//! - [`config`]: Bridge configuration
//! - [`convert`]: Conversions for native callable arguments
//! - [`runtime`]: Native callables and the in-memory reference runtime

pub mod classification;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod host;
pub mod native;
pub mod runtime;
pub mod type_hash;
pub mod values;

pub use classification::Classification;
pub use config::BridgeConfig;
pub use convert::{FromScript, IntoScript};
pub use engine::{
    ConstructorCall, ConstructorCallback, EngineScope, MemberFlags, PendingRelease,
    PersistentHandle, ProvisionalObject, ScriptEngine, TemplateId, TemplateMember, TemplateSpec,
};
pub use error::{
    BindingError, BridgeError, ConversionError, ExceptionKind, MarshalError, NativeError,
    RegistrationError, ScriptException, fatal,
};
pub use host::{AccessorBinding, BindingProvider, FunctionBinding, HostRuntime};
pub use native::{
    InternalSlot, Linkage, NativeClass, NativeObject, Ownership, PairingRecord, downcast_native,
};
pub use runtime::{CallContext, NativeCallable, NativeFn};
pub use type_hash::TypeHash;
pub use values::{EngineId, HostValue, ObjectKind, ObjectRef, ScriptValue, SymbolId};
