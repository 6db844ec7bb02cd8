//! Conversion traits for native callable arguments and return values.
//!
//! - [`FromScript`]: extract a Rust value from a [`ScriptValue`]
//! - [`IntoScript`]: convert a Rust value into a [`ScriptValue`]
//!
//! Scripts have one number type, so every numeric Rust type converts through
//! `f64`. Integer extraction rejects fractional and out-of-range numbers.
//!
//! ## Example
//!
//! ```
//! use classbridge_core::{FromScript, IntoScript, ScriptValue};
//!
//! let value = 42i32.into_script();
//! assert_eq!(value, ScriptValue::Number(42.0));
//! assert_eq!(i32::from_script(&value), Ok(42));
//! ```

use crate::error::ConversionError;
use crate::{ObjectRef, ScriptValue};

/// Extract a value from a script value.
pub trait FromScript: Sized {
    /// Extract a value, or report why the script value does not fit.
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError>;
}

/// Convert a value into a script value.
pub trait IntoScript {
    /// Convert this value.
    fn into_script(self) -> ScriptValue;
}

fn mismatch(expected: &'static str, value: &ScriptValue) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

// ============================================================================
// Numbers
// ============================================================================

macro_rules! impl_script_int {
    ($($ty:ty),*) => {
        $(
            impl FromScript for $ty {
                fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                    match value {
                        ScriptValue::Number(n) => {
                            if n.fract() == 0.0 && *n >= <$ty>::MIN as f64 && *n <= <$ty>::MAX as f64 {
                                Ok(*n as $ty)
                            } else {
                                Err(ConversionError::OutOfRange {
                                    value: *n,
                                    target_type: stringify!($ty),
                                })
                            }
                        }
                        _ => Err(mismatch("number", value)),
                    }
                }
            }

            impl IntoScript for $ty {
                fn into_script(self) -> ScriptValue {
                    ScriptValue::Number(self as f64)
                }
            }
        )*
    };
}

impl_script_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromScript for f64 {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        value.as_number().ok_or_else(|| mismatch("number", value))
    }
}

impl IntoScript for f64 {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Number(self)
    }
}

impl FromScript for f32 {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        f64::from_script(value).map(|n| n as f32)
    }
}

impl IntoScript for f32 {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Number(self as f64)
    }
}

// ============================================================================
// Other primitives
// ============================================================================

impl FromScript for bool {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Boolean(b) => Ok(*b),
            _ => Err(mismatch("boolean", value)),
        }
    }
}

impl IntoScript for bool {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Boolean(self)
    }
}

impl FromScript for String {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch("string", value))
    }
}

impl IntoScript for String {
    fn into_script(self) -> ScriptValue {
        ScriptValue::String(self)
    }
}

impl IntoScript for &str {
    fn into_script(self) -> ScriptValue {
        ScriptValue::String(self.to_owned())
    }
}

impl FromScript for ObjectRef {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        value.as_object().ok_or_else(|| mismatch("object", value))
    }
}

impl IntoScript for ObjectRef {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Object(self)
    }
}

impl FromScript for ScriptValue {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoScript for ScriptValue {
    fn into_script(self) -> ScriptValue {
        self
    }
}

impl IntoScript for () {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Undefined
    }
}

/// `null` and `undefined` both convert to `None`.
impl<T: FromScript> FromScript for Option<T> {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Null | ScriptValue::Undefined => Ok(None),
            other => T::from_script(other).map(Some),
        }
    }
}

impl<T: IntoScript> IntoScript for Option<T> {
    fn into_script(self) -> ScriptValue {
        match self {
            Some(value) => value.into_script(),
            None => ScriptValue::Null,
        }
    }
}
