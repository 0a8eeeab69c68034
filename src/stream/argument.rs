//! The tagged argument union and typed conversions.

use std::fmt;

use crate::error::DecodeError;
use crate::registry::ObjectId;
use crate::stream::command::ArgType;
use crate::stream::stream::MessageStream;

/// One argument of a message.
///
/// Exactly one variant per [`ArgType`]. Arrays carry their element count
/// as the `Vec` length; scalars report length 0.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    UInt8Array(Vec<u8>),
    UInt16Array(Vec<u16>),
    UInt32Array(Vec<u32>),
    UInt64Array(Vec<u64>),
    Float32Array(Vec<f32>),
    Float64Array(Vec<f64>),
    Bool(bool),
    String(String),
    /// A reference to a registered object.
    ObjectRef(ObjectId),
    /// A nested message stream.
    Stream(MessageStream),
    /// A forward identifier reference, expanded before dispatch.
    IdValue(ObjectId),
}

impl Argument {
    /// The stored type tag of this argument.
    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::Int8(_) => ArgType::Int8,
            Self::Int16(_) => ArgType::Int16,
            Self::Int32(_) => ArgType::Int32,
            Self::Int64(_) => ArgType::Int64,
            Self::UInt8(_) => ArgType::UInt8,
            Self::UInt16(_) => ArgType::UInt16,
            Self::UInt32(_) => ArgType::UInt32,
            Self::UInt64(_) => ArgType::UInt64,
            Self::Float32(_) => ArgType::Float32,
            Self::Float64(_) => ArgType::Float64,
            Self::Int8Array(_) => ArgType::Int8Array,
            Self::Int16Array(_) => ArgType::Int16Array,
            Self::Int32Array(_) => ArgType::Int32Array,
            Self::Int64Array(_) => ArgType::Int64Array,
            Self::UInt8Array(_) => ArgType::UInt8Array,
            Self::UInt16Array(_) => ArgType::UInt16Array,
            Self::UInt32Array(_) => ArgType::UInt32Array,
            Self::UInt64Array(_) => ArgType::UInt64Array,
            Self::Float32Array(_) => ArgType::Float32Array,
            Self::Float64Array(_) => ArgType::Float64Array,
            Self::Bool(_) => ArgType::Bool,
            Self::String(_) => ArgType::String,
            Self::ObjectRef(_) => ArgType::ObjectRef,
            Self::Stream(_) => ArgType::Stream,
            Self::IdValue(_) => ArgType::IdValue,
        }
    }

    /// Array element count; 0 for scalars, strings, refs and streams.
    pub fn len(&self) -> usize {
        match self {
            Self::Int8Array(v) => v.len(),
            Self::Int16Array(v) => v.len(),
            Self::Int32Array(v) => v.len(),
            Self::Int64Array(v) => v.len(),
            Self::UInt8Array(v) => v.len(),
            Self::UInt16Array(v) => v.len(),
            Self::UInt32Array(v) => v.len(),
            Self::UInt64Array(v) => v.len(),
            Self::Float32Array(v) => v.len(),
            Self::Float64Array(v) => v.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_array<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt8(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float32(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::Int8Array(v) => write_array(f, v),
            Self::Int16Array(v) => write_array(f, v),
            Self::Int32Array(v) => write_array(f, v),
            Self::Int64Array(v) => write_array(f, v),
            Self::UInt8Array(v) => write_array(f, v),
            Self::UInt16Array(v) => write_array(f, v),
            Self::UInt32Array(v) => write_array(f, v),
            Self::UInt64Array(v) => write_array(f, v),
            Self::Float32Array(v) => write_array(f, v),
            Self::Float64Array(v) => write_array(f, v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::ObjectRef(id) => write!(f, "{}", id),
            Self::Stream(s) => write!(f, "<stream: {} messages>", s.message_count()),
            Self::IdValue(id) => write!(f, "${}", id.raw()),
        }
    }
}

/// Values that can be appended to a stream as a single argument.
pub trait ToArgument {
    fn to_argument(self) -> Argument;
}

/// Values that can be read back out of a stored argument.
///
/// A read fails with [`DecodeError`] if the stored tag does not match the
/// requested type, or if a fixed-length array read does not match the
/// stored element count.
pub trait FromArgument: Sized {
    fn from_argument(arg: &Argument) -> Result<Self, DecodeError>;
}

macro_rules! scalar_argument {
    ($ty:ty, $variant:ident) => {
        impl ToArgument for $ty {
            fn to_argument(self) -> Argument {
                Argument::$variant(self)
            }
        }

        impl FromArgument for $ty {
            fn from_argument(arg: &Argument) -> Result<Self, DecodeError> {
                match arg {
                    Argument::$variant(v) => Ok(v.clone()),
                    other => Err(DecodeError::type_mismatch(
                        ArgType::$variant,
                        other.arg_type(),
                    )),
                }
            }
        }
    };
}

scalar_argument!(i8, Int8);
scalar_argument!(i16, Int16);
scalar_argument!(i32, Int32);
scalar_argument!(i64, Int64);
scalar_argument!(u8, UInt8);
scalar_argument!(u16, UInt16);
scalar_argument!(u32, UInt32);
scalar_argument!(u64, UInt64);
scalar_argument!(f32, Float32);
scalar_argument!(f64, Float64);
scalar_argument!(bool, Bool);
scalar_argument!(String, String);

impl ToArgument for &str {
    fn to_argument(self) -> Argument {
        Argument::String(self.to_string())
    }
}

macro_rules! array_argument {
    ($elem:ty, $variant:ident) => {
        impl ToArgument for Vec<$elem> {
            fn to_argument(self) -> Argument {
                Argument::$variant(self)
            }
        }

        impl ToArgument for &[$elem] {
            fn to_argument(self) -> Argument {
                Argument::$variant(self.to_vec())
            }
        }

        impl<const N: usize> ToArgument for [$elem; N] {
            fn to_argument(self) -> Argument {
                Argument::$variant(self.to_vec())
            }
        }

        impl FromArgument for Vec<$elem> {
            fn from_argument(arg: &Argument) -> Result<Self, DecodeError> {
                match arg {
                    Argument::$variant(v) => Ok(v.clone()),
                    other => Err(DecodeError::type_mismatch(
                        ArgType::$variant,
                        other.arg_type(),
                    )),
                }
            }
        }

        impl<const N: usize> FromArgument for [$elem; N] {
            fn from_argument(arg: &Argument) -> Result<Self, DecodeError> {
                match arg {
                    Argument::$variant(v) => {
                        if v.len() != N {
                            return Err(DecodeError::length_mismatch(N, v.len()));
                        }
                        let mut out = [<$elem>::default(); N];
                        out.copy_from_slice(v);
                        Ok(out)
                    }
                    other => Err(DecodeError::type_mismatch(
                        ArgType::$variant,
                        other.arg_type(),
                    )),
                }
            }
        }
    };
}

array_argument!(i8, Int8Array);
array_argument!(i16, Int16Array);
array_argument!(i32, Int32Array);
array_argument!(i64, Int64Array);
array_argument!(u8, UInt8Array);
array_argument!(u16, UInt16Array);
array_argument!(u32, UInt32Array);
array_argument!(u64, UInt64Array);
array_argument!(f32, Float32Array);
array_argument!(f64, Float64Array);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let arg = 42i32.to_argument();
        assert_eq!(arg.arg_type(), ArgType::Int32);
        assert_eq!(i32::from_argument(&arg).unwrap(), 42);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let arg = 42i32.to_argument();
        let err = i64::from_argument(&arg).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch {
                expected: ArgType::Int64,
                found: ArgType::Int32
            }
        ));
    }

    #[test]
    fn test_fixed_array_length_is_checked() {
        let arg = vec![1.0f64, 2.0, 3.0].to_argument();
        assert_eq!(arg.len(), 3);

        let ok: [f64; 3] = FromArgument::from_argument(&arg).unwrap();
        assert_eq!(ok, [1.0, 2.0, 3.0]);

        let err = <[f64; 4]>::from_argument(&arg).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LengthMismatch {
                expected: 4,
                found: 3
            }
        ));
    }

    #[test]
    fn test_vec_read_accepts_any_length() {
        let arg = [5u16, 6, 7].to_argument();
        assert_eq!(Vec::<u16>::from_argument(&arg).unwrap(), vec![5, 6, 7]);
    }

    #[test]
    fn test_scalar_length_is_zero() {
        assert_eq!("hello".to_argument().len(), 0);
        assert_eq!(true.to_argument().len(), 0);
        assert_eq!(Argument::ObjectRef(ObjectId(9)).len(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", 7u8.to_argument()), "7");
        assert_eq!(format!("{}", vec![1i32, 2].to_argument()), "[1, 2]");
        assert_eq!(format!("{}", "hi".to_argument()), "\"hi\"");
        assert_eq!(format!("{}", Argument::ObjectRef(ObjectId(3))), "#3");
        assert_eq!(format!("{}", Argument::IdValue(ObjectId(3))), "$3");
    }
}
