//! Error types for the wire protocol and the interpreter.

use thiserror::Error;

use crate::registry::ObjectId;
use crate::stream::ArgType;

/// Errors produced when reading or decoding a message stream.
///
/// Decode errors are always propagated to the caller of the read; the
/// stream never hands back a value whose stored tag did not match the
/// requested type.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Argument type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ArgType, found: ArgType },

    #[error("Array length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("No message at index {0}")]
    NoSuchMessage(usize),

    #[error("Message {message} has no argument at index {argument}")]
    NoSuchArgument { message: usize, argument: usize },

    #[error("Stream is invalid (argument appended outside a message)")]
    InvalidStream,

    #[error("Bad magic bytes: not a wirecall stream")]
    BadMagic,

    #[error("Unsupported stream format version {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown command tag {0:#04x}")]
    BadCommandTag(u8),

    #[error("Unknown argument type tag {0:#04x}")]
    BadTypeTag(u8),

    #[error("Truncated stream: needed {needed} more bytes, {remaining} remain")]
    Truncated { needed: usize, remaining: usize },

    #[error("Invalid UTF-8 in string argument")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Corrupt stream: {0}")]
    Corrupt(String),
}

impl DecodeError {
    pub fn type_mismatch(expected: ArgType, found: ArgType) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub fn length_mismatch(expected: usize, found: usize) -> Self {
        Self::LengthMismatch { expected, found }
    }

    pub fn truncated(needed: usize, remaining: usize) -> Self {
        Self::Truncated { needed, remaining }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }
}

/// Errors from the object registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Identifier {0} is already registered")]
    DuplicateId(ObjectId),

    #[error("No object registered under identifier {0}")]
    NotFound(ObjectId),

    #[error("The null identifier cannot be registered")]
    NullId,
}

/// Errors reported by constructor and command functions.
///
/// `UnknownClass` and `UnknownMethod` are distinct so that an embedding
/// application can tell "nothing handles this class" apart from "the
/// handler does not recognize this method" and implement its own
/// delegation on top.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No capability registered for class '{0}'")]
    UnknownClass(String),

    #[error("Class '{class}' has no method '{method}'")]
    UnknownMethod { class: String, method: String },

    #[error("Command failed: {0}")]
    Failed(String),

    #[error("Foreign runtime error: {0}")]
    Foreign(String),
}

impl CommandError {
    pub fn unknown_class(class: impl Into<String>) -> Self {
        Self::UnknownClass(class.into())
    }

    pub fn unknown_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            class: class.into(),
            method: method.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn foreign(message: impl Into<String>) -> Self {
        Self::Foreign(message.into())
    }
}

/// Errors raised inside the foreign-adapter shim.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// An exception raised by foreign code, carrying its diagnostic text.
    #[error("{0}")]
    Raised(String),

    /// A value that cannot be represented on the wire (or a wire value
    /// that cannot be represented in the foreign runtime).
    #[error("Cannot marshal value: {0}")]
    Unmarshalable(String),

    #[error("Attribute '{attribute}' of class '{class}' is not callable")]
    NotCallable { class: String, attribute: String },
}

impl AdapterError {
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }

    pub fn unmarshalable(message: impl Into<String>) -> Self {
        Self::Unmarshalable(message.into())
    }
}

/// A unified error type for embedding hosts.
#[derive(Debug, Error)]
pub enum WirecallError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
