//! Command and argument type tags for the wire protocol.

use std::fmt;

/// The command that begins a message.
///
/// `End` is a builder-level terminator: it closes the message currently
/// under construction and never appears inside a finalized message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Construct an object: NEW <class:string> <id:id_value>
    New = 0,
    /// Invoke a method: INVOKE <id:id_value> <method:string> <args...>
    Invoke,
    /// Release an object: DELETE <id:id_value>
    Delete,
    /// Alias an object under a new identifier: ASSIGN <id:id_value> <expr>
    Assign,
    /// The result of a successful dispatch.
    Reply,
    /// The result of a failed dispatch: ERROR <kind:uint32> <text:string>
    Error,
    /// Terminates the message currently under construction.
    End,
}

impl Command {
    /// Decode a wire tag back into a command.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::New),
            1 => Some(Self::Invoke),
            2 => Some(Self::Delete),
            3 => Some(Self::Assign),
            4 => Some(Self::Reply),
            5 => Some(Self::Error),
            6 => Some(Self::End),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Invoke => "Invoke",
            Self::Delete => "Delete",
            Self::Assign => "Assign",
            Self::Reply => "Reply",
            Self::Error => "Error",
            Self::End => "End",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The stored type of one argument.
///
/// Every `Argument` variant has exactly one tag here; the tag is what a
/// typed read is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArgType {
    Int8 = 0,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Int8Array,
    Int16Array,
    Int32Array,
    Int64Array,
    UInt8Array,
    UInt16Array,
    UInt32Array,
    UInt64Array,
    Float32Array,
    Float64Array,
    Bool,
    String,
    /// A reference to a registered object.
    ObjectRef,
    /// A nested message stream.
    Stream,
    /// A forward identifier reference, resolved before dispatch.
    IdValue,
}

impl ArgType {
    /// Decode a wire tag back into an argument type.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Int8),
            1 => Some(Self::Int16),
            2 => Some(Self::Int32),
            3 => Some(Self::Int64),
            4 => Some(Self::UInt8),
            5 => Some(Self::UInt16),
            6 => Some(Self::UInt32),
            7 => Some(Self::UInt64),
            8 => Some(Self::Float32),
            9 => Some(Self::Float64),
            10 => Some(Self::Int8Array),
            11 => Some(Self::Int16Array),
            12 => Some(Self::Int32Array),
            13 => Some(Self::Int64Array),
            14 => Some(Self::UInt8Array),
            15 => Some(Self::UInt16Array),
            16 => Some(Self::UInt32Array),
            17 => Some(Self::UInt64Array),
            18 => Some(Self::Float32Array),
            19 => Some(Self::Float64Array),
            20 => Some(Self::Bool),
            21 => Some(Self::String),
            22 => Some(Self::ObjectRef),
            23 => Some(Self::Stream),
            24 => Some(Self::IdValue),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::Int8Array
                | Self::Int16Array
                | Self::Int32Array
                | Self::Int64Array
                | Self::UInt8Array
                | Self::UInt16Array
                | Self::UInt32Array
                | Self::UInt64Array
                | Self::Float32Array
                | Self::Float64Array
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int8Array => "int8_array",
            Self::Int16Array => "int16_array",
            Self::Int32Array => "int32_array",
            Self::Int64Array => "int64_array",
            Self::UInt8Array => "uint8_array",
            Self::UInt16Array => "uint16_array",
            Self::UInt32Array => "uint32_array",
            Self::UInt64Array => "uint64_array",
            Self::Float32Array => "float32_array",
            Self::Float64Array => "float64_array",
            Self::Bool => "bool",
            Self::String => "string",
            Self::ObjectRef => "object_ref",
            Self::Stream => "stream",
            Self::IdValue => "id_value",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Machine-readable failure classes carried by Error replies.
///
/// An Error message's first argument is the kind as a uint32, its second
/// the human-readable description. The split lets a caller react to the
/// failure class (e.g. delegate on `UnknownMethod`) without parsing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorKind {
    UnknownClass = 1,
    UnknownMethod,
    NotFound,
    InvalidMessage,
    CommandFailed,
    ForeignError,
}

impl ErrorKind {
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::UnknownClass),
            2 => Some(Self::UnknownMethod),
            3 => Some(Self::NotFound),
            4 => Some(Self::InvalidMessage),
            5 => Some(Self::CommandFailed),
            6 => Some(Self::ForeignError),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UnknownClass => "unknown-class",
            Self::UnknownMethod => "unknown-method",
            Self::NotFound => "not-found",
            Self::InvalidMessage => "invalid-message",
            Self::CommandFailed => "command-failed",
            Self::ForeignError => "foreign-error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
