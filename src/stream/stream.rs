//! The message stream: an append-then-freeze sequence of messages.

use std::fmt;
use std::path::Path;

use crate::error::{DecodeError, WirecallError};
use crate::registry::ObjectId;
use crate::stream::argument::{Argument, FromArgument, ToArgument};
use crate::stream::codec;
use crate::stream::command::{ArgType, Command, ErrorKind};
use crate::stream::printer;

/// One `(command, arguments...)` record.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub command: Command,
    pub args: Vec<Argument>,
}

impl Message {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            args: Vec::new(),
        }
    }

    pub fn with_args(command: Command, args: Vec<Argument>) -> Self {
        Self { command, args }
    }

    /// Build a Reply message from already-expanded arguments.
    pub fn reply(args: Vec<Argument>) -> Self {
        Self::with_args(Command::Reply, args)
    }

    /// Build an Error message carrying a machine-readable kind and text.
    pub fn error(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self::with_args(
            Command::Error,
            vec![Argument::UInt32(kind as u32), Argument::String(text.into())],
        )
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.args.get(index)
    }

    /// Typed read of one argument.
    pub fn get<T: FromArgument>(&self, index: usize) -> Result<T, DecodeError> {
        let arg = self.args.get(index).ok_or(DecodeError::NoSuchArgument {
            message: 0,
            argument: index,
        })?;
        T::from_argument(arg)
    }

    /// Read an object reference argument.
    pub fn get_object_ref(&self, index: usize) -> Result<ObjectId, DecodeError> {
        match self.args.get(index) {
            Some(Argument::ObjectRef(id)) => Ok(*id),
            Some(other) => Err(DecodeError::type_mismatch(
                ArgType::ObjectRef,
                other.arg_type(),
            )),
            None => Err(DecodeError::NoSuchArgument {
                message: 0,
                argument: index,
            }),
        }
    }

    /// The failure class of an Error message, if this is one.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if self.command != Command::Error {
            return None;
        }
        match self.args.first() {
            Some(Argument::UInt32(code)) => ErrorKind::from_u32(*code),
            _ => None,
        }
    }

    /// The description text of an Error message, if this is one.
    pub fn error_text(&self) -> Option<&str> {
        if self.command != Command::Error {
            return None;
        }
        match self.args.get(1) {
            Some(Argument::String(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.command == Command::Reply
    }

    pub fn is_error(&self) -> bool {
        self.command == Command::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", printer::dump_message(self))
    }
}

/// An ordered, append-only, then frozen sequence of messages.
///
/// Appending a non-`End` command begins a new message (implicitly
/// terminating any message still open); `End` terminates the open
/// message explicitly. Appending an argument while no message is open
/// marks the whole stream invalid; only `reset` recovers. Queries see
/// finalized messages only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStream {
    messages: Vec<Message>,
    building: Option<Message>,
    invalid: bool,
}

impl MessageStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all content, including a partially-built message.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.building = None;
        self.invalid = false;
    }

    /// False once an argument was appended outside a message.
    pub fn is_valid(&self) -> bool {
        !self.invalid
    }

    /// Begin a new message, or terminate the open one with `End`.
    pub fn append_command(&mut self, command: Command) -> &mut Self {
        if command == Command::End {
            if let Some(message) = self.building.take() {
                self.messages.push(message);
            }
        } else {
            if let Some(message) = self.building.take() {
                self.messages.push(message);
            }
            self.building = Some(Message::new(command));
        }
        self
    }

    /// Append a typed argument to the open message.
    pub fn append<T: ToArgument>(&mut self, value: T) -> &mut Self {
        self.append_argument(value.to_argument())
    }

    /// Append an already-built argument to the open message.
    pub fn append_argument(&mut self, arg: Argument) -> &mut Self {
        if let Argument::Stream(nested) = &arg {
            if !nested.is_valid() {
                self.invalid = true;
                return self;
            }
        }
        match self.building.as_mut() {
            Some(message) => message.args.push(arg),
            None => self.invalid = true,
        }
        self
    }

    /// Append a reference to a registered object.
    pub fn append_object_ref(&mut self, id: ObjectId) -> &mut Self {
        self.append_argument(Argument::ObjectRef(id))
    }

    /// Append a forward identifier reference.
    pub fn append_id_value(&mut self, id: ObjectId) -> &mut Self {
        self.append_argument(Argument::IdValue(id))
    }

    /// Append a nested stream.
    pub fn append_stream(&mut self, stream: MessageStream) -> &mut Self {
        self.append_argument(Argument::Stream(stream))
    }

    /// Append a complete message record.
    pub fn append_message(&mut self, message: &Message) -> &mut Self {
        self.append_command(message.command);
        for arg in &message.args {
            self.append_argument(arg.clone());
        }
        self.append_command(Command::End)
    }

    /// Number of finalized messages; 0 for an invalid stream.
    pub fn message_count(&self) -> usize {
        if self.invalid {
            0
        } else {
            self.messages.len()
        }
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        if self.invalid {
            None
        } else {
            self.messages.get(index)
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn command_of(&self, index: usize) -> Result<Command, DecodeError> {
        Ok(self.checked_message(index)?.command)
    }

    pub fn argument_count(&self, index: usize) -> Result<usize, DecodeError> {
        Ok(self.checked_message(index)?.args.len())
    }

    pub fn argument_type(&self, message: usize, argument: usize) -> Result<ArgType, DecodeError> {
        Ok(self.checked_argument(message, argument)?.arg_type())
    }

    /// Array element count of an argument; 0 for scalars.
    pub fn argument_length(&self, message: usize, argument: usize) -> Result<usize, DecodeError> {
        Ok(self.checked_argument(message, argument)?.len())
    }

    /// Typed read of one argument of one message.
    pub fn get<T: FromArgument>(&self, message: usize, argument: usize) -> Result<T, DecodeError> {
        T::from_argument(self.checked_argument(message, argument)?)
    }

    /// Read an object reference argument.
    pub fn get_object_ref(&self, message: usize, argument: usize) -> Result<ObjectId, DecodeError> {
        match self.checked_argument(message, argument)? {
            Argument::ObjectRef(id) => Ok(*id),
            other => Err(DecodeError::type_mismatch(
                ArgType::ObjectRef,
                other.arg_type(),
            )),
        }
    }

    /// Read a forward identifier reference argument.
    pub fn get_id_value(&self, message: usize, argument: usize) -> Result<ObjectId, DecodeError> {
        match self.checked_argument(message, argument)? {
            Argument::IdValue(id) => Ok(*id),
            other => Err(DecodeError::type_mismatch(
                ArgType::IdValue,
                other.arg_type(),
            )),
        }
    }

    /// Read a nested stream argument.
    pub fn get_stream(&self, message: usize, argument: usize) -> Result<&MessageStream, DecodeError> {
        match self.checked_argument(message, argument)? {
            Argument::Stream(stream) => Ok(stream),
            other => Err(DecodeError::type_mismatch(
                ArgType::Stream,
                other.arg_type(),
            )),
        }
    }

    /// Encode the stream into its binary wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        codec::encode(self)
    }

    /// Decode a stream from its binary wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        codec::decode(bytes)
    }

    /// Write the encoded stream to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WirecallError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read an encoded stream back from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WirecallError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }

    fn checked_message(&self, index: usize) -> Result<&Message, DecodeError> {
        if self.invalid {
            return Err(DecodeError::InvalidStream);
        }
        self.messages
            .get(index)
            .ok_or(DecodeError::NoSuchMessage(index))
    }

    fn checked_argument(&self, message: usize, argument: usize) -> Result<&Argument, DecodeError> {
        self.checked_message(message)?
            .args
            .get(argument)
            .ok_or(DecodeError::NoSuchArgument { message, argument })
    }
}

impl fmt::Display for MessageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", printer::dump(self))
    }
}
