//! The wire protocol: commands, typed arguments and the message stream.

pub mod argument;
pub mod codec;
pub mod command;
pub mod printer;
pub mod stream;

pub use argument::{Argument, FromArgument, ToArgument};
pub use command::{ArgType, Command, ErrorKind};
pub use stream::{Message, MessageStream};
