//! Wirecall: a command-stream protocol and interpreter for driving live
//! object graphs.
//!
//! A producer builds a [`MessageStream`] describing object construction,
//! method invocation, deletion and aliasing; the [`Interpreter`] executes
//! it against a registry of reference-counted objects, resolving chained
//! and nested calls before dispatch. Per-class behavior is plugged in
//! through capability tables, so a producer needs no native bindings to
//! the objects it drives — including objects living in a separate
//! dynamic-language runtime, bridged by the adapter shim.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use wirecall::error::CommandError;
//! use wirecall::interpreter::Interpreter;
//! use wirecall::registry::{ObjectHandle, ObjectId};
//! use wirecall::stream::{Argument, Command, Message, MessageStream};
//!
//! let mut interpreter = Interpreter::new();
//! interpreter.add_constructor(
//!     "Counter",
//!     Rc::new(|_| Ok(ObjectHandle::new(RefCell::new(0i64)))),
//! );
//! interpreter.add_command_function(
//!     "Counter",
//!     Rc::new(|_, handle, method, _args| {
//!         let cell = handle
//!             .downcast_ref::<RefCell<i64>>()
//!             .ok_or_else(|| CommandError::failed("not a Counter"))?;
//!         match method {
//!             "increment" => {
//!                 *cell.borrow_mut() += 1;
//!                 Ok(Message::reply(vec![Argument::Int64(*cell.borrow())]))
//!             }
//!             other => Err(CommandError::unknown_method("Counter", other)),
//!         }
//!     }),
//! );
//!
//! let mut stream = MessageStream::new();
//! stream
//!     .append_command(Command::New)
//!     .append("Counter")
//!     .append_id_value(ObjectId(7))
//!     .append_command(Command::Invoke)
//!     .append_id_value(ObjectId(7))
//!     .append("increment")
//!     .append_command(Command::End);
//!
//! assert!(interpreter.process_stream(&stream));
//! assert_eq!(interpreter.get_last_result().get::<i64>(0).unwrap(), 1);
//! ```

#![allow(clippy::module_inception)]

pub mod adapter;
pub mod capability;
pub mod error;
pub mod interpreter;
pub mod registry;
pub mod stream;

pub use error::WirecallError;
pub use interpreter::Interpreter;
pub use registry::{ObjectHandle, ObjectId};
pub use stream::{Argument, Command, Message, MessageStream};

/// Ordered map with a fast non-cryptographic hasher.
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

/// Load a saved stream and render it as human-readable text.
pub fn dump_file(path: impl AsRef<std::path::Path>) -> Result<String, WirecallError> {
    let stream = MessageStream::load(path)?;
    Ok(stream::printer::dump(&stream))
}
