//! Observer hooks and the execution log sink.

use std::io::Write;
use std::path::Path;

use crate::registry::ObjectId;
use crate::stream::{printer, Message, MessageStream};

/// Callbacks fired while the interpreter processes a stream.
///
/// All hooks have empty default bodies; implement only what you need.
pub trait InterpreterObserver {
    /// An object was constructed and registered by a `New` message.
    fn object_created(&self, _class_name: &str, _id: ObjectId) {}

    /// An object's registration was removed by a `Delete` message.
    fn object_deleted(&self, _id: ObjectId) {}

    /// A message failed to dispatch; the stream and the failing index.
    fn dispatch_failed(&self, _stream: &MessageStream, _index: usize) {}
}

/// Mirrors every processed message to an append-only writer.
///
/// Side-effect only: write failures are swallowed and never influence
/// dispatch outcomes.
#[derive(Default)]
pub(crate) struct ExecutionLog {
    writer: Option<Box<dyn Write>>,
}

impl ExecutionLog {
    pub(crate) fn set_writer(&mut self, writer: Box<dyn Write>) {
        self.writer = Some(writer);
    }

    pub(crate) fn set_file(&mut self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.writer = Some(Box::new(file));
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.writer = None;
    }

    pub(crate) fn record(&mut self, index: usize, input: Option<&Message>, result: &Message) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let input_text = match input {
            Some(message) => printer::dump_message(message),
            None => "<no message>".to_string(),
        };
        let _ = writeln!(
            writer,
            "{:04} {} -> {}",
            index,
            input_text,
            printer::dump_message(result)
        );
        let _ = writer.flush();
    }
}

impl std::fmt::Debug for ExecutionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionLog")
            .field("enabled", &self.writer.is_some())
            .finish()
    }
}
