//! The command-stream interpreter.

use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use crate::capability::{CapabilityTable, CommandFn, ConstructorFn};
use crate::error::{CommandError, DecodeError, RegistryError};
use crate::interpreter::observer::{ExecutionLog, InterpreterObserver};
use crate::registry::{ObjectHandle, ObjectId, ObjectRegistry};
use crate::stream::{Argument, Command, ErrorKind, Message, MessageStream};
use crate::FastIndexMap;

/// A per-message dispatch failure, before it is rendered into an Error
/// reply. Conversions let dispatch code use `?` on the usual error types.
#[derive(Debug)]
pub(crate) enum DispatchFault {
    Decode(DecodeError),
    Registry(RegistryError),
    Command(CommandError),
    Invalid(String),
    /// An Error reply propagated out of a nested stream, kept verbatim.
    Nested(Message),
}

impl DispatchFault {
    pub(crate) fn invalid(text: impl Into<String>) -> Self {
        Self::Invalid(text.into())
    }

    fn into_message(self) -> Message {
        match self {
            Self::Nested(message) => message,
            Self::Decode(err) => Message::error(ErrorKind::InvalidMessage, err.to_string()),
            Self::Registry(err @ RegistryError::NotFound(_)) => {
                Message::error(ErrorKind::NotFound, err.to_string())
            }
            Self::Registry(err) => Message::error(ErrorKind::InvalidMessage, err.to_string()),
            Self::Command(err @ CommandError::UnknownClass(_)) => {
                Message::error(ErrorKind::UnknownClass, err.to_string())
            }
            Self::Command(err @ CommandError::UnknownMethod { .. }) => {
                Message::error(ErrorKind::UnknownMethod, err.to_string())
            }
            Self::Command(err @ CommandError::Foreign(_)) => {
                Message::error(ErrorKind::ForeignError, err.to_string())
            }
            Self::Command(err) => Message::error(ErrorKind::CommandFailed, err.to_string()),
            Self::Invalid(text) => Message::error(ErrorKind::InvalidMessage, text),
        }
    }
}

impl From<DecodeError> for DispatchFault {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl From<RegistryError> for DispatchFault {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<CommandError> for DispatchFault {
    fn from(err: CommandError) -> Self {
        Self::Command(err)
    }
}

/// Executes message streams against a registry of live objects.
///
/// Single-threaded and non-reentrant: `process_stream` runs to completion
/// before returning, and the `Rc`-based object model keeps an interpreter
/// confined to one thread. The only state carried across calls is the
/// registry, the capability tables and the last result.
pub struct Interpreter {
    registry: ObjectRegistry,
    constructors: CapabilityTable<ConstructorFn>,
    commands: CapabilityTable<CommandFn>,
    /// Reply message recorded when an id was registered; consulted by
    /// id_value expansion and `get_message_for_id`.
    id_messages: FastIndexMap<ObjectId, Message>,
    last_result: Message,
    observers: Vec<Rc<dyn InterpreterObserver>>,
    log: ExecutionLog,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            registry: ObjectRegistry::new(),
            constructors: CapabilityTable::new(),
            commands: CapabilityTable::new(),
            id_messages: FastIndexMap::default(),
            last_result: Message::reply(Vec::new()),
            observers: Vec::new(),
            log: ExecutionLog::default(),
        }
    }

    // ------------------------------------------------------------------
    // Registration surface
    // ------------------------------------------------------------------

    /// Register the constructor for a class name; the last registration
    /// wins and the replaced closure is dropped immediately.
    pub fn add_constructor(&mut self, class_name: &str, constructor: ConstructorFn) {
        self.constructors.add(class_name, constructor);
    }

    /// Register the command function for a class name; the last
    /// registration wins and the replaced closure is dropped immediately.
    pub fn add_command_function(&mut self, class_name: &str, command: CommandFn) {
        self.commands.add(class_name, command);
    }

    pub fn has_command_function(&self, class_name: &str) -> bool {
        self.commands.has(class_name)
    }

    pub fn has_constructor(&self, class_name: &str) -> bool {
        self.constructors.has(class_name)
    }

    /// Invoke a class's command function directly, bypassing the stream.
    /// Useful for wrapper functions implementing delegation.
    pub fn call_command(
        &self,
        class_name: &str,
        object: &ObjectHandle,
        method: &str,
        args: &Message,
    ) -> Result<Message, CommandError> {
        self.commands.call(self, class_name, object, method, args)
    }

    /// Construct an instance directly, bypassing the stream. Returns
    /// `None` when no constructor is registered or construction fails;
    /// nothing is registered.
    pub fn new_instance(&self, class_name: &str) -> Option<ObjectHandle> {
        self.constructors.construct(self, class_name).ok()
    }

    // ------------------------------------------------------------------
    // Identifier surface
    // ------------------------------------------------------------------

    /// Hand out the next unused counter identifier.
    pub fn next_available_id(&mut self) -> ObjectId {
        self.registry.next_id()
    }

    /// The Reply message recorded when `id` was registered, or `None`
    /// for the null id and unknown ids.
    pub fn get_message_for_id(&self, id: ObjectId) -> Option<&Message> {
        self.id_messages.get(&id)
    }

    /// Resolve an identifier to its object. The null id is `None`; an
    /// unknown id is `None` when `allow_missing` is set and an error
    /// otherwise.
    pub fn get_object_from_id(
        &self,
        id: ObjectId,
        allow_missing: bool,
    ) -> Result<Option<ObjectHandle>, RegistryError> {
        if id.is_null() {
            return Ok(None);
        }
        match self.registry.lookup(id) {
            Some(handle) => Ok(Some(handle)),
            None if allow_missing => Ok(None),
            None => Err(RegistryError::NotFound(id)),
        }
    }

    /// Reverse lookup: the identifier registered for an object, if any.
    pub fn get_id_from_object(&self, handle: &ObjectHandle) -> Option<ObjectId> {
        self.registry.id_of(handle)
    }

    /// The registered runtime class name of an object.
    pub fn class_of(&self, id: ObjectId) -> Option<&str> {
        self.registry.class_of(id)
    }

    pub fn registered_object_count(&self) -> usize {
        self.registry.len()
    }

    /// Registered identifiers in registration order.
    pub fn registered_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.registry.ids()
    }

    // ------------------------------------------------------------------
    // Observer and log surface
    // ------------------------------------------------------------------

    pub fn add_observer(&mut self, observer: Rc<dyn InterpreterObserver>) {
        self.observers.push(observer);
    }

    /// Mirror every processed message to `writer`. Side-effect only.
    pub fn set_log_writer(&mut self, writer: Box<dyn Write>) {
        self.log.set_writer(writer);
    }

    /// Mirror every processed message to a file. Side-effect only.
    pub fn set_log_file(&mut self, path: impl AsRef<Path>) -> std::io::Result<()> {
        self.log.set_file(path)
    }

    pub fn clear_log_writer(&mut self) {
        self.log.clear();
    }

    // ------------------------------------------------------------------
    // Dispatch surface
    // ------------------------------------------------------------------

    /// The reply of the most recently processed message. Overwritten,
    /// never appended, by each subsequent message.
    pub fn get_last_result(&self) -> &Message {
        &self.last_result
    }

    /// Process every message of a stream in order.
    ///
    /// Best-effort across the batch: a failing message records an Error
    /// last-result and fires the error observers, but later messages are
    /// still dispatched. Returns true only if every message succeeded.
    pub fn process_stream(&mut self, stream: &MessageStream) -> bool {
        if !stream.is_valid() {
            self.last_result =
                Message::error(ErrorKind::InvalidMessage, "stream is invalid");
            self.notify_failed(stream, 0);
            return false;
        }
        let mut ok = true;
        for index in 0..stream.message_count() {
            ok &= self.process_one_message(stream, index);
        }
        ok
    }

    /// Process a single message of a stream by index.
    pub fn process_one_message(&mut self, stream: &MessageStream, index: usize) -> bool {
        let outcome = self.dispatch_message(stream, index);
        let (result, ok) = match outcome {
            Ok(reply) => (reply, true),
            Err(fault) => (fault.into_message(), false),
        };
        self.log.record(index, stream.message(index), &result);
        self.last_result = result;
        if !ok {
            self.notify_failed(stream, index);
        }
        ok
    }

    fn dispatch_message(
        &mut self,
        stream: &MessageStream,
        index: usize,
    ) -> Result<Message, DispatchFault> {
        let command = stream.command_of(index)?;
        match command {
            Command::New => self.do_new(stream, index),
            Command::Invoke => self.do_invoke(stream, index),
            Command::Delete => self.do_delete(stream, index),
            Command::Assign => self.do_assign(stream, index),
            other => Err(DispatchFault::invalid(format!(
                "command {} cannot be dispatched",
                other
            ))),
        }
    }

    /// NEW <class:string> <id:id_value>
    fn do_new(&mut self, stream: &MessageStream, index: usize) -> Result<Message, DispatchFault> {
        let class_name: String = stream.get(index, 0)?;
        let id = stream.get_id_value(index, 1)?;

        let constructor = self
            .constructors
            .get(&class_name)
            .ok_or_else(|| CommandError::unknown_class(&class_name))?;
        let handle = constructor(&*self).map_err(DispatchFault::Command)?;

        self.registry.register(handle, &class_name, id)?;
        let reply = Message::reply(vec![Argument::ObjectRef(id)]);
        self.id_messages.insert(id, reply.clone());
        self.notify_created(&class_name, id);
        Ok(reply)
    }

    /// INVOKE <id:id_value> <method:string> <args...>
    fn do_invoke(&mut self, stream: &MessageStream, index: usize) -> Result<Message, DispatchFault> {
        let id = stream.get_id_value(index, 0)?;
        let handle = self.registry.lookup_required(id)?;
        let class_name = self
            .registry
            .class_of(id)
            .map(str::to_string)
            .ok_or(RegistryError::NotFound(id))?;
        let method: String = stream.get(index, 1)?;

        let message = stream
            .message(index)
            .ok_or(DecodeError::NoSuchMessage(index))?;
        let expanded = self.expand_arguments(&message.args[2..])?;
        let args = Message::with_args(Command::Invoke, expanded);

        let command = self
            .commands
            .get(&class_name)
            .ok_or_else(|| CommandError::unknown_class(&class_name))?;
        let reply = command(&*self, &handle, &method, &args).map_err(DispatchFault::Command)?;
        Ok(reply)
    }

    /// DELETE <id:id_value>
    ///
    /// Deleting an unknown id is a no-op, not an error, so teardown
    /// sequences can be replayed safely.
    fn do_delete(&mut self, stream: &MessageStream, index: usize) -> Result<Message, DispatchFault> {
        let id = stream.get_id_value(index, 0)?;
        if self.registry.contains(id) {
            self.registry.unregister(id);
            if !self.registry.contains(id) {
                self.id_messages.shift_remove(&id);
                self.notify_deleted(id);
            }
        }
        Ok(Message::reply(Vec::new()))
    }

    /// ASSIGN <id:id_value> <expr>
    ///
    /// Evaluates the source expression and registers the resulting object
    /// under the new identifier without invoking any constructor.
    fn do_assign(&mut self, stream: &MessageStream, index: usize) -> Result<Message, DispatchFault> {
        let id = stream.get_id_value(index, 0)?;
        let message = stream
            .message(index)
            .ok_or(DecodeError::NoSuchMessage(index))?;
        let expanded = self.expand_arguments(&message.args[1..])?;

        let source = match expanded.as_slice() {
            [Argument::ObjectRef(source)] => *source,
            _ => {
                return Err(DispatchFault::invalid(
                    "assign source must resolve to a single object reference",
                ))
            }
        };

        let handle = self.registry.lookup_required(source)?;
        let class_name = self
            .registry
            .class_of(source)
            .map(str::to_string)
            .ok_or(RegistryError::NotFound(source))?;
        self.registry.register(handle, &class_name, id)?;

        let reply = Message::reply(vec![Argument::ObjectRef(id)]);
        self.id_messages.insert(id, reply.clone());
        Ok(reply)
    }

    fn notify_created(&self, class_name: &str, id: ObjectId) {
        for observer in &self.observers {
            observer.object_created(class_name, id);
        }
    }

    fn notify_deleted(&self, id: ObjectId) {
        for observer in &self.observers {
            observer.object_deleted(id);
        }
    }

    fn notify_failed(&self, stream: &MessageStream, index: usize) {
        for observer in &self.observers {
            observer.dispatch_failed(stream, index);
        }
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("objects", &self.registry.len())
            .field("constructors", &self.constructors.len())
            .field("commands", &self.commands.len())
            .finish()
    }
}
