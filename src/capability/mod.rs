//! Capability tables: per-class-name constructor and command functions.
//!
//! Entries are closures that own whatever context they captured; replacing
//! or dropping an entry drops the closure, so context teardown happens
//! exactly once and synchronously with the replacement.

use std::rc::Rc;

use crate::error::CommandError;
use crate::interpreter::Interpreter;
use crate::registry::ObjectHandle;
use crate::stream::Message;
use crate::FastIndexMap;

/// Constructs a fresh instance of a class.
pub type ConstructorFn = Rc<dyn Fn(&Interpreter) -> Result<ObjectHandle, CommandError>>;

/// Invokes a named method on an object of a class.
///
/// Receives the interpreter for identifier resolution, the target handle,
/// the method name and a message holding the already-expanded arguments;
/// returns a Reply message on success.
pub type CommandFn =
    Rc<dyn Fn(&Interpreter, &ObjectHandle, &str, &Message) -> Result<Message, CommandError>>;

/// A per-class-name function table. Lookup is by exact class name only;
/// the last registration for a name wins.
pub struct CapabilityTable<F> {
    entries: FastIndexMap<String, F>,
}

impl<F> Default for CapabilityTable<F> {
    fn default() -> Self {
        Self {
            entries: FastIndexMap::default(),
        }
    }
}

impl<F: Clone> CapabilityTable<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function for a class name, replacing (and dropping) any
    /// previous entry.
    pub fn add(&mut self, class_name: &str, function: F) {
        self.entries.insert(class_name.to_string(), function);
    }

    pub fn has(&self, class_name: &str) -> bool {
        self.entries.contains_key(class_name)
    }

    pub fn get(&self, class_name: &str) -> Option<F> {
        self.entries.get(class_name).cloned()
    }

    pub fn remove(&mut self, class_name: &str) -> bool {
        self.entries.shift_remove(class_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered class names in registration order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl CapabilityTable<ConstructorFn> {
    /// Invoke the registered constructor for a class.
    pub fn construct(
        &self,
        interpreter: &Interpreter,
        class_name: &str,
    ) -> Result<ObjectHandle, CommandError> {
        match self.get(class_name) {
            Some(constructor) => constructor(interpreter),
            None => Err(CommandError::unknown_class(class_name)),
        }
    }
}

impl CapabilityTable<CommandFn> {
    /// Invoke the registered command function for a class.
    pub fn call(
        &self,
        interpreter: &Interpreter,
        class_name: &str,
        object: &ObjectHandle,
        method: &str,
        args: &Message,
    ) -> Result<Message, CommandError> {
        match self.get(class_name) {
            Some(command) => command(interpreter, object, method, args),
            None => Err(CommandError::unknown_class(class_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::stream::Argument;

    /// Context that counts its own drops.
    struct DropCounter(Rc<Cell<u32>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_lookup_is_by_exact_name() {
        let mut table: CapabilityTable<CommandFn> = CapabilityTable::new();
        table.add(
            "Counter",
            Rc::new(|_, _, _, _| Ok(Message::reply(vec![Argument::Int64(1)]))),
        );

        assert!(table.has("Counter"));
        assert!(!table.has("counter"));
        assert!(!table.has("CounterBase"));
    }

    #[test]
    fn test_missing_entry_is_unknown_class() {
        let table: CapabilityTable<CommandFn> = CapabilityTable::new();
        let interpreter = Interpreter::new();
        let handle = ObjectHandle::new(());
        let err = table
            .call(
                &interpreter,
                "Ghost",
                &handle,
                "poke",
                &Message::reply(Vec::new()),
            )
            .unwrap_err();
        assert!(matches!(err, CommandError::UnknownClass(name) if name == "Ghost"));
    }

    #[test]
    fn test_replacement_drops_previous_context_exactly_once() {
        let drops = Rc::new(Cell::new(0u32));
        let context = DropCounter(Rc::clone(&drops));

        let mut table: CapabilityTable<ConstructorFn> = CapabilityTable::new();
        table.add(
            "Thing",
            Rc::new(move |_| {
                let _ = &context;
                Ok(ObjectHandle::new(()))
            }),
        );
        assert_eq!(drops.get(), 0);

        table.add("Thing", Rc::new(|_| Ok(ObjectHandle::new(()))));
        assert_eq!(drops.get(), 1);

        table.add("Thing", Rc::new(|_| Ok(ObjectHandle::new(()))));
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_teardown_drops_context() {
        let drops = Rc::new(Cell::new(0u32));
        let context = DropCounter(Rc::clone(&drops));

        let mut table: CapabilityTable<ConstructorFn> = CapabilityTable::new();
        table.add(
            "Thing",
            Rc::new(move |_| {
                let _ = &context;
                Ok(ObjectHandle::new(()))
            }),
        );

        drop(table);
        assert_eq!(drops.get(), 1);
    }
}
