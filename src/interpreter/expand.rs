//! Recursive argument expansion.
//!
//! Before an `Invoke` or `Assign` dispatches, its arguments are rewritten
//! into a fully-resolved list: `id_value` references are replaced by the
//! arguments of the message recorded for that identifier, and nested
//! streams are processed and replaced by the arguments of their last
//! result. Resolution is depth-first and left-to-right, and completes
//! before the enclosing call executes, so a single wire message can carry
//! a small expression tree of chained calls.

use crate::interpreter::interpreter::{DispatchFault, Interpreter};
use crate::registry::ObjectId;
use crate::stream::{Argument, ErrorKind, Message};

impl Interpreter {
    /// Produce a new, fully-resolved argument list. The input buffer is
    /// never mutated.
    pub(crate) fn expand_arguments(
        &mut self,
        args: &[Argument],
    ) -> Result<Vec<Argument>, DispatchFault> {
        let mut expanded = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::IdValue(id) => self.expand_id_value(*id, &mut expanded)?,
                Argument::Stream(nested) => {
                    if nested.message_count() == 0 {
                        return Err(DispatchFault::invalid("empty nested stream"));
                    }
                    if !self.process_stream(nested) {
                        let result = self.get_last_result();
                        let message = if result.is_error() {
                            result.clone()
                        } else {
                            Message::error(ErrorKind::InvalidMessage, "nested stream failed")
                        };
                        return Err(DispatchFault::Nested(message));
                    }
                    let result = self.get_last_result();
                    if !result.is_reply() {
                        return Err(DispatchFault::invalid(
                            "nested stream did not produce a reply",
                        ));
                    }
                    expanded.extend(result.args.iter().cloned());
                }
                other => expanded.push(other.clone()),
            }
        }
        Ok(expanded)
    }

    fn expand_id_value(
        &self,
        id: ObjectId,
        expanded: &mut Vec<Argument>,
    ) -> Result<(), DispatchFault> {
        match self.get_message_for_id(id) {
            Some(message) => {
                expanded.extend(message.args.iter().cloned());
                Ok(())
            }
            None => Err(crate::error::RegistryError::NotFound(id).into()),
        }
    }
}
