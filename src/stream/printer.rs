//! Human-readable stream dumps for debugging and the execution log.

use std::fmt::Write;

use crate::stream::stream::{Message, MessageStream};

/// Render one message on a single line: the command followed by its
/// arguments.
pub fn dump_message(message: &Message) -> String {
    let mut out = String::new();
    out.push_str(message.command.name());
    for (i, arg) in message.args.iter().enumerate() {
        if i == 0 {
            out.push(' ');
        } else {
            out.push_str(", ");
        }
        let _ = write!(&mut out, "{}", arg);
    }
    out
}

/// Render a whole stream, one message per line, with a header.
pub fn dump(stream: &MessageStream) -> String {
    let mut out = String::new();
    if !stream.is_valid() {
        out.push_str("== invalid stream ==\n");
        return out;
    }
    let _ = writeln!(&mut out, "== stream: {} messages ==", stream.message_count());
    for (index, message) in stream.messages().enumerate() {
        let _ = writeln!(&mut out, "{:04} {}", index, dump_message(message));
    }
    out
}
