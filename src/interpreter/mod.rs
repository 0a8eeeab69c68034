//! Stream interpretation: dispatch, expansion, observers.

pub mod expand;
pub mod interpreter;
pub mod observer;

pub use interpreter::Interpreter;
pub use observer::InterpreterObserver;
