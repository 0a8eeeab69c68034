//! Foreign-adapter shim: bridges the interpreter's capability tables
//! into a separate dynamic object runtime.

pub mod marshal;
pub mod object;
pub mod runtime;
pub mod shim;
pub mod value;

pub use object::{ForeignCallable, ForeignObject, ForeignObjectRef};
pub use runtime::{ForeignFactory, ForeignRuntime, ForeignRuntimeRef};
pub use shim::{invoke_foreign, register_foreign_class};
pub use value::ForeignValue;
