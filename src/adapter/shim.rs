//! Capability-table entries forwarding into a foreign runtime.
//!
//! The interpreter has no foreign-path special cases: these are ordinary
//! constructor/command closures registered through the same tables as
//! native classes. Faults inside the foreign runtime surface as Error
//! replies and never abort stream processing.

use std::rc::Rc;

use crate::adapter::marshal;
use crate::adapter::object::ForeignObjectRef;
use crate::adapter::runtime::ForeignRuntimeRef;
use crate::capability::{CommandFn, ConstructorFn};
use crate::error::{AdapterError, CommandError};
use crate::interpreter::Interpreter;
use crate::registry::ObjectHandle;
use crate::stream::Message;

/// Register a foreign class with an interpreter: `New` goes through the
/// runtime's factory, `Invoke` through [`invoke_foreign`].
pub fn register_foreign_class(
    interpreter: &mut Interpreter,
    class_name: &str,
    runtime: ForeignRuntimeRef,
) {
    let constructor: ConstructorFn = {
        let runtime = Rc::clone(&runtime);
        let class_name = class_name.to_string();
        Rc::new(move |_| {
            let object = runtime
                .borrow()
                .instantiate(&class_name)
                .map_err(|err| CommandError::foreign(err.to_string()))?;
            // The handle takes over the factory's reference to the
            // foreign object; registry cloning adds the rest.
            Ok(ObjectHandle::new(object))
        })
    };
    interpreter.add_constructor(class_name, constructor);

    let command: CommandFn = Rc::new(invoke_foreign);
    interpreter.add_command_function(class_name, command);
}

/// Dispatch a method call on a foreign object.
///
/// A name the object does not expose at all is `UnknownMethod`, which the
/// interpreter reports distinguishably from `UnknownClass` so a caller
/// can fall back to another handler. Raises inside the call become Error
/// replies carrying the runtime's diagnostic text.
pub fn invoke_foreign(
    interpreter: &Interpreter,
    handle: &ObjectHandle,
    method: &str,
    args: &Message,
) -> Result<Message, CommandError> {
    let object = handle
        .downcast_ref::<ForeignObjectRef>()
        .ok_or_else(|| CommandError::failed("dispatch target is not a foreign object"))?;

    let callable = match object.method(method) {
        Some(callable) => callable,
        None if object.has_attribute(method) => {
            return Err(adapter_failure(AdapterError::NotCallable {
                class: object.class_name(),
                attribute: method.to_string(),
            }))
        }
        None => return Err(CommandError::unknown_method(object.class_name(), method)),
    };

    let mut foreign_args = Vec::with_capacity(args.arg_count());
    for arg in &args.args {
        foreign_args.push(
            marshal::argument_to_foreign(interpreter, arg)
                .map_err(|err| CommandError::foreign(err.to_string()))?,
        );
    }

    let result = callable(object, foreign_args)
        .map_err(|err| CommandError::foreign(err.to_string()))?;
    marshal::foreign_to_reply(interpreter, &result).map_err(adapter_failure)
}

/// Raises keep their foreign diagnostics; unmarshalable results are a
/// generic command failure.
fn adapter_failure(err: AdapterError) -> CommandError {
    match err {
        AdapterError::Raised(text) => CommandError::foreign(text),
        AdapterError::NotCallable { .. } => CommandError::foreign(err.to_string()),
        AdapterError::Unmarshalable(_) => CommandError::failed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::adapter::object::ForeignObject;
    use crate::adapter::runtime::ForeignRuntime;
    use crate::adapter::value::ForeignValue;
    use crate::registry::ObjectId;
    use crate::stream::{Command, ErrorKind, MessageStream};

    fn greeter_runtime() -> ForeignRuntimeRef {
        let mut runtime = ForeignRuntime::new();
        runtime.define_class(
            "Greeter",
            Rc::new(|| {
                let object = ForeignObject::new("Greeter")
                    .with_attribute("greeting", ForeignValue::Str("hello".to_string()))
                    .with_method(
                        "greet",
                        Rc::new(|receiver, args| {
                            let name = match args.first() {
                                Some(ForeignValue::Str(name)) => name.clone(),
                                other => {
                                    return Err(AdapterError::raised(format!(
                                        "greet() expects a string, got {:?}",
                                        other
                                    )))
                                }
                            };
                            let greeting = match receiver.attribute("greeting") {
                                Some(ForeignValue::Str(text)) => text,
                                _ => "hi".to_string(),
                            };
                            Ok(ForeignValue::Str(format!("{} {}", greeting, name)))
                        }),
                    )
                    .with_method(
                        "pair",
                        Rc::new(|_, _| {
                            Ok(ForeignValue::Tuple(vec![
                                ForeignValue::Int(1),
                                ForeignValue::Int(2),
                            ]))
                        }),
                    )
                    .with_method(
                        "mixed",
                        Rc::new(|_, _| {
                            Ok(ForeignValue::Tuple(vec![
                                ForeignValue::Int(1),
                                ForeignValue::Str("x".to_string()),
                            ]))
                        }),
                    )
                    .with_method(
                        "big",
                        Rc::new(|_, _| Ok(ForeignValue::UInt(u64::MAX))),
                    )
                    .with_method(
                        "boom",
                        Rc::new(|_, _| Err(AdapterError::raised("kaboom: division by zero"))),
                    )
                    .with_method(
                        "befriend",
                        Rc::new(|receiver, args| {
                            match args.first() {
                                Some(ForeignValue::Object(friend)) => {
                                    receiver.set_attribute(
                                        "friend",
                                        ForeignValue::Object(friend.clone()),
                                    );
                                    Ok(ForeignValue::None)
                                }
                                other => Err(AdapterError::raised(format!(
                                    "befriend() expects an object, got {:?}",
                                    other
                                ))),
                            }
                        }),
                    )
                    .with_method(
                        "twin",
                        Rc::new(|receiver, _| Ok(ForeignValue::Object(receiver.clone()))),
                    )
                    .with_method(
                        "sum",
                        Rc::new(|_, args| {
                            let mut total = 0i64;
                            for arg in &args {
                                match arg {
                                    ForeignValue::Tuple(items) => {
                                        for item in items {
                                            match item {
                                                ForeignValue::Int(v) => total += v,
                                                other => {
                                                    return Err(AdapterError::raised(format!(
                                                        "sum() expects ints, got {:?}",
                                                        other
                                                    )))
                                                }
                                            }
                                        }
                                    }
                                    ForeignValue::Int(v) => total += v,
                                    other => {
                                        return Err(AdapterError::raised(format!(
                                            "sum() expects ints, got {:?}",
                                            other
                                        )))
                                    }
                                }
                            }
                            Ok(ForeignValue::Int(total))
                        }),
                    );
                Ok(ForeignValue::Object(ForeignObjectRef::new(object)))
            }),
        );
        runtime.shared()
    }

    fn interpreter_with_greeter() -> Interpreter {
        let mut interpreter = Interpreter::new();
        register_foreign_class(&mut interpreter, "Greeter", greeter_runtime());
        interpreter
    }

    fn run_invoke(interpreter: &mut Interpreter, id: u32, build: impl FnOnce(&mut MessageStream)) -> bool {
        let mut stream = MessageStream::new();
        stream.append_command(Command::Invoke).append_id_value(ObjectId(id));
        build(&mut stream);
        stream.append_command(Command::End);
        interpreter.process_stream(&stream)
    }

    fn new_greeter(interpreter: &mut Interpreter, id: u32) {
        let mut stream = MessageStream::new();
        stream
            .append_command(Command::New)
            .append("Greeter")
            .append_id_value(ObjectId(id))
            .append_command(Command::End);
        assert!(interpreter.process_stream(&stream));
    }

    #[test]
    fn test_construct_through_stream() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert_eq!(interpreter.class_of(ObjectId(1)), Some("Greeter"));
        let handle = interpreter
            .get_object_from_id(ObjectId(1), false)
            .unwrap()
            .unwrap();
        let object = handle.downcast_ref::<ForeignObjectRef>().unwrap();
        assert_eq!(object.class_name(), "Greeter");
        // Registry handle plus the wrapper's own reference.
        assert!(object.ref_count() >= 1);
    }

    #[test]
    fn test_invoke_marshals_arguments_and_result() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(run_invoke(&mut interpreter, 1, |stream| {
            stream.append("greet").append("world");
        }));
        assert_eq!(
            interpreter.get_last_result().get::<String>(0).unwrap(),
            "hello world"
        );
    }

    #[test]
    fn test_missing_method_is_unknown_method() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(!run_invoke(&mut interpreter, 1, |stream| {
            stream.append("vanish");
        }));
        let result = interpreter.get_last_result();
        assert_eq!(result.error_kind(), Some(ErrorKind::UnknownMethod));
        assert!(result.error_text().unwrap().contains("vanish"));
    }

    #[test]
    fn test_plain_attribute_is_not_callable() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(!run_invoke(&mut interpreter, 1, |stream| {
            stream.append("greeting");
        }));
        let result = interpreter.get_last_result();
        // Present but not callable: a foreign fault, not UnknownMethod.
        assert_eq!(result.error_kind(), Some(ErrorKind::ForeignError));
    }

    #[test]
    fn test_raise_becomes_error_reply_with_text() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(!run_invoke(&mut interpreter, 1, |stream| {
            stream.append("boom");
        }));
        let result = interpreter.get_last_result();
        assert_eq!(result.error_kind(), Some(ErrorKind::ForeignError));
        assert!(result.error_text().unwrap().contains("kaboom"));

        // The fault did not poison the interpreter.
        assert!(run_invoke(&mut interpreter, 1, |stream| {
            stream.append("greet").append("again");
        }));
    }

    #[test]
    fn test_homogeneous_tuple_result() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(run_invoke(&mut interpreter, 1, |stream| {
            stream.append("pair");
        }));
        assert_eq!(
            interpreter.get_last_result().get::<Vec<i64>>(0).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_heterogeneous_tuple_result_fails() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(!run_invoke(&mut interpreter, 1, |stream| {
            stream.append("mixed");
        }));
        assert_eq!(
            interpreter.get_last_result().error_kind(),
            Some(ErrorKind::CommandFailed)
        );
    }

    #[test]
    fn test_overflow_promotion_on_return() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(run_invoke(&mut interpreter, 1, |stream| {
            stream.append("big");
        }));
        assert_eq!(
            interpreter.get_last_result().get::<u64>(0).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn test_array_argument_arrives_as_tuple() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(run_invoke(&mut interpreter, 1, |stream| {
            stream.append("sum").append(vec![1i32, 2, 3]).append(10i64);
        }));
        assert_eq!(interpreter.get_last_result().get::<i32>(0).unwrap(), 16);
    }

    #[test]
    fn test_object_references_cross_the_boundary() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);
        new_greeter(&mut interpreter, 2);

        assert!(run_invoke(&mut interpreter, 1, |stream| {
            stream.append("befriend").append_id_value(ObjectId(2));
        }));

        let first = interpreter
            .get_object_from_id(ObjectId(1), false)
            .unwrap()
            .unwrap();
        let second = interpreter
            .get_object_from_id(ObjectId(2), false)
            .unwrap()
            .unwrap();
        let first = first.downcast_ref::<ForeignObjectRef>().unwrap();
        let second = second.downcast_ref::<ForeignObjectRef>().unwrap();
        match first.attribute("friend") {
            Some(ForeignValue::Object(friend)) => assert!(friend.ptr_eq(second)),
            other => panic!("expected an object attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_returned_object_maps_back_to_its_id() {
        let mut interpreter = interpreter_with_greeter();
        new_greeter(&mut interpreter, 1);

        assert!(run_invoke(&mut interpreter, 1, |stream| {
            stream.append("twin");
        }));
        assert_eq!(
            interpreter.get_last_result().get_object_ref(0).unwrap(),
            ObjectId(1)
        );
    }

    #[test]
    fn test_foreign_and_native_classes_share_the_tables() {
        let mut interpreter = interpreter_with_greeter();
        assert!(interpreter.has_command_function("Greeter"));
        assert!(interpreter.has_constructor("Greeter"));

        // A native class registered alongside does not interfere.
        interpreter.add_constructor("Native", Rc::new(|_| Ok(ObjectHandle::new(()))));
        assert!(interpreter.has_constructor("Native"));
        assert!(interpreter.has_constructor("Greeter"));
    }
}
