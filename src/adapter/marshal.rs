//! Marshalling between wire arguments and foreign runtime values.

use crate::adapter::object::ForeignObjectRef;
use crate::adapter::value::ForeignValue;
use crate::error::AdapterError;
use crate::interpreter::Interpreter;
use crate::registry::ObjectId;
use crate::stream::{Argument, Message};

/// Convert one already-expanded wire argument into the foreign
/// runtime's native representation.
///
/// Arrays are rebuilt element-by-element as tuples; object references
/// are resolved back to the foreign object they denote.
pub fn argument_to_foreign(
    interpreter: &Interpreter,
    arg: &Argument,
) -> Result<ForeignValue, AdapterError> {
    let value = match arg {
        Argument::Int8(v) => ForeignValue::Int(i64::from(*v)),
        Argument::Int16(v) => ForeignValue::Int(i64::from(*v)),
        Argument::Int32(v) => ForeignValue::Int(i64::from(*v)),
        Argument::Int64(v) => ForeignValue::Int(*v),
        Argument::UInt8(v) => ForeignValue::Int(i64::from(*v)),
        Argument::UInt16(v) => ForeignValue::Int(i64::from(*v)),
        Argument::UInt32(v) => ForeignValue::Int(i64::from(*v)),
        Argument::UInt64(v) => match i64::try_from(*v) {
            Ok(fits) => ForeignValue::Int(fits),
            Err(_) => ForeignValue::UInt(*v),
        },
        Argument::Float32(v) => ForeignValue::Float(f64::from(*v)),
        Argument::Float64(v) => ForeignValue::Float(*v),
        Argument::Bool(v) => ForeignValue::Bool(*v),
        Argument::String(v) => ForeignValue::Str(v.clone()),
        Argument::Int8Array(v) => int_tuple(v.iter().map(|item| i64::from(*item))),
        Argument::Int16Array(v) => int_tuple(v.iter().map(|item| i64::from(*item))),
        Argument::Int32Array(v) => int_tuple(v.iter().map(|item| i64::from(*item))),
        Argument::Int64Array(v) => int_tuple(v.iter().copied()),
        Argument::UInt8Array(v) => int_tuple(v.iter().map(|item| i64::from(*item))),
        Argument::UInt16Array(v) => int_tuple(v.iter().map(|item| i64::from(*item))),
        Argument::UInt32Array(v) => int_tuple(v.iter().map(|item| i64::from(*item))),
        Argument::UInt64Array(v) => ForeignValue::Tuple(
            v.iter()
                .map(|item| match i64::try_from(*item) {
                    Ok(fits) => ForeignValue::Int(fits),
                    Err(_) => ForeignValue::UInt(*item),
                })
                .collect(),
        ),
        Argument::Float32Array(v) => ForeignValue::Tuple(
            v.iter()
                .map(|item| ForeignValue::Float(f64::from(*item)))
                .collect(),
        ),
        Argument::Float64Array(v) => {
            ForeignValue::Tuple(v.iter().map(|item| ForeignValue::Float(*item)).collect())
        }
        Argument::ObjectRef(id) => ForeignValue::Object(resolve_foreign(interpreter, *id)?),
        Argument::Stream(_) | Argument::IdValue(_) => {
            return Err(AdapterError::unmarshalable(format!(
                "{} arguments must be expanded before marshalling",
                arg.arg_type()
            )))
        }
    };
    Ok(value)
}

/// Convert a foreign return value into a Reply message.
///
/// `None` becomes an empty reply; anything else becomes a single
/// argument. Integers are promoted to the narrowest wire width that
/// holds them, falling back to unsigned 64-bit for values beyond
/// `i64::MAX`. Homogeneous tuples become typed arrays; heterogeneous
/// tuples are unsupported.
pub fn foreign_to_reply(
    interpreter: &Interpreter,
    value: &ForeignValue,
) -> Result<Message, AdapterError> {
    if value.is_none() {
        return Ok(Message::reply(Vec::new()));
    }
    Ok(Message::reply(vec![foreign_to_argument(interpreter, value)?]))
}

fn foreign_to_argument(
    interpreter: &Interpreter,
    value: &ForeignValue,
) -> Result<Argument, AdapterError> {
    let arg = match value {
        ForeignValue::None => {
            return Err(AdapterError::unmarshalable("none inside a compound value"))
        }
        ForeignValue::Bool(v) => Argument::Bool(*v),
        ForeignValue::Int(v) => promote_int(*v),
        ForeignValue::UInt(v) => match i64::try_from(*v) {
            Ok(fits) => promote_int(fits),
            Err(_) => Argument::UInt64(*v),
        },
        ForeignValue::Float(v) => Argument::Float64(*v),
        ForeignValue::Str(v) => Argument::String(v.clone()),
        ForeignValue::Tuple(items) => tuple_to_argument(items)?,
        ForeignValue::Object(object) => Argument::ObjectRef(find_registered(interpreter, object)?),
    };
    Ok(arg)
}

/// The narrowest signed wire representation holding `value`.
fn promote_int(value: i64) -> Argument {
    match i32::try_from(value) {
        Ok(fits) => Argument::Int32(fits),
        Err(_) => Argument::Int64(value),
    }
}

fn int_tuple(items: impl Iterator<Item = i64>) -> ForeignValue {
    ForeignValue::Tuple(items.map(ForeignValue::Int).collect())
}

/// Encode a homogeneous tuple as a typed array.
fn tuple_to_argument(items: &[ForeignValue]) -> Result<Argument, AdapterError> {
    if items
        .iter()
        .all(|item| matches!(item, ForeignValue::Float(_)))
    {
        let floats = items
            .iter()
            .map(|item| match item {
                ForeignValue::Float(v) => *v,
                _ => unreachable!(),
            })
            .collect();
        return Ok(Argument::Float64Array(floats));
    }

    // All-integer tuples prefer the signed encoding and fall back to
    // unsigned when any element is beyond i64::MAX.
    let mut signed = Vec::with_capacity(items.len());
    let mut all_signed = true;
    for item in items {
        match item {
            ForeignValue::Int(v) => signed.push(*v),
            ForeignValue::UInt(v) => match i64::try_from(*v) {
                Ok(fits) => signed.push(fits),
                Err(_) => {
                    all_signed = false;
                    break;
                }
            },
            _ => {
                return Err(AdapterError::unmarshalable(format!(
                    "heterogeneous tuple (found {})",
                    item.type_name()
                )))
            }
        }
    }
    if all_signed {
        return Ok(Argument::Int64Array(signed));
    }

    let mut unsigned = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ForeignValue::Int(v) => match u64::try_from(*v) {
                Ok(fits) => unsigned.push(fits),
                Err(_) => {
                    return Err(AdapterError::unmarshalable(
                        "tuple mixes negative and beyond-i64 integers",
                    ))
                }
            },
            ForeignValue::UInt(v) => unsigned.push(*v),
            _ => {
                return Err(AdapterError::unmarshalable(format!(
                    "heterogeneous tuple (found {})",
                    item.type_name()
                )))
            }
        }
    }
    Ok(Argument::UInt64Array(unsigned))
}

/// Resolve a wire object reference to the foreign object it wraps.
fn resolve_foreign(
    interpreter: &Interpreter,
    id: ObjectId,
) -> Result<ForeignObjectRef, AdapterError> {
    let handle = interpreter
        .get_object_from_id(id, false)
        .map_err(|err| AdapterError::raised(err.to_string()))?
        .ok_or_else(|| AdapterError::raised("null object reference"))?;
    handle
        .downcast_ref::<ForeignObjectRef>()
        .cloned()
        .ok_or_else(|| {
            AdapterError::unmarshalable(format!("object {} is not a foreign object", id))
        })
}

/// Reverse lookup: the wire identifier under which a foreign object is
/// registered.
fn find_registered(
    interpreter: &Interpreter,
    object: &ForeignObjectRef,
) -> Result<ObjectId, AdapterError> {
    for id in interpreter.registered_ids() {
        let Ok(Some(handle)) = interpreter.get_object_from_id(id, true) else {
            continue;
        };
        if handle
            .downcast_ref::<ForeignObjectRef>()
            .is_some_and(|candidate| candidate.ptr_eq(object))
        {
            return Ok(id);
        }
    }
    Err(AdapterError::unmarshalable(format!(
        "foreign {} object is not registered with the interpreter",
        object.class_name()
    )))
}
