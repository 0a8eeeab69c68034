//! Interpreter benchmarks for wirecall.

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wirecall::error::CommandError;
use wirecall::interpreter::Interpreter;
use wirecall::registry::{ObjectHandle, ObjectId};
use wirecall::stream::{Argument, Command, Message, MessageStream};

/// Build an interpreter with a simple Counter class registered.
fn counter_interpreter() -> Interpreter {
    let mut interpreter = Interpreter::new();
    interpreter.add_constructor(
        "Counter",
        Rc::new(|_| Ok(ObjectHandle::new(RefCell::new(0i64)))),
    );
    interpreter.add_command_function(
        "Counter",
        Rc::new(|_, handle, method, _args| {
            let cell = handle
                .downcast_ref::<RefCell<i64>>()
                .ok_or_else(|| CommandError::failed("not a Counter"))?;
            match method {
                "increment" => {
                    *cell.borrow_mut() += 1;
                    Ok(Message::reply(vec![Argument::Int64(*cell.borrow())]))
                }
                "get" => Ok(Message::reply(vec![Argument::Int64(*cell.borrow())])),
                other => Err(CommandError::unknown_method("Counter", other)),
            }
        }),
    );
    interpreter
}

/// One New followed by `invocations` increments.
fn counter_stream(invocations: usize) -> MessageStream {
    let mut stream = MessageStream::new();
    stream
        .append_command(Command::New)
        .append("Counter")
        .append_id_value(ObjectId(1));
    for _ in 0..invocations {
        stream
            .append_command(Command::Invoke)
            .append_id_value(ObjectId(1))
            .append("increment");
    }
    stream.append_command(Command::End);
    stream
}

/// An Invoke whose argument chains `depth` nested invocations.
fn nested_stream(depth: usize) -> MessageStream {
    let mut inner = MessageStream::new();
    inner
        .append_command(Command::Invoke)
        .append_id_value(ObjectId(1))
        .append("get")
        .append_command(Command::End);
    for _ in 0..depth {
        let mut outer = MessageStream::new();
        outer
            .append_command(Command::Invoke)
            .append_id_value(ObjectId(1))
            .append("get")
            .append_stream(inner)
            .append_command(Command::End);
        inner = outer;
    }
    inner
}

fn dispatch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let stream = counter_stream(1000);
    group.bench_function("increment_1000", |b| {
        b.iter(|| {
            let mut interpreter = counter_interpreter();
            assert!(interpreter.process_stream(black_box(&stream)));
        })
    });

    let setup = counter_stream(0);
    let nested = nested_stream(16);
    group.bench_function("nested_expansion_16", |b| {
        b.iter(|| {
            let mut interpreter = counter_interpreter();
            assert!(interpreter.process_stream(black_box(&setup)));
            assert!(interpreter.process_stream(black_box(&nested)));
        })
    });

    group.finish();
}

fn codec_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let stream = counter_stream(1000);
    group.bench_function("encode_1001_messages", |b| {
        b.iter(|| black_box(&stream).to_bytes().expect("encode"))
    });

    let bytes = stream.to_bytes().expect("encode");
    group.bench_function("decode_1001_messages", |b| {
        b.iter(|| MessageStream::from_bytes(black_box(&bytes)).expect("decode"))
    });

    group.finish();
}

criterion_group!(benches, dispatch_benchmarks, codec_benchmarks);
criterion_main!(benches);
