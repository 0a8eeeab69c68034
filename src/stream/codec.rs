//! Binary encoding of a message stream.
//!
//! Layout: 4 magic bytes, a format version byte, then a little-endian
//! u32 message count followed by the messages. Each message is a command
//! tag, a u32 argument count and the arguments; each argument is a type
//! tag followed by its payload. Arrays and strings are length-prefixed;
//! nested streams are a length-prefixed recursive encoding.

use crate::error::DecodeError;
use crate::registry::ObjectId;
use crate::stream::argument::Argument;
use crate::stream::command::{ArgType, Command};
use crate::stream::stream::{Message, MessageStream};

const MAGIC: [u8; 4] = *b"wcst";
const VERSION: u8 = 1;

/// Encode a stream into bytes. Fails only for an invalid stream.
pub fn encode(stream: &MessageStream) -> Result<Vec<u8>, DecodeError> {
    if !stream.is_valid() {
        return Err(DecodeError::InvalidStream);
    }
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);
    put_u32(&mut out, stream.message_count() as u32);
    for message in stream.messages() {
        encode_message(&mut out, message)?;
    }
    Ok(out)
}

/// Decode a stream from bytes, rejecting anything malformed.
pub fn decode(bytes: &[u8]) -> Result<MessageStream, DecodeError> {
    let mut reader = ByteReader::new(bytes);
    if reader.take(4)? != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = reader.u8()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let count = reader.u32()? as usize;
    let mut stream = MessageStream::new();
    for _ in 0..count {
        let message = decode_message(&mut reader)?;
        stream.append_message(&message);
    }
    if reader.remaining() != 0 {
        return Err(DecodeError::corrupt(format!(
            "{} trailing bytes after last message",
            reader.remaining()
        )));
    }
    Ok(stream)
}

fn encode_message(out: &mut Vec<u8>, message: &Message) -> Result<(), DecodeError> {
    out.push(message.command as u8);
    put_u32(out, message.args.len() as u32);
    for arg in &message.args {
        encode_argument(out, arg)?;
    }
    Ok(())
}

fn decode_message(reader: &mut ByteReader<'_>) -> Result<Message, DecodeError> {
    let tag = reader.u8()?;
    let command = Command::from_u8(tag).ok_or(DecodeError::BadCommandTag(tag))?;
    if command == Command::End {
        // End is a builder marker, never a stored message.
        return Err(DecodeError::BadCommandTag(tag));
    }
    let count = reader.u32()? as usize;
    let mut args = Vec::new();
    for _ in 0..count {
        args.push(decode_argument(reader)?);
    }
    Ok(Message::with_args(command, args))
}

macro_rules! put_scalar_array {
    ($out:expr, $items:expr) => {{
        put_u32($out, $items.len() as u32);
        for item in $items {
            $out.extend_from_slice(&item.to_le_bytes());
        }
    }};
}

fn encode_argument(out: &mut Vec<u8>, arg: &Argument) -> Result<(), DecodeError> {
    out.push(arg.arg_type() as u8);
    match arg {
        Argument::Int8(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::UInt8(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::UInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::UInt64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::Float32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::Float64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Argument::Int8Array(v) => put_scalar_array!(out, v),
        Argument::Int16Array(v) => put_scalar_array!(out, v),
        Argument::Int32Array(v) => put_scalar_array!(out, v),
        Argument::Int64Array(v) => put_scalar_array!(out, v),
        Argument::UInt8Array(v) => put_scalar_array!(out, v),
        Argument::UInt16Array(v) => put_scalar_array!(out, v),
        Argument::UInt32Array(v) => put_scalar_array!(out, v),
        Argument::UInt64Array(v) => put_scalar_array!(out, v),
        Argument::Float32Array(v) => put_scalar_array!(out, v),
        Argument::Float64Array(v) => put_scalar_array!(out, v),
        Argument::Bool(v) => out.push(u8::from(*v)),
        Argument::String(v) => {
            put_u32(out, v.len() as u32);
            out.extend_from_slice(v.as_bytes());
        }
        Argument::ObjectRef(id) => put_u32(out, id.raw()),
        Argument::IdValue(id) => put_u32(out, id.raw()),
        Argument::Stream(nested) => {
            let bytes = encode(nested)?;
            put_u32(out, bytes.len() as u32);
            out.extend_from_slice(&bytes);
        }
    }
    Ok(())
}

macro_rules! take_scalar_array {
    ($reader:expr, $elem:ty, $variant:ident) => {{
        let len = $reader.u32()? as usize;
        let size = std::mem::size_of::<$elem>();
        // Bound the allocation by what the buffer can actually hold.
        if $reader.remaining() < len.saturating_mul(size) {
            return Err(DecodeError::truncated(
                len.saturating_mul(size),
                $reader.remaining(),
            ));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let bytes = $reader.take(size)?;
            let mut buf = [0u8; std::mem::size_of::<$elem>()];
            buf.copy_from_slice(bytes);
            items.push(<$elem>::from_le_bytes(buf));
        }
        Argument::$variant(items)
    }};
}

fn decode_argument(reader: &mut ByteReader<'_>) -> Result<Argument, DecodeError> {
    let tag = reader.u8()?;
    let ty = ArgType::from_u8(tag).ok_or(DecodeError::BadTypeTag(tag))?;
    let arg = match ty {
        ArgType::Int8 => Argument::Int8(reader.u8()? as i8),
        ArgType::Int16 => Argument::Int16(i16::from_le_bytes(reader.array()?)),
        ArgType::Int32 => Argument::Int32(i32::from_le_bytes(reader.array()?)),
        ArgType::Int64 => Argument::Int64(i64::from_le_bytes(reader.array()?)),
        ArgType::UInt8 => Argument::UInt8(reader.u8()?),
        ArgType::UInt16 => Argument::UInt16(u16::from_le_bytes(reader.array()?)),
        ArgType::UInt32 => Argument::UInt32(reader.u32()?),
        ArgType::UInt64 => Argument::UInt64(u64::from_le_bytes(reader.array()?)),
        ArgType::Float32 => Argument::Float32(f32::from_le_bytes(reader.array()?)),
        ArgType::Float64 => Argument::Float64(f64::from_le_bytes(reader.array()?)),
        ArgType::Int8Array => take_scalar_array!(reader, i8, Int8Array),
        ArgType::Int16Array => take_scalar_array!(reader, i16, Int16Array),
        ArgType::Int32Array => take_scalar_array!(reader, i32, Int32Array),
        ArgType::Int64Array => take_scalar_array!(reader, i64, Int64Array),
        ArgType::UInt8Array => take_scalar_array!(reader, u8, UInt8Array),
        ArgType::UInt16Array => take_scalar_array!(reader, u16, UInt16Array),
        ArgType::UInt32Array => take_scalar_array!(reader, u32, UInt32Array),
        ArgType::UInt64Array => take_scalar_array!(reader, u64, UInt64Array),
        ArgType::Float32Array => take_scalar_array!(reader, f32, Float32Array),
        ArgType::Float64Array => take_scalar_array!(reader, f64, Float64Array),
        ArgType::Bool => match reader.u8()? {
            0 => Argument::Bool(false),
            1 => Argument::Bool(true),
            other => {
                return Err(DecodeError::corrupt(format!(
                    "bool payload must be 0 or 1, found {}",
                    other
                )))
            }
        },
        ArgType::String => {
            let len = reader.u32()? as usize;
            let bytes = reader.take(len)?;
            Argument::String(std::str::from_utf8(bytes)?.to_string())
        }
        ArgType::ObjectRef => Argument::ObjectRef(ObjectId(reader.u32()?)),
        ArgType::IdValue => Argument::IdValue(ObjectId(reader.u32()?)),
        ArgType::Stream => {
            let len = reader.u32()? as usize;
            let bytes = reader.take(len)?;
            Argument::Stream(decode(bytes)?)
        }
    };
    Ok(arg)
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::truncated(n, self.remaining()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.take(N)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::stream::command::ErrorKind;

    fn sample_stream() -> MessageStream {
        let mut nested = MessageStream::new();
        nested
            .append_command(Command::Invoke)
            .append_id_value(ObjectId(3))
            .append("area")
            .append_command(Command::End);

        let mut stream = MessageStream::new();
        stream
            .append_command(Command::New)
            .append("Shape")
            .append_id_value(ObjectId(3))
            .append_command(Command::Invoke)
            .append_id_value(ObjectId(3))
            .append("resize")
            .append(vec![2.0f64, 4.0])
            .append(true)
            .append(-17i64)
            .append(250u8)
            .append_stream(nested)
            .append_command(Command::End);
        stream
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let stream = sample_stream();
        let bytes = stream.to_bytes().unwrap();
        let decoded = MessageStream::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, stream);
    }

    #[test]
    fn test_round_trip_error_message() {
        let mut stream = MessageStream::new();
        stream.append_message(&Message::error(ErrorKind::NotFound, "no object #9"));
        let decoded = MessageStream::from_bytes(&stream.to_bytes().unwrap()).unwrap();
        assert_eq!(
            decoded.message(0).unwrap().error_kind(),
            Some(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let err = MessageStream::from_bytes(b"nope....").unwrap_err();
        assert!(matches!(err, DecodeError::BadMagic));
    }

    #[test]
    fn test_truncation_is_rejected() {
        let bytes = sample_stream().to_bytes().unwrap();
        for cut in [5, 9, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                MessageStream::from_bytes(&bytes[..cut]).is_err(),
                "cut at {} should fail",
                cut
            );
        }
    }

    #[test]
    fn test_corrupt_array_length_is_rejected() {
        let mut stream = MessageStream::new();
        stream
            .append_command(Command::Reply)
            .append(vec![1u32, 2, 3])
            .append_command(Command::End);
        let mut bytes = stream.to_bytes().unwrap();

        // The array length prefix sits right after magic, version, message
        // count, command tag, argument count and type tag.
        let len_offset = 4 + 1 + 4 + 1 + 4 + 1;
        bytes[len_offset..len_offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = MessageStream::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = sample_stream().to_bytes().unwrap();
        bytes.push(0);
        let err = MessageStream::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)));
    }

    #[test]
    fn test_invalid_stream_does_not_encode() {
        let mut stream = MessageStream::new();
        stream.append(1i32);
        assert!(matches!(
            stream.to_bytes(),
            Err(DecodeError::InvalidStream)
        ));
    }
}
