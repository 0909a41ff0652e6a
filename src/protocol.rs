use std::fmt;
use std::io::Cursor;
use std::time::Duration;

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;

use crate::Error;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("protocol error; empty payload")]
    EmptyPayload,
    #[error("protocol error; truncated payload")]
    Truncated,
    #[error("protocol error; malformed varint")]
    MalformedVarint,
    #[error("protocol error; frame of {0} bytes exceeds the 1 MiB limit")]
    FrameTooLarge(usize),
    #[error("protocol error; invalid response type: {0}")]
    InvalidResponseType(u8),
    #[error("protocol error; invalid UTF-8 text")]
    InvalidUtf8,
    #[error("unknown command: {0}")]
    UnknownOpcode(u8),
}

/// Wire opcodes, numbered consecutively from 0. The numbering is part of the
/// protocol and must stay stable across versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Get = 0,
    Set,
    Del,
    Exists,
    Incr,
    Decr,
    IncrBy,
    DecrBy,
    Expire,
    Ttl,
    Persist,
    HGet,
    HSet,
    HDel,
    HGetAll,
    HExists,
    LPush,
    RPush,
    LPop,
    RPop,
    LLen,
    SAdd,
    SRem,
    SMembers,
    SIsMember,
    Ping,
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Get),
            1 => Ok(Self::Set),
            2 => Ok(Self::Del),
            3 => Ok(Self::Exists),
            4 => Ok(Self::Incr),
            5 => Ok(Self::Decr),
            6 => Ok(Self::IncrBy),
            7 => Ok(Self::DecrBy),
            8 => Ok(Self::Expire),
            9 => Ok(Self::Ttl),
            10 => Ok(Self::Persist),
            11 => Ok(Self::HGet),
            12 => Ok(Self::HSet),
            13 => Ok(Self::HDel),
            14 => Ok(Self::HGetAll),
            15 => Ok(Self::HExists),
            16 => Ok(Self::LPush),
            17 => Ok(Self::RPush),
            18 => Ok(Self::LPop),
            19 => Ok(Self::RPop),
            20 => Ok(Self::LLen),
            21 => Ok(Self::SAdd),
            22 => Ok(Self::SRem),
            23 => Ok(Self::SMembers),
            24 => Ok(Self::SIsMember),
            25 => Ok(Self::Ping),
            byte => Err(ProtocolError::UnknownOpcode(byte)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode as u8
    }
}

/// A client request: opcode, target key (empty for PING), byte-string
/// arguments and a TTL in seconds (0 means "no expiration").
///
/// Payload layout: a 1-byte opcode, then the length-prefixed key, then the
/// argument count followed by each length-prefixed argument, then the TTL.
/// Lengths and counts are unsigned LEB128 varints.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub opcode: u8,
    pub key: String,
    pub args: Vec<Bytes>,
    pub ttl_secs: u64,
}

impl Request {
    pub fn new(opcode: Opcode, key: impl Into<String>) -> Self {
        Self {
            opcode: opcode.into(),
            key: key.into(),
            args: Vec::new(),
            ttl_secs: 0,
        }
    }

    pub fn with_args(mut self, args: Vec<Bytes>) -> Self {
        self.args = args;
        self
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// The request TTL as a duration. Zero seconds means "no expiration".
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + self.key.len());
        buf.push(self.opcode);
        put_uvarint(&mut buf, self.key.len() as u64);
        buf.extend_from_slice(self.key.as_bytes());
        put_uvarint(&mut buf, self.args.len() as u64);
        for arg in &self.args {
            put_uvarint(&mut buf, arg.len() as u64);
            buf.extend_from_slice(arg);
        }
        put_uvarint(&mut buf, self.ttl_secs);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }

        let mut src = Cursor::new(payload);
        let opcode = get_u8(&mut src)?;

        let key = get_length_prefixed(&mut src)?;
        let key = String::from_utf8(key.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)?;

        let arg_count = get_uvarint(&mut src)?;
        if arg_count > src.remaining() as u64 {
            // Each argument takes at least one byte for its length prefix.
            return Err(ProtocolError::Truncated);
        }
        let mut args = Vec::with_capacity(arg_count as usize);
        for _ in 0..arg_count {
            let arg = get_length_prefixed(&mut src)?;
            args.push(Bytes::copy_from_slice(arg));
        }

        let ttl_secs = get_uvarint(&mut src)?;

        Ok(Self {
            opcode,
            key,
            args,
            ttl_secs,
        })
    }
}

/// A server response. The type byte numbering (OK=0, Error=1, String=2,
/// Int=3, Array=4, Nil=5) is part of the protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Ok,
    Error(String),
    Str(Bytes),
    Int(i64),
    Array(Vec<Bytes>),
    Nil,
}

const RESP_OK: u8 = 0;
const RESP_ERROR: u8 = 1;
const RESP_STRING: u8 = 2;
const RESP_INT: u8 = 3;
const RESP_ARRAY: u8 = 4;
const RESP_NIL: u8 = 5;

impl Response {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        match self {
            Response::Ok => buf.push(RESP_OK),
            Response::Error(message) => {
                buf.push(RESP_ERROR);
                put_uvarint(&mut buf, message.len() as u64);
                buf.extend_from_slice(message.as_bytes());
            }
            Response::Str(value) => {
                buf.push(RESP_STRING);
                put_uvarint(&mut buf, value.len() as u64);
                buf.extend_from_slice(value);
            }
            Response::Int(value) => {
                buf.push(RESP_INT);
                put_varint(&mut buf, *value);
            }
            Response::Array(items) => {
                buf.push(RESP_ARRAY);
                put_uvarint(&mut buf, items.len() as u64);
                for item in items {
                    put_uvarint(&mut buf, item.len() as u64);
                    buf.extend_from_slice(item);
                }
            }
            Response::Nil => buf.push(RESP_NIL),
        }
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }

        let mut src = Cursor::new(payload);
        match get_u8(&mut src)? {
            RESP_OK => Ok(Response::Ok),
            RESP_ERROR => {
                let message = get_length_prefixed(&mut src)?;
                let message =
                    String::from_utf8(message.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Response::Error(message))
            }
            RESP_STRING => {
                let value = get_length_prefixed(&mut src)?;
                Ok(Response::Str(Bytes::copy_from_slice(value)))
            }
            RESP_INT => Ok(Response::Int(get_varint(&mut src)?)),
            RESP_ARRAY => {
                let count = get_uvarint(&mut src)?;
                if count > src.remaining() as u64 {
                    return Err(ProtocolError::Truncated);
                }
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let item = get_length_prefixed(&mut src)?;
                    items.push(Bytes::copy_from_slice(item));
                }
                Ok(Response::Array(items))
            }
            RESP_NIL => Ok(Response::Nil),
            byte => Err(ProtocolError::InvalidResponseType(byte)),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Error(message) => write!(f, "ERR {message}"),
            Response::Str(value) => write!(f, "\"{}\"", String::from_utf8_lossy(value)),
            Response::Int(value) => write!(f, "{value}"),
            Response::Nil => write!(f, "(nil)"),
            Response::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Response::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) \"{}\"", i + 1, String::from_utf8_lossy(item))?;
                }
                Ok(())
            }
        }
    }
}

/// Parses a whitespace-tokenized text command into a [`Request`].
///
/// Recognizes a subset of the wire commands: GET, SET, DEL, EXISTS, INCR,
/// DECR and PING. SET accepts an optional trailing integer TTL in seconds.
/// The command name is case-insensitive; keys and values are literal.
pub fn parse_text_command(line: &str) -> crate::Result<Request> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((name, rest)) = parts.split_first() else {
        return Err("empty command".into());
    };

    match name.to_uppercase().as_str() {
        "GET" => match rest {
            [key] => Ok(Request::new(Opcode::Get, *key)),
            _ => Err("GET requires exactly 1 argument".into()),
        },
        "SET" => match rest {
            [key, value] => {
                Ok(Request::new(Opcode::Set, *key)
                    .with_args(vec![Bytes::copy_from_slice(value.as_bytes())]))
            }
            [key, value, ttl] => {
                let ttl_secs: u64 = ttl
                    .parse()
                    .map_err(|_| -> Error { format!("invalid TTL: {ttl:?}").into() })?;
                Ok(Request::new(Opcode::Set, *key)
                    .with_args(vec![Bytes::copy_from_slice(value.as_bytes())])
                    .with_ttl(ttl_secs))
            }
            _ => Err("SET requires at least 2 arguments".into()),
        },
        "DEL" => match rest {
            [key] => Ok(Request::new(Opcode::Del, *key)),
            _ => Err("DEL requires exactly 1 argument".into()),
        },
        "EXISTS" => match rest {
            [key] => Ok(Request::new(Opcode::Exists, *key)),
            _ => Err("EXISTS requires exactly 1 argument".into()),
        },
        "INCR" => match rest {
            [key] => Ok(Request::new(Opcode::Incr, *key)),
            _ => Err("INCR requires exactly 1 argument".into()),
        },
        "DECR" => match rest {
            [key] => Ok(Request::new(Opcode::Decr, *key)),
            _ => Err("DECR requires exactly 1 argument".into()),
        },
        "PING" => Ok(Request::new(Opcode::Ping, "")),
        name => Err(format!("unknown command: {name:?}").into()),
    }
}

fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

// Signed LEB128: the sign lives in bit 6 of the final byte.
fn put_varint(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, ProtocolError> {
    if !src.has_remaining() {
        return Err(ProtocolError::Truncated);
    }
    Ok(src.get_u8())
}

fn get_uvarint(src: &mut Cursor<&[u8]>) -> Result<u64, ProtocolError> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        if shift > 63 {
            return Err(ProtocolError::MalformedVarint);
        }
        let byte = get_u8(src)?;
        if shift == 63 && byte > 1 {
            return Err(ProtocolError::MalformedVarint);
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

fn get_varint(src: &mut Cursor<&[u8]>) -> Result<i64, ProtocolError> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        if shift > 63 {
            return Err(ProtocolError::MalformedVarint);
        }
        let byte = get_u8(src)?;
        result |= i64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Ok(result);
        }
    }
}

fn get_length_prefixed<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let length = get_uvarint(src)?;
    if length > src.remaining() as u64 {
        return Err(ProtocolError::Truncated);
    }
    let start = src.position() as usize;
    let end = start + length as usize;
    let bytes = &src.get_ref()[start..end];
    src.set_position(end as u64);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_request(request: Request) {
        let encoded = request.encode();
        let decoded = Request::decode(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    fn roundtrip_response(response: Response) {
        let encoded = response.encode();
        let decoded = Response::decode(&encoded).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn request_roundtrip_bare() {
        roundtrip_request(Request::new(Opcode::Ping, ""));
        roundtrip_request(Request::new(Opcode::Get, "greeting"));
    }

    #[test]
    fn request_roundtrip_args_and_ttl() {
        roundtrip_request(
            Request::new(Opcode::Set, "greeting")
                .with_args(vec![Bytes::from("hi")])
                .with_ttl(60),
        );
        roundtrip_request(Request::new(Opcode::SAdd, "tags").with_args(vec![
            Bytes::from("a"),
            Bytes::from(""),
            Bytes::from_static(&[0x00, 0xff, 0x80]),
        ]));
    }

    #[test]
    fn zero_ttl_means_no_expiration() {
        assert_eq!(Request::new(Opcode::Set, "k").ttl(), None);
        assert_eq!(
            Request::new(Opcode::Set, "k").with_ttl(5).ttl(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn response_roundtrip_all_variants() {
        roundtrip_response(Response::Ok);
        roundtrip_response(Response::Nil);
        roundtrip_response(Response::Error("value is not a hash".to_string()));
        roundtrip_response(Response::Str(Bytes::from("hello")));
        roundtrip_response(Response::Str(Bytes::from("")));
        roundtrip_response(Response::Array(vec![]));
        roundtrip_response(Response::Array(vec![
            Bytes::from("name"),
            Bytes::from("A"),
            Bytes::from_static(&[0xde, 0xad]),
        ]));
    }

    #[test]
    fn response_roundtrip_integer_extremes() {
        for value in [0, 1, -1, 63, 64, -64, -65, 300, -300, i64::MAX, i64::MIN] {
            roundtrip_response(Response::Int(value));
        }
    }

    #[test]
    fn decode_empty_payload() {
        assert_eq!(Request::decode(&[]), Err(ProtocolError::EmptyPayload));
        assert_eq!(Response::decode(&[]), Err(ProtocolError::EmptyPayload));
    }

    #[test]
    fn decode_truncated_key() {
        // Opcode GET, key length 5, but only two key bytes follow.
        let payload = [0x00, 0x05, b'h', b'i'];
        assert_eq!(Request::decode(&payload), Err(ProtocolError::Truncated));
    }

    #[test]
    fn decode_truncated_varint() {
        // Continuation bit set with no following byte.
        let payload = [0x00, 0x80];
        assert_eq!(Request::decode(&payload), Err(ProtocolError::Truncated));
    }

    #[test]
    fn decode_overlong_varint() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&[0xff; 11]);
        assert_eq!(
            Request::decode(&payload),
            Err(ProtocolError::MalformedVarint)
        );
    }

    #[test]
    fn decode_invalid_response_type() {
        assert_eq!(
            Response::decode(&[42]),
            Err(ProtocolError::InvalidResponseType(42))
        );
    }

    #[test]
    fn decode_array_count_overflow() {
        // Array with a declared count far beyond the remaining bytes.
        let payload = [RESP_ARRAY, 0xff, 0xff, 0x03];
        assert_eq!(Response::decode(&payload), Err(ProtocolError::Truncated));
    }

    #[test]
    fn opcode_numbering_is_stable() {
        assert_eq!(u8::from(Opcode::Get), 0);
        assert_eq!(u8::from(Opcode::DecrBy), 7);
        assert_eq!(u8::from(Opcode::HGetAll), 14);
        assert_eq!(u8::from(Opcode::LLen), 20);
        assert_eq!(u8::from(Opcode::Ping), 25);
        assert_eq!(Opcode::try_from(25).unwrap(), Opcode::Ping);
        assert_eq!(Opcode::try_from(26), Err(ProtocolError::UnknownOpcode(26)));
    }

    #[test]
    fn parse_text_get() {
        let request = parse_text_command("GET mykey").unwrap();
        assert_eq!(request, Request::new(Opcode::Get, "mykey"));
    }

    #[test]
    fn parse_text_set_with_ttl() {
        let request = parse_text_command("set mykey myvalue 60").unwrap();
        assert_eq!(
            request,
            Request::new(Opcode::Set, "mykey")
                .with_args(vec![Bytes::from("myvalue")])
                .with_ttl(60)
        );
    }

    #[test]
    fn parse_text_case_insensitive() {
        let request = parse_text_command("pInG").unwrap();
        assert_eq!(request.opcode, u8::from(Opcode::Ping));
    }

    #[test]
    fn parse_text_rejects_bad_arity() {
        assert!(parse_text_command("GET").is_err());
        assert!(parse_text_command("SET key").is_err());
        assert!(parse_text_command("").is_err());
        assert!(parse_text_command("NOPE key").is_err());
    }
}
