pub mod decr;
pub mod decrby;
pub mod del;
pub mod executable;
pub mod exists;
pub mod expire;
pub mod get;
pub mod hdel;
pub mod hexists;
pub mod hget;
pub mod hgetall;
pub mod hset;
pub mod incr;
pub mod incrby;
pub mod llen;
pub mod lpop;
pub mod lpush;
pub mod persist;
pub mod ping;
pub mod rpop;
pub mod rpush;
pub mod sadd;
pub mod set;
pub mod sismember;
pub mod smembers;
pub mod srem;
pub mod ttl;

use std::time::Duration;
use std::vec;

use bytes::Bytes;
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::protocol::{Opcode, Request, Response};
use crate::store::Store;
use crate::Error;

use decr::Decr;
use decrby::DecrBy;
use del::Del;
use exists::Exists;
use expire::Expire;
use get::Get;
use hdel::HDel;
use hexists::HExists;
use hget::HGet;
use hgetall::HGetAll;
use hset::HSet;
use incr::Incr;
use incrby::IncrBy;
use llen::LLen;
use lpop::LPop;
use lpush::LPush;
use persist::Persist;
use ping::Ping;
use rpop::RPop;
use rpush::RPush;
use sadd::SAdd;
use set::Set;
use sismember::SIsMember;
use smembers::SMembers;
use srem::SRem;
use ttl::Ttl;

#[derive(Debug, PartialEq)]
pub enum Command {
    Get(Get),
    Set(Set),
    Del(Del),
    Exists(Exists),
    Incr(Incr),
    Decr(Decr),
    IncrBy(IncrBy),
    DecrBy(DecrBy),
    Expire(Expire),
    Ttl(Ttl),
    Persist(Persist),
    HGet(HGet),
    HSet(HSet),
    HDel(HDel),
    HGetAll(HGetAll),
    HExists(HExists),
    LPush(LPush),
    RPush(RPush),
    LPop(LPop),
    RPop(RPop),
    LLen(LLen),
    SAdd(SAdd),
    SRem(SRem),
    SMembers(SMembers),
    SIsMember(SIsMember),
    Ping(Ping),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Response, Error> {
        match self {
            Command::Get(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::Del(cmd) => cmd.exec(store),
            Command::Exists(cmd) => cmd.exec(store),
            Command::Incr(cmd) => cmd.exec(store),
            Command::Decr(cmd) => cmd.exec(store),
            Command::IncrBy(cmd) => cmd.exec(store),
            Command::DecrBy(cmd) => cmd.exec(store),
            Command::Expire(cmd) => cmd.exec(store),
            Command::Ttl(cmd) => cmd.exec(store),
            Command::Persist(cmd) => cmd.exec(store),
            Command::HGet(cmd) => cmd.exec(store),
            Command::HSet(cmd) => cmd.exec(store),
            Command::HDel(cmd) => cmd.exec(store),
            Command::HGetAll(cmd) => cmd.exec(store),
            Command::HExists(cmd) => cmd.exec(store),
            Command::LPush(cmd) => cmd.exec(store),
            Command::RPush(cmd) => cmd.exec(store),
            Command::LPop(cmd) => cmd.exec(store),
            Command::RPop(cmd) => cmd.exec(store),
            Command::LLen(cmd) => cmd.exec(store),
            Command::SAdd(cmd) => cmd.exec(store),
            Command::SRem(cmd) => cmd.exec(store),
            Command::SMembers(cmd) => cmd.exec(store),
            Command::SIsMember(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Request> for Command {
    type Error = Error;

    fn try_from(request: Request) -> Result<Self, Self::Error> {
        let opcode = Opcode::try_from(request.opcode)?;
        let parser = &mut RequestParser::new(request);

        match opcode {
            Opcode::Get => Get::try_from(parser).map(Command::Get),
            Opcode::Set => Set::try_from(parser).map(Command::Set),
            Opcode::Del => Del::try_from(parser).map(Command::Del),
            Opcode::Exists => Exists::try_from(parser).map(Command::Exists),
            Opcode::Incr => Incr::try_from(parser).map(Command::Incr),
            Opcode::Decr => Decr::try_from(parser).map(Command::Decr),
            Opcode::IncrBy => IncrBy::try_from(parser).map(Command::IncrBy),
            Opcode::DecrBy => DecrBy::try_from(parser).map(Command::DecrBy),
            Opcode::Expire => Expire::try_from(parser).map(Command::Expire),
            Opcode::Ttl => Ttl::try_from(parser).map(Command::Ttl),
            Opcode::Persist => Persist::try_from(parser).map(Command::Persist),
            Opcode::HGet => HGet::try_from(parser).map(Command::HGet),
            Opcode::HSet => HSet::try_from(parser).map(Command::HSet),
            Opcode::HDel => HDel::try_from(parser).map(Command::HDel),
            Opcode::HGetAll => HGetAll::try_from(parser).map(Command::HGetAll),
            Opcode::HExists => HExists::try_from(parser).map(Command::HExists),
            Opcode::LPush => LPush::try_from(parser).map(Command::LPush),
            Opcode::RPush => RPush::try_from(parser).map(Command::RPush),
            Opcode::LPop => LPop::try_from(parser).map(Command::LPop),
            Opcode::RPop => RPop::try_from(parser).map(Command::RPop),
            Opcode::LLen => LLen::try_from(parser).map(Command::LLen),
            Opcode::SAdd => SAdd::try_from(parser).map(Command::SAdd),
            Opcode::SRem => SRem::try_from(parser).map(Command::SRem),
            Opcode::SMembers => SMembers::try_from(parser).map(Command::SMembers),
            Opcode::SIsMember => SIsMember::try_from(parser).map(Command::SIsMember),
            Opcode::Ping => Ping::try_from(parser).map(Command::Ping),
        }
    }
}

/// Pulls the pieces of a decoded [`Request`] apart while commands validate
/// their argument arity.
pub(crate) struct RequestParser {
    key: String,
    args: vec::IntoIter<Bytes>,
    ttl_secs: u64,
}

impl RequestParser {
    fn new(request: Request) -> Self {
        Self {
            key: request.key,
            args: request.args.into_iter(),
            ttl_secs: request.ttl_secs,
        }
    }

    fn key(&mut self) -> String {
        std::mem::take(&mut self.key)
    }

    /// The request TTL. Zero seconds means "no expiration".
    fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    fn next_bytes(&mut self) -> Option<Bytes> {
        self.args.next()
    }

    fn next_string(&mut self) -> Result<Option<String>, CommandParserError> {
        match self.args.next() {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| CommandParserError::InvalidUtf8String),
            None => Ok(None),
        }
    }

    fn remaining(&mut self) -> Vec<Bytes> {
        self.args.by_ref().collect()
    }
}

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum CommandParserError {
    #[error("{command} requires {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("value is not an integer")]
    InvalidInteger,
    #[error("protocol error; argument is not valid UTF-8")]
    InvalidUtf8String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolError;

    #[test]
    fn parse_get_command() {
        let request = Request::new(Opcode::Get, "foo");

        let command = Command::try_from(request).unwrap();

        assert_eq!(
            command,
            Command::Get(Get {
                key: String::from("foo")
            })
        );
    }

    #[test]
    fn parse_set_command_with_ttl() {
        let request = Request::new(Opcode::Set, "foo")
            .with_args(vec![Bytes::from("bar")])
            .with_ttl(60);

        let command = Command::try_from(request).unwrap();

        assert_eq!(
            command,
            Command::Set(Set {
                key: String::from("foo"),
                value: Bytes::from("bar"),
                ttl: Some(Duration::from_secs(60)),
            })
        );
    }

    #[test]
    fn unknown_opcode() {
        let request = Request {
            opcode: 26,
            key: String::from("foo"),
            args: vec![],
            ttl_secs: 0,
        };

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<ProtocolError>().unwrap();

        assert_eq!(*err, ProtocolError::UnknownOpcode(26));
        assert_eq!(err.to_string(), "unknown command: 26");
    }

    #[test]
    fn missing_argument_message() {
        let request = Request::new(Opcode::Set, "foo");

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(err.to_string(), "SET requires a value");
    }
}
