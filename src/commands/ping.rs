use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Connectivity check; always answers PONG.
#[derive(Debug, PartialEq)]
pub struct Ping;

impl Executable for Ping {
    fn exec(self, _store: Store) -> Result<Response, Error> {
        Ok(Response::Str(Bytes::from_static(b"PONG")))
    }
}

impl TryFrom<&mut RequestParser> for Ping {
    type Error = Error;

    fn try_from(_parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}
