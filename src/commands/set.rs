use std::time::Duration;

use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Stores a string value under a key, overwriting any prior value of any
/// variant. An optional TTL makes the key expire.
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub ttl: Option<Duration>,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Response, Error> {
        store.set(self.key, self.value, self.ttl);
        Ok(Response::Ok)
    }
}

impl TryFrom<&mut RequestParser> for Set {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let value = parser
            .next_bytes()
            .ok_or(CommandParserError::MissingArgument {
                command: "SET",
                what: "a value",
            })?;

        Ok(Self {
            key,
            value,
            ttl: parser.ttl(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn stores_the_value() {
        let store = Store::new();

        let request = Request::new(Opcode::Set, "key1").with_args(vec![Bytes::from("value")]);
        let cmd = Command::try_from(request).unwrap();

        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Response::Ok);
        assert_eq!(store.get("key1").unwrap(), Some(Bytes::from("value")));
    }

    #[tokio::test]
    async fn missing_value() {
        let request = Request::new(Opcode::Set, "key1");

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(
            *err,
            CommandParserError::MissingArgument {
                command: "SET",
                what: "a value",
            }
        );
    }
}
