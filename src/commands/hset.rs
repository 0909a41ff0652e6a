use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Sets a hash field, creating the hash when the key is absent. A key
/// holding another variant is a type error.
#[derive(Debug, PartialEq)]
pub struct HSet {
    pub key: String,
    pub field: String,
    pub value: Bytes,
}

impl Executable for HSet {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.hset(&self.key, self.field, self.value) {
            Ok(()) => Response::Ok,
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for HSet {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let missing = CommandParserError::MissingArgument {
            command: "HSET",
            what: "field and value",
        };
        let field = parser.next_string()?.ok_or_else(|| missing.clone())?;
        let value = parser.next_bytes().ok_or(missing)?;

        Ok(Self { key, field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn creates_hash_and_field() {
        let store = Store::new();

        let request = Request::new(Opcode::HSet, "user:1")
            .with_args(vec![Bytes::from("name"), Bytes::from("A")]);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(cmd.exec(store.clone()).unwrap(), Response::Ok);
        assert_eq!(
            store.hget("user:1", "name").unwrap(),
            Some(Bytes::from("A"))
        );
    }

    #[tokio::test]
    async fn wrong_variant_is_an_error() {
        let store = Store::new();
        store.set("user:1".to_string(), Bytes::from("plain"), None);

        let request = Request::new(Opcode::HSet, "user:1")
            .with_args(vec![Bytes::from("name"), Bytes::from("A")]);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(
            cmd.exec(store.clone()).unwrap(),
            Response::Error("value is not a hash".to_string())
        );
        assert_eq!(store.get("user:1").unwrap(), Some(Bytes::from("plain")));
    }

    #[tokio::test]
    async fn missing_value() {
        let request = Request::new(Opcode::HSet, "user:1").with_args(vec![Bytes::from("name")]);

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(err.to_string(), "HSET requires field and value");
    }
}
