use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Removes a key. Returns 1 when the key existed, 0 otherwise.
#[derive(Debug, PartialEq)]
pub struct Del {
    pub key: String,
}

impl Executable for Del {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let deleted = store.del(&self.key);
        Ok(Response::Int(i64::from(deleted)))
    }
}

impl TryFrom<&mut RequestParser> for Del {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn existing_key() {
        let store = Store::new();
        store.set("key1".to_string(), Bytes::from("value"), None);

        let cmd = Command::try_from(Request::new(Opcode::Del, "key1")).unwrap();
        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Response::Int(1));
        assert!(!store.exists("key1"));
    }

    #[tokio::test]
    async fn non_existing_key() {
        let store = Store::new();

        let cmd = Command::try_from(Request::new(Opcode::Del, "key1")).unwrap();
        let result = cmd.exec(store).unwrap();

        assert_eq!(result, Response::Int(0));
    }
}
