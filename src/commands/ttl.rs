use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns the remaining time to live of a key in seconds: -1 when the key
/// has no expiration, -2 when the key does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/ttl>
#[derive(Debug, PartialEq)]
pub struct Ttl {
    pub key: String,
}

impl Executable for Ttl {
    fn exec(self, store: Store) -> Result<Response, Error> {
        Ok(Response::Int(store.ttl(&self.key).as_secs()))
    }
}

impl TryFrom<&mut RequestParser> for Ttl {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn sentinels() {
        let store = Store::new();
        store.set("permanent".to_string(), Bytes::from("v"), None);
        store.set(
            "ephemeral".to_string(),
            Bytes::from("v"),
            Some(Duration::from_secs(100)),
        );

        let cmd = Command::try_from(Request::new(Opcode::Ttl, "permanent")).unwrap();
        assert_eq!(cmd.exec(store.clone()).unwrap(), Response::Int(-1));

        let cmd = Command::try_from(Request::new(Opcode::Ttl, "missing")).unwrap();
        assert_eq!(cmd.exec(store.clone()).unwrap(), Response::Int(-2));

        let cmd = Command::try_from(Request::new(Opcode::Ttl, "ephemeral")).unwrap();
        match cmd.exec(store).unwrap() {
            Response::Int(secs) => assert!((0..=100).contains(&secs)),
            other => panic!("expected integer response, got {other:?}"),
        }
    }
}
