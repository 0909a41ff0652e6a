use std::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Sets the expiration of an existing key to now plus the request TTL.
/// Returns 1 when the expiration was set, 0 when the key is absent.
///
/// Ref: <https://redis.io/docs/latest/commands/expire/>
#[derive(Debug, PartialEq)]
pub struct Expire {
    pub key: String,
    pub ttl: Duration,
}

impl Executable for Expire {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let updated = store.expire(&self.key, self.ttl);
        Ok(Response::Int(i64::from(updated)))
    }
}

impl TryFrom<&mut RequestParser> for Expire {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self {
            key: parser.key(),
            ttl: Duration::from_secs(parser.ttl_secs()),
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};
    use crate::store::Ttl;

    #[tokio::test]
    async fn existing_key() {
        let store = Store::new();
        store.set("key1".to_string(), Bytes::from("value"), None);

        let request = Request::new(Opcode::Expire, "key1").with_ttl(100);
        let cmd = Command::try_from(request).unwrap();
        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Response::Int(1));
        assert!(matches!(store.ttl("key1"), Ttl::Remaining(_)));
    }

    #[tokio::test]
    async fn non_existing_key() {
        let store = Store::new();

        let request = Request::new(Opcode::Expire, "key1").with_ttl(100);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(cmd.exec(store).unwrap(), Response::Int(0));
    }
}
