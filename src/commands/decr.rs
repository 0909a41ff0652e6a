use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Decrements the number stored at key by one.
///
/// Ref: <https://redis.io/docs/latest/commands/decr/>
#[derive(Debug, PartialEq)]
pub struct Decr {
    pub key: String,
}

impl Executable for Decr {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.decr(&self.key) {
            Ok(value) => Response::Int(value),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for Decr {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn non_existing_key_starts_at_minus_one() {
        let store = Store::new();

        let cmd = Command::try_from(Request::new(Opcode::Decr, "countdown")).unwrap();
        let result = cmd.exec(store).unwrap();

        assert_eq!(result, Response::Int(-1));
    }
}
