use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Adds members to a set, creating it when the key is absent. Duplicates
/// are ignored. Returns the number of members actually added.
///
/// Ref: <https://redis.io/docs/latest/commands/sadd/>
#[derive(Debug, PartialEq)]
pub struct SAdd {
    pub key: String,
    pub members: Vec<Bytes>,
}

impl Executable for SAdd {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.sadd(&self.key, self.members) {
            Ok(added) => Response::Int(added),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for SAdd {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let members = parser.remaining();
        if members.is_empty() {
            return Err(CommandParserError::MissingArgument {
                command: "SADD",
                what: "at least one member",
            }
            .into());
        }

        Ok(Self { key, members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn duplicates_are_ignored() {
        let store = Store::new();

        let request = Request::new(Opcode::SAdd, "tags").with_args(vec![
            Bytes::from("a"),
            Bytes::from("b"),
            Bytes::from("a"),
        ]);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(cmd.exec(store.clone()).unwrap(), Response::Int(2));

        let request =
            Request::new(Opcode::SAdd, "tags").with_args(vec![Bytes::from("a"), Bytes::from("c")]);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(cmd.exec(store).unwrap(), Response::Int(1));
    }

    #[tokio::test]
    async fn no_members() {
        let request = Request::new(Opcode::SAdd, "tags");

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(err.to_string(), "SADD requires at least one member");
    }
}
