use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns 1 when the member is in the set, 0 otherwise.
#[derive(Debug, PartialEq)]
pub struct SIsMember {
    pub key: String,
    pub member: Bytes,
}

impl Executable for SIsMember {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.sismember(&self.key, &self.member) {
            Ok(is_member) => Response::Int(i64::from(is_member)),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for SIsMember {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let member = parser
            .next_bytes()
            .ok_or(CommandParserError::MissingArgument {
                command: "SISMEMBER",
                what: "a member",
            })?;

        Ok(Self { key, member })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn membership() {
        let store = Store::new();
        store.sadd("tags", vec![Bytes::from("a")]).unwrap();

        let request = Request::new(Opcode::SIsMember, "tags").with_args(vec![Bytes::from("a")]);
        let cmd = Command::try_from(request).unwrap();
        assert_eq!(cmd.exec(store.clone()).unwrap(), Response::Int(1));

        let request = Request::new(Opcode::SIsMember, "tags").with_args(vec![Bytes::from("z")]);
        let cmd = Command::try_from(request).unwrap();
        assert_eq!(cmd.exec(store).unwrap(), Response::Int(0));
    }

    #[tokio::test]
    async fn missing_member_argument() {
        let request = Request::new(Opcode::SIsMember, "tags");

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(err.to_string(), "SISMEMBER requires a member");
    }
}
