use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Pushes values at the head of a list, one by one, so the last value ends
/// up first. Creates the list when the key is absent. Returns the new
/// length.
///
/// Ref: <https://redis.io/docs/latest/commands/lpush/>
#[derive(Debug, PartialEq)]
pub struct LPush {
    pub key: String,
    pub values: Vec<Bytes>,
}

impl Executable for LPush {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.lpush(&self.key, self.values) {
            Ok(length) => Response::Int(length),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for LPush {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let values = parser.remaining();
        if values.is_empty() {
            return Err(CommandParserError::MissingArgument {
                command: "LPUSH",
                what: "at least one value",
            }
            .into());
        }

        Ok(Self { key, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn last_value_ends_up_first() {
        let store = Store::new();

        let request = Request::new(Opcode::LPush, "q").with_args(vec![
            Bytes::from("1"),
            Bytes::from("2"),
            Bytes::from("3"),
        ]);
        let cmd = Command::try_from(request).unwrap();
        let result = cmd.exec(store.clone()).unwrap();

        assert_eq!(result, Response::Int(3));
        assert_eq!(store.lpop("q").unwrap(), Some(Bytes::from("3")));
        assert_eq!(store.llen("q").unwrap(), 2);
    }

    #[tokio::test]
    async fn no_values() {
        let request = Request::new(Opcode::LPush, "q");

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(err.to_string(), "LPUSH requires at least one value");
    }
}
