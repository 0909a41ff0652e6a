use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Appends values at the tail of a list, in order. Creates the list when
/// the key is absent. Returns the new length.
#[derive(Debug, PartialEq)]
pub struct RPush {
    pub key: String,
    pub values: Vec<Bytes>,
}

impl Executable for RPush {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.rpush(&self.key, self.values) {
            Ok(length) => Response::Int(length),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for RPush {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let values = parser.remaining();
        if values.is_empty() {
            return Err(CommandParserError::MissingArgument {
                command: "RPUSH",
                what: "at least one value",
            }
            .into());
        }

        Ok(Self { key, values })
    }
}
