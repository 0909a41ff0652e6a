use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Removes members from a set. Returns the number actually removed.
#[derive(Debug, PartialEq)]
pub struct SRem {
    pub key: String,
    pub members: Vec<Bytes>,
}

impl Executable for SRem {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.srem(&self.key, self.members) {
            Ok(removed) => Response::Int(removed),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for SRem {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let members = parser.remaining();
        if members.is_empty() {
            return Err(CommandParserError::MissingArgument {
                command: "SREM",
                what: "at least one member",
            }
            .into());
        }

        Ok(Self { key, members })
    }
}
