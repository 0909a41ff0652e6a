use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns every member of a set in no particular order. An absent key
/// yields an empty array.
#[derive(Debug, PartialEq)]
pub struct SMembers {
    pub key: String,
}

impl Executable for SMembers {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.smembers(&self.key) {
            Ok(members) => Response::Array(members),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for SMembers {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}
