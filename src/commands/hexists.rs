use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns 1 when the hash field exists, 0 otherwise.
#[derive(Debug, PartialEq)]
pub struct HExists {
    pub key: String,
    pub field: String,
}

impl Executable for HExists {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.hexists(&self.key, &self.field) {
            Ok(exists) => Response::Int(i64::from(exists)),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for HExists {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let field = parser
            .next_string()?
            .ok_or(CommandParserError::MissingArgument {
                command: "HEXISTS",
                what: "a field",
            })?;

        Ok(Self { key, field })
    }
}
