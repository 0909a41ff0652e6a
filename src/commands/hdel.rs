use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Deletes a hash field. Returns 1 when the field existed, 0 otherwise.
#[derive(Debug, PartialEq)]
pub struct HDel {
    pub key: String,
    pub field: String,
}

impl Executable for HDel {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.hdel(&self.key, &self.field) {
            Ok(deleted) => Response::Int(i64::from(deleted)),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for HDel {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let field = parser
            .next_string()?
            .ok_or(CommandParserError::MissingArgument {
                command: "HDEL",
                what: "a field",
            })?;

        Ok(Self { key, field })
    }
}
