use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns the value of a hash field, or Nil when the hash or field is
/// absent.
#[derive(Debug, PartialEq)]
pub struct HGet {
    pub key: String,
    pub field: String,
}

impl Executable for HGet {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.hget(&self.key, &self.field) {
            Ok(Some(value)) => Response::Str(value),
            Ok(None) => Response::Nil,
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for HGet {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let field = parser
            .next_string()?
            .ok_or(CommandParserError::MissingArgument {
                command: "HGET",
                what: "a field",
            })?;

        Ok(Self { key, field })
    }
}
