use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Removes and returns the last element of a list, or Nil when the list is
/// absent or empty.
#[derive(Debug, PartialEq)]
pub struct RPop {
    pub key: String,
}

impl Executable for RPop {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.rpop(&self.key) {
            Ok(Some(value)) => Response::Str(value),
            Ok(None) => Response::Nil,
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for RPop {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}
