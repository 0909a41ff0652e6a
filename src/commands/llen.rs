use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns the length of a list; 0 when the key is absent.
#[derive(Debug, PartialEq)]
pub struct LLen {
    pub key: String,
}

impl Executable for LLen {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.llen(&self.key) {
            Ok(length) => Response::Int(length),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for LLen {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}
