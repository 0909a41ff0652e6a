use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Increments the number stored at key by one.
///
/// Ref: <https://redis.io/docs/latest/commands/incr/>
#[derive(Debug, PartialEq)]
pub struct Incr {
    pub key: String,
}

impl Executable for Incr {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.incr(&self.key) {
            Ok(value) => Response::Int(value),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for Incr {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}
