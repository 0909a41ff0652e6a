use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Removes the expiration from a key, making it permanent. Returns 1 when
/// the key exists, 0 otherwise.
#[derive(Debug, PartialEq)]
pub struct Persist {
    pub key: String,
}

impl Executable for Persist {
    fn exec(self, store: Store) -> Result<Response, Error> {
        Ok(Response::Int(i64::from(store.persist(&self.key))))
    }
}

impl TryFrom<&mut RequestParser> for Persist {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}
