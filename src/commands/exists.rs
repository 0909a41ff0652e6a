use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns 1 when the key exists and is live, 0 otherwise.
#[derive(Debug, PartialEq)]
pub struct Exists {
    pub key: String,
}

impl Executable for Exists {
    fn exec(self, store: Store) -> Result<Response, Error> {
        Ok(Response::Int(i64::from(store.exists(&self.key))))
    }
}

impl TryFrom<&mut RequestParser> for Exists {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}
