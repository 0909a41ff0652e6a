use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

pub trait Executable {
    fn exec(self, store: Store) -> Result<Response, Error>;
}
