use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Returns every field and value of a hash as a flat array
/// `[field1, value1, field2, value2, …]` in no particular order. An absent
/// key yields an empty array.
///
/// Ref: <https://redis.io/docs/latest/commands/hgetall/>
#[derive(Debug, PartialEq)]
pub struct HGetAll {
    pub key: String,
}

impl Executable for HGetAll {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.hget_all(&self.key) {
            Ok(pairs) => {
                let mut items = Vec::with_capacity(pairs.len() * 2);
                for (field, value) in pairs {
                    items.push(Bytes::from(field));
                    items.push(value);
                }
                Response::Array(items)
            }
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for HGetAll {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        Ok(Self { key: parser.key() })
    }
}
