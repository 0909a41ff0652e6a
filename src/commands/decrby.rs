use crate::commands::executable::Executable;
use crate::commands::incrby::parse_delta;
use crate::commands::RequestParser;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Decrements the number stored at key by a caller-supplied delta.
/// Equivalent to INCRBY with the delta negated.
#[derive(Debug, PartialEq)]
pub struct DecrBy {
    pub key: String,
    pub delta: i64,
}

impl Executable for DecrBy {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.decr_by(&self.key, self.delta) {
            Ok(value) => Response::Int(value),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for DecrBy {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let delta = parse_delta(parser, "DECRBY")?;
        Ok(Self { key, delta })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn decrements_by_delta() {
        let store = Store::new();
        store.set("score".to_string(), Bytes::from("10"), None);

        let request = Request::new(Opcode::DecrBy, "score").with_args(vec![Bytes::from("4")]);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(cmd.exec(store).unwrap(), Response::Int(6));
    }
}
