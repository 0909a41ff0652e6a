use crate::commands::executable::Executable;
use crate::commands::{CommandParserError, RequestParser};
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Increments the number stored at key by a caller-supplied delta. The delta
/// travels as a decimal string; one that does not parse as an i64 is a value
/// error, not a silent increment of one.
#[derive(Debug, PartialEq)]
pub struct IncrBy {
    pub key: String,
    pub delta: i64,
}

impl Executable for IncrBy {
    fn exec(self, store: Store) -> Result<Response, Error> {
        let res = match store.incr_by(&self.key, self.delta) {
            Ok(value) => Response::Int(value),
            Err(err) => Response::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut RequestParser> for IncrBy {
    type Error = Error;

    fn try_from(parser: &mut RequestParser) -> Result<Self, Self::Error> {
        let key = parser.key();
        let delta = parse_delta(parser, "INCRBY")?;
        Ok(Self { key, delta })
    }
}

pub(crate) fn parse_delta(parser: &mut RequestParser, command: &'static str) -> Result<i64, Error> {
    let arg = parser
        .next_bytes()
        .ok_or(CommandParserError::MissingArgument {
            command,
            what: "a delta value",
        })?;

    let delta = std::str::from_utf8(&arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandParserError::InvalidInteger)?;

    Ok(delta)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;
    use crate::protocol::{Opcode, Request};

    #[tokio::test]
    async fn increments_by_delta() {
        let store = Store::new();
        store.set("score".to_string(), Bytes::from("10"), None);

        let request = Request::new(Opcode::IncrBy, "score").with_args(vec![Bytes::from("5")]);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(
            cmd,
            Command::IncrBy(IncrBy {
                key: "score".to_string(),
                delta: 5,
            })
        );
        assert_eq!(cmd.exec(store).unwrap(), Response::Int(15));
    }

    #[tokio::test]
    async fn negative_delta() {
        let store = Store::new();

        let request = Request::new(Opcode::IncrBy, "score").with_args(vec![Bytes::from("-3")]);
        let cmd = Command::try_from(request).unwrap();

        assert_eq!(cmd.exec(store).unwrap(), Response::Int(-3));
    }

    #[tokio::test]
    async fn missing_delta() {
        let request = Request::new(Opcode::IncrBy, "score");

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(err.to_string(), "INCRBY requires a delta value");
    }

    #[tokio::test]
    async fn non_integer_delta() {
        let request = Request::new(Opcode::IncrBy, "score").with_args(vec![Bytes::from("five")]);

        let err = Command::try_from(request).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(*err, CommandParserError::InvalidInteger);
        assert_eq!(err.to_string(), "value is not an integer");
    }
}
