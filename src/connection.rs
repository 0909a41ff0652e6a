use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::codec::ClientCodec;
use crate::protocol::{Request, Response};
use crate::Result;

/// Client side of one TCP connection to a cache server. Requests and
/// responses travel as length-prefixed frames; every I/O operation runs
/// under a deadline.
pub struct Connection {
    framed: Framed<TcpStream, ClientCodec>,
}

impl Connection {
    pub async fn connect(address: &str, connect_timeout: Duration) -> Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(address)).await??;
        Ok(Self {
            framed: Framed::new(stream, ClientCodec),
        })
    }

    pub async fn send(&mut self, request: Request, write_timeout: Duration) -> Result<()> {
        timeout(write_timeout, self.framed.send(request)).await??;
        Ok(())
    }

    pub async fn recv(&mut self, read_timeout: Duration) -> Result<Response> {
        match timeout(read_timeout, self.framed.next()).await? {
            Some(response) => response,
            None => Err("connection closed by server".into()),
        }
    }
}
