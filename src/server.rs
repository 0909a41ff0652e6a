use std::future::Future;
use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument};

use crate::codec::ServerCodec;
use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::config::ServerConfig;
use crate::protocol::Response;
use crate::store::Store;
use crate::Error;

/// Binds the listener and serves connections until the process exits.
pub async fn run(config: ServerConfig) -> Result<(), Error> {
    run_until(config, std::future::pending()).await
}

/// Binds the listener and serves connections until `shutdown` resolves.
/// New connections stop being admitted at that point; connections already
/// in flight run to completion on their own tasks.
pub async fn run_until(
    config: ServerConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|err| debug!("failed to initialize global tracing: {err}"));

    let listener = TcpListener::bind(config.address()).await?;
    let store = Store::new();
    let _reaper = store.spawn_reaper();

    info!("shardis server listening on {}", listener.local_addr()?);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, client_address)) => {
                        let store = store.clone();
                        let config = config.clone();
                        tokio::spawn(async move {
                            if let Err(err) =
                                handle_connection(socket, client_address, store, config).await
                            {
                                error!("connection error: {err}");
                            }
                        });
                    }
                    // A transient accept failure is not fatal; log and keep
                    // accepting.
                    Err(err) => error!("failed to accept connection: {err}"),
                }
            }
            _ = &mut shutdown => {
                info!("shutting down; no new connections will be admitted");
                break;
            }
        }
    }

    Ok(())
}

#[instrument(name = "connection", skip(stream, store, config), fields(client_address))]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    config: ServerConfig,
) -> Result<(), Error> {
    tracing::Span::current().record("client_address", client_address.to_string());
    debug!("accepted connection");

    let mut framed = Framed::new(stream, ServerCodec);

    // One command in flight per connection: read, dispatch, write, repeat.
    loop {
        let request = match timeout(config.read_timeout, framed.next()).await {
            Ok(Some(Ok(request))) => request,
            // Protocol errors are fatal for the connection.
            Ok(Some(Err(err))) => return Err(err),
            // Client closed the connection.
            Ok(None) => break,
            Err(_) => return Err("read deadline elapsed".into()),
        };

        debug!("received request: {request:?}");

        let response = match Command::try_from(request) {
            Ok(command) => command.exec(store.clone())?,
            // Arity and unknown-opcode failures answer with an error frame
            // and keep the connection alive.
            Err(err) => Response::Error(err.to_string()),
        };

        match timeout(config.write_timeout, framed.send(response)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err("write deadline elapsed".into()),
        }
    }

    debug!("connection closed");
    Ok(())
}
