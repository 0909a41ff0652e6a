use std::time::Duration;

use clap::Parser;
use shardis::config::ServerConfig;
use shardis::{server, Error};

const PORT: u16 = 7379;

#[derive(Parser, Debug)]
struct Args {
    /// The port to listen on
    #[arg(short, long, default_value_t = PORT)]
    port: u16,

    /// The host address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Per-command read deadline in seconds
    #[arg(long, default_value_t = 30)]
    read_timeout: u64,

    /// Per-response write deadline in seconds
    #[arg(long, default_value_t = 10)]
    write_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        read_timeout: Duration::from_secs(args.read_timeout),
        write_timeout: Duration::from_secs(args.write_timeout),
    };
    config.validate()?;

    server::run(config).await
}
