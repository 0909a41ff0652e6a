use clap::Parser;
use shardis::client::Client;
use shardis::protocol::parse_text_command;
use shardis::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Interactive text-command shell against a cluster. Supports GET, SET
/// (with an optional trailing TTL in seconds), DEL, EXISTS, INCR, DECR and
/// PING; `quit` exits.
#[derive(Parser, Debug)]
struct Args {
    /// Cluster servers in host:port form
    #[arg(short, long, default_value = "127.0.0.1:7379", value_delimiter = ',')]
    servers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    let client = Client::new(args.servers)?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") {
            break;
        }

        let output = match parse_text_command(line) {
            Ok(request) => match client.execute(request).await {
                Ok(response) => response.to_string(),
                Err(err) => format!("ERR {err}"),
            },
            Err(err) => format!("ERR {err}"),
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    client.close();
    Ok(())
}
