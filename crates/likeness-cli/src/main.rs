use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use likeness_core::wire::{CommandName, EventPayload, GatewayEvent, GatewayReply};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Parser)]
#[command(name = "likeness", about = "Drive a face comparison session against likenessd")]
struct Cli {
    /// Path to the daemon's gateway socket
    #[arg(long, default_value = "/run/likeness/gateway.sock")]
    socket: PathBuf,

    /// User identity to act as
    #[arg(long, default_value = "cli")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the greeting command
    Start,
    /// Send the help command
    Help,
    /// Begin a new comparison
    Begin,
    /// Submit a photo file
    Photo {
        /// Path to the image file
        file: PathBuf,
    },
    /// Send a non-photo message (exercises the invalid-format path)
    Text,
    /// Cancel the current comparison
    Cancel,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let payload = match cli.command {
        Commands::Start => EventPayload::Command {
            name: CommandName::Start,
        },
        Commands::Help => EventPayload::Command {
            name: CommandName::Help,
        },
        Commands::Begin => EventPayload::Command {
            name: CommandName::Begin,
        },
        Commands::Cancel => EventPayload::Command {
            name: CommandName::Cancel,
        },
        Commands::Text => EventPayload::Text,
        Commands::Photo { file } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            EventPayload::Photo { data }
        }
    };

    let event = GatewayEvent {
        user_id: cli.user,
        payload,
    };

    let stream = UnixStream::connect(&cli.socket)
        .await
        .with_context(|| format!("connecting to {}", cli.socket.display()))?;
    let (read_half, mut write_half) = stream.into_split();

    let mut line = serde_json::to_string(&event)?;
    line.push('\n');
    write_half.write_all(line.as_bytes()).await?;

    // Some events (photo outside a session, free text in idle) get no
    // reply; don't hang forever waiting for one.
    let mut lines = BufReader::new(read_half).lines();
    match tokio::time::timeout(Duration::from_secs(60), lines.next_line()).await {
        Ok(Ok(Some(reply_line))) => {
            let reply: GatewayReply = serde_json::from_str(&reply_line)?;
            println!("{}", reply.text);
        }
        Ok(Ok(None)) | Err(_) => println!("(no reply)"),
        Ok(Err(e)) => return Err(e.into()),
    }

    Ok(())
}
