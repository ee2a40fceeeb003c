use std::io::{Read, Write};

use clap::{Parser, Subcommand};
use msgchan::{Receiver, Sender};

#[derive(Parser)]
#[command(name = "msgchan-cli", about = "Send or receive one message over a named shared-memory channel")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and exit.
    Send {
        /// Channel name, shared with the receiving process.
        name: String,
        /// Text to send as the message body.
        text: String,
    },
    /// Block for one message, print it to stdout, and exit.
    Recv {
        /// Channel name, shared with the sending process.
        name: String,
    },
}

type BoxError = Box<dyn std::error::Error>;

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::try_init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Send { name, text } => send(&name, &text),
        Command::Recv { name } => recv(&name),
    }
}

fn send(name: &str, text: &str) -> Result<(), BoxError> {
    let mut sender = Sender::create_or_open(name)?;
    sender.send_message::<_, std::io::Error>(|stream| stream.write_all(text.as_bytes()))?;
    tracing::info!(name, bytes = text.len(), "message sent");
    Ok(())
}

fn recv(name: &str) -> Result<(), BoxError> {
    let mut receiver = Receiver::create_or_open(name)?;
    let message = receiver.receive_message::<_, std::io::Error>(|stream| {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(buf)
    })?;

    match message {
        Some(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
        None => tracing::warn!(name, "receive was cancelled before a message arrived"),
    }
    Ok(())
}
