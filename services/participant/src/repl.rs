//! Interactive command interface.
//!
//! Reads commands from stdin, one per line.  Invalid ports or missing
//! arguments produce a message and change nothing; `exit` deregisters first
//! when currently registered.

use crate::session::{LocalState, Session};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register(u16),
    Deregister,
    Disconnect,
    Reconnect(u16),
    Msend(String),
    Exit,
}

/// Parse one input line.  `Err` carries the user-facing message.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();

    // msend keeps the message verbatim, including inner whitespace.
    if line == "msend" || line.starts_with("msend ") {
        let message = line.strip_prefix("msend").unwrap_or("").trim();
        if message.is_empty() {
            return Err("Message cannot be empty".to_owned());
        }
        return Ok(Command::Msend(message.to_owned()));
    }

    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("register"), Some(port), None) => port
            .parse::<u16>()
            .map(Command::Register)
            .map_err(|_| "Invalid port number".to_owned()),
        (Some("reconnect"), Some(port), None) => port
            .parse::<u16>()
            .map(Command::Reconnect)
            .map_err(|_| "Invalid port number".to_owned()),
        (Some("register" | "reconnect"), _, _) => Err("Invalid port number".to_owned()),
        (Some("deregister"), None, None) => Ok(Command::Deregister),
        (Some("disconnect"), None, None) => Ok(Command::Disconnect),
        (Some("exit"), None, None) => Ok(Command::Exit),
        _ => Err("Unknown command".to_owned()),
    }
}

fn print_menu(session: &Session) {
    println!("Participant {} started", session.participant_id());
    println!("Available commands:");
    println!("  register <port>  - Register with the coordinator");
    println!("  deregister       - Deregister from the multicast group");
    println!("  disconnect       - Temporarily go offline");
    println!("  reconnect <port> - Reconnect to the coordinator");
    println!("  msend <message>  - Send a multicast message");
    println!("  exit             - Exit the participant program");
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Drive the interactive loop until `exit` or end of input.
pub async fn run(session: &mut Session) {
    print_menu(session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::Register(port) => match session.register(port).await {
                Ok(addr) => println!("Registered with coordinator using {addr}"),
                Err(e) => println!("{e}"),
            },
            Command::Deregister => match session.deregister().await {
                Ok(()) => println!("Deregistered from coordinator"),
                Err(e) => println!("{e}"),
            },
            Command::Disconnect => match session.disconnect().await {
                Ok(()) => println!("Disconnected from coordinator"),
                Err(e) => println!("{e}"),
            },
            Command::Reconnect(port) => match session.reconnect(port).await {
                Ok(addr) => println!("Reconnected to coordinator using {addr}"),
                Err(e) => println!("{e}"),
            },
            Command::Msend(message) => match session.msend(&message).await {
                Ok(()) => println!("Message sent: {message}"),
                Err(e) => println!("{e}"),
            },
            Command::Exit => {
                if session.state() == LocalState::Registered {
                    match session.deregister().await {
                        Ok(()) => println!("Deregistered from coordinator"),
                        Err(e) => println!("{e}"),
                    }
                }
                break;
            }
        }
    }

    session.shutdown().await;
}
