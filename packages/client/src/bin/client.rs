//! Interactive collaboration client with automatic reconnection.
//!
//! Connects to the collaboration server, optionally joins a room, and turns input
//! lines into frames. Lost connections are retried with exponential backoff and
//! the last joined room is rejoined after every reconnect.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-client -- --name Alice --room demo
//! cargo run --bin tsudoi-client -- -n Bob -r demo --observer
//! ```

use std::time::Duration;

use clap::Parser;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;
use tsudoi_client::{
    command::{HELP, InputCommand, parse_input},
    formatter::MessageFormatter,
    reconnect::{ReconnectPolicy, RoomMembership},
    session::{ClientEvent, SessionHandle, spawn_session},
    ui::redisplay_prompt,
};
use tsudoi_server::infrastructure::dto::websocket::{ClientMessage, CursorPosition, ServerMessage};
use tsudoi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tsudoi-client")]
#[command(about = "Collaboration room client with automatic reconnection", long_about = None)]
struct Args {
    /// WebSocket endpoint of the server
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws/collab")]
    url: String,

    /// Display name used when joining rooms
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Room to join right after connecting
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// Join as an observer (cannot publish updates)
    #[arg(long)]
    observer: bool,

    /// Reconnect attempts before the final retry
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    /// Base reconnect delay in milliseconds
    #[arg(long, default_value_t = 1000)]
    base_delay_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let policy = ReconnectPolicy {
        base_delay: Duration::from_millis(args.base_delay_ms),
        max_attempts: args.max_attempts,
        ..ReconnectPolicy::default()
    };
    let (session, mut events, task) = spawn_session(args.url.as_str(), policy);

    if let Some(room_id) = &args.room {
        session.join(RoomMembership {
            room_id: room_id.clone(),
            participant_name: args.name.clone(),
            is_publisher: !args.observer,
        })?;
    }

    println!("\nType messages and press Enter to send. /help lists commands.\n");

    let prompt = args.name.clone().unwrap_or_default();
    let mut lines = spawn_readline(prompt.clone());
    let mut input_open = true;
    let mut my_id: Option<String> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let output = match &event {
                    ClientEvent::StateChanged(state) => MessageFormatter::format_state(*state),
                    ClientEvent::Message(message) => {
                        if let ServerMessage::RoomJoined { participant_id, .. } = message {
                            my_id = Some(participant_id.clone());
                        }
                        MessageFormatter::format_server_message(message, my_id.as_deref())
                    }
                    ClientEvent::ConnectionError { message, terminal } => {
                        MessageFormatter::format_connection_error(message, *terminal)
                    }
                };
                print!("{}", output);
                redisplay_prompt(&prompt);
            }
            line = lines.recv(), if input_open => match line {
                Some(line) => handle_line(&session, &args, &line)?,
                // 入力終了 (Ctrl+C / Ctrl+D)
                None => {
                    session.disconnect().ok();
                    input_open = false;
                }
            },
        }
    }

    task.await?;
    Ok(())
}

fn handle_line(
    session: &SessionHandle,
    args: &Args,
    line: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let command = match parse_input(line) {
        Ok(command) => command,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };

    match command {
        InputCommand::Join {
            room_id,
            participant_name,
        } => session.join(RoomMembership {
            room_id,
            participant_name: participant_name.or_else(|| args.name.clone()),
            is_publisher: !args.observer,
        })?,
        InputCommand::Leave => session.leave()?,
        InputCommand::Cursor {
            line,
            column,
            file_id,
        } => session.send(ClientMessage::CursorUpdate {
            position: CursorPosition { line, column },
            file_id,
        })?,
        InputCommand::Code { file_id, content } => session.send(ClientMessage::CodeUpdate {
            file_id,
            content,
            metadata: None,
        })?,
        InputCommand::State(state) => session.send(ClientMessage::UpdateState { state })?,
        InputCommand::Who => session.send(ClientMessage::GetRoomParticipants)?,
        InputCommand::Ping => session.send(ClientMessage::Ping)?,
        InputCommand::Help => println!("{}", HELP),
        InputCommand::Quit => session.disconnect()?,
        InputCommand::Chat(content) => session.send(ClientMessage::SendMessage {
            content,
            target_participant_id: None,
        })?,
    }

    Ok(())
}

/// Read lines on a blocking thread (rustyline is synchronous)
fn spawn_readline(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", prompt);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
