//! Operator console for the server.

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use patchwork_collab::{ParticipantId, Room, RoomError};

use crate::ascii::{AsciiCanvas, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::commands::{Args, CommandError, Reply};

const HELP: &str = "\
list                  participants and their images
get                   ask every participant to send its image
send                  send each participant the image held for it
annotate <id> <text>  set the annotation of a participant's image
show <id>             draw a participant's image
stats [--json]        shape and color counts over all images
patchwork             draw all images side by side
dump <id>             print a participant's image as JSON
help                  this text
quit                  stop the server";

#[derive(Debug, PartialEq)]
pub enum ServerCommand {
    List,
    Get,
    Send,
    Annotate { id: ParticipantId, text: String },
    Show(ParticipantId),
    Stats { json: bool },
    Patchwork,
    Dump(ParticipantId),
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<ServerCommand>, CommandError> {
    let mut args = Args::new(line);
    let Some(word) = args.next_word() else {
        return Ok(None);
    };
    let command = match word {
        "list" | "print" => ServerCommand::List,
        "get" => ServerCommand::Get,
        "send" => ServerCommand::Send,
        "annotate" => {
            let id = ParticipantId(args.parse("participant id")?);
            if args.is_empty() {
                return Err(CommandError::Missing("annotation text"));
            }
            let text = args.rest();
            return Ok(Some(ServerCommand::Annotate { id, text }));
        }
        "show" | "display" => ServerCommand::Show(ParticipantId(args.parse("participant id")?)),
        "stats" => match args.next_word() {
            None => ServerCommand::Stats { json: false },
            Some("--json") => ServerCommand::Stats { json: true },
            Some(other) => return Err(CommandError::Trailing(other.to_string())),
        },
        "patchwork" => ServerCommand::Patchwork,
        "dump" => ServerCommand::Dump(ParticipantId(args.parse("participant id")?)),
        "help" => ServerCommand::Help,
        "quit" | "exit" => ServerCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    args.finish()?;
    Ok(Some(command))
}

pub async fn execute(room: &Room, command: ServerCommand) -> Result<Reply, RoomError> {
    let text = match command {
        ServerCommand::List => {
            let rows = room.participants().await?;
            if rows.is_empty() {
                "no participants connected".to_string()
            } else {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["ID", "Shapes", "Annotation"]);
                for row in rows {
                    table.add_row(vec![
                        Cell::new(row.id),
                        Cell::new(row.components),
                        Cell::new(row.annotation),
                    ]);
                }
                table.to_string()
            }
        }
        ServerCommand::Get => {
            let n = room.request_images().await?;
            format!("requested images from {n} participants")
        }
        ServerCommand::Send => {
            let n = room.send_back_images().await?;
            format!("sent images back to {n} participants")
        }
        ServerCommand::Annotate { id, text } => {
            room.annotate(id, &text).await?;
            format!("annotated participant {id}")
        }
        ServerCommand::Show(id) => {
            let image = room.image(id).await?;
            AsciiCanvas::render(&image, DEFAULT_WIDTH, DEFAULT_HEIGHT)
        }
        ServerCommand::Stats { json } => {
            let stats = room.stats().await?;
            if json {
                serde_json::to_string_pretty(&stats).unwrap_or_else(|e| format!("error: {e}"))
            } else {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Kind / color", "Count"]);
                for (kind, n) in &stats.shapes.kinds {
                    table.add_row(vec![Cell::new(kind), Cell::new(n)]);
                }
                for (color, n) in &stats.shapes.colors {
                    table.add_row(vec![Cell::new(color), Cell::new(n)]);
                }
                format!("{} participants\n{table}", stats.participants)
            }
        }
        ServerCommand::Patchwork => {
            let composite = room.patchwork().await?;
            AsciiCanvas::render(&composite, DEFAULT_WIDTH, DEFAULT_HEIGHT)
        }
        ServerCommand::Dump(id) => {
            let image = room.image(id).await?;
            serde_json::to_string_pretty(&image).unwrap_or_else(|e| format!("error: {e}"))
        }
        ServerCommand::Help => HELP.to_string(),
        ServerCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(room: Arc<Room>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("type `help` for commands");

    while let Some(line) = lines.next_line().await? {
        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match execute(&room, command).await {
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}
