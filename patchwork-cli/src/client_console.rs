//! Participant console: build and edit the local image, then send it.

use comfy_table::{presets::UTF8_FULL, Table};
use tokio::io::{AsyncBufReadExt, BufReader};

use patchwork_collab::{ConnectionError, ConnectionState, PatchworkClient};
use patchwork_core::{
    Circle, Ellipse, Line, Polygon, Shape, SharedImage, Transform, Transformable, Vec2,
};

use crate::ascii::{AsciiCanvas, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::commands::{Args, CommandError, Reply};

const HELP: &str = "\
make circle <x> <y> <radius> <r> <g> <b>
make ellipse <x> <y> <rx> <ry> <r> <g> <b>
make line <x> <y> <dx> <dy> <r> <g> <b>
make polygon <r> <g> <b> <x1> <y1> <x2> <y2> <x3> <y3> ...
transform <index> translate <dx> <dy>
transform <index> homothety <ratio> [<px> <py>]
transform <index> rotate <degrees> [<px> <py>]
transform <index> central <cx> <cy>
transform <index> axial <px> <py> <dx> <dy>
delete <index>        remove one shape
print                 list shapes with area and perimeter
annotation            show the current annotation
show                  draw the image
send                  send the image to the server
dump                  print the image as JSON
help                  this text
quit                  disconnect";

#[derive(Debug, PartialEq)]
pub enum ClientCommand {
    Make(Shape),
    Transform { index: usize, op: Transform },
    Delete(usize),
    Print,
    Annotation,
    Show,
    Send,
    Dump,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<ClientCommand>, CommandError> {
    let mut args = Args::new(line);
    let Some(word) = args.next_word() else {
        return Ok(None);
    };
    let command = match word {
        "make" => ClientCommand::Make(parse_shape(&mut args)?),
        "transform" => {
            let index = args.parse("shape index")?;
            let op = parse_transform(&mut args)?;
            ClientCommand::Transform { index, op }
        }
        "delete" => ClientCommand::Delete(args.parse("shape index")?),
        "print" | "list" => ClientCommand::Print,
        "annotation" => ClientCommand::Annotation,
        "show" | "display" => ClientCommand::Show,
        "send" => ClientCommand::Send,
        "dump" => ClientCommand::Dump,
        "help" => ClientCommand::Help,
        "quit" | "exit" => ClientCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    args.finish()?;
    Ok(Some(command))
}

fn parse_shape(args: &mut Args<'_>) -> Result<Shape, CommandError> {
    let shape = match args.word("shape kind")? {
        "circle" => {
            let origin = args.point("center")?;
            let radius = args.number("radius")?;
            if radius <= 0.0 {
                return Err(CommandError::Rejected("radius must be positive"));
            }
            Circle::new(origin, radius, args.color()?).into()
        }
        "ellipse" => {
            let origin = args.point("center")?;
            let radius = args.point("radii")?;
            if radius.x <= 0.0 || radius.y <= 0.0 {
                return Err(CommandError::Rejected("radii must be positive"));
            }
            Ellipse::new(origin, radius, args.color()?).into()
        }
        "line" => {
            let point = args.point("point")?;
            let direction = args.point("direction")?;
            if direction == Vec2::ZERO {
                return Err(CommandError::Rejected("direction must not be zero"));
            }
            Line::new(point, direction, args.color()?).into()
        }
        "polygon" => {
            let color = args.color()?;
            let mut points = Vec::new();
            while !args.is_empty() {
                points.push(args.point("vertex")?);
            }
            if points.len() < 3 {
                return Err(CommandError::Rejected("a polygon needs at least three vertices"));
            }
            Polygon::new(points, color).into()
        }
        other => {
            return Err(CommandError::Invalid {
                what: "shape kind",
                token: other.to_string(),
            })
        }
    };
    Ok(shape)
}

fn parse_transform(args: &mut Args<'_>) -> Result<Transform, CommandError> {
    let op = match args.word("transform")? {
        "translate" => Transform::Translate(args.point("offset")?),
        "homothety" => {
            let ratio = args.number("ratio")?;
            if ratio <= 0.0 {
                return Err(CommandError::Rejected("ratio must be positive"));
            }
            if args.is_empty() {
                Transform::Homothety { ratio }
            } else {
                Transform::HomothetyAbout {
                    pivot: args.point("pivot")?,
                    ratio,
                }
            }
        }
        "rotate" => {
            let angle = args.number("angle")?.to_radians();
            if args.is_empty() {
                Transform::Rotate { angle }
            } else {
                Transform::RotateAbout {
                    pivot: args.point("pivot")?,
                    angle,
                }
            }
        }
        "central" => Transform::CentralSym {
            center: args.point("center")?,
        },
        "axial" => {
            let point = args.point("axis point")?;
            let direction = args.point("axis direction")?;
            if direction == Vec2::ZERO {
                return Err(CommandError::Rejected("axis direction must not be zero"));
            }
            Transform::AxialSym { point, direction }
        }
        other => {
            return Err(CommandError::Invalid {
                what: "transform",
                token: other.to_string(),
            })
        }
    };
    Ok(op)
}

/// Run one command against the local image. `send` goes through `client`.
pub fn execute(
    image: &SharedImage,
    client: Option<&PatchworkClient>,
    command: ClientCommand,
) -> Result<Reply, ConnectionError> {
    let text = match command {
        ClientCommand::Make(shape) => {
            let index = image.add_component(shape)?;
            format!("added shape {index}")
        }
        ClientCommand::Transform { index, op } => {
            image.transform(index, &op)?;
            format!("transformed shape {index}")
        }
        ClientCommand::Delete(index) => {
            let removed = image.delete_component(index)?;
            format!("deleted {removed}")
        }
        ClientCommand::Print => {
            let shapes = image.components()?;
            if shapes.is_empty() {
                "no shapes".to_string()
            } else {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["#", "Shape", "Area", "Perimeter"]);
                for (i, shape) in shapes.iter().enumerate() {
                    table.add_row(vec![
                        i.to_string(),
                        shape.to_string(),
                        format!("{:.2}", shape.area()),
                        format!("{:.2}", shape.perimeter()),
                    ]);
                }
                table.to_string()
            }
        }
        ClientCommand::Annotation => {
            let text = image.annotation()?;
            if text.is_empty() {
                "no annotation".to_string()
            } else {
                text
            }
        }
        ClientCommand::Show => {
            let snapshot = image.snapshot()?;
            AsciiCanvas::render(&snapshot, DEFAULT_WIDTH, DEFAULT_HEIGHT)
        }
        ClientCommand::Send => {
            let client = client.ok_or(ConnectionError::Closed)?;
            client.send_image()?;
            "image queued for sending".to_string()
        }
        ClientCommand::Dump => {
            let snapshot = image.snapshot()?;
            serde_json::to_string_pretty(&snapshot).unwrap_or_else(|e| format!("error: {e}"))
        }
        ClientCommand::Help => HELP.to_string(),
        ClientCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

/// Read commands from stdin until `quit`, end of input, or the server
/// closing the connection.
pub async fn run(client: PatchworkClient) -> Result<(), ConnectionError> {
    let image = client.image().clone();
    let mut state = client.watch_state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("type `help` for commands");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = state.wait_for(|s| *s == ConnectionState::Closed) => {
                println!("connection closed by server");
                break;
            }
        };
        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match execute(&image, Some(&client), command) {
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }

    client.close().await
}
