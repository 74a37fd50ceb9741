use anyhow::{anyhow, bail, Context};
use boat_link::{AngleControl, Intent, UiCommand};
use boat_protocol::Identity;

pub const HELP: &str = "\
commands:
  login <boat-id>          select the boat
  connect | disconnect     open or close the broker link
  rudder <deg>             set and send the rudder angle
  sail <value>             set and send the sail
  set rudder|sail <value>  move a control without sending
  commit rudder|sail       send what `set` left armed
  center rudder|sail       send zero
  drive <left> <right>     wheel speeds
  stop                     emergency stop
  lcd <text>               show text on the display (\\n for a line break)
  status                   print link state and telemetry
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Link(UiCommand),
    Status,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let cmd = match word {
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "status" => ConsoleCommand::Status,
        "connect" => ConsoleCommand::Link(UiCommand::Connect),
        "disconnect" => ConsoleCommand::Link(UiCommand::Disconnect),
        "login" => {
            let identity = Identity::parse(rest).with_context(|| format!("bad boat id {rest:?}"))?;
            ConsoleCommand::Link(UiCommand::Login(identity))
        }
        "rudder" | "sail" => {
            let control = control(word)?;
            let [value] = args[..] else {
                bail!("usage: {word} <value>");
            };
            send(Intent::Angle {
                control,
                value: number(value)?,
            })
        }
        "set" => {
            let [name, value] = args[..] else {
                bail!("usage: set rudder|sail <value>");
            };
            send(Intent::Adjust {
                control: control(name)?,
                value: number(value)?,
            })
        }
        "commit" => send(Intent::Commit(control(rest)?)),
        "center" => send(Intent::Recenter(control(rest)?)),
        "drive" => {
            let [left, right] = args[..] else {
                bail!("usage: drive <left> <right>");
            };
            send(Intent::Drive {
                left: number(left)?,
                right: number(right)?,
            })
        }
        "stop" => send(Intent::EmergencyStop),
        "lcd" => send(Intent::Display(rest.replace("\\n", "\n"))),
        other => bail!("unknown command {other:?}, try `help`"),
    };
    Ok(Some(cmd))
}

fn send(intent: Intent) -> ConsoleCommand {
    ConsoleCommand::Link(UiCommand::Send(intent))
}

fn control(name: &str) -> anyhow::Result<AngleControl> {
    match name {
        "rudder" => Ok(AngleControl::Rudder),
        "sail" => Ok(AngleControl::Sail),
        other => Err(anyhow!("expected rudder or sail, got {other:?}")),
    }
}

fn number(raw: &str) -> anyhow::Result<i32> {
    raw.parse()
        .with_context(|| format!("{raw:?} is not a whole number"))
}
