//! Terminal adapter: prints what the surfaces would show and turns typed
//! commands into `AppEvent`s.

use crate::artifact::Artifact;
use crate::event::{AppEvent, EventSender, Key, PointerEvent};
use crate::export::FormatFilter;
use crate::frontend::Frontend;
use crate::geometry::{Point, Rect};
use crate::selection::{DrawOp, SelectionMode, SelectionPurpose};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

pub const HELP: &str = "\
commands:
  record [X Y W H]       select an area to record (or give it directly)
  screenshot [X Y W H]   select an area to capture
  down X Y | move X Y | up X Y   pointer input on the selector
  esc | space            keys
  pause | end | restart | close  recording controls
  save PATH [FORMAT]     save the result (mp4, gif, png, jpg, all)
  open | play            open the folder / play the recording
  exit";

pub struct ConsoleFrontend<W: Write = std::io::Stdout> {
    json: bool,
    out: W,
}

impl ConsoleFrontend<std::io::Stdout> {
    pub fn stdout(json: bool) -> Self {
        Self::new(json, std::io::stdout())
    }
}

impl<W: Write> ConsoleFrontend<W> {
    pub fn new(json: bool, out: W) -> Self {
        Self { json, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// One line per surface change: a JSON object with an `event` field,
    /// or `text` for humans.
    fn emit(&mut self, event: &str, fields: Value, text: impl FnOnce() -> String) {
        let line = if self.json {
            let mut object = json!({ "event": event });
            if let (Some(object), Value::Object(fields)) = (object.as_object_mut(), fields) {
                object.extend(fields);
            }
            object.to_string()
        } else {
            let text = text();
            if text.is_empty() {
                return;
            }
            text
        };
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|()| self.out.flush()) {
            log::warn!("[CONSOLE] Write failed: {}", e);
        }
    }
}

fn size_label(ops: &[DrawOp]) -> Option<&str> {
    ops.iter().find_map(|op| match op {
        DrawOp::Label { text, .. } => Some(text.as_str()),
        _ => None,
    })
}

impl<W: Write> Frontend for ConsoleFrontend<W> {
    fn show_entry(&mut self) {
        self.emit("entry", json!({}), || {
            "Ready. Type 'record', 'screenshot' or 'exit' ('help' lists all commands).".to_string()
        });
    }

    fn hide_entry(&mut self) {}

    fn show_selector(&mut self, purpose: SelectionPurpose, instructions: &str, ops: &[DrawOp]) {
        self.emit(
            "selector",
            json!({ "purpose": format!("{:?}", purpose).to_lowercase(), "instructions": instructions, "ops": ops }),
            || instructions.to_string(),
        );
    }

    fn update_selector(&mut self, ops: &[DrawOp]) {
        let label = size_label(ops).map(str::to_string);
        if !self.json && label.is_none() {
            return;
        }
        self.emit("selector_update", json!({ "ops": ops }), || {
            format!("  selection {}", label.unwrap_or_default())
        });
    }

    fn set_instructions(&mut self, text: &str) {
        self.emit("instructions", json!({ "text": text }), || text.to_string());
    }

    fn hide_selector(&mut self) {
        self.emit("selector_hidden", json!({}), String::new);
    }

    fn show_countdown(&mut self, remaining: u32) {
        self.emit("countdown", json!({ "remaining": remaining }), || {
            format!("Recording starts in {}...", remaining)
        });
    }

    fn hide_countdown(&mut self) {}

    fn show_controls(&mut self, origin: (u32, u32), region: Rect) {
        self.emit(
            "recording",
            json!({ "region": region, "controls_at": [origin.0, origin.1] }),
            || {
                format!(
                    "Recording {}x{} at {},{}. Type 'pause', 'end' or 'restart'.",
                    region.width, region.height, region.x, region.y
                )
            },
        );
    }

    fn update_controls(&mut self, elapsed: &str, paused: bool) {
        self.emit(
            "elapsed",
            json!({ "elapsed": elapsed, "paused": paused }),
            || {
                if paused {
                    format!("  {} (paused)", elapsed)
                } else {
                    format!("  {}", elapsed)
                }
            },
        );
    }

    fn hide_controls(&mut self) {
        self.emit("recording_stopped", json!({}), || "Recording stopped.".to_string());
    }

    fn show_preview(&mut self, artifact: &Artifact, display_size: Option<(u32, u32)>) {
        self.emit(
            "preview",
            json!({ "artifact": artifact, "display_size": display_size }),
            || {
                let dims = artifact
                    .dimensions
                    .map(|(w, h)| format!(", {}x{}", w, h))
                    .unwrap_or_default();
                format!(
                    "Saved {} ({} bytes{}). Type 'save PATH [FORMAT]', 'open', 'play' or 'close'.",
                    artifact.path.display(),
                    artifact.size_bytes,
                    dims
                )
            },
        );
    }

    fn hide_preview(&mut self) {}

    fn begin_progress(&mut self, message: &str) {
        self.emit("progress", json!({ "message": message }), || message.to_string());
    }

    fn end_progress(&mut self) {}

    fn show_error(&mut self, title: &str, message: &str) {
        self.emit("error", json!({ "title": title, "message": message }), || {
            format!("{}: {}", title, message)
        });
    }

    fn show_info(&mut self, title: &str, message: &str) {
        self.emit("info", json!({ "title": title, "message": message }), || {
            format!("{}: {}", title, message)
        });
    }
}

/// Pointer events that select `region` in `mode`, as a user would.
pub fn synthesize_selection(mode: SelectionMode, region: Rect) -> Vec<PointerEvent> {
    let start = Point::new(f64::from(region.x), f64::from(region.y));
    // Far corner in pointer space; the engine cuts it to the screen.
    let end = Point::new(
        f64::from(region.x) + f64::from(region.width),
        f64::from(region.y) + f64::from(region.height),
    );
    match mode {
        SelectionMode::Drag => vec![
            PointerEvent::Down(start),
            PointerEvent::Move(end),
            PointerEvent::Up(end),
        ],
        SelectionMode::TwoClick => vec![
            PointerEvent::Down(start),
            PointerEvent::Move(end),
            PointerEvent::Down(end),
        ],
    }
}

fn parse_number(word: &str) -> Result<f64, String> {
    word.parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", word))
}

fn parse_point(words: &[&str]) -> Result<Point, String> {
    match words {
        [x, y] => Ok(Point::new(parse_number(x)?, parse_number(y)?)),
        _ => Err("expected X Y".to_string()),
    }
}

fn parse_rect(words: &[&str]) -> Result<Rect, String> {
    let values = words
        .iter()
        .map(|w| w.parse::<u32>().map_err(|_| format!("'{}' is not a pixel value", w)))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err("expected X Y W H".to_string()),
    }
}

/// `X,Y,W,H` as given on the command line.
pub fn parse_region(value: &str) -> Result<Rect, String> {
    let words: Vec<&str> = value.split(',').map(str::trim).collect();
    parse_rect(&words)
}

fn begin_with_region(
    start: AppEvent,
    args: &[&str],
    mode: SelectionMode,
) -> Result<Vec<AppEvent>, String> {
    if args.is_empty() {
        return Ok(vec![start]);
    }
    let region = parse_rect(args)?;
    let mut events = vec![start];
    events.extend(
        synthesize_selection(mode, region)
            .into_iter()
            .map(AppEvent::Pointer),
    );
    Ok(events)
}

/// Parses one typed command. An empty line yields no events.
pub fn parse_command(line: &str, mode: SelectionMode) -> Result<Vec<AppEvent>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((command, args)) = words.split_first() else {
        return Ok(Vec::new());
    };

    let events = match (command.to_ascii_lowercase().as_str(), args) {
        ("record", args) => return begin_with_region(AppEvent::Record, args, mode),
        ("screenshot", args) => return begin_with_region(AppEvent::Screenshot, args, mode),
        ("down", args) => vec![AppEvent::Pointer(PointerEvent::Down(parse_point(args)?))],
        ("move", args) => vec![AppEvent::Pointer(PointerEvent::Move(parse_point(args)?))],
        ("up", args) => vec![AppEvent::Pointer(PointerEvent::Up(parse_point(args)?))],
        ("esc" | "escape", []) => vec![AppEvent::Key(Key::Escape)],
        ("space", []) => vec![AppEvent::Key(Key::Space)],
        ("key", [name]) => vec![AppEvent::Key(Key::Other(name.to_string()))],
        ("end" | "stop", []) => vec![AppEvent::End],
        ("pause" | "resume", []) => vec![AppEvent::TogglePause],
        ("restart", []) => vec![AppEvent::StartOver],
        // Whichever of the two is open gets closed; the other is ignored.
        ("close", []) => vec![AppEvent::ControlsClosed, AppEvent::ClosePreview],
        ("save", [path]) => vec![AppEvent::SaveAs {
            destination: PathBuf::from(path),
            filter: None,
        }],
        ("save", [path, format]) => vec![AppEvent::SaveAs {
            destination: PathBuf::from(path),
            filter: Some(format.parse::<FormatFilter>().map_err(|e| e.to_string())?),
        }],
        ("open", []) => vec![AppEvent::OpenFolder],
        ("play", []) => vec![AppEvent::Play],
        ("exit" | "quit", []) => vec![AppEvent::Exit],
        _ => return Err(format!("unknown command '{}'", line.trim())),
    };
    Ok(events)
}

/// Reads commands from stdin until EOF, which is treated as `exit`.
pub fn spawn_stdin_reader(events: EventSender, mode: SelectionMode) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim() == "help" => println!("{}", HELP),
                Ok(Some(line)) => match parse_command(&line, mode) {
                    Ok(parsed) => {
                        for event in parsed {
                            if events.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    log::warn!("[CONSOLE] stdin read failed: {}", e);
                    break;
                }
            }
        }
        let _ = events.send(AppEvent::Exit);
    })
}
