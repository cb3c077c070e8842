//! Interactive editing session.
//!
//! A line-oriented shell over the workspace. Page and tab numbers are typed
//! 1-based and converted on parse.

use std::path::PathBuf;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::commands::{list, play, print_storyboard};
use crate::cli::to_index;
use crate::media::{BlobField, CaptureSession};
use crate::state::PagePatch;
use crate::workspace::Workspace;

const HELP: &str = "\
Commands:
  list                          list open storyboards
  new <name>                    create a storyboard
  open <file>                   import a storyboard file
  tab <n>                       switch to tab n
  close [n] / close! [n]        close a tab (! discards unsaved changes)
  add                           append a page
  edit <page> <field> <text>    set pageName, dialogue, context or timestamp
  image <page> <path>           attach an image file
  audio <page> <path>           attach an audio file
  record <page> <path>...       record audio from raw chunk files
  clear <page> image|audio      remove an attachment
  delete <page>                 delete a page
  move <from> <to>              move a page
  undo / redo
  show                          print the active storyboard
  play [slides]                 print the playback plan
  export [dir]                  export the active storyboard
  dark / light / theme          set or toggle colour mode
  quit / quit!                  leave (! discards unsaved changes)";

/// One parsed session line. Indices are 0-based.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Help,
    List,
    New(String),
    Open(PathBuf),
    Tab(usize),
    Close { tab: Option<usize>, force: bool },
    Add,
    Edit { page: usize, patch: PagePatch },
    Attach { page: usize, field: BlobField, path: PathBuf },
    Record { page: usize, chunks: Vec<PathBuf> },
    Clear { page: usize, field: BlobField },
    Delete(usize),
    Move { from: usize, to: usize },
    Undo,
    Redo,
    Show,
    Play { slideshow: bool },
    Export(Option<PathBuf>),
    DarkMode(bool),
    ToggleTheme,
    Quit { force: bool },
    Empty,
}

/// Parse one input line.
pub fn parse_line(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "" => SessionCommand::Empty,
        "help" | "?" => SessionCommand::Help,
        "list" | "ls" => SessionCommand::List,
        "new" => {
            if rest.is_empty() {
                return Err("usage: new <name>".to_string());
            }
            SessionCommand::New(rest.to_string())
        }
        "open" => SessionCommand::Open(required_path(rest, "open <file>")?),
        "tab" => SessionCommand::Tab(number(rest, "tab <n>")?),
        "close" | "close!" => SessionCommand::Close {
            tab: if rest.is_empty() {
                None
            } else {
                Some(number(rest, "close [n]")?)
            },
            force: word.ends_with('!'),
        },
        "add" => SessionCommand::Add,
        "edit" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let page = number(parts.next().unwrap_or(""), "edit <page> <field> <text>")?;
            let field = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("").trim();
            let patch = PagePatch::for_field(field, value)
                .ok_or_else(|| format!("unknown field: {}", field))?;
            SessionCommand::Edit { page, patch }
        }
        "image" | "audio" => {
            let (page, path) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("usage: {} <page> <path>", word))?;
            SessionCommand::Attach {
                page: number(page, "<page>")?,
                field: word.parse().map_err(|_| format!("unknown field: {}", word))?,
                path: PathBuf::from(path.trim()),
            }
        }
        "record" => {
            let mut parts = rest.split_whitespace();
            let page = number(parts.next().unwrap_or(""), "record <page> <path>...")?;
            let chunks: Vec<PathBuf> = parts.map(PathBuf::from).collect();
            if chunks.is_empty() {
                return Err("usage: record <page> <path>...".to_string());
            }
            SessionCommand::Record { page, chunks }
        }
        "clear" => {
            let (page, field) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: clear <page> image|audio".to_string())?;
            SessionCommand::Clear {
                page: number(page, "<page>")?,
                field: field
                    .trim()
                    .parse()
                    .map_err(|_| format!("unknown field: {}", field.trim()))?,
            }
        }
        "delete" | "rm" => SessionCommand::Delete(number(rest, "delete <page>")?),
        "move" | "mv" => {
            let (from, to) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: move <from> <to>".to_string())?;
            SessionCommand::Move {
                from: number(from, "<from>")?,
                to: number(to.trim(), "<to>")?,
            }
        }
        "undo" => SessionCommand::Undo,
        "redo" => SessionCommand::Redo,
        "show" => SessionCommand::Show,
        "play" => SessionCommand::Play {
            slideshow: matches!(rest, "slides" | "slideshow"),
        },
        "export" => SessionCommand::Export(if rest.is_empty() {
            None
        } else {
            Some(PathBuf::from(rest))
        }),
        "dark" => SessionCommand::DarkMode(true),
        "light" => SessionCommand::DarkMode(false),
        "theme" => SessionCommand::ToggleTheme,
        "quit" | "exit" | "q" => SessionCommand::Quit { force: false },
        "quit!" | "q!" => SessionCommand::Quit { force: true },
        other => return Err(format!("unknown command: {} (try help)", other)),
    };
    Ok(command)
}

fn number(text: &str, usage: &str) -> Result<usize, String> {
    text.trim()
        .parse::<usize>()
        .ok()
        .and_then(to_index)
        .ok_or_else(|| format!("usage: {} (numbers start at 1)", usage))
}

fn required_path(text: &str, usage: &str) -> Result<PathBuf, String> {
    if text.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(PathBuf::from(text))
    }
}

/// Outcome of executing one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run the interactive loop until `quit` or end of input.
pub async fn run(workspace: &mut Workspace) -> anyhow::Result<()> {
    println!("Type `help` for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(workspace);
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            Ok(command) => {
                debug!("Session command: {:?}", command);
                if execute(workspace, command) == Flow::Quit {
                    break;
                }
            }
            Err(message) => println!("{}", message),
        }

        for failure in workspace.persistence_warnings() {
            warn!("{}", failure.to_error());
        }
    }
    Ok(())
}

fn prompt(workspace: &Workspace) {
    use std::io::Write;

    let label = match workspace.active() {
        Some(sb) => sb.name().to_string(),
        None => "-".to_string(),
    };
    let dirty = if workspace.confirm_discard() { "*" } else { "" };
    print!("[{}{}]> ", label, dirty);
    let _ = std::io::stdout().flush();
}

/// Execute one command against the workspace, printing the outcome.
pub fn execute(workspace: &mut Workspace, command: SessionCommand) -> Flow {
    match apply(workspace, command) {
        Ok(flow) => flow,
        Err(e) => {
            println!("error: {}", e);
            Flow::Continue
        }
    }
}

fn apply(workspace: &mut Workspace, command: SessionCommand) -> anyhow::Result<Flow> {
    match command {
        SessionCommand::Empty => {}
        SessionCommand::Help => println!("{}", HELP),
        SessionCommand::List => list(workspace)?,
        SessionCommand::New(name) => {
            workspace.create_storyboard(&name);
            println!("Created storyboard: {}", name);
        }
        SessionCommand::Open(path) => {
            workspace.import_file(&path)?;
            println!("Opened {}", path.display());
        }
        SessionCommand::Tab(index) => workspace.set_active(index)?,
        SessionCommand::Close { tab, force } => {
            let index = match tab {
                Some(index) => index,
                None => workspace.registry().require_active()?,
            };
            if !force && workspace.confirm_discard() {
                println!("Unsaved changes; export first or use close!");
            } else {
                let closed = workspace.close(index)?;
                println!("Closed {}", closed.name());
            }
        }
        SessionCommand::Add => {
            let index = workspace.add_page()?;
            println!("Added page {}", index + 1);
        }
        SessionCommand::Edit { page, patch } => workspace.update_page(page, &patch)?,
        SessionCommand::Attach { page, field, path } => {
            workspace.attach_blob(page, field, &path)?
        }
        SessionCommand::Record { page, chunks } => record(workspace, page, &chunks)?,
        SessionCommand::Clear { page, field } => workspace.clear_blob(page, field)?,
        SessionCommand::Delete(page) => workspace.delete_page(page)?,
        SessionCommand::Move { from, to } => {
            if !workspace.reorder_pages(from, to)? {
                println!("Nothing to move");
            }
        }
        SessionCommand::Undo => {
            if !workspace.undo()? {
                println!("Nothing to undo");
            }
        }
        SessionCommand::Redo => {
            if !workspace.redo()? {
                println!("Nothing to redo");
            }
        }
        SessionCommand::Show => {
            let active = workspace.registry().require_active()?;
            if let Some(storyboard) = workspace.registry().get(active) {
                print_storyboard(storyboard);
            }
        }
        SessionCommand::Play { slideshow } => play(workspace, None, slideshow)?,
        SessionCommand::Export(dir) => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let path = workspace.export_active(&dir)?;
            println!("Exported to {}", path.display());
        }
        SessionCommand::DarkMode(dark) => {
            if workspace.preferences().has_completed_setup {
                workspace.set_dark_mode(dark)?;
            } else {
                workspace.complete_setup(dark)?;
            }
        }
        SessionCommand::ToggleTheme => {
            let dark = workspace.toggle_dark_mode()?;
            println!("Colour mode: {}", if dark { "dark" } else { "light" });
        }
        SessionCommand::Quit { force } => {
            if !force && workspace.confirm_discard() {
                println!("Unsaved changes; export first or use quit!");
            } else {
                return Ok(Flow::Quit);
            }
        }
    }
    Ok(Flow::Continue)
}

fn record(workspace: &mut Workspace, page: usize, chunks: &[PathBuf]) -> anyhow::Result<()> {
    let mut capture = CaptureSession::new();
    capture.start()?;
    for path in chunks {
        match std::fs::read(path) {
            Ok(bytes) => capture.push_chunk(&bytes)?,
            Err(e) => {
                capture.fail(format!("{}: {}", path.display(), e));
                return Err(e.into());
            }
        }
    }
    let patch = capture.stop()?;
    workspace.update_page(page, &patch)?;
    Ok(())
}
