//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use log::{info, warn};

use crate::cli::{session, to_index, Cli, Commands};
use crate::error::StoryboardError;
use crate::media::playback::{audio_queue, slideshow, PlaybackCursor};
use crate::state::Storyboard;
use crate::transfer;
use crate::workspace::Workspace;

/// Open the workspace, run one command, then flush pending writes.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.engine_config().context("loading configuration")?;
    info!("Using data directory {}", config.data_dir.display());

    let mut workspace = Workspace::open(config)
        .await
        .context("opening workspace")?;

    let result = match cli.command {
        Some(command) => handle_command(command, &mut workspace).await,
        None => greet(&mut workspace).map(|()| println!("Use --help for available commands")),
    };

    let report = workspace.shutdown().await?;
    for failure in &report.failures {
        warn!("{}", failure.to_error());
    }

    if let Err(e) = &result {
        if let Some(hint) = e
            .downcast_ref::<StoryboardError>()
            .and_then(StoryboardError::recovery_suggestion)
        {
            eprintln!("hint: {}", hint);
        }
    }
    result
}

async fn handle_command(command: Commands, workspace: &mut Workspace) -> anyhow::Result<()> {
    match command {
        Commands::List => list(workspace),
        Commands::New { name } => create(workspace, &name),
        Commands::Import { file } => import(workspace, &file),
        Commands::Export { tab, out } => export(workspace, tab, out.as_deref()),
        Commands::Show { tab } => show(workspace, tab),
        Commands::Play { tab, slideshow } => play(workspace, tab, slideshow),
        Commands::Prefs { mode, name } => prefs(workspace, mode.as_deref(), name.as_deref()),
        Commands::Session => {
            greet(workspace)?;
            session::run(workspace).await
        }
    }
}

/// List open storyboards, marking the active one.
pub fn list(workspace: &Workspace) -> anyhow::Result<()> {
    let registry = workspace.registry();
    if registry.is_empty() {
        println!("No open storyboards.");
        return Ok(());
    }

    for (i, storyboard) in registry.storyboards().iter().enumerate() {
        let marker = if Some(i) == registry.active_index() {
            "* "
        } else {
            "  "
        };
        println!(
            "{}{}. {} ({} pages)",
            marker,
            i + 1,
            storyboard.name(),
            storyboard.pages().len()
        );
    }
    Ok(())
}

/// Create a new empty storyboard.
pub fn create(workspace: &mut Workspace, name: &str) -> anyhow::Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("storyboard name must not be empty"));
    }
    workspace.create_storyboard(name);
    println!("Created storyboard: {}", name);
    Ok(())
}

/// Import a storyboard from an exported file.
pub fn import(workspace: &mut Workspace, file: &Path) -> anyhow::Result<()> {
    workspace.import_file(file)?;
    if let Some(sb) = workspace.active() {
        println!("Imported: {} ({} pages)", sb.name(), sb.pages().len());
    }
    Ok(())
}

/// Export the storyboard in tab `tab` to `out`.
pub fn export(workspace: &mut Workspace, tab: usize, out: Option<&Path>) -> anyhow::Result<()> {
    let index = tab_index(workspace, Some(tab))?;
    let file_name = workspace
        .registry()
        .get(index)
        .map(|sb| transfer::export_file_name(sb.name()))
        .ok_or_else(|| anyhow!("no storyboard in tab {}", tab))?;

    let path = match out {
        Some(dir) if dir.is_dir() => dir.join(&file_name),
        Some(file) => file.to_path_buf(),
        None => PathBuf::from(&file_name),
    };

    workspace.export_to(index, &path)?;
    println!("Exported to {}", path.display());
    Ok(())
}

/// Print the pages of a storyboard.
pub fn show(workspace: &Workspace, tab: Option<usize>) -> anyhow::Result<()> {
    let index = tab_index(workspace, tab)?;
    let storyboard = workspace
        .registry()
        .get(index)
        .ok_or_else(|| anyhow!("no storyboard at tab {}", index + 1))?;
    print_storyboard(storyboard);
    Ok(())
}

/// Print the audio queue or slideshow of a storyboard.
pub fn play(workspace: &Workspace, tab: Option<usize>, as_slideshow: bool) -> anyhow::Result<()> {
    let index = tab_index(workspace, tab)?;
    let storyboard = workspace
        .registry()
        .get(index)
        .ok_or_else(|| anyhow!("no storyboard at tab {}", index + 1))?;
    let pages = storyboard.pages();

    if as_slideshow {
        let slides = slideshow(pages, workspace.config().default_slide_duration());
        let mut cursor = PlaybackCursor::new(slides.len());
        if cursor.start().is_none() {
            println!("Nothing to play.");
        }
        while let Some(i) = cursor.current() {
            let slide = &slides[i];
            println!(
                "Page {}: {:.1}s{}",
                slide.page_index + 1,
                slide.duration.as_secs_f64(),
                if slide.has_audio { " (with audio)" } else { "" }
            );
            cursor.advance();
        }
    } else {
        let queue = audio_queue(pages);
        let mut cursor = PlaybackCursor::new(queue.len());
        if cursor.start().is_none() {
            println!("No pages with audio.");
        }
        while let Some(i) = cursor.current() {
            println!("{}. Page {}", i + 1, queue[i].page_index + 1);
            cursor.advance();
        }
    }
    Ok(())
}

/// Show or change preferences.
pub fn prefs(
    workspace: &mut Workspace,
    mode: Option<&str>,
    name: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(mode) = mode {
        let dark = match mode {
            "dark" => true,
            "light" => false,
            other => return Err(anyhow!("unknown colour mode: {} (use dark or light)", other)),
        };
        if workspace.preferences().has_completed_setup {
            workspace.set_dark_mode(dark)?;
        } else {
            workspace.complete_setup(dark)?;
        }
    }
    if let Some(name) = name {
        workspace.set_user_name(name)?;
    }

    let prefs = workspace.preferences();
    println!("Colour mode: {}", if prefs.dark_mode { "dark" } else { "light" });
    println!(
        "Setup complete: {}",
        if prefs.has_completed_setup { "yes" } else { "no" }
    );
    println!(
        "Name: {}",
        prefs.user_name.as_deref().unwrap_or("(not set)")
    );
    match prefs.active_tab_index {
        Some(i) => println!("Active tab: {}", i + 1),
        None => println!("Active tab: none"),
    }
    Ok(())
}

/// Print a storyboard's pages, one block per page.
pub fn print_storyboard(storyboard: &Storyboard) {
    println!("{}", storyboard.name());
    println!("{:-<60}", "");
    if storyboard.pages().is_empty() {
        println!("(no pages)");
    }
    for page in storyboard.pages() {
        let label = if page.page_name.is_empty() {
            String::new()
        } else {
            format!(" - {}", page.page_name)
        };
        println!("#{}{}", page.page_number(), label);
        if !page.dialogue.is_empty() {
            println!("  dialogue: {}", page.dialogue);
        }
        if !page.context.is_empty() {
            println!("  context:  {}", page.context);
        }
        if !page.timestamp.is_empty() {
            println!("  time:     {}", page.timestamp);
        }
        let mut media = Vec::new();
        if page.has_image() {
            media.push("image");
        }
        if page.has_audio() {
            media.push("audio");
        }
        if !media.is_empty() {
            println!("  media:    {}", media.join(", "));
        }
    }
    println!("{:-<60}", "");
    println!(
        "Undo: {} | Redo: {}",
        storyboard.history().undo_count(),
        storyboard.history().redo_count()
    );
}

/// Greet the user, asking for a name the first time.
fn greet(workspace: &mut Workspace) -> anyhow::Result<()> {
    let name = workspace.user_name_or_prompt(|| prompt_line("What is your name? "))?;
    println!("Welcome, {}", name);
    Ok(())
}

fn prompt_line(question: &str) -> Option<String> {
    print!("{}", question);
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    Some(line.trim().to_string())
}

fn tab_index(workspace: &Workspace, tab: Option<usize>) -> anyhow::Result<usize> {
    let registry = workspace.registry();
    match tab {
        Some(number) => to_index(number)
            .filter(|&i| i < registry.len())
            .ok_or_else(|| StoryboardError::out_of_range(number.saturating_sub(1), registry.len()).into()),
        None => Ok(registry.require_active()?),
    }
}
