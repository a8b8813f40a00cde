use std::fmt::Write as _;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::app::App;
use crate::config::AppConfig;
use crate::model::{NewNote, Note, ALL_NOTES, DEFAULT_TITLE};
use crate::store::NoteStore;

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    /// Title for the note (prompted for on a terminal if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note content inline. If omitted, reads from stdin.
    #[arg(long)]
    pub content: Option<String>,
    /// Folder to file the note under
    #[arg(long)]
    pub folder: Option<String>,
    /// Pin the new note
    #[arg(long)]
    pub pin: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Search terms, matched case-insensitively against title and content
    #[arg()]
    pub query: Vec<String>,
    /// Only list notes in this folder
    #[arg(long)]
    pub folder: Option<String>,
    /// Limit the number of notes printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Note identifier as printed by `list`
    pub id: String,
}

pub fn run_tui(config: Arc<AppConfig>, store: NoteStore) -> Result<()> {
    let mut app = App::new(config, store);
    app.run()
}

pub fn new_note(mut store: NoteStore, args: NewArgs) -> Result<()> {
    let title = match args.title.clone() {
        Some(title) => Some(title),
        None if atty::is(atty::Stream::Stdin) => Some(prompt("Title")?),
        None => None,
    };
    let content = match args.content.clone() {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };
    let args = NewArgs { title, ..args };
    let note = create_note(&mut store, &args, content);
    println!(
        "Created note {}{}",
        note.id,
        if note.pinned { " (pinned)" } else { "" }
    );
    Ok(())
}

/// Normalizes title and folder the same way the editor does before saving.
fn create_note(store: &mut NoteStore, args: &NewArgs, content: String) -> Note {
    let title = args
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TITLE);
    let mut initial = NewNote::titled(title)
        .with_content(content)
        .pinned(args.pin);
    if let Some(folder) = args.folder.as_deref().map(str::trim) {
        initial = initial.in_folder(folder);
    }
    store.create_note(initial)
}

pub fn list_notes(mut store: NoteStore, args: ListArgs) -> Result<()> {
    print!("{}", run_list(&mut store, &args));
    Ok(())
}

fn run_list(store: &mut NoteStore, args: &ListArgs) -> String {
    store.set_search_query(args.query.join(" "));
    store.set_selected_folder(args.folder.as_deref().unwrap_or(ALL_NOTES));
    let notes = store.filtered_notes();
    let shown = &notes[..notes.len().min(args.limit)];
    let mut out = format_note_list(shown);
    if shown.len() < notes.len() {
        let _ = writeln!(&mut out, "({} more not shown)", notes.len() - shown.len());
    }
    out
}

fn format_note_list(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No notes found.\n".to_string();
    }
    let mut out = String::new();
    for note in notes {
        let mut headline = format!("{}  {}", note.id, note.title);
        if note.pinned {
            headline.push_str("  [PINNED]");
        }
        let _ = writeln!(&mut out, "{headline}");
        let _ = writeln!(
            &mut out,
            "    {} · updated {}",
            folder_display(note),
            format_timestamp(note.updated_at)
        );
        if let Some(snippet) = build_snippet(note, 2) {
            let _ = writeln!(&mut out, "    {snippet}");
        }
        out.push('\n');
    }
    out
}

pub fn list_folders(store: &NoteStore) -> Result<()> {
    print!("{}", format_folders(store.folders()));
    Ok(())
}

fn format_folders(folders: &[String]) -> String {
    let mut out = String::new();
    for folder in folders {
        let _ = writeln!(&mut out, "{folder}");
    }
    out
}

pub fn show_note(store: &NoteStore, args: &IdArgs) -> Result<()> {
    print!("{}", run_show(store, args));
    Ok(())
}

fn run_show(store: &NoteStore, args: &IdArgs) -> String {
    let Some(note) = store.note(&args.id) else {
        return not_found(&args.id);
    };
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.title);
    let _ = writeln!(&mut out, "id       {}", note.id);
    let _ = writeln!(&mut out, "folder   {}", folder_display(note));
    let _ = writeln!(
        &mut out,
        "pinned   {}",
        if note.pinned { "yes" } else { "no" }
    );
    let _ = writeln!(&mut out, "created  {}", format_timestamp(note.created_at));
    let _ = writeln!(&mut out, "updated  {}", format_timestamp(note.updated_at));
    if !note.content.is_empty() {
        out.push('\n');
        out.push_str(&note.content);
        if !note.content.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

pub fn toggle_pin(mut store: NoteStore, args: &IdArgs) -> Result<()> {
    print!("{}", run_toggle_pin(&mut store, args));
    Ok(())
}

fn run_toggle_pin(store: &mut NoteStore, args: &IdArgs) -> String {
    if store.note(&args.id).is_none() {
        return not_found(&args.id);
    }
    store.toggle_pinned(&args.id);
    match store.note(&args.id) {
        Some(note) if note.pinned => format!("Pinned \"{}\" ({})\n", note.title, note.id),
        Some(note) => format!("Unpinned \"{}\" ({})\n", note.title, note.id),
        None => not_found(&args.id),
    }
}

pub fn delete_note(mut store: NoteStore, args: &IdArgs) -> Result<()> {
    print!("{}", run_delete(&mut store, args));
    Ok(())
}

fn run_delete(store: &mut NoteStore, args: &IdArgs) -> String {
    let Some(title) = store.note(&args.id).map(|note| note.title.clone()) else {
        return not_found(&args.id);
    };
    store.delete_note(&args.id);
    format!("Deleted \"{}\" ({})\n", title, args.id)
}

fn not_found(id: &str) -> String {
    format!("Note {id} not found.\n")
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("reading title from stdin")?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading note content from stdin")?;
    Ok(Some(buf))
}

fn folder_display(note: &Note) -> &str {
    match note.folder_label() {
        "" => "(no folder)",
        folder => folder,
    }
}

fn build_snippet(note: &Note, max_lines: usize) -> Option<String> {
    let segments: Vec<&str> = note
        .content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join(" ").chars().take(160).collect())
}

fn format_timestamp(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}
