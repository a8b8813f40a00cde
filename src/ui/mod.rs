use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::{macros::format_description, OffsetDateTime};

use crate::app::{EditorField, EditorForm, FocusPane, OverlayState, TextField, ViewState};
use crate::highlight::{build_highlight_regex, split_matches};
use crate::model::Note;

mod theme;

pub use theme::Palette;

pub fn draw_app(
    frame: &mut Frame,
    view: &ViewState,
    palette: &Palette,
    list_state: &mut ListState,
    folder_state: &mut ListState,
) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Percentage(45),
        ])
        .split(vertical[1]);

    let regex = if view.highlight_matches {
        build_highlight_regex(&view.search_query)
    } else {
        None
    };

    render_search_bar(frame, view, palette, vertical[0]);
    render_folders(frame, view, palette, columns[0], folder_state);
    render_notes(frame, view, palette, regex.as_ref(), columns[1], list_state);
    match view.editor.as_ref() {
        Some(editor) => render_editor(frame, editor, view, palette, columns[2]),
        None => render_preview(frame, view, palette, regex.as_ref(), columns[2]),
    }

    let status = Paragraph::new(status_text(view)).style(palette.meta());
    frame.render_widget(status, vertical[2]);

    render_overlay(frame, view, palette);
}

fn render_search_bar(frame: &mut Frame, view: &ViewState, palette: &Palette, area: Rect) {
    let mut spans = vec![Span::styled("Search: ", palette.meta())];
    if view.search_query.is_empty() && !view.search_active {
        spans.push(Span::styled("press / to search", palette.meta()));
    } else {
        spans.push(Span::raw(view.search_query.clone()));
    }
    spans.push(Span::styled("    a: new note", palette.meta()));
    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title("Smart Notes")
            .borders(Borders::ALL)
            .border_style(palette.border(view.search_active)),
    );
    frame.render_widget(bar, area);
    if view.search_active {
        let col = "Search: ".len() + unicode_width::UnicodeWidthStr::width(view.search_query.as_str());
        frame.set_cursor(area.x + 1 + col as u16, area.y + 1);
    }
}

fn render_folders(
    frame: &mut Frame,
    view: &ViewState,
    palette: &Palette,
    area: Rect,
    folder_state: &mut ListState,
) {
    let items: Vec<ListItem> = view
        .folders
        .iter()
        .map(|folder| {
            let style = if *folder == view.selected_folder {
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(folder.clone(), style)))
        })
        .collect();
    let focused = view.focus == FocusPane::Sidebar;
    let mut list = List::new(items).block(
        Block::default()
            .title("Folders")
            .borders(Borders::ALL)
            .border_style(palette.border(focused)),
    );
    if focused {
        list = list.highlight_style(palette.selection()).highlight_symbol("▸ ");
    } else {
        folder_state.select(None);
    }
    frame.render_stateful_widget(list, area, folder_state);
}

fn render_notes(
    frame: &mut Frame,
    view: &ViewState,
    palette: &Palette,
    regex: Option<&Regex>,
    area: Rect,
    list_state: &mut ListState,
) {
    let mut items: Vec<ListItem> = view
        .notes
        .iter()
        .map(|note| ListItem::new(note_lines(note, view, palette, regex)))
        .collect();
    if items.is_empty() {
        let message = if view.total_notes == 0 {
            "No notes yet. Press `a` to create one."
        } else {
            "No notes match the current filters."
        };
        items.push(ListItem::new(message));
    }
    let title = format!("Notes ({}/{})", view.notes.len(), view.total_notes);
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(palette.border(view.focus == FocusPane::List)),
        )
        .highlight_style(palette.selection())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn note_lines(
    note: &Note,
    view: &ViewState,
    palette: &Palette,
    regex: Option<&Regex>,
) -> Vec<Line<'static>> {
    let mut title_spans = Vec::new();
    let editing = view
        .editor
        .as_ref()
        .map(|editor| editor.note_id() == note.id)
        .unwrap_or(false);
    if editing {
        let label = if view.editor_dirty() { "✎* " } else { "✎ " };
        title_spans.push(Span::styled(label, Style::default().fg(palette.accent)));
    }
    if note.pinned {
        title_spans.push(Span::styled(
            "★ ",
            Style::default()
                .fg(palette.pinned)
                .add_modifier(Modifier::BOLD),
        ));
    }
    title_spans.extend(highlight_line(
        &note.title,
        regex,
        palette.highlight(),
        Style::default().add_modifier(Modifier::BOLD),
    ));

    let mut lines = vec![Line::from(title_spans), meta_line(note, palette)];
    for line in note.content.lines().take(view.preview_lines) {
        lines.push(Line::from(highlight_line(
            line,
            regex,
            palette.highlight(),
            Style::default(),
        )));
    }
    lines
}

fn meta_line(note: &Note, palette: &Palette) -> Line<'static> {
    let mut meta = format!("Updated {}", format_timestamp(note.updated_at));
    if !note.folder_label().is_empty() {
        meta = format!("{} · {}", note.folder_label(), meta);
    }
    Line::from(Span::styled(meta, palette.meta()))
}

fn render_preview(
    frame: &mut Frame,
    view: &ViewState,
    palette: &Palette,
    regex: Option<&Regex>,
    area: Rect,
) {
    let text = view
        .selected_note
        .as_ref()
        .map(|note| {
            let mut lines = Vec::new();
            let mut header = Vec::new();
            if note.pinned {
                header.push(Span::styled("★ ", Style::default().fg(palette.pinned)));
            }
            header.extend(highlight_line(
                &note.title,
                regex,
                palette.highlight(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            lines.push(Line::from(header));
            lines.push(meta_line(note, palette));
            lines.push(Line::from(""));
            for line in note.content.lines() {
                lines.push(Line::from(highlight_line(
                    line,
                    regex,
                    palette.highlight(),
                    Style::default(),
                )));
            }
            Text::from(lines)
        })
        .unwrap_or_else(|| Text::from("Select a note to see its contents."));

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title("Note")
                .borders(Borders::ALL)
                .border_style(palette.border(view.focus == FocusPane::Editor)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_editor(
    frame: &mut Frame,
    editor: &EditorForm,
    view: &ViewState,
    palette: &Palette,
    area: Rect,
) {
    let title = if editor.is_dirty() {
        "Editing (unsaved)"
    } else {
        "Editing"
    };
    let outer = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(palette.border(view.focus == FocusPane::Editor));
    let inner = outer.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(inner);

    let fields = [
        (EditorField::Title, rows[0]),
        (EditorField::Folder, rows[1]),
        (EditorField::Content, rows[2]),
    ];
    for (field, rect) in fields {
        let active = editor.active == field;
        let input = editor.field(field);
        let scroll = field_scroll(input, rect);
        let paragraph = Paragraph::new(input.text().to_string())
            .scroll((scroll, 0))
            .block(
                Block::default()
                    .title(field.to_string())
                    .borders(Borders::ALL)
                    .border_style(palette.border(active)),
            );
        frame.render_widget(paragraph, rect);
        if active && view.focus == FocusPane::Editor {
            if let Some((x, y)) = cursor_screen_position(input, rect, scroll) {
                frame.set_cursor(x, y);
            }
        }
    }
}

/// Rows to scroll so the cursor line stays inside the bordered `area`.
fn field_scroll(field: &TextField, area: Rect) -> u16 {
    let visible = area.height.saturating_sub(2).max(1) as usize;
    let (line, _) = field.cursor_position();
    line.saturating_sub(visible - 1) as u16
}

fn cursor_screen_position(field: &TextField, area: Rect, scroll: u16) -> Option<(u16, u16)> {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }
    let (line, col) = field.cursor_position();
    let row = (line as u16).saturating_sub(scroll).min(inner_height - 1);
    let col = (col as u16).min(inner_width - 1);
    Some((area.x + 1 + col, area.y + 1 + row))
}

fn status_text(view: &ViewState) -> String {
    if let Some(message) = &view.status_message {
        return message.clone();
    }
    let mut parts = vec![
        format!("{} of {} notes", view.notes.len(), view.total_notes),
        view.selected_folder.clone(),
    ];
    if !view.search_query.trim().is_empty() {
        parts.push(format!("search \"{}\"", view.search_query.trim()));
    }
    if !view.persistent {
        parts.push("not persisted".to_string());
    }
    parts.push("q quit · / search · f folders · e edit · p pin · d delete".to_string());
    parts.join(" | ")
}

fn format_timestamp(dt: OffsetDateTime) -> String {
    dt.format(&format_description!(
        "[year]-[month]-[day] [hour]:[minute]"
    ))
    .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    split_matches(text, regex)
        .into_iter()
        .map(|(segment, is_match)| {
            let style = if is_match { highlight_style } else { base_style };
            Span::styled(segment.to_string(), style)
        })
        .collect()
}

fn render_overlay(frame: &mut Frame, view: &ViewState, palette: &Palette) {
    let Some(OverlayState::DeleteNote(overlay)) = view.overlay.as_ref() else {
        return;
    };
    let area = centered_rect(50, 25, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            "Delete this note?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(overlay.title.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "Enter/y to delete • Esc/n to cancel",
            palette.meta(),
        )),
    ])
    .block(
        Block::default()
            .title("Confirm Delete")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.danger)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use time::macros::datetime;
    use time::Duration;

    use super::*;
    use crate::app::StoreFeeds;
    use crate::model::NewNote;
    use crate::storage::Persistence;
    use crate::store::{ManualClock, NoteStore};

    fn span_texts(spans: &[Span<'static>]) -> Vec<String> {
        spans.iter().map(|span| span.content.to_string()).collect()
    }

    fn populated_view() -> (NoteStore, ViewState) {
        let clock = Arc::new(ManualClock::with_step(
            datetime!(2024-09-01 12:00 UTC),
            Duration::minutes(1),
        ));
        let mut store = NoteStore::with_clock(Persistence::in_memory(), clock);
        let feeds = StoreFeeds::subscribe(&store);
        store.create_note(
            NewNote::titled("Work log")
                .in_folder("Work")
                .with_content("first line\nsecond line\nthird line"),
        );
        store.create_note(NewNote::titled("Groceries").pinned(true));
        let mut view = ViewState::new(true, 2, true);
        view.sync(&feeds);
        (store, view)
    }

    #[test]
    fn highlight_line_marks_matches() {
        let regex = build_highlight_regex("log");
        let spans = highlight_line(
            "Work log and Log",
            regex.as_ref(),
            Style::default(),
            Style::default(),
        );
        assert_eq!(span_texts(&spans), vec!["Work ", "log", " and ", "Log"]);
    }

    #[test]
    fn note_lines_include_pin_meta_and_preview() {
        let (store, view) = populated_view();
        let palette = Palette::default();
        let work = store
            .notes()
            .iter()
            .find(|note| note.title == "Work log")
            .cloned()
            .expect("work note");
        let lines = note_lines(&work, &view, &palette, None);
        let rendered: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "Work log".to_string(),
                "Work · Updated 2024-09-01 12:00".to_string(),
                "first line".to_string(),
                "second line".to_string(),
            ]
        );

        let groceries = &store.notes()[0];
        let first = note_lines(groceries, &view, &palette, None);
        assert!(first[0].to_string().starts_with("★ "));
    }

    #[test]
    fn status_text_prefers_message() {
        let (_store, mut view) = populated_view();
        insta::assert_snapshot!(status_text(&view), @"2 of 2 notes | All Notes | q quit · / search · f folders · e edit · p pin · d delete");
        view.persistent = false;
        view.search_query = " log ".into();
        insta::assert_snapshot!(status_text(&view), @r###"2 of 2 notes | All Notes | search "log" | not persisted | q quit · / search · f folders · e edit · p pin · d delete"###);
        view.set_status_message(Some("Saved"));
        assert_eq!(status_text(&view), "Saved");
    }

    #[test]
    fn draws_every_pane() -> anyhow::Result<()> {
        let (_store, mut view) = populated_view();
        view.open_delete_note();
        let mut terminal = Terminal::new(TestBackend::new(120, 30))?;
        let palette = Palette::default();
        let mut list_state = ListState::default();
        let mut folder_state = ListState::default();
        terminal.draw(|frame| {
            draw_app(frame, &view, &palette, &mut list_state, &mut folder_state);
        })?;
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        for needle in ["Folders", "All Notes", "Groceries", "Confirm Delete", "Smart Notes"] {
            assert!(screen.contains(needle), "missing {needle}");
        }
        Ok(())
    }
}
