use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::AppConfig;
use crate::store::NoteStore;
use crate::ui::{self, Palette};

mod actions;
pub mod editor;
pub mod state;

pub use actions::ActionDispatcher;
pub use editor::{EditorField, EditorForm, TextField};
pub use state::{DeleteNoteOverlay, FocusPane, OverlayState, StoreFeeds, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    ToggleFocus,
    NewNote,
    EnterEdit,
    StartSearch,
    ClearSearch,
    TogglePin,
    DeleteNote,
    FocusFolders,
}

pub struct App {
    pub config: Arc<AppConfig>,
    store: NoteStore,
    feeds: StoreFeeds,
    view: ViewState,
    palette: Palette,
    list_state: ListState,
    folder_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, store: NoteStore) -> Self {
        let feeds = StoreFeeds::subscribe(&store);
        let mut view = ViewState::new(
            store.is_persistent(),
            config.preview_lines as usize,
            config.search.highlight_matches,
        );
        view.sync(&feeds);
        if !view.persistent {
            view.set_status_message(Some("Notes are not persisted in this session"));
        }
        Self {
            palette: Palette::for_theme(config.theme),
            config,
            store,
            feeds,
            view,
            list_state: ListState::default(),
            folder_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    self.list_state.select(self.view.selected_index());
                    self.folder_state.select(Some(self.view.folder_cursor));
                    ui::draw_app(
                        frame,
                        &self.view,
                        &self.palette,
                        &mut self.list_state,
                        &mut self.folder_state,
                    );
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        self.view.sync(&self.feeds);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        let handled = self.handle_overlay_key(key)
            || self.handle_editor_key(key)
            || self.handle_search_key(key)
            || self.handle_sidebar_key(key);
        if !handled {
            if let Some(action) = map_key(key) {
                self.handle_action(action);
            }
        }
        self.view.sync(&self.feeds);
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.select_neighbor(1),
            Action::SelectPrevious => self.select_neighbor(-1),
            Action::ToggleFocus => self.view.cycle_focus(),
            Action::NewNote => self.handle_new_note(),
            Action::EnterEdit => self.handle_enter_edit(),
            Action::StartSearch => {
                self.view.search_active = true;
                self.view
                    .set_status_message(Some("Type to filter, Enter to keep, Esc to clear"));
            }
            Action::ClearSearch => {
                if !self.view.search_query.is_empty() {
                    self.dispatcher().set_query(String::new());
                }
            }
            Action::TogglePin => self.handle_toggle_pin(),
            Action::DeleteNote => {
                if self.view.open_delete_note() {
                    self.view
                        .set_status_message(Some("Enter to delete, Esc to cancel"));
                }
            }
            Action::FocusFolders => self.view.focus_sidebar(),
        }
    }

    fn dispatcher(&mut self) -> ActionDispatcher<'_> {
        ActionDispatcher::new(&mut self.store)
    }

    fn select_neighbor(&mut self, delta: isize) {
        if let Some(id) = self.view.neighbor_id(delta).map(str::to_string) {
            self.dispatcher().select(Some(&id));
        }
    }

    fn handle_new_note(&mut self) {
        let note = self.dispatcher().new_note();
        tracing::info!(id = %note.id, "created note from tui");
        self.view.sync(&self.feeds);
        if self.view.open_editor() {
            if let Some(editor) = self.view.editor.as_mut() {
                editor.active = EditorField::Title;
            }
            self.view
                .set_status_message(Some("New note: Tab switches fields, Ctrl-s saves"));
        }
    }

    fn handle_enter_edit(&mut self) {
        if self.view.open_editor() {
            self.view
                .set_status_message(Some("Editing: Tab switches fields, Ctrl-s saves, Esc closes"));
        } else {
            self.view.set_status_message(Some("Select a note to edit"));
        }
    }

    fn handle_toggle_pin(&mut self) {
        let Some(note_id) = self.view.selected_note_id.clone() else {
            return;
        };
        match self.dispatcher().toggle_pin(&note_id) {
            Some(true) => self.view.set_status_message(Some("Pinned")),
            Some(false) => self.view.set_status_message(Some("Unpinned")),
            None => self.view.set_status_message(Some("Note no longer exists")),
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        let Some(OverlayState::DeleteNote(overlay)) = self.view.overlay.clone() else {
            return false;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') => {
                self.view.close_overlay();
                self.view.set_status_message(Some("Delete canceled"));
            }
            KeyCode::Enter | KeyCode::Char('y') => {
                self.view.close_overlay();
                if self.dispatcher().delete(&overlay.note_id) {
                    tracing::info!(id = %overlay.note_id, "deleted note from tui");
                    self.view
                        .set_status_message(Some(format!("Deleted \"{}\"", overlay.title)));
                } else {
                    self.view.set_status_message(Some("Note no longer exists"));
                }
            }
            _ => {}
        }
        true
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> bool {
        if self.view.focus != FocusPane::Editor {
            return false;
        }
        let Some(editor) = self.view.editor.as_mut() else {
            return false;
        };

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('s') {
                self.save_editor();
            }
            return true;
        }

        match key.code {
            KeyCode::Esc => {
                let dirty = editor.is_dirty();
                self.view.close_editor();
                let message = if dirty {
                    "Discarded unsaved changes"
                } else {
                    "Closed editor"
                };
                self.view.set_status_message(Some(message));
            }
            KeyCode::Tab => editor.active = editor.active.next(),
            KeyCode::BackTab => editor.active = editor.active.previous(),
            KeyCode::Enter => editor.enter(),
            KeyCode::Backspace => {
                editor.active_field_mut().backspace();
            }
            KeyCode::Delete => {
                editor.active_field_mut().delete();
            }
            KeyCode::Left => {
                editor.active_field_mut().move_left();
            }
            KeyCode::Right => {
                editor.active_field_mut().move_right();
            }
            KeyCode::Home => editor.active_field_mut().move_home(),
            KeyCode::End => editor.active_field_mut().move_end(),
            KeyCode::Char(ch) if !key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SUPER) => {
                editor.active_field_mut().insert_char(ch);
            }
            _ => {}
        }
        true
    }

    fn save_editor(&mut self) {
        let Some(form) = self.view.editor.clone() else {
            return;
        };
        let active = form.active;
        let saved = self.dispatcher().save(form);
        self.view.sync(&self.feeds);
        // Reopen on the stored version so normalized fields read as clean.
        let stored = self.store.note(&saved.id).cloned().unwrap_or(saved);
        let mut reopened = EditorForm::open(&stored);
        reopened.active = active;
        self.view.editor = Some(reopened);
        self.view.set_status_message(Some("Saved"));
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        if !self.view.search_active {
            return false;
        }
        match key.code {
            KeyCode::Esc => {
                self.view.search_active = false;
                self.dispatcher().set_query(String::new());
                self.view.set_status_message(None::<String>);
            }
            KeyCode::Enter => {
                self.view.search_active = false;
                self.view.set_status_message(None::<String>);
            }
            KeyCode::Backspace => self.dispatcher().pop_query_char(),
            KeyCode::Char(ch)
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                self.dispatcher().push_query_char(ch)
            }
            _ => return false,
        }
        true
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> bool {
        if self.view.focus != FocusPane::Sidebar {
            return false;
        }
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.view.move_folder_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.view.move_folder_cursor(-1),
            KeyCode::Enter => {
                if let Some(folder) = self.view.folder_under_cursor().map(str::to_string) {
                    self.dispatcher().set_folder(&folder);
                    self.view.focus = FocusPane::List;
                }
            }
            KeyCode::Esc => self.view.focus = FocusPane::List,
            _ => return false,
        }
        true
    }
}

fn map_key(key: KeyEvent) -> Option<Action> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
    {
        return None;
    }
    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::SelectNext,
        KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevious,
        KeyCode::Tab => Action::ToggleFocus,
        KeyCode::Char('a') => Action::NewNote,
        KeyCode::Char('e') | KeyCode::Enter => Action::EnterEdit,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::Esc => Action::ClearSearch,
        KeyCode::Char('p') => Action::TogglePin,
        KeyCode::Char('d') => Action::DeleteNote,
        KeyCode::Char('f') => Action::FocusFolders,
        _ => return None,
    };
    Some(action)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
