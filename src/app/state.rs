use crate::model::{Note, ALL_NOTES};
use crate::reactive::Subscription;
use crate::store::NoteStore;

use super::editor::EditorForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FocusPane {
    Sidebar,
    List,
    Editor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteNoteOverlay {
    pub note_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayState {
    DeleteNote(DeleteNoteOverlay),
}

/// Subscriptions to every store view the screen renders.
pub struct StoreFeeds {
    notes: Subscription<Vec<Note>>,
    filtered_notes: Subscription<Vec<Note>>,
    folders: Subscription<Vec<String>>,
    selected_folder: Subscription<String>,
    search_query: Subscription<String>,
    selected_note_id: Subscription<Option<String>>,
    selected_note: Subscription<Option<Note>>,
}

impl StoreFeeds {
    pub fn subscribe(store: &NoteStore) -> Self {
        Self {
            notes: store.watch_notes(),
            filtered_notes: store.watch_filtered_notes(),
            folders: store.watch_folders(),
            selected_folder: store.watch_selected_folder(),
            search_query: store.watch_search_query(),
            selected_note_id: store.watch_selected_note_id(),
            selected_note: store.watch_selected_note(),
        }
    }
}

/// What the screen shows. Store-owned fields only change through [`ViewState::sync`].
#[derive(Debug, Clone)]
pub struct ViewState {
    pub focus: FocusPane,
    pub total_notes: usize,
    pub notes: Vec<Note>,
    pub folders: Vec<String>,
    pub selected_folder: String,
    pub search_query: String,
    pub selected_note_id: Option<String>,
    pub selected_note: Option<Note>,
    pub folder_cursor: usize,
    pub search_active: bool,
    pub overlay: Option<OverlayState>,
    pub editor: Option<EditorForm>,
    pub status_message: Option<String>,
    pub persistent: bool,
    pub preview_lines: usize,
    pub highlight_matches: bool,
}

impl ViewState {
    pub fn new(persistent: bool, preview_lines: usize, highlight_matches: bool) -> Self {
        Self {
            focus: FocusPane::List,
            total_notes: 0,
            notes: Vec::new(),
            folders: vec![ALL_NOTES.to_string()],
            selected_folder: ALL_NOTES.to_string(),
            search_query: String::new(),
            selected_note_id: None,
            selected_note: None,
            folder_cursor: 0,
            search_active: false,
            overlay: None,
            editor: None,
            status_message: None,
            persistent,
            preview_lines,
            highlight_matches,
        }
    }

    /// Pulls the newest value of every feed. Returns `true` if anything changed.
    pub fn sync(&mut self, feeds: &StoreFeeds) -> bool {
        let mut changed = false;
        if let Some(notes) = feeds.notes.latest() {
            self.total_notes = notes.len();
            changed = true;
        }
        if let Some(notes) = feeds.filtered_notes.latest() {
            self.notes = notes;
            changed = true;
        }
        if let Some(folders) = feeds.folders.latest() {
            self.folders = folders;
            changed = true;
        }
        if let Some(folder) = feeds.selected_folder.latest() {
            self.selected_folder = folder;
            changed = true;
        }
        if let Some(query) = feeds.search_query.latest() {
            self.search_query = query;
            changed = true;
        }
        if let Some(id) = feeds.selected_note_id.latest() {
            self.selected_note_id = id;
            changed = true;
        }
        if let Some(note) = feeds.selected_note.latest() {
            self.apply_selected_note(note);
            changed = true;
        }
        if changed {
            self.clamp_folder_cursor();
        }
        changed
    }

    fn apply_selected_note(&mut self, note: Option<Note>) {
        match (&note, self.editor.as_mut()) {
            (Some(current), Some(editor)) if editor.note_id() == current.id => {
                editor.rebase(current);
            }
            (_, Some(editor)) => {
                let message = if editor.is_dirty() {
                    "Note closed; unsaved edits were discarded"
                } else {
                    "Closed editor"
                };
                self.editor = None;
                if self.focus == FocusPane::Editor {
                    self.focus = FocusPane::List;
                }
                self.status_message = Some(message.into());
            }
            _ => {}
        }
        self.selected_note = note;
    }

    fn clamp_folder_cursor(&mut self) {
        if self.folder_cursor >= self.folders.len() {
            self.folder_cursor = self.folders.len().saturating_sub(1);
        }
    }

    /// Index of the selected note within the visible list.
    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected_note_id.as_deref()?;
        self.notes.iter().position(|note| note.id == id)
    }

    /// Id of the visible note `delta` rows away from the selection. Without a
    /// visible selection this is the first row.
    pub fn neighbor_id(&self, delta: isize) -> Option<&str> {
        if self.notes.is_empty() {
            return None;
        }
        let target = match self.selected_index() {
            Some(current) => {
                let last = self.notes.len() as isize - 1;
                (current as isize + delta).clamp(0, last) as usize
            }
            None => 0,
        };
        self.notes.get(target).map(|note| note.id.as_str())
    }

    pub fn move_folder_cursor(&mut self, delta: isize) {
        if self.folders.is_empty() {
            return;
        }
        let last = self.folders.len() as isize - 1;
        self.folder_cursor = (self.folder_cursor as isize + delta).clamp(0, last) as usize;
    }

    pub fn folder_under_cursor(&self) -> Option<&str> {
        self.folders.get(self.folder_cursor).map(String::as_str)
    }

    pub fn focus_sidebar(&mut self) {
        self.focus = FocusPane::Sidebar;
        if let Some(idx) = self
            .folders
            .iter()
            .position(|folder| *folder == self.selected_folder)
        {
            self.folder_cursor = idx;
        }
    }

    pub fn cycle_focus(&mut self) {
        match self.focus {
            FocusPane::List => self.focus_sidebar(),
            FocusPane::Sidebar | FocusPane::Editor => self.focus = FocusPane::List,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    pub fn open_editor(&mut self) -> bool {
        let Some(note) = self.selected_note.as_ref() else {
            return false;
        };
        self.editor = Some(EditorForm::open(note));
        self.focus = FocusPane::Editor;
        true
    }

    pub fn close_editor(&mut self) -> Option<EditorForm> {
        if self.focus == FocusPane::Editor {
            self.focus = FocusPane::List;
        }
        self.editor.take()
    }

    pub fn editor_dirty(&self) -> bool {
        self.editor
            .as_ref()
            .map(|editor| editor.is_dirty())
            .unwrap_or(false)
    }

    pub fn open_delete_note(&mut self) -> bool {
        let Some(note) = self.selected_note.as_ref() else {
            return false;
        };
        self.overlay = Some(OverlayState::DeleteNote(DeleteNoteOverlay {
            note_id: note.id.clone(),
            title: note.title.clone(),
        }));
        true
    }

    pub fn close_overlay(&mut self) -> Option<OverlayState> {
        self.overlay.take()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;
    use time::Duration;

    use super::*;
    use crate::model::NewNote;
    use crate::storage::Persistence;
    use crate::store::ManualClock;

    fn store() -> NoteStore {
        let clock = Arc::new(ManualClock::with_step(
            datetime!(2024-07-01 08:00 UTC),
            Duration::seconds(1),
        ));
        NoteStore::with_clock(Persistence::in_memory(), clock)
    }

    fn view() -> ViewState {
        ViewState::new(false, 2, true)
    }

    #[test]
    fn sync_mirrors_store_views() {
        let mut store = store();
        let feeds = StoreFeeds::subscribe(&store);
        let mut view = view();
        assert!(view.sync(&feeds));
        assert!(!view.sync(&feeds));

        store.create_note(NewNote::titled("a").in_folder("Work"));
        let b = store.create_note(NewNote::titled("b"));
        store.set_search_query("b");
        assert!(view.sync(&feeds));

        assert_eq!(view.total_notes, 2);
        assert_eq!(view.notes, vec![b.clone()]);
        assert_eq!(view.folders, vec!["All Notes".to_string(), "Work".to_string()]);
        assert_eq!(view.search_query, "b");
        assert_eq!(view.selected_note, Some(b.clone()));
        assert_eq!(view.selected_index(), Some(0));
    }

    #[test]
    fn neighbor_navigation_clamps_and_defaults_to_first() {
        let mut store = store();
        let feeds = StoreFeeds::subscribe(&store);
        let mut view = view();
        let first = store.create_note(NewNote::titled("first"));
        let second = store.create_note(NewNote::titled("second"));
        store.select_note(None);
        view.sync(&feeds);

        // Newest first: [second, first]
        assert_eq!(view.neighbor_id(1), Some(second.id.as_str()));
        store.select_note(Some(&second.id));
        view.sync(&feeds);
        assert_eq!(view.neighbor_id(1), Some(first.id.as_str()));
        assert_eq!(view.neighbor_id(-5), Some(second.id.as_str()));
        assert_eq!(view.neighbor_id(5), Some(first.id.as_str()));
    }

    #[test]
    fn deleting_edited_note_closes_editor() {
        let mut store = store();
        let feeds = StoreFeeds::subscribe(&store);
        let mut view = view();
        let note = store.create_note(NewNote::titled("doomed"));
        view.sync(&feeds);
        assert!(view.open_editor());
        assert_eq!(view.focus, FocusPane::Editor);

        if let Some(editor) = view.editor.as_mut() {
            editor.active_field_mut().insert_char('!');
        }
        assert!(view.editor_dirty());

        store.delete_note(&note.id);
        view.sync(&feeds);
        assert!(!view.is_editing());
        assert_eq!(view.focus, FocusPane::List);
        assert_eq!(
            view.status_message.as_deref(),
            Some("Note closed; unsaved edits were discarded")
        );
    }

    #[test]
    fn switching_away_from_clean_editor_just_closes_it() {
        let mut store = store();
        let feeds = StoreFeeds::subscribe(&store);
        let mut view = view();
        let other = store.create_note(NewNote::titled("other"));
        store.create_note(NewNote::titled("open"));
        view.sync(&feeds);
        assert!(view.open_editor());
        assert!(!view.editor_dirty());

        store.select_note(Some(&other.id));
        view.sync(&feeds);
        assert!(!view.is_editing());
        assert_eq!(view.focus, FocusPane::List);
        assert_eq!(view.status_message.as_deref(), Some("Closed editor"));
    }

    #[test]
    fn pin_toggle_keeps_editor_open() {
        let mut store = store();
        let feeds = StoreFeeds::subscribe(&store);
        let mut view = view();
        let note = store.create_note(NewNote::titled("keep"));
        view.sync(&feeds);
        view.open_editor();

        store.toggle_pinned(&note.id);
        view.sync(&feeds);
        assert!(view.is_editing());
        assert!(!view.editor_dirty());
    }

    #[test]
    fn sidebar_focus_starts_on_selected_folder() {
        let mut store = store();
        let feeds = StoreFeeds::subscribe(&store);
        let mut view = view();
        store.create_note(NewNote::titled("a").in_folder("Alpha"));
        store.create_note(NewNote::titled("b").in_folder("Beta"));
        store.set_selected_folder("Beta");
        view.sync(&feeds);

        view.focus_sidebar();
        assert_eq!(view.folder_under_cursor(), Some("Beta"));
        view.move_folder_cursor(-10);
        assert_eq!(view.folder_under_cursor(), Some(ALL_NOTES));
        view.move_folder_cursor(10);
        assert_eq!(view.folder_under_cursor(), Some("Beta"));
    }

    #[test]
    fn delete_overlay_requires_selection() {
        let mut view = view();
        assert!(!view.open_delete_note());
        assert!(view.close_overlay().is_none());
    }
}
