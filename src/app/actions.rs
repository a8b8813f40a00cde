use crate::model::{NewNote, Note, ALL_NOTES};
use crate::store::NoteStore;

use super::editor::EditorForm;

/// Translates screen actions into store mutations.
pub struct ActionDispatcher<'a> {
    store: &'a mut NoteStore,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(store: &'a mut NoteStore) -> Self {
        Self { store }
    }

    /// New notes land in the folder being browsed so they stay visible.
    pub fn new_note(&mut self) -> Note {
        let folder = self.store.selected_folder().to_string();
        let initial = if folder == ALL_NOTES {
            NewNote::default()
        } else {
            NewNote::default().in_folder(folder)
        };
        self.store.create_note(initial)
    }

    pub fn save(&mut self, form: EditorForm) -> Note {
        let note = form.into_note();
        self.store.update_note(note.clone());
        note
    }

    /// Returns the new pin state, or `None` when the note is gone.
    pub fn toggle_pin(&mut self, note_id: &str) -> Option<bool> {
        self.store.note(note_id)?;
        self.store.toggle_pinned(note_id);
        self.store.note(note_id).map(|note| note.pinned)
    }

    pub fn delete(&mut self, note_id: &str) -> bool {
        let existed = self.store.note(note_id).is_some();
        self.store.delete_note(note_id);
        existed
    }

    pub fn select(&mut self, note_id: Option<&str>) {
        self.store.select_note(note_id);
    }

    pub fn set_query(&mut self, query: String) {
        self.store.set_search_query(query);
    }

    pub fn push_query_char(&mut self, ch: char) {
        let mut query = self.store.search_query().to_string();
        query.push(ch);
        self.store.set_search_query(query);
    }

    pub fn pop_query_char(&mut self) {
        let mut query = self.store.search_query().to_string();
        if query.pop().is_some() {
            self.store.set_search_query(query);
        }
    }

    pub fn set_folder(&mut self, folder: &str) {
        self.store.set_selected_folder(folder);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;
    use time::Duration;

    use super::*;
    use crate::model::DEFAULT_TITLE;
    use crate::storage::Persistence;
    use crate::store::ManualClock;

    fn store() -> NoteStore {
        let clock = Arc::new(ManualClock::with_step(
            datetime!(2024-03-10 09:00 UTC),
            Duration::seconds(1),
        ));
        NoteStore::with_clock(Persistence::in_memory(), clock)
    }

    #[test]
    fn new_note_follows_browsed_folder() {
        let mut store = store();
        let mut actions = ActionDispatcher::new(&mut store);
        let first = actions.new_note();
        assert_eq!(first.folder, "");
        assert_eq!(first.title, DEFAULT_TITLE);

        actions.set_folder("Work");
        let second = actions.new_note();
        assert_eq!(second.folder, "Work");
        assert_eq!(store.filtered_notes().len(), 1);
        assert_eq!(store.selected_note_id(), Some(second.id.as_str()));
    }

    #[test]
    fn save_writes_normalized_form() {
        let mut store = store();
        let note = store.create_note(NewNote::titled("draft"));
        let mut form = EditorForm::open(&note);
        for ch in " more".chars() {
            form.content.insert_char(ch);
        }
        form.folder.insert_char(' ');

        let saved = ActionDispatcher::new(&mut store).save(form);
        assert_eq!(saved.content, " more");
        assert_eq!(store.note(&note.id).map(|n| n.content.as_str()), Some(" more"));
        assert_eq!(store.note(&note.id).map(|n| n.folder.as_str()), Some(""));
    }

    #[test]
    fn pin_and_delete_report_missing_notes() {
        let mut store = store();
        let note = store.create_note(NewNote::titled("x"));
        let mut actions = ActionDispatcher::new(&mut store);
        assert_eq!(actions.toggle_pin(&note.id), Some(true));
        assert_eq!(actions.toggle_pin("nope"), None);
        assert!(actions.delete(&note.id));
        assert!(!actions.delete(&note.id));
    }

    #[test]
    fn query_editing_round_trips_through_store() {
        let mut store = store();
        let mut actions = ActionDispatcher::new(&mut store);
        actions.push_query_char('h');
        actions.push_query_char('i');
        actions.pop_query_char();
        assert_eq!(store.search_query(), "h");
        ActionDispatcher::new(&mut store).set_query(String::new());
        assert_eq!(store.search_query(), "");
    }
}
