//! Canonical note state and the views derived from it.
//!
//! [`NoteStore`] owns the note collection plus the selection and filter state.
//! Every read is available as a snapshot and as a [`Subscription`] that starts
//! with the current value. Mutations apply synchronously, recompute every
//! derived view from the final state, publish the views that changed, and
//! write the collection back through [`Persistence`] when it changed.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::model::{generate_id, NewNote, Note, ALL_NOTES};
use crate::reactive::{Subject, Subscription};
use crate::search::{folder_names, NoteFilter};
use crate::storage::Persistence;

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

pub struct NoteStore {
    notes: Subject<Vec<Note>>,
    selected_note_id: Subject<Option<String>>,
    selected_note: Subject<Option<Note>>,
    search_query: Subject<String>,
    selected_folder: Subject<String>,
    folders: Subject<Vec<String>>,
    filtered_notes: Subject<Vec<Note>>,
    persistence: Persistence,
    clock: Arc<dyn Clock>,
}

impl NoteStore {
    pub fn new(persistence: Persistence) -> Self {
        Self::with_clock(persistence, Arc::new(SystemClock))
    }

    pub fn with_clock(persistence: Persistence, clock: Arc<dyn Clock>) -> Self {
        let notes = persistence.load();
        let folders = folder_names(&notes);
        let filtered = NoteFilter::new(ALL_NOTES, "").apply(&notes);
        Self {
            notes: Subject::new(notes),
            selected_note_id: Subject::new(None),
            selected_note: Subject::new(None),
            search_query: Subject::new(String::new()),
            selected_folder: Subject::new(ALL_NOTES.to_string()),
            folders: Subject::new(folders),
            filtered_notes: Subject::new(filtered),
            persistence,
            clock,
        }
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.get()
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.get().iter().find(|note| note.id == id)
    }

    pub fn selected_note_id(&self) -> Option<&str> {
        self.selected_note_id.get().as_deref()
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selected_note.get().as_ref()
    }

    pub fn search_query(&self) -> &str {
        self.search_query.get()
    }

    pub fn selected_folder(&self) -> &str {
        self.selected_folder.get()
    }

    pub fn folders(&self) -> &[String] {
        self.folders.get()
    }

    pub fn filtered_notes(&self) -> &[Note] {
        self.filtered_notes.get()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_enabled()
    }

    pub fn watch_notes(&self) -> Subscription<Vec<Note>> {
        self.notes.subscribe()
    }

    pub fn watch_selected_note_id(&self) -> Subscription<Option<String>> {
        self.selected_note_id.subscribe()
    }

    pub fn watch_selected_note(&self) -> Subscription<Option<Note>> {
        self.selected_note.subscribe()
    }

    pub fn watch_search_query(&self) -> Subscription<String> {
        self.search_query.subscribe()
    }

    pub fn watch_selected_folder(&self) -> Subscription<String> {
        self.selected_folder.subscribe()
    }

    pub fn watch_folders(&self) -> Subscription<Vec<String>> {
        self.folders.subscribe()
    }

    pub fn watch_filtered_notes(&self) -> Subscription<Vec<Note>> {
        self.filtered_notes.subscribe()
    }

    /// Stores the query verbatim; trimming happens when filtering.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        tracing::debug!(%query, "search query changed");
        self.commit(None, None, Some(query), None);
    }

    pub fn set_selected_folder(&mut self, folder: &str) {
        let folder = if folder.is_empty() { ALL_NOTES } else { folder };
        tracing::debug!(%folder, "folder filter changed");
        self.commit(None, None, None, Some(folder.to_string()));
    }

    /// Selects by id without checking that the note exists.
    pub fn select_note(&mut self, id: Option<&str>) {
        self.commit(None, Some(id.map(str::to_string)), None, None);
    }

    pub fn create_note(&mut self, initial: NewNote) -> Note {
        let now = self.clock.now();
        let note = initial.build(generate_id(now), now);
        let mut next = Vec::with_capacity(self.notes.get().len() + 1);
        next.push(note.clone());
        next.extend(self.notes.get().iter().cloned());
        tracing::debug!(id = %note.id, "note created");
        self.commit(Some(next), Some(Some(note.id.clone())), None, None);
        note
    }

    /// Replaces every field of the stored note with the same id, stamping
    /// `updated_at`. Unknown ids are ignored.
    pub fn update_note(&mut self, updated: Note) {
        let Some(index) = self.position(&updated.id) else {
            tracing::debug!(id = %updated.id, "update ignored, note not found");
            return;
        };
        let previous = self.notes.get()[index].updated_at;
        let mut next = self.notes.get().clone();
        next[index] = Note {
            updated_at: self.touch(previous),
            ..updated
        };
        tracing::debug!(id = %next[index].id, "note updated");
        self.commit(Some(next), None, None, None);
    }

    pub fn delete_note(&mut self, id: &str) {
        let Some(index) = self.position(id) else {
            tracing::debug!(%id, "delete ignored, note not found");
            return;
        };
        let mut next = self.notes.get().clone();
        next.remove(index);
        let selection = if self.selected_note_id() == Some(id) {
            Some(None)
        } else {
            None
        };
        tracing::debug!(%id, "note deleted");
        self.commit(Some(next), selection, None, None);
    }

    pub fn toggle_pinned(&mut self, id: &str) {
        let Some(index) = self.position(id) else {
            tracing::debug!(%id, "pin toggle ignored, note not found");
            return;
        };
        let mut next = self.notes.get().clone();
        let updated_at = self.touch(next[index].updated_at);
        let note = &mut next[index];
        note.pinned = !note.pinned;
        note.updated_at = updated_at;
        tracing::debug!(%id, pinned = note.pinned, "pin toggled");
        self.commit(Some(next), None, None, None);
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.get().iter().position(|note| note.id == id)
    }

    fn touch(&self, previous: OffsetDateTime) -> OffsetDateTime {
        self.clock.now().max(previous)
    }

    /// Applies the given state changes, then recomputes and publishes the
    /// derived views from the final state.
    fn commit(
        &mut self,
        notes: Option<Vec<Note>>,
        selected_id: Option<Option<String>>,
        query: Option<String>,
        folder: Option<String>,
    ) {
        let notes_changed = match notes {
            Some(notes) => self.notes.set(notes),
            None => false,
        };
        if let Some(selected_id) = selected_id {
            self.selected_note_id.set(selected_id);
        }
        if let Some(query) = query {
            self.search_query.set(query);
        }
        if let Some(folder) = folder {
            self.selected_folder.set(folder);
        }

        let notes = self.notes.get();
        let selected = self
            .selected_note_id
            .get()
            .as_deref()
            .and_then(|id| notes.iter().find(|note| note.id == id))
            .cloned();
        let filtered =
            NoteFilter::new(self.selected_folder.get(), self.search_query.get()).apply(notes);
        let folders = folder_names(notes);

        self.selected_note.set(selected);
        self.filtered_notes.set(filtered);
        self.folders.set(folders);

        if notes_changed {
            self.persistence.save(self.notes.get());
        }
    }
}
