use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::model::{Note, NoteDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EditorField {
    Title,
    Folder,
    Content,
}

impl EditorField {
    pub fn next(self) -> Self {
        match self {
            EditorField::Title => EditorField::Folder,
            EditorField::Folder => EditorField::Content,
            EditorField::Content => EditorField::Title,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            EditorField::Title => EditorField::Content,
            EditorField::Folder => EditorField::Title,
            EditorField::Content => EditorField::Folder,
        }
    }
}

/// Editable text with a grapheme-aware byte cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    buffer: String,
    cursor: usize,
}

impl TextField {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: text.to_string(),
            cursor: text.len(),
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        true
    }

    pub fn move_right(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        true
    }

    pub fn move_home(&mut self) {
        self.cursor = line_start(&self.buffer, self.cursor);
    }

    pub fn move_end(&mut self) {
        self.cursor = line_end(&self.buffer, self.cursor);
    }

    /// Zero-based (line, display column) of the cursor.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before = &self.buffer[..self.cursor];
        let line = before.matches('\n').count();
        let start = line_start(&self.buffer, self.cursor);
        (line, self.buffer[start..self.cursor].width())
    }
}

/// The note being edited. Keystrokes only change the form; saving hands a
/// normalized [`Note`] to the store.
#[derive(Debug, Clone)]
pub struct EditorForm {
    base: Note,
    pub title: TextField,
    pub folder: TextField,
    pub content: TextField,
    pub active: EditorField,
}

impl EditorForm {
    pub fn open(note: &Note) -> Self {
        Self {
            base: note.clone(),
            title: TextField::new(&note.title),
            folder: TextField::new(&note.folder),
            content: TextField::new(&note.content),
            active: EditorField::Content,
        }
    }

    pub fn note_id(&self) -> &str {
        &self.base.id
    }

    pub fn field(&self, field: EditorField) -> &TextField {
        match field {
            EditorField::Title => &self.title,
            EditorField::Folder => &self.folder,
            EditorField::Content => &self.content,
        }
    }

    pub fn active_field_mut(&mut self) -> &mut TextField {
        match self.active {
            EditorField::Title => &mut self.title,
            EditorField::Folder => &mut self.folder,
            EditorField::Content => &mut self.content,
        }
    }

    pub fn draft(&self) -> NoteDraft {
        NoteDraft {
            base: self.base.clone(),
            title: self.title.text().to_string(),
            folder: self.folder.text().to_string(),
            content: self.content.text().to_string(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.draft().is_modified()
    }

    /// Enter moves to the next field on single-line fields and breaks lines in content.
    pub fn enter(&mut self) {
        match self.active {
            EditorField::Content => self.content.insert_char('\n'),
            other => self.active = other.next(),
        }
    }

    /// Adopts a newer stored version of the note (e.g. after a pin toggle)
    /// while keeping in-progress edits.
    pub fn rebase(&mut self, note: &Note) {
        if note.id == self.base.id {
            self.base = note.clone();
        }
    }

    pub fn into_note(self) -> Note {
        self.draft().into_note()
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or(text.len())
}
