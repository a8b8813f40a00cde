use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Folder filter value that disables folder filtering.
pub const ALL_NOTES: &str = "All Notes";
/// Title given to notes created or saved without one.
pub const DEFAULT_TITLE: &str = "Untitled Note";

const ID_RANDOM_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub folder: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub pinned: bool,
}

impl Note {
    /// Folder with surrounding whitespace removed; empty means unfiled.
    pub fn folder_label(&self) -> &str {
        self.folder.trim()
    }

    pub fn is_in_folder(&self, folder: &str) -> bool {
        self.folder.to_lowercase() == folder.to_lowercase()
    }
}

/// Initial values for a note about to be created. Unset fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: Option<String>,
    pub pinned: Option<bool>,
}

impl NewNote {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub(crate) fn build(self, id: String, now: OffsetDateTime) -> Note {
        Note {
            id,
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: self.content.unwrap_or_default(),
            folder: self.folder.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            pinned: self.pinned.unwrap_or(false),
        }
    }
}

/// Editable copy of a note held by the editor form.
///
/// Edits never touch the stored note; [`NoteDraft::into_note`] produces the
/// normalized record handed to `NoteStore::update_note`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub base: Note,
    pub title: String,
    pub folder: String,
    pub content: String,
}

impl NoteDraft {
    pub fn from_note(note: &Note) -> Self {
        Self {
            base: note.clone(),
            title: note.title.clone(),
            folder: note.folder.clone(),
            content: note.content.clone(),
        }
    }

    pub fn note_id(&self) -> &str {
        &self.base.id
    }

    pub fn is_modified(&self) -> bool {
        self.title != self.base.title
            || self.folder != self.base.folder
            || self.content != self.base.content
    }

    pub fn into_note(self) -> Note {
        let title = match self.title.trim() {
            "" => DEFAULT_TITLE.to_string(),
            trimmed => trimmed.to_string(),
        };
        Note {
            title,
            folder: self.folder.trim().to_string(),
            content: self.content,
            ..self.base
        }
    }
}

/// Builds a process-unique note id: base-36 milliseconds, a dash, then random hex.
pub fn generate_id(now: OffsetDateTime) -> String {
    let millis = (now.unix_timestamp_nanos() / 1_000_000).max(0) as u128;
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", to_base36(millis), &random[..ID_RANDOM_LEN])
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
