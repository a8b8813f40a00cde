use std::env;

use indexmap::IndexMap;

use crate::model::Note;

use super::{KeyValueStorage, StorageError};

/// Key the note collection is stored under. The suffix versions the format.
pub const STORAGE_KEY: &str = "smart-notes-notes-v1";
/// Set to anything but `""`, `0` or `false` to run without persistence.
pub const HEADLESS_ENV: &str = "SMART_NOTES_HEADLESS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RuntimeContext {
    Interactive,
    Headless,
}

impl RuntimeContext {
    pub fn detect(force_headless: bool) -> Self {
        if force_headless || env_flag(HEADLESS_ENV) {
            RuntimeContext::Headless
        } else {
            RuntimeContext::Interactive
        }
    }
}

fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(value) => !matches!(value.trim(), "" | "0" | "false"),
        Err(_) => false,
    }
}

/// Best-effort bridge between the store and its storage substrate.
///
/// Nothing here reports failure to the caller: unreadable or malformed data
/// loads as an empty collection and failed writes are logged and dropped.
pub struct Persistence {
    backend: Option<Box<dyn KeyValueStorage>>,
}

impl Persistence {
    pub fn new(context: RuntimeContext, backend: impl KeyValueStorage + 'static) -> Self {
        match context {
            RuntimeContext::Interactive => Self {
                backend: Some(Box::new(backend)),
            },
            RuntimeContext::Headless => {
                tracing::info!("headless context, notes are kept in memory only");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn load(&self) -> Vec<Note> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        let raw = match backend.read(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(%err, "could not read saved notes, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Note>>(&raw) {
            Ok(notes) => {
                let notes = dedup_by_id(notes);
                tracing::info!(count = notes.len(), "loaded saved notes");
                notes
            }
            Err(err) => {
                tracing::warn!(%err, "ignoring corrupt saved notes");
                Vec::new()
            }
        }
    }

    pub fn save(&self, notes: &[Note]) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(err) = write_notes(backend.as_ref(), notes) {
            tracing::warn!(%err, count = notes.len(), "failed to save notes");
        }
    }
}

/// Keeps the first note for each id; later copies are dropped.
fn dedup_by_id(notes: Vec<Note>) -> Vec<Note> {
    let total = notes.len();
    let mut unique: IndexMap<String, Note> = IndexMap::with_capacity(total);
    for note in notes {
        unique.entry(note.id.clone()).or_insert(note);
    }
    if unique.len() < total {
        tracing::warn!(
            dropped = total - unique.len(),
            "saved notes contained duplicate ids, keeping the first of each"
        );
    }
    unique.into_values().collect()
}

fn write_notes(backend: &dyn KeyValueStorage, notes: &[Note]) -> Result<(), StorageError> {
    let payload = serde_json::to_string(notes)?;
    backend.write(STORAGE_KEY, &payload)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::model::NewNote;
    use crate::storage::MemoryStorage;

    struct BrokenStorage {
        calls: Arc<AtomicUsize>,
    }

    impl KeyValueStorage for BrokenStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into())
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::Other, "disk full").into())
        }
    }

    fn notes() -> Vec<Note> {
        let now = datetime!(2024-03-10 08:30:15.123456789 UTC);
        vec![
            NewNote::titled("Second").in_folder("Work").build("b".into(), now),
            NewNote::titled("First").pinned(true).build("a".into(), now),
        ]
    }

    #[test]
    fn save_then_load_reproduces_collection() {
        let backend = MemoryStorage::new();
        let persistence = Persistence::new(RuntimeContext::Interactive, backend.clone());
        persistence.save(&notes());

        let reloaded = Persistence::new(RuntimeContext::Interactive, backend);
        assert_eq!(reloaded.load(), notes());
    }

    #[test]
    fn duplicate_ids_keep_first_copy() -> anyhow::Result<()> {
        let now = datetime!(2024-03-10 08:30 UTC);
        let first = NewNote::titled("kept").build("x".into(), now);
        let second = NewNote::titled("dropped").build("x".into(), now);
        let other = NewNote::titled("other").build("y".into(), now);
        let backend = MemoryStorage::new();
        backend.insert(
            STORAGE_KEY,
            serde_json::to_string(&[first.clone(), second, other.clone()])?,
        );

        let persistence = Persistence::new(RuntimeContext::Interactive, backend);
        assert_eq!(persistence.load(), vec![first, other]);
        Ok(())
    }

    #[test]
    fn malformed_payload_loads_empty() {
        let backend = MemoryStorage::new();
        backend.insert(STORAGE_KEY, "{not json");
        let persistence = Persistence::new(RuntimeContext::Interactive, backend);
        assert!(persistence.load().is_empty());
    }

    #[test]
    fn backend_failures_are_swallowed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let persistence = Persistence::new(
            RuntimeContext::Interactive,
            BrokenStorage {
                calls: calls.clone(),
            },
        );
        assert!(persistence.load().is_empty());
        persistence.save(&notes());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn headless_context_never_touches_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let persistence = Persistence::new(
            RuntimeContext::Headless,
            BrokenStorage {
                calls: calls.clone(),
            },
        );
        assert!(!persistence.is_enabled());
        assert!(persistence.load().is_empty());
        persistence.save(&notes());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn forced_headless_wins() {
        assert_eq!(RuntimeContext::detect(true), RuntimeContext::Headless);
        assert_eq!(RuntimeContext::Headless.to_string(), "headless");
    }
}
