use std::cmp::Ordering;

use indexmap::IndexSet;

use crate::model::{Note, ALL_NOTES};

/// Folder and text filters applied to the collection before sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFilter {
    folder: Option<String>,
    needle: Option<String>,
}

impl NoteFilter {
    pub fn new(selected_folder: &str, search_query: &str) -> Self {
        let folder = if selected_folder.is_empty() || selected_folder == ALL_NOTES {
            None
        } else {
            Some(selected_folder.to_lowercase())
        };
        let trimmed = search_query.trim();
        let needle = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        };
        Self { folder, needle }
    }

    #[cfg(test)]
    pub(crate) fn is_unfiltered(&self) -> bool {
        self.folder.is_none() && self.needle.is_none()
    }

    pub fn matches(&self, note: &Note) -> bool {
        if let Some(folder) = &self.folder {
            if !note.is_in_folder(folder) {
                return false;
            }
        }
        if let Some(needle) = &self.needle {
            let haystack = format!("{} {}", note.title, note.content).to_lowercase();
            if !haystack.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }

    /// Filtered copy of `notes`, pinned first, then most recently updated.
    pub fn apply(&self, notes: &[Note]) -> Vec<Note> {
        let mut result: Vec<Note> = notes
            .iter()
            .filter(|note| self.matches(note))
            .cloned()
            .collect();
        sort_for_display(&mut result);
        result
    }
}

/// Stable sort: pinned before unpinned, then `updated_at` descending.
pub fn sort_for_display(notes: &mut [Note]) {
    notes.sort_by(|a, b| match (a.pinned, b.pinned) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b.updated_at.cmp(&a.updated_at),
    });
}

/// `"All Notes"` followed by every distinct trimmed folder name in collation order.
pub fn folder_names(notes: &[Note]) -> Vec<String> {
    let mut unique: IndexSet<&str> = IndexSet::new();
    for note in notes {
        let label = note.folder_label();
        // A folder literally named like the sentinel would only duplicate it.
        if !label.is_empty() && label != ALL_NOTES {
            unique.insert(label);
        }
    }
    let mut names: Vec<&str> = unique.into_iter().collect();
    names.sort_by(|a, b| collate(a, b));

    let mut folders = Vec::with_capacity(names.len() + 1);
    folders.push(ALL_NOTES.to_string());
    folders.extend(names.into_iter().map(str::to_string));
    folders
}

/// Case-insensitive ordering that places lowercase before uppercase on ties,
/// so `apple < Apple < banana`.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn note(id: &str, title: &str, content: &str, folder: &str, pinned: bool, at: OffsetDateTime) -> Note {
        Note {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            folder: folder.into(),
            created_at: at,
            updated_at: at,
            pinned,
        }
    }

    fn ids(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn pinned_notes_sort_first() {
        let t0 = datetime!(2024-01-01 00:00 UTC);
        let t1 = datetime!(2024-01-02 00:00 UTC);
        let notes = vec![
            note("a", "A", "", "Work", false, t1),
            note("b", "B", "", "Home", true, t0),
        ];
        let result = NoteFilter::new(ALL_NOTES, "").apply(&notes);
        assert_eq!(ids(&result), vec!["b", "a"]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let t = datetime!(2024-01-01 00:00 UTC);
        let notes = vec![
            note("1", "one", "", "", false, t),
            note("2", "two", "", "", true, t),
            note("3", "three", "", "", false, t),
            note("4", "four", "", "", true, t),
        ];
        let result = NoteFilter::new(ALL_NOTES, "").apply(&notes);
        assert_eq!(ids(&result), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn search_matches_title_or_content_case_insensitively() {
        let t = datetime!(2024-01-01 00:00 UTC);
        let notes = vec![
            note("hit", "Standup", "discuss WORK items", "", false, t),
            note("miss", "Groceries", "milk and eggs", "", false, t),
        ];
        let result = NoteFilter::new(ALL_NOTES, "  work ").apply(&notes);
        assert_eq!(ids(&result), vec!["hit"]);
    }

    #[test]
    fn search_spans_title_and_content_with_a_space() {
        let t = datetime!(2024-01-01 00:00 UTC);
        let notes = vec![note("x", "Weekly", "review", "", false, t)];
        assert_eq!(NoteFilter::new(ALL_NOTES, "weekly review").apply(&notes).len(), 1);
        assert!(NoteFilter::new(ALL_NOTES, "weeklyreview").apply(&notes).is_empty());
    }

    #[test]
    fn folder_filter_ignores_case_and_combines_with_search() {
        let t = datetime!(2024-01-01 00:00 UTC);
        let notes = vec![
            note("w1", "Plan", "roadmap", "Work", false, t),
            note("w2", "Retro", "notes", "work", false, t),
            note("h1", "Plan", "garden", "Home", false, t),
        ];
        let in_work = NoteFilter::new("WORK", "").apply(&notes);
        assert_eq!(ids(&in_work), vec!["w1", "w2"]);

        let plans_in_work = NoteFilter::new("work", "plan").apply(&notes);
        assert_eq!(ids(&plans_in_work), vec!["w1"]);
    }

    #[test]
    fn blank_query_and_sentinel_folder_are_unfiltered() {
        assert!(NoteFilter::new(ALL_NOTES, "   ").is_unfiltered());
        assert!(NoteFilter::new("", "").is_unfiltered());
        assert!(!NoteFilter::new("Work", "").is_unfiltered());
    }

    #[test]
    fn folders_are_trimmed_deduplicated_and_sorted() {
        let t = datetime!(2024-01-01 00:00 UTC);
        let notes = vec![
            note("1", "", "", " Work ", false, t),
            note("2", "", "", "work", false, t),
            note("3", "", "", "Work", false, t),
            note("4", "", "", "   ", false, t),
            note("5", "", "", "", false, t),
            note("6", "", "", "archive", false, t),
        ];
        assert_eq!(
            folder_names(&notes),
            vec!["All Notes", "archive", "work", "Work"]
        );
    }

    #[test]
    fn folders_always_start_with_sentinel() {
        assert_eq!(folder_names(&[]), vec![ALL_NOTES]);

        let t = datetime!(2024-01-01 00:00 UTC);
        let notes = vec![note("1", "", "", "All Notes", false, t)];
        assert_eq!(folder_names(&notes), vec![ALL_NOTES]);
    }

    #[test]
    fn collation_orders_case_insensitively() {
        let mut words = vec!["banana", "Apple", "apple", "Cherry"];
        words.sort_by(|a, b| collate(a, b));
        assert_eq!(words, vec!["apple", "Apple", "banana", "Cherry"]);
    }
}
