use crate::model::FileId;
use crate::store::StateStore;
use std::collections::BTreeMap;

/// Pending names of every file at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    names: BTreeMap<FileId, String>,
}

impl HistorySnapshot {
    pub fn capture(store: &StateStore) -> Self {
        Self {
            names: store
                .files()
                .map(|file| (file.id, file.new_name.clone()))
                .collect(),
        }
    }

    /// Puts the recorded pending names back in one batch. Files missing from
    /// the snapshot keep their current pending name.
    pub fn restore(&self, store: &mut StateStore) {
        store.batch(|store| {
            for (id, name) in &self.names {
                store.set_file_name(*id, name.as_str());
            }
        });
    }

    pub fn get(&self, id: FileId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(FileId, String)> for HistorySnapshot {
    fn from_iter<T: IntoIterator<Item = (FileId, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Unbounded LIFO of snapshots for an interactive session.
#[derive(Debug, Clone, Default)]
pub struct History {
    stack: Vec<HistorySnapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: HistorySnapshot) {
        self.stack.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<HistorySnapshot> {
        self.stack.pop()
    }

    /// Restores the newest snapshot. Returns `false` when there is nothing to
    /// undo.
    pub fn undo(&mut self, store: &mut StateStore) -> bool {
        match self.pop() {
            Some(snapshot) => {
                snapshot.restore(store);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StateStore {
        let mut store = StateStore::new("/w");
        let root = store.root_folder();
        store.add_file(root, "one.txt", 1, None);
        store.add_file(root, "two.txt", 2, None);
        store
    }

    fn pending(store: &StateStore) -> Vec<String> {
        store.files().map(|f| f.new_name.clone()).collect()
    }

    #[test]
    fn undo_restores_snapshot() {
        let mut store = store();
        let mut history = History::new();
        let before = pending(&store);

        history.push(HistorySnapshot::capture(&store));
        store.set_file_name(FileId(0), "ONE.txt");
        store.set_file_name(FileId(1), "TWO.txt");

        assert!(history.undo(&mut store));
        assert_eq!(pending(&store), before);
        assert!(!history.undo(&mut store));
    }

    #[test]
    fn undo_is_lifo() {
        let mut store = store();
        let mut history = History::new();

        history.push(HistorySnapshot::capture(&store));
        store.set_file_name(FileId(0), "a.txt");
        history.push(HistorySnapshot::capture(&store));
        store.set_file_name(FileId(0), "b.txt");
        assert_eq!(history.depth(), 2);

        history.undo(&mut store);
        assert_eq!(store.file(FileId(0)).new_name, "a.txt");
        history.undo(&mut store);
        assert_eq!(store.file(FileId(0)).new_name, "one.txt");
        assert!(history.is_empty());
    }

    #[test]
    fn files_outside_snapshot_are_untouched() {
        let mut store = store();
        let partial: HistorySnapshot = [(FileId(0), "kept.txt".to_string())].into_iter().collect();
        store.set_file_name(FileId(1), "changed.txt");

        partial.restore(&mut store);
        assert_eq!(pending(&store), vec!["kept.txt", "changed.txt"]);
        assert_eq!(partial.get(FileId(0)), Some("kept.txt"));
        assert_eq!(partial.len(), 1);
    }
}
