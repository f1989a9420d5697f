use crate::document::GraphSnapshot;

pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Linear undo/redo over graph snapshots.
///
/// `entries[cursor]` is the state the mirror currently shows. Recording after
/// an undo discards the redo tail. Snapshots are stored without selection.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<GraphSnapshot>,
    cursor: usize,
    max_depth: usize,
}

impl History {
    pub fn new(initial: &GraphSnapshot, max_depth: usize) -> Self {
        Self {
            entries: vec![initial.without_selection()],
            cursor: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Record the current state; returns false when it matches the entry at
    /// the cursor structurally and nothing was appended.
    pub fn record(&mut self, snapshot: &GraphSnapshot) -> bool {
        let snapshot = snapshot.without_selection();
        if self.entries.get(self.cursor) == Some(&snapshot) {
            return false;
        }

        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);
        if self.entries.len() > self.max_depth {
            let overflow = self.entries.len() - self.max_depth;
            self.entries.drain(..overflow);
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    pub fn undo(&mut self) -> Option<GraphSnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    pub fn redo(&mut self) -> Option<GraphSnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
