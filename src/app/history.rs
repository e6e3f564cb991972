/// Two-stack undo model shared by the board and the detail editor. `record`
/// pushes the pre-mutation state; undo/redo swap the live value with the top
/// of the matching stack, so the stacks always hold states other than the
/// current one.
#[derive(Clone, Debug)]
pub(super) struct History<T> {
    past: Vec<T>,
    future: Vec<T>,
    limit: usize,
}

pub(super) const HISTORY_LIMIT: usize = 50;

impl<T: Clone> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// Records the state as it was before a mutation. Any redo states are
    /// invalidated; the oldest entry is dropped once the cap is reached.
    pub fn record(&mut self, before: T) {
        self.past.push(before);
        if self.past.len() > self.limit {
            let excess = self.past.len() - self.limit;
            self.past.drain(0..excess);
        }
        self.future.clear();
    }

    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_then_redo_is_identity() {
        let mut history = History::new(HISTORY_LIMIT);
        let mut state = 0i32;
        for next in 1..=5 {
            history.record(state);
            state = next;
        }
        let snapshot = state;
        for _ in 0..5 {
            state = history.undo(state).unwrap();
        }
        assert_eq!(state, 0);
        for _ in 0..5 {
            state = history.redo(state).unwrap();
        }
        assert_eq!(state, snapshot);
    }

    #[test]
    fn record_clears_redo_states() {
        let mut history = History::new(HISTORY_LIMIT);
        let mut state = 0i32;
        history.record(state);
        state = 1;
        state = history.undo(state).unwrap();
        assert!(history.can_redo());
        history.record(state);
        assert!(!history.can_redo());
    }

    #[test]
    fn cap_drops_oldest_entry() {
        let mut history = History::new(HISTORY_LIMIT);
        let mut state = 0i32;
        for next in 1..=60 {
            history.record(state);
            state = next;
        }
        let mut undone = 0;
        while let Some(prev) = history.undo(state) {
            state = prev;
            undone += 1;
        }
        assert_eq!(undone, HISTORY_LIMIT);
        // The 10 oldest states fell off the bottom.
        assert_eq!(state, 10);
    }

    #[test]
    fn undo_on_empty_is_none() {
        let mut history: History<i32> = History::new(HISTORY_LIMIT);
        assert!(history.undo(0).is_none());
        assert!(history.redo(0).is_none());
        assert!(!history.can_undo());
    }
}
