// ============================================================================
// HISTORY STACK - fixed-capacity LIFO ring buffer
// ============================================================================

/// Fixed-capacity LIFO that overwrites its oldest entry once full.
///
/// Slots are addressed through a rotating write cursor: `cursor` is the slot
/// the next push lands in, so the newest entry sits just behind it.
#[derive(Clone, Debug)]
pub struct HistoryStack<T> {
    slots: Vec<Option<T>>,
    cursor: usize,
    count: usize,
}

impl<T> HistoryStack<T> {
    /// Panics when `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "history capacity must be at least 1");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            cursor: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Push `value`, returning the entry it displaced when the stack was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = self.slots[self.cursor].replace(value);
        self.cursor = (self.cursor + 1) % self.capacity();
        if self.count < self.capacity() {
            self.count += 1;
            None
        } else {
            evicted
        }
    }

    /// Remove and return the newest entry.
    pub fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        self.cursor = (self.cursor + self.capacity() - 1) % self.capacity();
        self.count -= 1;
        self.slots[self.cursor].take()
    }

    /// Newest entry without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.count == 0 {
            return None;
        }
        let newest = (self.cursor + self.capacity() - 1) % self.capacity();
        self.slots[newest].as_ref()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.cursor = 0;
        self.count = 0;
    }

    /// Entries oldest to newest, regardless of where the cursor has wrapped.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let cap = self.capacity();
        let oldest = (self.cursor + cap - self.count) % cap;
        (0..self.count).filter_map(move |i| self.slots[(oldest + i) % cap].as_ref())
    }
}

impl<T: Clone> HistoryStack<T> {
    /// Owned copy of the contents, oldest to newest.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Extend<T> for HistoryStack<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

// ============================================================================
// UNDO HISTORY - undo/redo pair built from two bounded stacks
// ============================================================================

/// Undo/redo bookkeeping over snapshots of `T`.
///
/// Values handed in must be independent snapshots: the history never clones,
/// it only moves what it is given.
#[derive(Clone, Debug)]
pub struct UndoHistory<T> {
    undo_stack: HistoryStack<T>,
    redo_stack: HistoryStack<T>,
}

impl<T> UndoHistory<T> {
    pub fn new(max_history_size: usize) -> Self {
        let capacity = max_history_size.max(1);
        Self {
            undo_stack: HistoryStack::new(capacity),
            redo_stack: HistoryStack::new(capacity),
        }
    }

    /// Record the state that existed before a new edit. Clears redo.
    pub fn record(&mut self, previous: T) {
        self.redo_stack.clear();
        if self.undo_stack.push(previous).is_some() {
            log_info!(
                "History full ({} steps), dropped oldest snapshot",
                self.undo_stack.capacity()
            );
        }
    }

    /// Step back: `current` moves to the redo stack and the previous state is
    /// returned. Hands `current` back as `Err` when there is nothing to undo.
    pub fn undo(&mut self, current: T) -> Result<T, T> {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.redo_stack.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    /// Step forward again; mirror of [`UndoHistory::undo`].
    pub fn redo(&mut self, current: T) -> Result<T, T> {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn capacity(&self) -> usize {
        self.undo_stack.capacity()
    }

    /// Undo snapshots oldest to newest (what gets persisted).
    pub fn undo_entries(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.undo_stack.iter()
    }

    /// Rebuild from persisted undo snapshots (oldest first). Redo is empty.
    pub fn restore(&mut self, entries: impl IntoIterator<Item = T>) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.undo_stack.extend(entries);
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl<T> Default for UndoHistory<T> {
    fn default() -> Self {
        Self::new(50)
    }
}
