//! # Undo/Redo Snapshots
//!
//! Keeps whole-value snapshots of a control and moves a cursor through them.
//!
//! ## Design
//!
//! - The constructor records the current value, so there is always a state
//!   at the cursor
//! - Saving a value equal to the one at the cursor does nothing
//! - Saving after an undo discards the redo branch
//! - History is bounded; the oldest snapshots are evicted first
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = UndoRedoState::new(&control, UndoRedoConfig::default());
//!
//! // ... edit the control ...
//! history.save_state(&control);
//!
//! history.undo(&mut control);
//! history.redo(&mut control);
//! ```

use charon_extensions::{EmitOptions, EventBus, ValueControl};
use tracing::{debug, info};

use crate::config::UndoRedoConfig;

/// Notification emitted after the history moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoRedoEvent {
    Saved,
    Undone,
    Redone,
}

#[derive(Debug)]
pub struct UndoRedoState<T> {
    /// Snapshots, oldest first
    states: Vec<T>,

    /// Index of the snapshot matching the control's value
    cursor: usize,

    max_state_snapshots: usize,

    state_change: EventBus<UndoRedoEvent>,
}

impl<T: Clone + PartialEq + 'static> UndoRedoState<T> {
    pub fn new<C: ValueControl<Value = T>>(control: &C, config: UndoRedoConfig) -> Self {
        Self {
            states: vec![control.value()],
            cursor: 0,
            max_state_snapshots: config.effective_max_state_snapshots(),
            state_change: EventBus::new(),
        }
    }

    /// Record the control's current value.
    ///
    /// Returns false when it equals the snapshot at the cursor.
    pub fn save_state<C: ValueControl<Value = T>>(&mut self, control: &C) -> bool {
        let value = control.value();
        if self.states.get(self.cursor) == Some(&value) {
            return false;
        }

        self.states.truncate(self.cursor + 1);
        self.states.push(value);
        self.cursor = self.states.len() - 1;

        let overflow = self.states.len().saturating_sub(self.max_state_snapshots);
        if overflow > 0 {
            self.states.drain(..overflow);
            self.cursor -= overflow;
        }

        debug!(snapshots = self.states.len(), cursor = self.cursor, "snapshot saved");
        self.state_change.emit(&UndoRedoEvent::Saved);
        true
    }

    pub fn undo<C: ValueControl<Value = T>>(&mut self, control: &mut C) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        control.set_value(self.states[self.cursor].clone(), EmitOptions::default());

        info!(cursor = self.cursor, "undo");
        self.state_change.emit(&UndoRedoEvent::Undone);
        true
    }

    pub fn redo<C: ValueControl<Value = T>>(&mut self, control: &mut C) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        control.set_value(self.states[self.cursor].clone(), EmitOptions::default());

        info!(cursor = self.cursor, "redo");
        self.state_change.emit(&UndoRedoEvent::Redone);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.states.len()
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn max_state_snapshots(&self) -> usize {
        self.max_state_snapshots
    }

    pub fn state_change(&self) -> &EventBus<UndoRedoEvent> {
        &self.state_change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charon_extensions::ValueChange;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Minimal control holding a number
    struct Counter {
        value: u32,
        changes: EventBus<ValueChange>,
    }

    impl Counter {
        fn new(value: u32) -> Self {
            Self {
                value,
                changes: EventBus::new(),
            }
        }
    }

    impl ValueControl for Counter {
        type Value = u32;

        fn value(&self) -> u32 {
            self.value
        }

        fn set_value(&mut self, value: u32, opts: EmitOptions) {
            self.value = value;
            if opts.emit_event {
                self.changes.emit(&ValueChange::root());
            }
        }

        fn value_changes(&self) -> &EventBus<ValueChange> {
            &self.changes
        }
    }

    fn config(max: usize) -> UndoRedoConfig {
        UndoRedoConfig {
            max_state_snapshots: max,
        }
    }

    #[test]
    fn test_initial_state() {
        let counter = Counter::new(0);
        let history = UndoRedoState::new(&counter, UndoRedoConfig::default());
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.max_state_snapshots(), 100);
    }

    #[test]
    fn test_duplicate_state_is_skipped() {
        let mut counter = Counter::new(0);
        let mut history = UndoRedoState::new(&counter, UndoRedoConfig::default());

        assert!(!history.save_state(&counter));
        counter.value = 1;
        assert!(history.save_state(&counter));
        assert!(!history.save_state(&counter));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_undo_and_redo_restore_values() {
        let mut counter = Counter::new(0);
        let mut history = UndoRedoState::new(&counter, UndoRedoConfig::default());
        counter.value = 1;
        history.save_state(&counter);
        counter.value = 2;
        history.save_state(&counter);

        assert!(history.undo(&mut counter));
        assert_eq!(counter.value, 1);
        assert!(history.undo(&mut counter));
        assert_eq!(counter.value, 0);
        assert!(!history.undo(&mut counter));
        assert_eq!(counter.value, 0);

        assert!(history.redo(&mut counter));
        assert!(history.redo(&mut counter));
        assert_eq!(counter.value, 2);
        assert!(!history.redo(&mut counter));
    }

    #[test]
    fn test_save_after_undo_discards_redo_branch() {
        let mut counter = Counter::new(0);
        let mut history = UndoRedoState::new(&counter, UndoRedoConfig::default());
        counter.value = 1;
        history.save_state(&counter);
        history.undo(&mut counter);
        assert!(history.can_redo());

        counter.value = 5;
        assert!(history.save_state(&counter));

        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        history.undo(&mut counter);
        assert_eq!(counter.value, 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut counter = Counter::new(0);
        let mut history = UndoRedoState::new(&counter, config(10));
        for value in 1..=25 {
            counter.value = value;
            history.save_state(&counter);
        }

        assert_eq!(history.len(), 10);
        assert_eq!(history.cursor(), 9);

        let mut undos = 0;
        while history.undo(&mut counter) {
            undos += 1;
        }
        assert_eq!(undos, 9);
        assert_eq!(counter.value, 16);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_limit_has_a_floor() {
        let counter = Counter::new(0);
        let history = UndoRedoState::new(&counter, config(2));
        assert_eq!(history.max_state_snapshots(), 10);
    }

    #[test]
    fn test_state_change_notifications() {
        let mut counter = Counter::new(0);
        let mut history = UndoRedoState::new(&counter, UndoRedoConfig::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let _subscription = history
            .state_change()
            .subscribe(move |event: &UndoRedoEvent| sink.borrow_mut().push(*event));

        counter.value = 3;
        history.save_state(&counter);
        history.undo(&mut counter);
        history.redo(&mut counter);
        history.redo(&mut counter);

        assert_eq!(
            *events.borrow(),
            vec![UndoRedoEvent::Saved, UndoRedoEvent::Undone, UndoRedoEvent::Redone]
        );
    }
}
