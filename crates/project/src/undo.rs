use std::collections::VecDeque;

use bevy_ecs::prelude::*;

use crate::{
    actions::{ActionKind, ActionVariant, EditRequest},
    error::{ConsistencyError, EditError},
    ids::ClipId,
};

/// Bounded history of applied actions, oldest at the bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct UndoStack {
    actions: VecDeque<ActionVariant>,
    capacity: usize,
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            actions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// `actions` are ordered bottom to top. Fails if they don't fit.
    pub(crate) fn from_actions(
        actions: impl IntoIterator<Item = ActionVariant>,
        capacity: usize,
    ) -> Option<Self> {
        let actions: VecDeque<_> = actions.into_iter().collect();
        (actions.len() <= capacity).then_some(Self { actions, capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.actions.len() >= self.capacity
    }

    /// Pushes `action` on top. When the stack is full the bottom action is
    /// evicted to make room and returned; it can't be undone any more.
    pub fn push(&mut self, action: ActionVariant) -> Option<ActionVariant> {
        if self.capacity == 0 {
            return Some(action);
        }
        let evicted = if self.is_full() { self.pop_last() } else { None };
        self.actions.push_back(action);
        evicted
    }

    pub fn pop(&mut self) -> Option<ActionVariant> {
        self.actions.pop_back()
    }

    /// Removes the oldest action.
    pub fn pop_last(&mut self) -> Option<ActionVariant> {
        self.actions.pop_front()
    }

    pub fn peek(&self) -> Option<&ActionVariant> {
        self.actions.back()
    }

    pub fn peek_last(&self) -> Option<&ActionVariant> {
        self.actions.front()
    }

    /// Disposes every action.
    pub fn clear(&mut self) {
        for action in self.actions.drain(..) {
            action.dispose();
        }
    }

    pub fn contains(&self, predicate: impl FnMut(&ActionVariant) -> bool) -> bool {
        self.actions.iter().any(predicate)
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ActionVariant> + ExactSizeIterator {
        self.actions.iter()
    }
}

/// Where `perform` put an action: `stack_index` counts from the bottom of
/// the undo stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionHandle {
    pub kind: ActionKind,
    pub stack_index: usize,
}

/// Applies edits and moves them between the undo and redo stacks.
#[derive(Clone, Debug, PartialEq)]
pub struct UndoManager {
    undo_stack: UndoStack,
    redo_stack: UndoStack,
}

impl UndoManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: UndoStack::new(capacity),
            redo_stack: UndoStack::new(capacity),
        }
    }

    pub(crate) fn from_stacks(undo_stack: UndoStack, redo_stack: UndoStack) -> Self {
        Self {
            undo_stack,
            redo_stack,
        }
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    pub fn redo_stack(&self) -> &UndoStack {
        &self.redo_stack
    }

    /// Builds the action for `request` and applies it. Only a successful
    /// action reaches the history, and it clears the redo stack.
    pub fn perform(
        &mut self,
        world: &mut World,
        request: impl Into<EditRequest>,
    ) -> Result<ActionHandle, EditError> {
        let action = ActionVariant::from_request(world, request.into()).inspect_err(|err| {
            log::warn!("rejected edit: {err}");
        })?;
        self.perform_action(world, action)
    }

    /// Applies an action that has never been applied.
    pub fn perform_action(
        &mut self,
        world: &mut World,
        mut action: ActionVariant,
    ) -> Result<ActionHandle, EditError> {
        if action.already_applied() {
            return Err(ConsistencyError::AlreadyApplied.into());
        }

        if let Err(err) = action.apply(world) {
            log::warn!("\"{}\" failed: {err}", action.describe());
            action.dispose();
            return Err(err);
        }
        log::debug!("applied \"{}\"", action.describe());

        let kind = action.kind();
        if let Some(evicted) = self.undo_stack.push(action) {
            log::info!("undo history full, dropping \"{}\"", evicted.describe());
            evicted.dispose();
        }
        self.redo_stack.clear();

        Ok(ActionHandle {
            kind,
            stack_index: self.undo_stack.len().saturating_sub(1),
        })
    }

    /// Reverts the most recent action. Returns false when there is nothing
    /// to undo.
    pub fn undo(&mut self, world: &mut World) -> Result<bool, EditError> {
        let Some(mut action) = self.undo_stack.pop() else {
            return Ok(false);
        };

        if let Err(err) = action.undo(world) {
            log::warn!("undoing \"{}\" failed: {err}", action.describe());
            self.undo_stack.push(action);
            return Err(err.into_replay_error());
        }
        log::debug!("undid \"{}\"", action.describe());

        if let Some(evicted) = self.redo_stack.push(action) {
            evicted.dispose();
        }
        Ok(true)
    }

    /// Reapplies the most recently undone action. Returns false when there
    /// is nothing to redo.
    pub fn redo(&mut self, world: &mut World) -> Result<bool, EditError> {
        let Some(mut action) = self.redo_stack.pop() else {
            return Ok(false);
        };

        if let Err(err) = action.apply(world) {
            log::warn!("redoing \"{}\" failed: {err}", action.describe());
            self.redo_stack.push(action);
            return Err(err.into_replay_error());
        }
        log::debug!("redid \"{}\"", action.describe());

        if let Some(evicted) = self.undo_stack.push(action) {
            evicted.dispose();
        }
        Ok(true)
    }

    /// Undoes up to `count` actions, returning how many were undone.
    pub fn undo_n(&mut self, world: &mut World, count: usize) -> Result<usize, EditError> {
        for done in 0..count {
            if !self.undo(world)? {
                return Ok(done);
            }
        }
        Ok(count)
    }

    /// Redoes up to `count` actions, returning how many were redone.
    pub fn redo_n(&mut self, world: &mut World, count: usize) -> Result<usize, EditError> {
        for done in 0..count {
            if !self.redo(world)? {
                return Ok(done);
            }
        }
        Ok(count)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// `(undo_count, redo_count)`
    pub fn stack_depth(&self) -> (usize, usize) {
        (self.undo_stack.len(), self.redo_stack.len())
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.peek().map(ActionVariant::describe)
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.peek().map(ActionVariant::describe)
    }

    /// Whether any action in either stack still needs `clip`.
    pub fn references_clip(&self, clip: ClipId) -> bool {
        self.undo_stack.contains(|action| action.references_clip(clip))
            || self.redo_stack.contains(|action| action.references_clip(clip))
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
