//! Undo/redo functionality for tracking and reversing user actions.
//!
//! Each completed gesture or structural edit records a single action; undoing
//! applies the reverse mutation and yields the inverse action for the redo
//! stack.

use crate::constants::MAX_UNDO_HISTORY;
use crate::shapes::{Bounds, Document, RemovedSubtree};
use crate::types::ShapeId;
use serde::{Deserialize, Serialize};

/// Represents different types of actions that can be undone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UndoAction {
    /// A shape (and its subtree) was moved from one position to another
    ShapeMoved {
        /// The moved shape
        id: ShapeId,
        /// Bounds corner before the move
        old_top_left: (f32, f32),
        /// Bounds corner after the move
        new_top_left: (f32, f32),
    },
    /// A shape was resized along one or both axes
    ShapeResized {
        /// The resized shape
        id: ShapeId,
        /// Bounds before the resize
        old_bounds: Bounds,
        /// Bounds after the resize
        new_bounds: Bounds,
    },
    /// A shape was created
    ShapeCreated {
        /// The created shape
        id: ShapeId,
    },
    /// A shape and its subtree were deleted
    ShapeDeleted {
        /// The removed subtree and its old attachment point
        removed: RemovedSubtree,
    },
}

/// Manages undo/redo history for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UndoHistory {
    /// Stack of actions that can be undone
    #[serde(skip)]
    undo_stack: Vec<UndoAction>,
    /// Stack of actions that can be redone
    #[serde(skip)]
    redo_stack: Vec<UndoAction>,
}

impl UndoHistory {
    /// Creates a new empty undo history.
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Adds a freshly performed action to the undo history.
    ///
    /// This clears the redo stack since a new action invalidates any
    /// previously undone actions.
    pub fn push_action(&mut self, action: UndoAction) {
        self.undo_stack.push(action);
        self.redo_stack.clear();

        // Limit undo history size
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Pushes an action onto the undo stack without clearing the redo stack.
    /// Used when a redo produces its inverse.
    pub fn push_undo(&mut self, action: UndoAction) {
        self.undo_stack.push(action);
    }

    /// Returns true if there are actions that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are actions that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pops the most recent action from the undo stack.
    pub fn pop_undo(&mut self) -> Option<UndoAction> {
        self.undo_stack.pop()
    }

    /// Pops the most recent action from the redo stack.
    pub fn pop_redo(&mut self) -> Option<UndoAction> {
        self.redo_stack.pop()
    }

    /// Pushes an undone action onto the redo stack.
    pub fn push_redo(&mut self, action: UndoAction) {
        self.redo_stack.push(action);
    }

    /// Clears all undo and redo history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Extension methods for applying undo/redo actions to a document.
pub trait UndoableDocument {
    /// Applies an undo action to reverse it, returning the inverse action.
    fn apply_undo(&mut self, action: &UndoAction) -> Option<UndoAction>;

    /// Applies a redo action to re-apply it, returning the inverse action.
    fn apply_redo(&mut self, action: &UndoAction) -> Option<UndoAction>;
}

impl UndoableDocument for Document {
    fn apply_undo(&mut self, action: &UndoAction) -> Option<UndoAction> {
        match action {
            UndoAction::ShapeMoved {
                id,
                old_top_left,
                new_top_left,
            } => {
                self.shapes.get(id)?;
                self.shapes
                    .set_location(*id, egui::pos2(old_top_left.0, old_top_left.1));
                Some(UndoAction::ShapeMoved {
                    id: *id,
                    old_top_left: *new_top_left,
                    new_top_left: *old_top_left,
                })
            }
            UndoAction::ShapeResized {
                id,
                old_bounds,
                new_bounds,
            } => {
                let shape = self.shapes.get_mut(id)?;
                shape.set_bounds(*old_bounds);
                Some(UndoAction::ShapeResized {
                    id: *id,
                    old_bounds: *new_bounds,
                    new_bounds: *old_bounds,
                })
            }
            UndoAction::ShapeDeleted { removed } => {
                let id = removed.shapes.first()?.id;
                self.shapes.restore(removed.clone());
                Some(UndoAction::ShapeCreated { id })
            }
            UndoAction::ShapeCreated { id } => {
                let removed = self.shapes.remove(*id)?;
                Some(UndoAction::ShapeDeleted { removed })
            }
        }
    }

    fn apply_redo(&mut self, action: &UndoAction) -> Option<UndoAction> {
        // Redo is just applying the reverse of an undo
        self.apply_undo(action)
    }
}
