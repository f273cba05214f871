//! Application state management structures.
//!
//! This module contains all the state structures that track the application's
//! current UI state, including canvas navigation, the in-progress drag
//! gesture, and file operations.

use super::undo::UndoHistory;
use crate::shapes::{Bounds, Document};
use crate::types::{Region, ShapeId};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// State related to canvas navigation and display.
///
/// Tracks the current pan offset and zoom level of the canvas.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasState {
    /// Current canvas pan offset for navigation (in screen space)
    #[serde(skip)]
    pub offset: egui::Vec2,
    /// Current zoom level (1.0 = normal, 2.0 = 2x zoom, 0.5 = 50% zoom)
    pub zoom_factor: f32,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            offset: egui::Vec2::ZERO,
            zoom_factor: 1.0,
        }
    }
}

/// A drag gesture in progress against a single shape.
///
/// Captured on pointer-down and held constant until pointer-up: the hit
/// region decides the drag verb (move vs. resize-which-edge) and the grab
/// offset keeps the shape from jumping under the pointer.
#[derive(Debug, Clone, Copy)]
pub struct DragGesture {
    /// The shape being dragged
    pub shape: ShapeId,
    /// The hit region classified at pointer-down
    pub region: Region,
    /// Vector from the shape's bounds corner to the pointer-down point
    pub grab_offset: egui::Vec2,
    /// Bounds at pointer-down, for undo recording
    pub start_bounds: Bounds,
}

/// State related to user interactions with shapes and the canvas.
#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InteractionState {
    /// Currently selected shape id, if any
    #[serde(skip)]
    pub selected_shape: Option<ShapeId>,
    /// The drag gesture in progress, if any; `None` means idle
    #[serde(skip)]
    pub drag: Option<DragGesture>,
    /// Whether the user is currently panning the canvas
    #[serde(skip)]
    pub is_panning: bool,
    /// Last mouse position during panning operation
    #[serde(skip)]
    pub last_pan_pos: Option<egui::Pos2>,
}

/// State related to file operations and persistence.
///
/// Manages file paths, unsaved changes tracking, and async file operations.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct FileState {
    /// Current file path for save/load operations
    #[serde(skip)]
    pub current_path: Option<String>,
    /// Flag indicating if the document has unsaved changes
    #[serde(skip)]
    pub has_unsaved_changes: bool,
    /// Pending save operation to initiate on the next frame
    #[serde(skip)]
    pub pending_save_operation: Option<PendingSaveOperation>,
    /// Pending load operation to initiate on the next frame
    #[serde(skip)]
    pub pending_load_operation: Option<PendingLoadOperation>,
    /// Channel for receiving file operation results from async contexts
    #[serde(skip)]
    pub file_operation_sender: Option<Sender<FileOperationResult>>,
    /// Receiving end drained once per frame
    #[serde(skip)]
    pub file_operation_receiver: Option<Receiver<FileOperationResult>>,
    /// Whether to show an unsaved-changes confirmation dialog
    #[serde(skip)]
    pub show_unsaved_dialog: bool,
    /// The action the user attempted that requires confirmation (e.g., New or Quit)
    #[serde(skip)]
    pub pending_confirm_action: Option<PendingConfirmAction>,
    /// One-shot flag to allow the next close request to proceed after user confirmation
    #[serde(skip)]
    pub allow_close_on_next_request: bool,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            current_path: None,
            has_unsaved_changes: false,
            pending_save_operation: None,
            pending_load_operation: None,
            file_operation_sender: Some(sender),
            file_operation_receiver: Some(receiver),
            show_unsaved_dialog: false,
            pending_confirm_action: None,
            allow_close_on_next_request: false,
        }
    }
}

/// Represents a pending save operation type.
#[derive(Debug)]
pub enum PendingSaveOperation {
    /// Save with a new file path (show file picker)
    SaveAs,
    /// Save to the existing file path
    Save,
}

/// Represents a pending load operation type.
#[derive(Debug)]
pub enum PendingLoadOperation {
    /// Load a document from a file (show file picker)
    Load,
    /// Load a background image from a file (show file picker)
    LoadBackground,
}

/// Messages sent from async file operations back to the main app.
#[derive(Debug)]
pub enum FileOperationResult {
    /// Save operation completed successfully with the given path
    SaveCompleted(String),
    /// Document load completed successfully with path and content
    LoadCompleted(String, String),
    /// Background image load completed with path and raw bytes
    BackgroundLoaded(String, Vec<u8>),
    /// Operation failed with an error message
    OperationFailed(String),
}

/// Pending confirmation actions that may require user approval due to unsaved changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirmAction {
    /// User is attempting to create a new document
    New,
    /// User is attempting to open a document
    Open,
    /// User is attempting to quit the application
    Quit,
}

/// The main application structure containing UI state and the annotation
/// document.
///
/// This struct implements the `eframe::App` trait and handles all user
/// interface rendering and interaction logic.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationApp {
    /// The document being edited
    pub document: Document,
    /// Canvas navigation and display state
    pub canvas: CanvasState,
    /// User interaction state
    pub interaction: InteractionState,
    /// File operations state
    pub file: FileState,
    /// Undo/redo history for tracking and reversing actions
    pub undo_history: UndoHistory,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
    /// Remembered width of the properties panel across sessions
    pub properties_panel_width: f32,
    /// Counter for generating unique default shape names
    pub shape_counter: u32,
    /// GPU texture for the background image, uploaded lazily
    #[serde(skip)]
    pub background_texture: Option<egui::TextureHandle>,
    /// Set when the background image changed and the texture must be rebuilt
    #[serde(skip)]
    pub background_dirty: bool,
}

impl Default for AnnotationApp {
    fn default() -> Self {
        Self {
            document: Document::default(),
            canvas: CanvasState::default(),
            interaction: InteractionState::default(),
            file: FileState::default(),
            undo_history: UndoHistory::new(),
            dark_mode: true,
            properties_panel_width: 300.0,
            shape_counter: 0,
            background_texture: None,
            background_dirty: true,
        }
    }
}

impl AnnotationApp {
    /// Serializes the application state to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes application state from JSON, rebuilding the parent links
    /// the document does not persist.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut app: Self = serde_json::from_str(json)?;
        app.document.shapes.fix_links();
        app.background_dirty = true;
        Ok(app)
    }
}
