//! File operations for saving and loading annotation documents.
//!
//! All dialogs run as async tasks so the UI thread never blocks; completed
//! results come back over a channel and are applied at the start of the next
//! frame. The shape tree itself is only ever touched from the UI thread.

use super::state::{
    AnnotationApp, FileOperationResult, PendingLoadOperation, PendingSaveOperation,
};
use crate::shapes::Document;
use crate::types::ImageData;
use eframe::egui;

impl AnnotationApp {
    /// Handles pending file operations.
    ///
    /// This method processes completed async file operations and initiates
    /// new ones.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context for requesting repaints
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        // First, process any completed file operations from the channel
        if let Some(receiver) = &self.file.file_operation_receiver {
            while let Ok(result) = receiver.try_recv() {
                match result {
                    FileOperationResult::SaveCompleted(path) => {
                        self.file.current_path = Some(path);
                        self.file.has_unsaved_changes = false;
                        println!("File saved successfully");
                    }
                    FileOperationResult::LoadCompleted(path, content) => {
                        match Document::from_json(&content) {
                            Ok(document) => {
                                self.document = document;
                                self.background_dirty = true;
                                self.file.current_path = Some(path);
                                self.file.has_unsaved_changes = false;
                                self.interaction.selected_shape = None;
                                self.interaction.drag = None;
                                self.document.shapes.set_selected(None);
                                self.undo_history.clear();
                                // Keep generated names unique after a load
                                self.shape_counter = self.document.shapes.len() as u32;
                                println!("File loaded successfully");
                            }
                            Err(e) => {
                                eprintln!("Failed to parse document: {}", e);
                            }
                        }
                    }
                    FileOperationResult::BackgroundLoaded(path, bytes) => {
                        self.document.background = Some(ImageData::from_bytes(bytes));
                        self.background_dirty = true;
                        self.file.has_unsaved_changes = true;
                        println!("Background image loaded from {}", path);
                    }
                    FileOperationResult::OperationFailed(error) => {
                        eprintln!("File operation failed: {}", error);
                    }
                }
            }
        }

        // Handle pending save operations
        if let Some(save_op) = self.file.pending_save_operation.take() {
            let ctx = ctx.clone();
            let document_json = self.document.to_json().unwrap_or_default();
            let sender = self.file.file_operation_sender.clone();

            match save_op {
                PendingSaveOperation::SaveAs => {
                    tokio::spawn(async move {
                        if let Some(handle) = rfd::AsyncFileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name("annotations.json")
                            .save_file()
                            .await
                        {
                            let path = handle.path();
                            match std::fs::write(path, document_json) {
                                Ok(_) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::SaveCompleted(
                                            path.display().to_string(),
                                        ));
                                    }
                                }
                                Err(e) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::OperationFailed(
                                            format!("Failed to save file: {}", e),
                                        ));
                                    }
                                }
                            }
                        }
                        ctx.request_repaint();
                    });
                }
                PendingSaveOperation::Save => {
                    if let Some(path) = self.file.current_path.clone() {
                        tokio::spawn(async move {
                            match std::fs::write(&path, document_json) {
                                Ok(_) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::SaveCompleted(path));
                                    }
                                }
                                Err(e) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::OperationFailed(
                                            format!("Failed to save file: {}", e),
                                        ));
                                    }
                                }
                            }
                            ctx.request_repaint();
                        });
                    } else {
                        self.file.pending_save_operation = Some(PendingSaveOperation::SaveAs);
                    }
                }
            }
        }

        // Handle pending load operations
        if let Some(load_op) = self.file.pending_load_operation.take() {
            let ctx = ctx.clone();
            let sender = self.file.file_operation_sender.clone();

            match load_op {
                PendingLoadOperation::Load => {
                    tokio::spawn(async move {
                        if let Some(handle) = rfd::AsyncFileDialog::new()
                            .add_filter("JSON", &["json"])
                            .pick_file()
                            .await
                        {
                            let path = handle.path();
                            match std::fs::read_to_string(path) {
                                Ok(json) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::LoadCompleted(
                                            path.display().to_string(),
                                            json,
                                        ));
                                    }
                                }
                                Err(e) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::OperationFailed(
                                            format!("Failed to read file: {}", e),
                                        ));
                                    }
                                }
                            }
                        }
                        ctx.request_repaint();
                    });
                }
                PendingLoadOperation::LoadBackground => {
                    tokio::spawn(async move {
                        if let Some(handle) = rfd::AsyncFileDialog::new()
                            .add_filter("Images", &["png", "jpg", "jpeg"])
                            .pick_file()
                            .await
                        {
                            let path = handle.path();
                            match std::fs::read(path) {
                                Ok(bytes) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::BackgroundLoaded(
                                            path.display().to_string(),
                                            bytes,
                                        ));
                                    }
                                }
                                Err(e) => {
                                    if let Some(tx) = sender {
                                        let _ = tx.send(FileOperationResult::OperationFailed(
                                            format!("Failed to read image: {}", e),
                                        ));
                                    }
                                }
                            }
                        }
                        ctx.request_repaint();
                    });
                }
            }
        }
    }

    /// Opens a file dialog to save the document with a new name.
    pub fn save_as_document(&mut self) {
        self.file.pending_save_operation = Some(PendingSaveOperation::SaveAs);
    }

    /// Saves the document to the current file path, or triggers "Save As" if
    /// no path is set.
    pub fn save_document(&mut self) {
        if self.file.current_path.is_some() {
            self.file.pending_save_operation = Some(PendingSaveOperation::Save);
        } else {
            self.save_as_document();
        }
    }

    /// Opens a file dialog to load a document from disk.
    pub fn load_document(&mut self) {
        self.file.pending_load_operation = Some(PendingLoadOperation::Load);
    }

    /// Opens a file dialog to pick a background image for the canvas.
    pub fn load_background_image(&mut self) {
        self.file.pending_load_operation = Some(PendingLoadOperation::LoadBackground);
    }

    /// Creates a new empty document, resetting all state.
    pub fn new_document(&mut self) {
        self.document = Document::new();
        self.background_dirty = true;
        self.file.current_path = None;
        self.file.has_unsaved_changes = false;
        self.interaction.selected_shape = None;
        self.interaction.drag = None;
        self.undo_history.clear();
        self.shape_counter = 0;
        self.canvas.offset = egui::Vec2::ZERO;
        self.canvas.zoom_factor = 1.0;
    }
}
