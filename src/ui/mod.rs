//! User interface components and rendering logic for the annotation tool.
//!
//! This module contains all the UI-related code including the main
//! application struct, canvas rendering, the properties panel, and user
//! interaction handling.
//!
//! # Module Organization
//!
//! - `state` - Application state structures and the main AnnotationApp
//! - `file_ops` - Async document save/load and background image loading
//! - `canvas` - Canvas navigation, zooming, panning, and the drag state machine
//! - `rendering` - Drawing the background image and annotation shapes
//! - `undo` - Undo/redo history and action application

mod canvas;
mod file_ops;
mod rendering;
mod state;
mod undo;


pub use state::AnnotationApp;
pub use undo::{UndoAction, UndoHistory, UndoableDocument};

use self::state::PendingConfirmAction;
use crate::constants;
use crate::shapes::{Bounds, Shape, ShapeKind};
use crate::types::{FillMode, Layer, ShapeId};
use eframe::egui;

impl eframe::App for AnnotationApp {
    /// Persist entire app state between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.to_json() {
            Ok(json) => {
                storage.set_string("app_state", json);
            }
            Err(err) => {
                eprintln!("Failed to serialize app state: {err}");
            }
        }
    }

    /// Main update function called by egui for each frame.
    ///
    /// This method handles the overall UI layout, including the toolbar, the
    /// properties panel and the main canvas area.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context
    /// * `_frame` - The eframe frame
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply theme visuals
        let visuals = if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        // Handle pending file operations
        self.handle_pending_operations(ctx);

        // Handle undo/redo keyboard shortcuts
        self.handle_undo_redo_keys(ctx);

        // Handle delete key for removing the selected shape
        self.handle_delete_key(ctx);

        // Handle file-related keyboard shortcuts (New/Open/Save)
        self.handle_file_shortcuts(ctx);

        // Intercept native window close requests (titlebar X)
        if ctx.input(|i| i.viewport().close_requested()) {
            if self.file.has_unsaved_changes && !self.file.allow_close_on_next_request {
                // Abort close and show confirmation dialog
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                if !self.file.show_unsaved_dialog {
                    self.file.show_unsaved_dialog = true;
                    self.file.pending_confirm_action = Some(PendingConfirmAction::Quit);
                }
            } else {
                // Either no unsaved changes or user confirmed close
                self.file.allow_close_on_next_request = false;
            }
        }

        // Top toolbar occupies full width and is independent of the properties panel
        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        // Properties panel should only take space from the canvas area below the toolbar
        let viewport_width = ctx.input(|i| i.screen_rect().width());
        let clamped_width = self
            .properties_panel_width
            .clamp(180.0, (viewport_width * 0.9).max(180.0));

        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(clamped_width)
            .show(ctx, |ui| {
                // Capture the current width each frame so we can remember it
                let current_width = ui.available_width();
                let max_allowed = (viewport_width * 0.9).max(180.0);
                self.properties_panel_width = current_width.clamp(180.0, max_allowed);
                self.draw_properties_panel(ui);
            });

        // Central canvas area (below the toolbar)
        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });

        // Unsaved changes confirmation dialog
        if self.file.show_unsaved_dialog {
            self.draw_unsaved_dialog(ctx);
        }
    }
}

impl AnnotationApp {
    /// Handles Ctrl/Cmd+Z (undo) and Ctrl/Cmd+Shift+Z or Ctrl/Cmd+Y (redo).
    fn handle_undo_redo_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let undo_pressed = ctx.input(|i| {
            i.modifiers.command && !i.modifiers.shift && i.key_pressed(egui::Key::Z)
        });
        let redo_pressed = ctx.input(|i| {
            i.modifiers.command
                && (i.key_pressed(egui::Key::Y)
                    || (i.modifiers.shift && i.key_pressed(egui::Key::Z)))
        });

        if undo_pressed {
            self.perform_undo();
        } else if redo_pressed {
            self.perform_redo();
        }
    }

    /// Handles Delete/Backspace for removing the selected shape.
    fn handle_delete_key(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let delete_pressed = ctx.input(|i| {
            i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)
        });
        if delete_pressed {
            self.delete_selected_shape();
        }
    }

    /// Handles Ctrl/Cmd+N, Ctrl/Cmd+O and Ctrl/Cmd+S.
    fn handle_file_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (new_pressed, open_pressed, save_pressed) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::N),
                i.modifiers.command && i.key_pressed(egui::Key::O),
                i.modifiers.command && i.key_pressed(egui::Key::S),
            )
        });
        if new_pressed {
            self.request_new_document();
        }
        if open_pressed {
            self.request_open_document();
        }
        if save_pressed {
            self.save_document();
        }
    }

    /// Starts a new document, asking for confirmation first when there are
    /// unsaved changes.
    pub fn request_new_document(&mut self) {
        if self.file.has_unsaved_changes {
            self.file.show_unsaved_dialog = true;
            self.file.pending_confirm_action = Some(PendingConfirmAction::New);
        } else {
            self.new_document();
        }
    }

    /// Opens a document, asking for confirmation first when there are unsaved
    /// changes.
    pub fn request_open_document(&mut self) {
        if self.file.has_unsaved_changes {
            self.file.show_unsaved_dialog = true;
            self.file.pending_confirm_action = Some(PendingConfirmAction::Open);
        } else {
            self.load_document();
        }
    }

    /// Undoes the most recent action, if any.
    pub fn perform_undo(&mut self) {
        if let Some(action) = self.undo_history.pop_undo() {
            if let Some(inverse) = self.document.apply_undo(&action) {
                self.undo_history.push_redo(inverse);
                self.file.has_unsaved_changes = true;
                self.prune_selection();
            }
        }
    }

    /// Redoes the most recently undone action, if any.
    pub fn perform_redo(&mut self) {
        if let Some(action) = self.undo_history.pop_redo() {
            if let Some(inverse) = self.document.apply_redo(&action) {
                self.undo_history.push_undo(inverse);
                self.file.has_unsaved_changes = true;
                self.prune_selection();
            }
        }
    }

    /// Drops the selection if the selected shape no longer exists.
    fn prune_selection(&mut self) {
        if let Some(id) = self.interaction.selected_shape {
            if self.document.shapes.get(&id).is_none() {
                self.interaction.selected_shape = None;
            }
        }
    }

    /// Selects the given shape (or clears the selection), keeping the
    /// per-shape selected flags in sync.
    pub fn select_shape(&mut self, id: Option<ShapeId>) {
        self.interaction.selected_shape = id;
        self.document.shapes.set_selected(id);
    }

    /// Deletes the selected shape and its subtree, recording an undo action.
    pub fn delete_selected_shape(&mut self) {
        if let Some(id) = self.interaction.selected_shape.take() {
            if let Some(removed) = self.document.shapes.remove(id) {
                self.undo_history
                    .push_action(UndoAction::ShapeDeleted { removed });
                self.file.has_unsaved_changes = true;
            }
            self.document.shapes.set_selected(None);
            self.interaction.drag = None;
        }
    }

    /// Inserts a shape centered in the current view, selects it and records
    /// an undo action.
    pub fn insert_shape(&mut self, ctx: &egui::Context, mut shape: Shape, kind_label: &str) {
        self.shape_counter += 1;
        shape.name = format!("{} {}", kind_label, self.shape_counter);
        let world_center = self.screen_to_world(ctx.input(|i| i.screen_rect()).center());
        let delta = world_center - shape.bounds().center();
        shape.offset(delta);
        let id = self.document.shapes.insert_root(shape);
        self.select_shape(Some(id));
        self.undo_history.push_action(UndoAction::ShapeCreated { id });
        self.file.has_unsaved_changes = true;
    }

    /// Draws the top toolbar: file actions, shape insertion, undo/redo and
    /// view options.
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("New").clicked() {
                self.request_new_document();
            }
            if ui.button("Open…").clicked() {
                self.request_open_document();
            }
            if ui.button("Save").clicked() {
                self.save_document();
            }
            if ui.button("Save As…").clicked() {
                self.save_as_document();
            }

            ui.separator();

            let ctx = ui.ctx().clone();
            if ui.button("Rectangle").clicked() {
                let bounds = Bounds::new(
                    0.0,
                    0.0,
                    constants::DEFAULT_SHAPE_WIDTH,
                    constants::DEFAULT_SHAPE_HEIGHT,
                );
                self.insert_shape(&ctx, Shape::rectangle(bounds), "Rectangle");
            }
            if ui.button("Ellipse").clicked() {
                let bounds = Bounds::new(
                    0.0,
                    0.0,
                    constants::DEFAULT_SHAPE_WIDTH,
                    constants::DEFAULT_SHAPE_HEIGHT,
                );
                self.insert_shape(&ctx, Shape::ellipse(bounds), "Ellipse");
            }
            if ui.button("Label").clicked() {
                self.insert_shape(&ctx, Shape::label("Label"), "Label");
            }
            if ui.button("Curve").clicked() {
                let mut curve = Shape::curve(vec![
                    (0.0, 0.0),
                    (40.0, -25.0),
                    (80.0, 25.0),
                    (120.0, 0.0),
                ]);
                // Hand-inserted curves should be movable right away
                curve.locked = false;
                self.insert_shape(&ctx, curve, "Curve");
            }

            ui.separator();

            if ui
                .add_enabled(self.undo_history.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                self.perform_undo();
            }
            if ui
                .add_enabled(self.undo_history.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                self.perform_redo();
            }

            ui.separator();

            if ui.button("Background…").clicked() {
                self.load_background_image();
            }

            ui.separator();

            ui.checkbox(&mut self.dark_mode, "Dark mode");

            ui.separator();

            ui.label(format!("Zoom: {:.0}%", self.canvas.zoom_factor * 100.0));
            if ui.button("Reset view").clicked() {
                self.canvas.zoom_factor = 1.0;
                self.canvas.offset = egui::Vec2::ZERO;
            }
        });
    }

    /// Draws the right-hand properties panel for the selected shape.
    fn draw_properties_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Properties");
        ui.separator();

        let Some(id) = self.interaction.selected_shape else {
            ui.label("Select a shape to edit its properties.");
            ui.separator();
            self.draw_file_status(ui);
            return;
        };

        let mut changed = false;
        let mut bring_forward = false;
        let mut send_backward = false;
        let mut bring_to_front = false;
        let mut send_to_back = false;
        let mut delete = false;

        if let Some(shape) = self.document.shapes.get_mut(&id) {
            ui.horizontal(|ui| {
                ui.label("Name:");
                changed |= ui.text_edit_singleline(&mut shape.name).changed();
            });
            ui.label(format!("Kind: {}", kind_label(&shape.kind)));
            ui.separator();

            // Position and size go through the policy-aware setters: curve
            // bounds are derived and fixed-size shapes ignore resizes.
            let bounds = shape.bounds();
            let (mut x, mut y) = (bounds.x, bounds.y);
            let (mut width, mut height) = (bounds.width, bounds.height);
            ui.horizontal(|ui| {
                ui.label("X:");
                if ui.add(egui::DragValue::new(&mut x).speed(1.0)).changed() {
                    shape.set_x(x);
                    changed = true;
                }
                ui.label("Y:");
                if ui.add(egui::DragValue::new(&mut y).speed(1.0)).changed() {
                    shape.set_y(y);
                    changed = true;
                }
            });
            ui.horizontal(|ui| {
                ui.label("W:");
                if ui.add(egui::DragValue::new(&mut width).speed(1.0)).changed() {
                    shape.set_width(width);
                    changed = true;
                }
                ui.label("H:");
                if ui
                    .add(egui::DragValue::new(&mut height).speed(1.0))
                    .changed()
                {
                    shape.set_height(height);
                    changed = true;
                }
            });

            changed |= ui.checkbox(&mut shape.locked, "Locked").changed();
            let label_kind = matches!(shape.kind, ShapeKind::Label { .. });
            changed |= ui
                .add_enabled(
                    !label_kind,
                    egui::Checkbox::new(&mut shape.fixed_size, "Fixed size"),
                )
                .changed();

            ui.horizontal(|ui| {
                ui.label("Layer:");
                changed |= ui
                    .selectable_value(&mut shape.layer, Layer::Background, "Background")
                    .changed();
                changed |= ui
                    .selectable_value(&mut shape.layer, Layer::Foreground, "Foreground")
                    .changed();
            });

            if shape.is_framed() {
                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("Fill:");
                    changed |= ui
                        .selectable_value(&mut shape.fill_mode, FillMode::None, "None")
                        .changed();
                    changed |= ui
                        .selectable_value(&mut shape.fill_mode, FillMode::Solid, "Solid")
                        .changed();
                    changed |= ui
                        .color_edit_button_srgba_unmultiplied(&mut shape.fill_color)
                        .changed();
                });
                ui.horizontal(|ui| {
                    ui.label("Opacity:");
                    changed |= ui
                        .add(egui::Slider::new(&mut shape.opacity, 0..=255))
                        .changed();
                });
                ui.horizontal(|ui| {
                    ui.label("Frame:");
                    changed |= ui
                        .color_edit_button_srgba_unmultiplied(&mut shape.frame_color)
                        .changed();
                    ui.label("Selected:");
                    changed |= ui
                        .color_edit_button_srgba_unmultiplied(&mut shape.selected_frame_color)
                        .changed();
                    ui.label("Width:");
                    changed |= ui
                        .add(
                            egui::DragValue::new(&mut shape.frame_width)
                                .speed(0.5)
                                .range(0.0..=60.0),
                        )
                        .changed();
                });
            }

            match &mut shape.kind {
                ShapeKind::Label {
                    text,
                    font,
                    font_color,
                } => {
                    ui.separator();
                    ui.label("Text:");
                    // Bounds re-measure on the next frame, so the text can be
                    // edited in place
                    changed |= ui.text_edit_singleline(text).changed();
                    ui.horizontal(|ui| {
                        ui.label("Font:");
                        changed |= ui.text_edit_singleline(&mut font.family).changed();
                        changed |= ui
                            .add(
                                egui::DragValue::new(&mut font.size)
                                    .speed(0.5)
                                    .range(4.0..=96.0),
                            )
                            .changed();
                    });
                    ui.horizontal(|ui| {
                        changed |= ui.checkbox(&mut font.bold, "Bold").changed();
                        changed |= ui.checkbox(&mut font.italic, "Italic").changed();
                        changed |= ui.checkbox(&mut font.underline, "Underline").changed();
                        changed |= ui.checkbox(&mut font.strikeout, "Strikeout").changed();
                    });
                    ui.horizontal(|ui| {
                        ui.label("Color:");
                        changed |= ui
                            .color_edit_button_srgba_unmultiplied(font_color)
                            .changed();
                    });
                }
                ShapeKind::Curve {
                    line_width,
                    line_color,
                    selected_line_color,
                    line_opacity,
                    ..
                } => {
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.label("Line:");
                        changed |= ui
                            .color_edit_button_srgba_unmultiplied(line_color)
                            .changed();
                        ui.label("Selected:");
                        changed |= ui
                            .color_edit_button_srgba_unmultiplied(selected_line_color)
                            .changed();
                    });
                    ui.horizontal(|ui| {
                        ui.label("Width:");
                        changed |= ui
                            .add(egui::DragValue::new(line_width).speed(0.5).range(0.0..=30.0))
                            .changed();
                        ui.label("Opacity:");
                        changed |= ui
                            .add(egui::Slider::new(line_opacity, 0..=255))
                            .changed();
                    });
                }
                _ => {}
            }

            ui.separator();
            ui.label("Z-order:");
            ui.horizontal(|ui| {
                bring_forward = ui.button("Forward").clicked();
                send_backward = ui.button("Backward").clicked();
            });
            ui.horizontal(|ui| {
                bring_to_front = ui.button("To front").clicked();
                send_to_back = ui.button("To back").clicked();
            });

            ui.separator();
            delete = ui.button("Delete shape").clicked();
        }

        if bring_forward {
            self.document.shapes.bring_forward(id);
            changed = true;
        }
        if send_backward {
            self.document.shapes.send_backward(id);
            changed = true;
        }
        if bring_to_front {
            self.document.shapes.bring_to_front(id);
            changed = true;
        }
        if send_to_back {
            self.document.shapes.send_to_back(id);
            changed = true;
        }
        if delete {
            self.delete_selected_shape();
            changed = true;
        }
        if changed {
            self.file.has_unsaved_changes = true;
        }

        ui.separator();
        self.draw_file_status(ui);
    }

    /// Shows the current file path and unsaved-changes state.
    fn draw_file_status(&self, ui: &mut egui::Ui) {
        match &self.file.current_path {
            Some(path) => {
                ui.label(format!("File: {}", path));
            }
            None => {
                ui.label("File: (unsaved)");
            }
        }
        if self.file.has_unsaved_changes {
            ui.label("Unsaved changes");
        }
        ui.label(format!("Shapes: {}", self.document.shapes.len()));
    }

    /// Draws the unsaved-changes confirmation dialog.
    fn draw_unsaved_dialog(&mut self, ctx: &egui::Context) {
        let title = match self.file.pending_confirm_action {
            Some(PendingConfirmAction::Quit) => "Unsaved changes — Quit?",
            Some(PendingConfirmAction::New) => "Unsaved changes — Create New?",
            Some(PendingConfirmAction::Open) => "Unsaved changes — Open File?",
            None => "Unsaved changes",
        };
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("You have unsaved changes. Are you sure you want to continue?");
                ui.horizontal(|ui| {
                    let confirm_label = match self.file.pending_confirm_action {
                        Some(PendingConfirmAction::Quit) => "Discard and Quit",
                        Some(PendingConfirmAction::New) => "Discard and Create New",
                        Some(PendingConfirmAction::Open) => "Discard and Open",
                        None => "Discard",
                    };
                    if ui.button(confirm_label).clicked() {
                        match self.file.pending_confirm_action {
                            Some(PendingConfirmAction::New) => {
                                self.new_document();
                            }
                            Some(PendingConfirmAction::Open) => {
                                self.load_document();
                            }
                            Some(PendingConfirmAction::Quit) => {
                                // Allow one close request to pass without interception
                                self.file.allow_close_on_next_request = true;
                                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                            }
                            None => {}
                        }
                        self.file.show_unsaved_dialog = false;
                        self.file.pending_confirm_action = None;
                    }
                    if ui.button("Cancel").clicked() {
                        self.file.show_unsaved_dialog = false;
                        self.file.pending_confirm_action = None;
                    }
                });
            });
    }
}

/// Human-readable name of a shape kind for the properties panel.
fn kind_label(kind: &ShapeKind) -> &'static str {
    match kind {
        ShapeKind::Rectangle => "Rectangle",
        ShapeKind::Ellipse => "Ellipse",
        ShapeKind::Label { .. } => "Label",
        ShapeKind::Curve { .. } => "Curve",
    }
}
