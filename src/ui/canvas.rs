//! Canvas interaction and navigation functionality.
//!
//! This module handles canvas panning, zooming, coordinate transformations
//! between screen and world space, and the pointer-driven drag state machine
//! that moves and resizes annotation shapes.

use super::state::{AnnotationApp, DragGesture};
use super::undo::UndoAction;
use crate::constants;
use crate::types::Region;
use eframe::egui;

impl AnnotationApp {
    /// Converts screen coordinates to world coordinates accounting for zoom and pan.
    ///
    /// # Arguments
    ///
    /// * `screen_pos` - Position in screen space (pixels)
    ///
    /// # Returns
    ///
    /// The corresponding position in world space
    pub fn screen_to_world(&self, screen_pos: egui::Pos2) -> egui::Pos2 {
        (screen_pos - self.canvas.offset) / self.canvas.zoom_factor
    }

    /// Converts world coordinates to screen coordinates accounting for zoom and pan.
    ///
    /// # Arguments
    ///
    /// * `world_pos` - Position in world space
    ///
    /// # Returns
    ///
    /// The corresponding position in screen space (pixels)
    pub fn world_to_screen(&self, world_pos: egui::Pos2) -> egui::Pos2 {
        world_pos * self.canvas.zoom_factor + self.canvas.offset
    }

    /// Converts world-space bounds to a screen-space rectangle.
    pub fn world_bounds_to_screen(&self, bounds: crate::shapes::Bounds) -> egui::Rect {
        egui::Rect::from_min_max(
            self.world_to_screen(bounds.top_left()),
            self.world_to_screen(egui::pos2(bounds.right(), bounds.bottom())),
        )
    }

    /// Handles middle-click or Cmd/Ctrl+left-click canvas panning functionality.
    ///
    /// Uses Cmd on macOS and Ctrl on other platforms for modifier-based panning.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The response from the canvas widget
    pub fn handle_canvas_panning(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        // modifiers.command automatically uses Cmd on macOS and Ctrl elsewhere
        let should_pan = ui.input(|i| {
            i.pointer.middle_down() || (i.pointer.primary_down() && i.modifiers.command)
        });

        if should_pan {
            if let Some(current_pos) = response.interact_pointer_pos() {
                if !self.interaction.is_panning {
                    self.interaction.is_panning = true;
                    self.interaction.last_pan_pos = Some(current_pos);
                } else if let Some(last_pos) = self.interaction.last_pan_pos {
                    let delta = current_pos - last_pos;
                    self.canvas.offset += delta;
                    self.interaction.last_pan_pos = Some(current_pos);
                }
            }
        } else {
            self.interaction.is_panning = false;
            self.interaction.last_pan_pos = None;
        }
    }

    /// Handles scroll wheel zooming functionality.
    ///
    /// Zooms in/out while keeping the mouse cursor position fixed in world
    /// space. Zoom range is clamped between 0.25x and 5.0x. Only zooms if the
    /// cursor is over the canvas.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The response from the canvas widget
    pub fn handle_canvas_zoom(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);

        if scroll_delta != 0.0 {
            let mouse_pos = ui
                .input(|i| i.pointer.hover_pos())
                .or_else(|| response.interact_pointer_pos());

            if let Some(mouse_pos) = mouse_pos {
                if !response.rect.contains(mouse_pos) {
                    return;
                }

                // World position under the cursor before the zoom change
                let world_pos_before_zoom = self.screen_to_world(mouse_pos);

                let zoom_delta = if scroll_delta > 0.0 { 0.025 } else { -0.025 };
                let old_zoom = self.canvas.zoom_factor;
                self.canvas.zoom_factor = (self.canvas.zoom_factor + zoom_delta).clamp(0.25, 5.0);

                // Only adjust offset if zoom actually changed
                if (self.canvas.zoom_factor - old_zoom).abs() > f32::EPSILON {
                    let world_pos_after_zoom = self.world_to_screen(world_pos_before_zoom);
                    let offset_adjustment = mouse_pos - world_pos_after_zoom;
                    self.canvas.offset += offset_adjustment;
                }
            }
        }
    }

    /// Updates the cursor hint while hovering with no button pressed.
    ///
    /// Edge regions map to the matching resize cursor, body regions to the
    /// move cursor. Hovering never mutates any shape.
    pub fn update_hover_cursor(&self, ui: &egui::Ui, response: &egui::Response) {
        if ui.input(|i| i.pointer.any_down()) {
            return;
        }
        let Some(screen_pos) = response.hover_pos() else {
            return;
        };
        if !response.rect.contains(screen_pos) {
            return;
        }
        let world_pos = self.screen_to_world(screen_pos);
        let Some(id) = self.document.shapes.shape_at(world_pos) else {
            return;
        };
        let Some(shape) = self.document.shapes.get(&id) else {
            return;
        };
        let cursor = match shape.hit_region(world_pos) {
            Region::EdgeLeft | Region::EdgeRight => egui::CursorIcon::ResizeHorizontal,
            Region::EdgeTop | Region::EdgeBottom => egui::CursorIcon::ResizeVertical,
            region if region.is_body() => egui::CursorIcon::Move,
            _ => egui::CursorIcon::Default,
        };
        ui.ctx().set_cursor_icon(cursor);
    }

    /// Runs the drag state machine against the current pointer state.
    ///
    /// Pointer-down over a shape starts a gesture keyed off the classified
    /// hit region; moves while the button is held mutate the shape's bounds;
    /// release returns to idle unconditionally and records one undo action
    /// for the whole gesture.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The response from the canvas widget
    pub fn handle_shape_interaction(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let primary_down = ui.input(|i| i.pointer.primary_down());
        let command_held = ui.input(|i| i.modifiers.command);

        if primary_down && !self.interaction.is_panning && !command_held {
            let Some(screen_pos) = response.interact_pointer_pos() else {
                return;
            };
            let world_pos = self.screen_to_world(screen_pos);

            if let Some(gesture) = self.interaction.drag {
                if self.update_drag(&gesture, world_pos) {
                    self.file.has_unsaved_changes = true;
                    // Repaint is deferred; nothing re-enters the mutation here
                    ui.ctx().request_repaint();
                }
            } else if ui.input(|i| i.pointer.primary_pressed()) {
                self.begin_drag(world_pos);
            }
        } else if let Some(gesture) = self.interaction.drag.take() {
            self.finish_drag(&gesture);
        }
    }

    /// Starts a drag gesture at the given world position, if a shape is hit.
    ///
    /// The currently selected shape keeps priority while it is under the
    /// pointer; otherwise the topmost shape at the point becomes selected and
    /// is the drag target. A press on empty canvas clears the selection.
    /// Locked shapes can be selected but never enter a drag.
    fn begin_drag(&mut self, world_pos: egui::Pos2) {
        let target = self
            .interaction
            .selected_shape
            .filter(|id| {
                self.document
                    .shapes
                    .get(id)
                    .is_some_and(|s| s.hit_region(world_pos) != Region::None)
            })
            .or_else(|| self.document.shapes.shape_at(world_pos));

        let Some(id) = target else {
            self.select_shape(None);
            return;
        };
        self.select_shape(Some(id));

        let Some(shape) = self.document.shapes.get(&id) else {
            return;
        };
        if shape.locked {
            return;
        }
        let region = shape.hit_region(world_pos);
        if region == Region::None {
            return;
        }
        let bounds = shape.bounds();
        self.interaction.drag = Some(DragGesture {
            shape: id,
            region,
            grab_offset: world_pos - bounds.top_left(),
            start_bounds: bounds,
        });
    }

    /// Applies one pointer-move to the dragged shape. Returns whether any
    /// bounds actually changed.
    ///
    /// Edge gestures resize along their single axis, rejected entirely on
    /// that axis if the shape would shrink below the minimum extent. Body
    /// gestures reposition the shape (and recursively its subtree) so its
    /// corner stays at `pointer - grab_offset`.
    fn update_drag(&mut self, gesture: &DragGesture, world_pos: egui::Pos2) -> bool {
        let Some(shape) = self.document.shapes.get(&gesture.shape) else {
            return false;
        };

        if gesture.region.is_edge() {
            // Derived sizes always win: fixed-size shapes ignore edge drags
            if shape.fixed_size {
                return false;
            }
            let bounds = shape.bounds();
            let mut updated = bounds;
            let min = constants::MIN_SHAPE_EXTENT;
            match gesture.region {
                Region::EdgeLeft => {
                    let width = bounds.right() - world_pos.x;
                    if width > min {
                        updated.x = world_pos.x;
                        updated.width = width;
                    }
                }
                Region::EdgeRight => {
                    let width = world_pos.x - bounds.x;
                    if width > min {
                        updated.width = width;
                    }
                }
                Region::EdgeTop => {
                    let height = bounds.bottom() - world_pos.y;
                    if height > min {
                        updated.y = world_pos.y;
                        updated.height = height;
                    }
                }
                Region::EdgeBottom => {
                    let height = world_pos.y - bounds.y;
                    if height > min {
                        updated.height = height;
                    }
                }
                _ => {}
            }
            if updated == bounds {
                return false;
            }
            if let Some(shape) = self.document.shapes.get_mut(&gesture.shape) {
                shape.set_bounds(updated);
            }
            true
        } else {
            let old_top_left = shape.bounds().top_left();
            let new_top_left = world_pos - gesture.grab_offset;
            if new_top_left == old_top_left {
                return false;
            }
            self.document.shapes.set_location(gesture.shape, new_top_left);
            true
        }
    }

    /// Ends a drag gesture, recording a single undo action when the bounds
    /// changed over the whole gesture.
    fn finish_drag(&mut self, gesture: &DragGesture) {
        let Some(shape) = self.document.shapes.get(&gesture.shape) else {
            return;
        };
        let end_bounds = shape.bounds();
        if end_bounds == gesture.start_bounds {
            return;
        }
        let action = if gesture.region.is_edge() {
            UndoAction::ShapeResized {
                id: gesture.shape,
                old_bounds: gesture.start_bounds,
                new_bounds: end_bounds,
            }
        } else {
            UndoAction::ShapeMoved {
                id: gesture.shape,
                old_top_left: (gesture.start_bounds.x, gesture.start_bounds.y),
                new_top_left: (end_bounds.x, end_bounds.y),
            }
        };
        self.undo_history.push_action(action);
        self.file.has_unsaved_changes = true;
    }

    /// Draws the canvas area and runs all canvas interactions for the frame.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());

        // Initialize canvas to center the origin on first frame
        if self.canvas.offset == egui::Vec2::ZERO && self.shape_counter == 0 {
            let canvas_center = response.rect.center();
            self.canvas.offset = canvas_center.to_vec2();
        }

        // Handle canvas panning with middle mouse button or Ctrl+drag
        self.handle_canvas_panning(ui, &response);

        // Handle scroll wheel zooming
        self.handle_canvas_zoom(ui, &response);

        // Hover-only cursor hints (never mutates shapes)
        self.update_hover_cursor(ui, &response);

        // Drag state machine: select, move, resize
        self.handle_shape_interaction(ui, &response);

        // Labels re-measure before painting so their bounds track the text
        self.sync_label_bounds(&painter);

        // Render background image and all shapes
        self.render_document(ui.ctx(), &painter, response.rect);
    }
}
