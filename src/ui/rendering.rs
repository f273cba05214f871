//! Canvas rendering for the background image and annotation shapes.
//!
//! Shapes paint with a painter's algorithm: background-layer roots first,
//! then foreground-layer roots; each shape draws its own fill and stroke and
//! then its children, depth-first pre-order, so innermost children end up on
//! top of their parents.

use super::state::AnnotationApp;
use crate::shapes::{Shape, ShapeKind};
use crate::types::{color32, FillMode, Layer, ShapeId};
use eframe::egui;
use eframe::epaint::StrokeKind;

impl AnnotationApp {
    /// Renders the whole document: background raster first, then all root
    /// shapes in layer and z order.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context, used for lazy texture upload
    /// * `painter` - The egui painter for drawing operations
    /// * `canvas_rect` - The screen-space rectangle of the canvas area
    pub fn render_document(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        canvas_rect: egui::Rect,
    ) {
        self.refresh_background_texture(ctx);

        if let Some(texture) = &self.background_texture {
            let size = texture.size_vec2() * self.canvas.zoom_factor;
            let origin = self.world_to_screen(egui::pos2(0.0, 0.0));
            let image_rect = egui::Rect::from_min_size(origin, size);
            if image_rect.intersects(canvas_rect) {
                painter.image(
                    texture.id(),
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
        }

        for layer in [Layer::Background, Layer::Foreground] {
            for id in self.document.shapes.roots.clone() {
                let in_layer = self
                    .document
                    .shapes
                    .get(&id)
                    .is_some_and(|s| s.layer == layer);
                if in_layer {
                    self.draw_shape(painter, id);
                }
            }
        }
    }

    /// Rebuilds the background texture after the image bytes changed.
    ///
    /// A buffer that fails to decode simply leaves the background blank; the
    /// document itself is untouched and keeps round-tripping the bytes.
    fn refresh_background_texture(&mut self, ctx: &egui::Context) {
        if !self.background_dirty {
            return;
        }
        self.background_dirty = false;
        self.background_texture = None;
        if let Some(data) = &self.document.background {
            match data.decode() {
                Some(image) => {
                    self.background_texture = Some(ctx.load_texture(
                        "background",
                        image,
                        egui::TextureOptions::LINEAR,
                    ));
                }
                None => {
                    eprintln!("Background image could not be decoded; skipping it");
                }
            }
        }
    }

    /// Re-measures every label's text and writes the measured size back into
    /// its bounds. Measurement always wins over user resizes.
    pub fn sync_label_bounds(&mut self, painter: &egui::Painter) {
        let mut measured: Vec<(ShapeId, egui::Vec2)> = Vec::new();
        for (id, shape) in &self.document.shapes.shapes {
            if let ShapeKind::Label {
                text,
                font,
                font_color,
            } = &shape.kind
            {
                let mut job = egui::text::LayoutJob::default();
                job.append(text, 0.0, font.text_format(color32(*font_color), 1.0));
                let galley = painter.layout_job(job);
                measured.push((*id, galley.size()));
            }
        }
        for (id, size) in measured {
            if let Some(shape) = self.document.shapes.get_mut(&id) {
                shape.set_derived_size(size.x, size.y);
            }
        }
    }

    /// Draws one shape and, after it, its children.
    ///
    /// Degenerate (zero-area) shapes are skipped entirely, children included.
    fn draw_shape(&self, painter: &egui::Painter, id: ShapeId) {
        let Some(shape) = self.document.shapes.get(&id) else {
            return;
        };
        let bounds = shape.bounds();
        if bounds.is_degenerate() {
            return;
        }
        let rect = self.world_bounds_to_screen(bounds);
        let zoom = self.canvas.zoom_factor;

        match &shape.kind {
            ShapeKind::Rectangle => {
                self.fill_and_stroke_rect(painter, shape, rect);
            }
            ShapeKind::Ellipse => {
                let fill = if shape.fill_mode == FillMode::Solid {
                    self.fill_color_of(shape)
                } else {
                    egui::Color32::TRANSPARENT
                };
                painter.add(egui::Shape::Ellipse(egui::epaint::EllipseShape {
                    center: rect.center(),
                    radius: rect.size() / 2.0,
                    fill,
                    stroke: self.frame_stroke_of(shape),
                }));
            }
            ShapeKind::Label {
                text,
                font,
                font_color,
            } => {
                // Labels are rectangles underneath; most are transparent and
                // frameless, but fill and frame still honor the shape style
                self.fill_and_stroke_rect(painter, shape, rect);
                let color = color32(*font_color);
                let mut job = egui::text::LayoutJob::default();
                job.append(text, 0.0, font.text_format(color, zoom));
                let galley = painter.layout_job(job);
                painter.galley(rect.min, galley, color);
            }
            ShapeKind::Curve {
                line_width,
                line_color,
                selected_line_color,
                line_opacity,
                ..
            } => {
                if let Some(path) = shape.curve_path() {
                    let points: Vec<egui::Pos2> =
                        path.into_iter().map(|p| self.world_to_screen(p)).collect();
                    let color = if shape.selected {
                        color32(*selected_line_color)
                    } else {
                        let c = *line_color;
                        egui::Color32::from_rgba_unmultiplied(c[0], c[1], c[2], *line_opacity)
                    };
                    if *line_width > 0.0 && points.len() > 1 {
                        painter.add(egui::Shape::line(
                            points,
                            egui::Stroke::new(line_width * zoom, color),
                        ));
                    }
                }
            }
        }

        for child in &shape.children {
            self.draw_shape(painter, *child);
        }
    }

    /// Fills and strokes a rectangular frame according to the shape style.
    fn fill_and_stroke_rect(
        &self,
        painter: &egui::Painter,
        shape: &Shape,
        rect: egui::Rect,
    ) {
        if shape.fill_mode == FillMode::Solid {
            painter.rect_filled(rect, 0.0, self.fill_color_of(shape));
        }
        let stroke = self.frame_stroke_of(shape);
        if stroke != egui::Stroke::NONE {
            painter.rect_stroke(rect, 0.0, stroke, StrokeKind::Inside);
        }
    }

    /// The interior fill color: the fill RGB at the shape's opacity level.
    fn fill_color_of(&self, shape: &Shape) -> egui::Color32 {
        let c = shape.fill_color;
        egui::Color32::from_rgba_unmultiplied(c[0], c[1], c[2], shape.opacity)
    }

    /// The contour stroke: frame color (selection-aware) at the frame width.
    /// Frameless shapes still get a thin outline while selected.
    fn frame_stroke_of(&self, shape: &Shape) -> egui::Stroke {
        let color = color32(if shape.selected {
            shape.selected_frame_color
        } else {
            shape.frame_color
        });
        if shape.frame_width > 0.0 {
            egui::Stroke::new(shape.frame_width * self.canvas.zoom_factor, color)
        } else if shape.selected {
            egui::Stroke::new(1.0, color)
        } else {
            egui::Stroke::NONE
        }
    }
}
