//! Annotation shape model: contours, containment, hit-region classification,
//! and the arena-backed composite shape tree.
//!
//! Shapes are owned by an [`AnnotationSet`] arena and referenced by id. A
//! parent stores its children as an ordered id list and each child keeps a
//! non-owning id back-reference; both directions are kept consistent by every
//! structural mutation. Moving a shape offsets its whole subtree by the same
//! delta, applied depth-first exactly once.

use crate::constants;
use crate::types::{FillMode, FontSpec, ImageData, Layer, Region, ShapeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Axis-aligned shape bounds: corner position plus size, in logical units.
///
/// `width` and `height` are never negative. Zero-area bounds are valid but
/// the shape is neither drawn nor hit-testable while degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Horizontal extent, `>= 0`
    pub width: f32,
    /// Vertical extent, `>= 0`
    pub height: f32,
}

impl Bounds {
    /// Creates bounds from a corner and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// The right edge coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// The bottom edge coordinate.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// The midpoint of the bounds.
    pub fn center(&self) -> egui::Pos2 {
        egui::pos2(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The corner the bounds are anchored at.
    pub fn top_left(&self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }

    /// Converts to an egui rectangle.
    pub fn to_rect(&self) -> egui::Rect {
        egui::Rect::from_min_size(self.top_left(), egui::vec2(self.width, self.height))
    }

    /// True if either extent is zero.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// The concrete contour of a shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Ellipse inscribed in the bounds
    Ellipse,
    /// Rectangle equal to the bounds
    Rectangle,
    /// Auto-sized text; bounds follow the measured text
    Label {
        /// The displayed text
        text: String,
        /// Portable font description
        font: FontSpec,
        /// Text color
        font_color: [u8; 4],
    },
    /// Smoothed open path through an ordered point sequence; bounds are the
    /// points' axis-aligned extent and may not be set
    Curve {
        /// Ordered control points in logical units
        points: Vec<(f32, f32)>,
        /// Stroke width of the curve line
        line_width: f32,
        /// Stroke color
        line_color: [u8; 4],
        /// Stroke color while selected
        selected_line_color: [u8; 4],
        /// Stroke opacity, 0..=255
        line_opacity: u8,
    },
}

/// A user-manipulable overlay region with a contour, styling, and optional
/// child shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    /// Unique shape identity, also the arena key
    pub id: ShapeId,
    /// User-visible name
    pub name: String,
    /// The contour kind and kind-specific data
    pub kind: ShapeKind,
    bounds: Bounds,
    /// Immovable and non-resizable from user input when set
    pub locked: bool,
    /// Width/height are derived and external resize requests are ignored
    pub fixed_size: bool,
    /// Paint/selection order hint
    pub layer: Layer,
    /// Affects stroke color only, not geometry
    #[serde(skip)]
    pub selected: bool,
    /// Non-owning back-reference to the parent, rebuilt after deserialization
    #[serde(skip)]
    pub parent: Option<ShapeId>,
    /// Ordered child shape ids, owned top-down through the arena
    pub children: Vec<ShapeId>,
    /// Interior fill style
    pub fill_mode: FillMode,
    /// Interior fill color
    pub fill_color: [u8; 4],
    /// Contour stroke color
    pub frame_color: [u8; 4],
    /// Contour stroke color while selected
    pub selected_frame_color: [u8; 4],
    /// Contour stroke width in logical units
    pub frame_width: f32,
    /// Fill opacity, 0..=255
    pub opacity: u8,
}

impl Shape {
    /// Creates a shape of the given kind with default unit bounds.
    ///
    /// Labels start fixed-size, transparent and frameless with bounds derived
    /// from their text; curves start locked.
    pub fn new(kind: ShapeKind) -> Self {
        let is_label = matches!(kind, ShapeKind::Label { .. });
        let is_curve = matches!(kind, ShapeKind::Curve { .. });
        let mut shape = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            kind,
            bounds: Bounds::new(0.0, 0.0, 1.0, 1.0),
            locked: is_curve,
            fixed_size: is_label,
            layer: Layer::Background,
            selected: false,
            parent: None,
            children: Vec::new(),
            fill_mode: FillMode::Solid,
            fill_color: [240, 248, 255, 255],
            frame_color: [100, 149, 237, 255],
            selected_frame_color: [255, 0, 0, 255],
            frame_width: if is_label { 0.0 } else { 1.0 },
            opacity: if is_label { 0 } else { 100 },
        };
        if let ShapeKind::Label { text, font, .. } = &shape.kind {
            let (w, h) = font.estimate_size(text);
            shape.bounds.width = w;
            shape.bounds.height = h;
        }
        shape
    }

    /// Creates a rectangle shape covering `bounds`.
    pub fn rectangle(bounds: Bounds) -> Self {
        let mut shape = Self::new(ShapeKind::Rectangle);
        shape.bounds = bounds;
        shape
    }

    /// Creates an ellipse shape inscribed in `bounds`.
    pub fn ellipse(bounds: Bounds) -> Self {
        let mut shape = Self::new(ShapeKind::Ellipse);
        shape.bounds = bounds;
        shape
    }

    /// Creates an auto-sized label shape.
    pub fn label(text: &str) -> Self {
        Self::new(ShapeKind::Label {
            text: text.to_string(),
            font: FontSpec::default(),
            font_color: [0, 0, 0, 255],
        })
    }

    /// Creates a curve shape through the given control points.
    pub fn curve(points: Vec<(f32, f32)>) -> Self {
        Self::new(ShapeKind::Curve {
            points,
            line_width: 1.0,
            line_color: [240, 248, 255, 255],
            selected_line_color: [255, 0, 0, 255],
            line_opacity: 255,
        })
    }

    /// True for shapes with a well-defined closed contour (everything except
    /// curves). Only framed shapes can be resized.
    pub fn is_framed(&self) -> bool {
        !matches!(self.kind, ShapeKind::Curve { .. })
    }

    /// The shape's bounds.
    ///
    /// For curve shapes this is computed as the control points' axis-aligned
    /// extent; for all other kinds it is the stored rectangle.
    pub fn bounds(&self) -> Bounds {
        match &self.kind {
            ShapeKind::Curve { points, .. } => curve_extent(points),
            _ => self.bounds,
        }
    }

    /// Replaces the bounds. A no-op for curve shapes, whose bounds are
    /// derived; for fixed-size shapes only the position is applied.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        if !self.is_framed() {
            return;
        }
        if self.fixed_size {
            self.bounds.x = bounds.x;
            self.bounds.y = bounds.y;
            return;
        }
        self.bounds = Bounds::new(bounds.x, bounds.y, bounds.width, bounds.height);
    }

    /// Sets the left edge. No-op for curve shapes.
    pub fn set_x(&mut self, x: f32) {
        if self.is_framed() {
            self.bounds.x = x;
        }
    }

    /// Sets the top edge. No-op for curve shapes.
    pub fn set_y(&mut self, y: f32) {
        if self.is_framed() {
            self.bounds.y = y;
        }
    }

    /// Sets the width. No-op for curve and fixed-size shapes.
    pub fn set_width(&mut self, width: f32) {
        if self.is_framed() && !self.fixed_size {
            self.bounds.width = width.max(0.0);
        }
    }

    /// Sets the height. No-op for curve and fixed-size shapes.
    pub fn set_height(&mut self, height: f32) {
        if self.is_framed() && !self.fixed_size {
            self.bounds.height = height.max(0.0);
        }
    }

    /// The midpoint of the bounds.
    pub fn center(&self) -> egui::Pos2 {
        self.bounds().center()
    }

    /// Replaces a label's text and re-derives its bounds from the new text.
    /// No-op for other kinds.
    pub fn set_label_text(&mut self, new_text: impl Into<String>) {
        if let ShapeKind::Label { text, font, .. } = &mut self.kind {
            *text = new_text.into();
            let (w, h) = font.estimate_size(text);
            self.bounds.width = w;
            self.bounds.height = h;
        }
    }

    /// Writes a measured size straight into the bounds, bypassing the
    /// fixed-size policy. Measurement always wins over user resizes.
    pub(crate) fn set_derived_size(&mut self, width: f32, height: f32) {
        self.bounds.width = width.max(0.0);
        self.bounds.height = height.max(0.0);
    }

    /// Offsets the shape by `delta`. Curves move their control points; the
    /// derived bounds follow.
    pub(crate) fn offset(&mut self, delta: egui::Vec2) {
        match &mut self.kind {
            ShapeKind::Curve { points, .. } => {
                for point in points {
                    point.0 += delta.x;
                    point.1 += delta.y;
                }
            }
            _ => {
                self.bounds.x += delta.x;
                self.bounds.y += delta.y;
            }
        }
    }

    /// True iff `point` lies within the filled region of the shape's contour.
    ///
    /// Degenerate shapes contain nothing.
    pub fn contains_point(&self, point: egui::Pos2) -> bool {
        let b = self.bounds();
        if b.is_degenerate() {
            return false;
        }
        match &self.kind {
            ShapeKind::Rectangle | ShapeKind::Label { .. } => b.to_rect().contains(point),
            ShapeKind::Ellipse => {
                let c = b.center();
                let rx = b.width / 2.0;
                let ry = b.height / 2.0;
                let nx = (point.x - c.x) / rx;
                let ny = (point.y - c.y) / ry;
                nx * nx + ny * ny <= 1.0
            }
            ShapeKind::Curve { points, .. } => {
                let polygon = flatten_curve(points);
                point_in_polygon(point, &polygon)
            }
        }
    }

    /// Classifies `point` against the shape: outside, on an edge band, or in
    /// a body quadrant.
    ///
    /// The classification is angle-based rather than nearest-edge-based so it
    /// tolerates non-rectangular contours: edge membership is approximated
    /// through the corner-angle wedges of the bounding rectangle. The angle
    /// convention treats the vertical axis as flipped, so the "top" corner
    /// angles are measured to the larger-y corners; for axis-aligned frames
    /// the wedge boundaries are unchanged and the edge names still pair with
    /// the resize rules that act on them.
    ///
    /// Curve shapes only report [`Region::Body`] or [`Region::None`]; they
    /// can be moved but never resized.
    pub fn hit_region(&self, point: egui::Pos2) -> Region {
        if !self.contains_point(point) {
            return Region::None;
        }
        if !self.is_framed() {
            return Region::Body;
        }

        let b = self.bounds();
        let c = b.center();
        let angle = angle_of(c, point);
        let top_left = angle_of(c, egui::pos2(b.x, b.bottom()));
        let top_right = angle_of(c, egui::pos2(b.right(), b.bottom()));
        let bottom_left = angle_of(c, egui::pos2(b.x, b.y));
        let bottom_right = angle_of(c, egui::pos2(b.right(), b.y));

        if self.on_frame_band(point) {
            if (angle > 0.0 && angle < top_right) || (angle <= 0.0 && angle > bottom_right) {
                Region::EdgeRight
            } else if angle >= top_left || angle <= bottom_left {
                Region::EdgeLeft
            } else if angle >= top_right && angle < top_left {
                Region::EdgeBottom
            } else {
                Region::EdgeTop
            }
        } else if angle.abs() < 45.0 {
            Region::BodyRight
        } else if angle.abs() > 135.0 {
            Region::BodyLeft
        } else if (45.0..=135.0).contains(&angle) {
            Region::BodyBottom
        } else {
            Region::BodyTop
        }
    }

    /// True if `point` lies within the resize band around the contour
    /// outline. The band is a stroke of width `max(EDGE_BAND_WIDTH,
    /// frame_width)` centered on the outline, collapsed to one unit for
    /// fixed-size shapes.
    fn on_frame_band(&self, point: egui::Pos2) -> bool {
        let band = if self.fixed_size {
            constants::FIXED_SIZE_BAND_WIDTH
        } else {
            self.frame_width.max(constants::EDGE_BAND_WIDTH)
        };
        let half = band / 2.0;
        let b = self.bounds();
        match &self.kind {
            ShapeKind::Rectangle | ShapeKind::Label { .. } => {
                let rect = b.to_rect();
                rect.expand(half).contains(point) && !rect.shrink(half).contains(point)
            }
            ShapeKind::Ellipse => {
                let c = b.center();
                let rx = b.width / 2.0;
                let ry = b.height / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let nx = (point.x - c.x) / rx;
                let ny = (point.y - c.y) / ry;
                let distance = (nx * nx + ny * ny).sqrt();
                let ring = half / rx.min(ry);
                (1.0 - ring) <= distance && distance <= (1.0 + ring)
            }
            ShapeKind::Curve { .. } => false,
        }
    }

    /// The flattened render path of a curve shape, or `None` for framed
    /// kinds.
    pub fn curve_path(&self) -> Option<Vec<egui::Pos2>> {
        match &self.kind {
            ShapeKind::Curve { points, .. } => Some(flatten_curve(points)),
            _ => None,
        }
    }
}

/// Angle in degrees of `point` around `center`: range `(-180, 180]`, 0°
/// pointing right.
fn angle_of(center: egui::Pos2, point: egui::Pos2) -> f32 {
    (point.y - center.y)
        .atan2(point.x - center.x)
        .to_degrees()
}

/// Axis-aligned extent of a control-point sequence.
fn curve_extent(points: &[(f32, f32)]) -> Bounds {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return Bounds::new(0.0, 0.0, 0.0, 0.0);
    };
    let (mut min_x, mut min_y) = *first;
    let (mut max_x, mut max_y) = *first;
    for (x, y) in iter {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

/// Flattens a control-point sequence into a polyline by sampling a cardinal
/// spline through the points.
fn flatten_curve(points: &[(f32, f32)]) -> Vec<egui::Pos2> {
    let n = points.len();
    if n < 2 {
        return points.iter().map(|(x, y)| egui::pos2(*x, *y)).collect();
    }
    let at = |i: isize| -> egui::Vec2 {
        let i = i.clamp(0, n as isize - 1) as usize;
        egui::vec2(points[i].0, points[i].1)
    };
    let samples = constants::CURVE_SAMPLES_PER_SEGMENT;
    let mut out = Vec::with_capacity((n - 1) * samples + 1);
    for i in 0..n - 1 {
        let p0 = at(i as isize - 1);
        let p1 = at(i as isize);
        let p2 = at(i as isize + 1);
        let p3 = at(i as isize + 2);
        for step in 0..samples {
            let t = step as f32 / samples as f32;
            let t2 = t * t;
            let t3 = t2 * t;
            let v = 0.5
                * (2.0 * p1
                    + (p2 - p0) * t
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
                    + (3.0 * p1 - 3.0 * p2 + p3 - p0) * t3);
            out.push(v.to_pos2());
        }
    }
    out.push(at(n as isize - 1).to_pos2());
    out
}

/// Even-odd containment test of `point` against the polygon obtained by
/// closing `polygon` from its last point back to its first.
fn point_in_polygon(point: egui::Pos2, polygon: &[egui::Pos2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let crossing_x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// A removed subtree together with where it was attached, so it can be
/// restored by undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedSubtree {
    /// The removed shapes in pre-order; the first entry is the subtree root
    pub shapes: Vec<Shape>,
    /// The id of the parent the root was detached from, if any
    pub parent: Option<ShapeId>,
    /// The root-list index the root was removed from, if it was a top-level
    /// shape
    pub root_index: Option<usize>,
}

/// Flat arena of all shapes plus the z-ordered list of top-level roots.
///
/// Children are reached only through their parent and are never listed at top
/// level. Roots are painted back-to-front in list order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationSet {
    /// All shapes, indexed by id
    pub shapes: HashMap<ShapeId, Shape>,
    /// Top-level shape ids in paint order (back to front)
    pub roots: Vec<ShapeId>,
}

impl AnnotationSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shapes in the arena, including children.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// True if the arena holds no shapes.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Borrows a shape by id.
    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Mutably borrows a shape by id.
    pub fn get_mut(&mut self, id: &ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(id)
    }

    /// Inserts a shape as a new topmost root and returns its id.
    pub fn insert_root(&mut self, mut shape: Shape) -> ShapeId {
        shape.parent = None;
        let id = shape.id;
        self.shapes.insert(id, shape);
        self.roots.push(id);
        id
    }

    /// Inserts `child` under `parent`, wiring both link directions.
    ///
    /// Returns the child's id, or `None` if the parent does not exist.
    pub fn add_child(&mut self, parent: ShapeId, mut child: Shape) -> Option<ShapeId> {
        if !self.shapes.contains_key(&parent) {
            return None;
        }
        let id = child.id;
        child.parent = Some(parent);
        self.shapes.insert(id, child);
        if let Some(p) = self.shapes.get_mut(&parent) {
            p.children.push(id);
        }
        Some(id)
    }

    /// Creates a label child centered inside `parent` and returns its id.
    pub fn add_label(&mut self, parent: ShapeId, text: &str) -> Option<ShapeId> {
        let parent_bounds = self.shapes.get(&parent)?.bounds();
        let mut label = Shape::label(text);
        let label_bounds = label.bounds();
        label.set_x(parent_bounds.x + (parent_bounds.width - label_bounds.width) / 2.0);
        label.set_y(parent_bounds.y + (parent_bounds.height - label_bounds.height) / 2.0);
        self.add_child(parent, label)
    }

    /// Removes a shape and its whole subtree from the arena.
    ///
    /// Detaches the subtree root from its parent's child list (or the root
    /// list) and clears its back-reference. Returns the removed subtree so
    /// the caller can restore it, or `None` if the id is unknown.
    pub fn remove(&mut self, id: ShapeId) -> Option<RemovedSubtree> {
        if !self.shapes.contains_key(&id) {
            return None;
        }
        let order = self.subtree(id);
        let parent = self.shapes.get(&id).and_then(|s| s.parent);
        let root_index = self.roots.iter().position(|r| *r == id);
        if let Some(parent_id) = parent {
            if let Some(p) = self.shapes.get_mut(&parent_id) {
                p.children.retain(|c| *c != id);
            }
        }
        self.roots.retain(|r| *r != id);
        let mut shapes = Vec::with_capacity(order.len());
        for shape_id in order {
            if let Some(mut shape) = self.shapes.remove(&shape_id) {
                if shape_id == id {
                    shape.parent = None;
                }
                shapes.push(shape);
            }
        }
        Some(RemovedSubtree {
            shapes,
            parent,
            root_index,
        })
    }

    /// Reinserts a previously removed subtree.
    ///
    /// If the original parent still exists the subtree is reattached to it;
    /// otherwise it becomes a root at its old index (clamped).
    pub fn restore(&mut self, removed: RemovedSubtree) {
        let RemovedSubtree {
            shapes,
            parent,
            root_index,
        } = removed;
        let Some(first) = shapes.first().map(|s| s.id) else {
            return;
        };
        for shape in shapes {
            self.shapes.insert(shape.id, shape);
        }
        match parent.filter(|p| self.shapes.contains_key(p)) {
            Some(parent_id) => {
                if let Some(p) = self.shapes.get_mut(&parent_id) {
                    p.children.push(first);
                }
                if let Some(c) = self.shapes.get_mut(&first) {
                    c.parent = Some(parent_id);
                }
            }
            None => {
                if let Some(c) = self.shapes.get_mut(&first) {
                    c.parent = None;
                }
                let index = root_index.unwrap_or(self.roots.len()).min(self.roots.len());
                self.roots.insert(index, first);
            }
        }
    }

    /// The ids of a shape and all its descendants, pre-order.
    pub fn subtree(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: ShapeId, out: &mut Vec<ShapeId>) {
        let Some(shape) = self.shapes.get(&id) else {
            return;
        };
        out.push(id);
        for child in &shape.children {
            self.collect_subtree(*child, out);
        }
    }

    /// Moves a shape so its bounds corner lands on `new_top_left`, offsetting
    /// every descendant by the same delta, recursively, exactly once.
    pub fn set_location(&mut self, id: ShapeId, new_top_left: egui::Pos2) {
        let Some(shape) = self.shapes.get(&id) else {
            return;
        };
        let delta = new_top_left - shape.bounds().top_left();
        if delta == egui::Vec2::ZERO {
            return;
        }
        self.offset_subtree(id, delta);
    }

    fn offset_subtree(&mut self, id: ShapeId, delta: egui::Vec2) {
        let children = match self.shapes.get(&id) {
            Some(shape) => shape.children.clone(),
            None => return,
        };
        for child in children {
            self.offset_subtree(child, delta);
        }
        if let Some(shape) = self.shapes.get_mut(&id) {
            shape.offset(delta);
        }
    }

    /// The topmost root shape at `point`, or `None`.
    ///
    /// Foreground roots are tested before background ones; within a layer,
    /// later roots (painted on top) win.
    pub fn shape_at(&self, point: egui::Pos2) -> Option<ShapeId> {
        for layer in [Layer::Foreground, Layer::Background] {
            for id in self.roots.iter().rev() {
                if let Some(shape) = self.shapes.get(id) {
                    if shape.layer == layer && shape.hit_region(point) != Region::None {
                        return Some(*id);
                    }
                }
            }
        }
        None
    }

    /// Swaps a root one step toward the front of the paint order.
    pub fn bring_forward(&mut self, id: ShapeId) {
        if let Some(i) = self.roots.iter().position(|r| *r == id) {
            if i + 1 < self.roots.len() {
                self.roots.swap(i, i + 1);
            }
        }
    }

    /// Swaps a root one step toward the back of the paint order.
    pub fn send_backward(&mut self, id: ShapeId) {
        if let Some(i) = self.roots.iter().position(|r| *r == id) {
            if i > 0 {
                self.roots.swap(i, i - 1);
            }
        }
    }

    /// Moves a root to the front of the paint order.
    pub fn bring_to_front(&mut self, id: ShapeId) {
        if let Some(i) = self.roots.iter().position(|r| *r == id) {
            let id = self.roots.remove(i);
            self.roots.push(id);
        }
    }

    /// Moves a root to the back of the paint order.
    pub fn send_to_back(&mut self, id: ShapeId) {
        if let Some(i) = self.roots.iter().position(|r| *r == id) {
            let id = self.roots.remove(i);
            self.roots.insert(0, id);
        }
    }

    /// Rebuilds every parent back-reference from the children lists.
    /// Required once after deserialization; the back-references themselves
    /// are not persisted.
    pub fn fix_links(&mut self) {
        let pairs: Vec<(ShapeId, Vec<ShapeId>)> = self
            .shapes
            .iter()
            .map(|(id, shape)| (*id, shape.children.clone()))
            .collect();
        for (parent, children) in pairs {
            for child in children {
                if let Some(shape) = self.shapes.get_mut(&child) {
                    shape.parent = Some(parent);
                }
            }
        }
    }

    /// Marks at most one shape as selected, clearing every other flag.
    pub fn set_selected(&mut self, id: Option<ShapeId>) {
        for shape in self.shapes.values_mut() {
            shape.selected = Some(shape.id) == id;
        }
    }
}

/// The persisted document: the annotation shapes plus an optional background
/// raster (typically a rendered graph snapshot the annotations sit on).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// All annotation shapes
    pub shapes: AnnotationSet,
    /// Optional background image underneath the annotations
    pub background: Option<ImageData>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the document to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a document from JSON and rebuilds the parent links.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut document: Self = serde_json::from_str(json)?;
        document.shapes.fix_links();
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rect() -> Shape {
        Shape::rectangle(Bounds::new(0.0, 0.0, 100.0, 50.0))
    }

    #[test]
    fn new_shape_has_unit_bounds() {
        let shape = Shape::new(ShapeKind::Rectangle);
        assert_eq!(shape.bounds(), Bounds::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn rectangle_near_right_edge_classifies_edge_right() {
        let shape = test_rect();
        assert_eq!(shape.hit_region(egui::pos2(98.0, 25.0)), Region::EdgeRight);
    }

    #[test]
    fn rectangle_near_left_edge_classifies_edge_left() {
        let shape = test_rect();
        assert_eq!(shape.hit_region(egui::pos2(2.0, 25.0)), Region::EdgeLeft);
    }

    #[test]
    fn rectangle_vertical_bands_pair_with_their_resize_edges() {
        let shape = test_rect();
        // The smaller-y band resizes via EdgeTop (adjusts y and height), the
        // larger-y band via EdgeBottom (adjusts height only).
        assert_eq!(shape.hit_region(egui::pos2(50.0, 2.0)), Region::EdgeTop);
        assert_eq!(shape.hit_region(egui::pos2(50.0, 48.0)), Region::EdgeBottom);
    }

    #[test]
    fn rectangle_interior_classifies_body_quadrants() {
        let shape = test_rect();
        assert_eq!(shape.hit_region(egui::pos2(80.0, 25.0)), Region::BodyRight);
        assert_eq!(shape.hit_region(egui::pos2(20.0, 25.0)), Region::BodyLeft);
        assert_eq!(shape.hit_region(egui::pos2(50.0, 20.0)), Region::BodyTop);
        assert_eq!(shape.hit_region(egui::pos2(50.0, 30.0)), Region::BodyBottom);
    }

    #[test]
    fn rectangle_center_is_a_body_hit() {
        let shape = test_rect();
        let region = shape.hit_region(egui::pos2(50.0, 25.0));
        assert!(region.is_body());
    }

    #[test]
    fn points_outside_the_frame_classify_none() {
        let rect = test_rect();
        let ellipse = Shape::ellipse(Bounds::new(0.0, 0.0, 100.0, 50.0));
        for point in [
            egui::pos2(-1.0, 25.0),
            egui::pos2(101.0, 25.0),
            egui::pos2(50.0, -1.0),
            egui::pos2(50.0, 51.0),
            egui::pos2(500.0, 500.0),
        ] {
            assert_eq!(rect.hit_region(point), Region::None);
            assert_eq!(ellipse.hit_region(point), Region::None);
        }
    }

    #[test]
    fn ellipse_excludes_bounding_rect_corners() {
        let ellipse = Shape::ellipse(Bounds::new(0.0, 0.0, 100.0, 50.0));
        // Inside the bounding rectangle but outside the inscribed ellipse.
        assert!(!ellipse.contains_point(egui::pos2(2.0, 2.0)));
        assert_eq!(ellipse.hit_region(egui::pos2(2.0, 2.0)), Region::None);
    }

    #[test]
    fn ellipse_rim_classifies_as_edge() {
        let ellipse = Shape::ellipse(Bounds::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(ellipse.hit_region(egui::pos2(96.0, 25.0)), Region::EdgeRight);
        assert_eq!(ellipse.hit_region(egui::pos2(4.0, 25.0)), Region::EdgeLeft);
    }

    #[test]
    fn degenerate_shape_is_not_hit_testable() {
        let flat = Shape::rectangle(Bounds::new(10.0, 10.0, 0.0, 50.0));
        assert!(!flat.contains_point(egui::pos2(10.0, 20.0)));
        assert_eq!(flat.hit_region(egui::pos2(10.0, 20.0)), Region::None);
    }

    #[test]
    fn fixed_size_shape_barely_exposes_edges() {
        let mut shape = test_rect();
        shape.fixed_size = true;
        // The band collapses to one unit, so a point a couple of units inside
        // the contour is an interior hit rather than an edge hit.
        assert_eq!(shape.hit_region(egui::pos2(98.0, 25.0)), Region::BodyRight);
    }

    #[test]
    fn wide_frame_stroke_widens_the_band() {
        let mut shape = test_rect();
        shape.frame_width = 60.0;
        // Band half-width is 30, so x=35 is still on the left band.
        assert_eq!(shape.hit_region(egui::pos2(35.0, 25.0)), Region::EdgeLeft);
    }

    #[test]
    fn curve_reports_only_body_or_none() {
        let mut curve = Shape::curve(vec![(0.0, 0.0), (50.0, 30.0), (100.0, 0.0)]);
        curve.locked = false;
        assert_eq!(curve.hit_region(egui::pos2(50.0, 10.0)), Region::Body);
        assert_eq!(curve.hit_region(egui::pos2(50.0, 200.0)), Region::None);
    }

    #[test]
    fn curve_bounds_follow_control_points() {
        let curve = Shape::curve(vec![(10.0, 5.0), (60.0, 45.0), (110.0, 5.0)]);
        assert_eq!(curve.bounds(), Bounds::new(10.0, 5.0, 100.0, 40.0));
    }

    #[test]
    fn curve_bounds_setters_are_ignored() {
        let mut curve = Shape::curve(vec![(0.0, 0.0), (50.0, 30.0), (100.0, 0.0)]);
        let before = curve.bounds();
        curve.set_bounds(Bounds::new(5.0, 5.0, 10.0, 10.0));
        curve.set_x(99.0);
        curve.set_y(99.0);
        curve.set_width(99.0);
        curve.set_height(99.0);
        assert_eq!(curve.bounds(), before);
    }

    #[test]
    fn fixed_size_resize_setters_are_ignored() {
        let mut label = Shape::label("hello");
        let before = label.bounds();
        label.set_width(500.0);
        label.set_height(500.0);
        assert_eq!(label.bounds().width, before.width);
        assert_eq!(label.bounds().height, before.height);
    }

    #[test]
    fn label_bounds_follow_text() {
        let mut label = Shape::label("hi");
        let short = label.bounds().width;
        label.set_label_text("a considerably longer label text");
        assert!(label.bounds().width > short);
    }

    #[test]
    fn curve_starts_locked_and_labels_start_fixed_size() {
        assert!(Shape::curve(vec![(0.0, 0.0), (1.0, 1.0)]).locked);
        assert!(Shape::label("x").fixed_size);
    }

    #[test]
    fn add_child_wires_both_directions() {
        let mut set = AnnotationSet::new();
        let parent = set.insert_root(test_rect());
        let child = set
            .add_child(parent, Shape::rectangle(Bounds::new(10.0, 10.0, 20.0, 20.0)))
            .unwrap();
        assert_eq!(set.get(&child).unwrap().parent, Some(parent));
        assert!(set.get(&parent).unwrap().children.contains(&child));
        assert!(!set.roots.contains(&child));
    }

    #[test]
    fn add_child_to_unknown_parent_fails() {
        let mut set = AnnotationSet::new();
        let orphan = Uuid::new_v4();
        assert!(set.add_child(orphan, test_rect()).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn add_label_centers_the_child() {
        let mut set = AnnotationSet::new();
        let parent = set.insert_root(test_rect());
        let label = set.add_label(parent, "title").unwrap();
        let parent_center = set.get(&parent).unwrap().center();
        let label_center = set.get(&label).unwrap().center();
        assert!((parent_center.x - label_center.x).abs() < 0.5);
        assert!((parent_center.y - label_center.y).abs() < 0.5);
    }

    #[test]
    fn moving_a_parent_offsets_descendants_exactly_once() {
        let mut set = AnnotationSet::new();
        let root = set.insert_root(Shape::rectangle(Bounds::new(0.0, 0.0, 100.0, 100.0)));
        let child = set
            .add_child(root, Shape::rectangle(Bounds::new(10.0, 10.0, 30.0, 30.0)))
            .unwrap();
        let grandchild = set
            .add_child(child, Shape::rectangle(Bounds::new(12.0, 12.0, 5.0, 5.0)))
            .unwrap();

        set.set_location(root, egui::pos2(50.0, -20.0));

        let root_bounds = set.get(&root).unwrap().bounds();
        let child_bounds = set.get(&child).unwrap().bounds();
        let grandchild_bounds = set.get(&grandchild).unwrap().bounds();
        assert_eq!((root_bounds.x, root_bounds.y), (50.0, -20.0));
        assert_eq!((child_bounds.x, child_bounds.y), (60.0, -10.0));
        assert_eq!((grandchild_bounds.x, grandchild_bounds.y), (62.0, -8.0));
        // Sizes are untouched by moves.
        assert_eq!(child_bounds.width, 30.0);
        assert_eq!(grandchild_bounds.width, 5.0);
    }

    #[test]
    fn moving_a_parent_moves_curve_children() {
        let mut set = AnnotationSet::new();
        let root = set.insert_root(Shape::rectangle(Bounds::new(0.0, 0.0, 100.0, 100.0)));
        let curve = set
            .add_child(root, Shape::curve(vec![(0.0, 0.0), (50.0, 30.0), (100.0, 0.0)]))
            .unwrap();

        set.set_location(root, egui::pos2(10.0, 10.0));

        let curve_bounds = set.get(&curve).unwrap().bounds();
        assert_eq!((curve_bounds.x, curve_bounds.y), (10.0, 10.0));
    }

    #[test]
    fn remove_drops_the_whole_subtree() {
        let mut set = AnnotationSet::new();
        let root = set.insert_root(test_rect());
        let child = set
            .add_child(root, Shape::rectangle(Bounds::new(1.0, 1.0, 2.0, 2.0)))
            .unwrap();
        let grandchild = set
            .add_child(child, Shape::rectangle(Bounds::new(1.0, 1.0, 1.0, 1.0)))
            .unwrap();

        let removed = set.remove(root).unwrap();

        assert!(set.is_empty());
        assert!(set.roots.is_empty());
        assert_eq!(removed.shapes.len(), 3);
        assert_eq!(removed.shapes[0].id, root);
        assert!(removed.shapes.iter().any(|s| s.id == grandchild));
    }

    #[test]
    fn remove_child_clears_the_back_reference() {
        let mut set = AnnotationSet::new();
        let root = set.insert_root(test_rect());
        let child = set
            .add_child(root, Shape::rectangle(Bounds::new(1.0, 1.0, 2.0, 2.0)))
            .unwrap();

        let removed = set.remove(child).unwrap();

        assert!(set.get(&root).unwrap().children.is_empty());
        assert_eq!(removed.shapes[0].parent, None);
        assert_eq!(removed.parent, Some(root));
    }

    #[test]
    fn restore_reattaches_a_removed_child() {
        let mut set = AnnotationSet::new();
        let root = set.insert_root(test_rect());
        let child = set
            .add_child(root, Shape::rectangle(Bounds::new(1.0, 1.0, 2.0, 2.0)))
            .unwrap();
        let removed = set.remove(child).unwrap();

        set.restore(removed);

        assert_eq!(set.get(&child).unwrap().parent, Some(root));
        assert!(set.get(&root).unwrap().children.contains(&child));
    }

    #[test]
    fn restore_falls_back_to_root_when_parent_is_gone() {
        let mut set = AnnotationSet::new();
        let root = set.insert_root(test_rect());
        let child = set
            .add_child(root, Shape::rectangle(Bounds::new(1.0, 1.0, 2.0, 2.0)))
            .unwrap();
        let removed_child = set.remove(child).unwrap();
        set.remove(root);

        set.restore(removed_child);

        assert_eq!(set.get(&child).unwrap().parent, None);
        assert!(set.roots.contains(&child));
    }

    #[test]
    fn restore_puts_a_root_back_at_its_old_index() {
        let mut set = AnnotationSet::new();
        let a = set.insert_root(test_rect());
        let b = set.insert_root(test_rect());
        let c = set.insert_root(test_rect());
        let removed = set.remove(b).unwrap();

        set.restore(removed);

        assert_eq!(set.roots, vec![a, b, c]);
    }

    #[test]
    fn z_order_ops_only_permute_roots() {
        let mut set = AnnotationSet::new();
        let a = set.insert_root(test_rect());
        let b = set.insert_root(test_rect());
        let c = set.insert_root(test_rect());

        set.bring_forward(a);
        assert_eq!(set.roots, vec![b, a, c]);
        set.send_backward(c);
        assert_eq!(set.roots, vec![b, c, a]);
        set.bring_to_front(b);
        assert_eq!(set.roots, vec![c, a, b]);
        set.send_to_back(a);
        assert_eq!(set.roots, vec![a, c, b]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn shape_at_prefers_topmost_and_foreground() {
        let mut set = AnnotationSet::new();
        let below = set.insert_root(test_rect());
        let above = set.insert_root(test_rect());
        assert_eq!(set.shape_at(egui::pos2(50.0, 25.0)), Some(above));

        if let Some(shape) = set.get_mut(&below) {
            shape.layer = Layer::Foreground;
        }
        assert_eq!(set.shape_at(egui::pos2(50.0, 25.0)), Some(below));
    }

    #[test]
    fn shape_at_misses_empty_space() {
        let mut set = AnnotationSet::new();
        set.insert_root(test_rect());
        assert_eq!(set.shape_at(egui::pos2(500.0, 500.0)), None);
    }

    #[test]
    fn fix_links_rebuilds_parents_after_roundtrip() {
        let mut set = AnnotationSet::new();
        let root = set.insert_root(test_rect());
        let child = set
            .add_child(root, Shape::rectangle(Bounds::new(1.0, 1.0, 2.0, 2.0)))
            .unwrap();

        let document = Document {
            shapes: set,
            background: None,
        };
        let json = document.to_json().unwrap();
        let restored = Document::from_json(&json).unwrap();

        assert_eq!(restored.shapes.get(&child).unwrap().parent, Some(root));
        assert!(restored.shapes.get(&root).unwrap().children.contains(&child));
    }

    #[test]
    fn document_roundtrip_preserves_bounds_and_roots() {
        let mut document = Document::new();
        let id = document
            .shapes
            .insert_root(Shape::ellipse(Bounds::new(5.0, 6.0, 70.0, 40.0)));

        let json = document.to_json().unwrap();
        let restored = Document::from_json(&json).unwrap();

        assert_eq!(restored.shapes.roots, vec![id]);
        assert_eq!(
            restored.shapes.get(&id).unwrap().bounds(),
            Bounds::new(5.0, 6.0, 70.0, 40.0)
        );
    }

    #[test]
    fn set_selected_marks_exactly_one_shape() {
        let mut set = AnnotationSet::new();
        let a = set.insert_root(test_rect());
        let b = set.insert_root(test_rect());

        set.set_selected(Some(b));
        assert!(!set.get(&a).unwrap().selected);
        assert!(set.get(&b).unwrap().selected);

        set.set_selected(None);
        assert!(!set.get(&b).unwrap().selected);
    }
}
