//! Shared application-wide constants.
//! Centralizes tweakable values used across shape hit-testing and interactions.

// Hit-testing
/// Width in logical units of the band around a shape's contour that counts as an edge hit.
/// A wider frame stroke widens the band: the effective band is `max(EDGE_BAND_WIDTH, frame_width)`.
pub const EDGE_BAND_WIDTH: f32 = 30.0;
/// Edge band width used for fixed-size shapes, which cannot be resized anyway.
pub const FIXED_SIZE_BAND_WIDTH: f32 = 1.0;
/// Number of interpolated samples per control-point segment when flattening curves.
pub const CURVE_SAMPLES_PER_SEGMENT: usize = 8;

// Resizing
/// Minimum width/height in logical units that an edge-resize may shrink a shape to.
/// A move that would shrink below this is rejected on the violating axis.
pub const MIN_SHAPE_EXTENT: f32 = 5.0;

// Shape creation defaults
/// Default width in logical units for shapes inserted from the toolbar.
pub const DEFAULT_SHAPE_WIDTH: f32 = 120.0;
/// Default height in logical units for shapes inserted from the toolbar.
pub const DEFAULT_SHAPE_HEIGHT: f32 = 80.0;

// Undo/redo
/// Maximum number of undo history entries to retain.
pub const MAX_UNDO_HISTORY: usize = 100;
