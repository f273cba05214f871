//! # Annotation Tool
//!
//! An overlay annotation editor for rendered graph images: place ellipses,
//! rectangles, labels and curves on top of a background raster, then select,
//! move and resize them interactively.
//!
//! ## Features
//! - Angle-based hit-region classification (edge bands vs. body quadrants)
//! - Pointer-driven move/resize with per-axis minimum-extent clamping
//! - Parent/child shape trees with recursive move propagation
//! - Canvas panning and zooming
//! - Shape property editing, layering and z-order control
//! - JSON persistence with portable font and image descriptions

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod constants;
mod shapes;
mod types;
mod ui;

// Re-export public types and functions
pub use shapes::*;
pub use types::*;
use ui::AnnotationApp;

/// Runs the annotation application with default settings.
///
/// This function initializes the egui application window and starts the main
/// event loop. File dialogs run on a tokio runtime owned by this call.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an
/// `eframe::Error` if initialization fails.
///
/// # Example
///
/// ```no_run
/// use annotation_tool::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start the async runtime for file dialogs");
    let _guard = runtime.enter();

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Annotation Tool",
        options,
        Box::new(|cc| {
            let app = cc
                .storage
                .and_then(|storage| storage.get_string("app_state"))
                .and_then(|json| AnnotationApp::from_json(&json).ok())
                .unwrap_or_default();
            Ok(Box::new(app))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_default() {
        let document = Document::default();
        assert!(document.shapes.is_empty());
        assert!(document.background.is_none());
    }

    #[test]
    fn test_shape_creation() {
        let shape = Shape::rectangle(Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert!(!shape.locked);
        assert!(!shape.fixed_size);
        assert!(matches!(shape.layer, Layer::Background));
    }
}
