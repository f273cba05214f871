fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    // Run the annotation application
    annotation_tool::run_app()
}
