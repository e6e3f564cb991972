mod app;
mod model;

fn main() -> eframe::Result<()> {
    env_logger::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Nexus Board",
        native_options,
        Box::new(|cc| Ok(Box::new(app::NexusApp::new(cc)))),
    )
}
