mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use app::MallDashApp;
use config::DashboardConfig;
use data::loader::DatasetCache;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::from_env();
    let cache = DatasetCache::new(&config.data_path, config.load_options);
    let state = AppState::from_cache(&config, &cache);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Shopping Mall Sales Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(MallDashApp::new(state)))),
    )
}
