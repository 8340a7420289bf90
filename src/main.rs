// src/main.rs
use anyhow::anyhow;
use eframe::egui;
use gesture_globe::app::GlobeApp;
use gesture_globe::config::{GlobeConfig, SourceKind};
use gesture_globe::video::list_cameras;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GlobeConfig::load();

    if config.capture.source == SourceKind::Camera {
        match list_cameras() {
            Ok(cameras) => {
                info!("found {} camera(s)", cameras.len());
                for (i, name) in cameras.iter().enumerate() {
                    info!("  [{i}] {name}");
                }
            }
            Err(e) => warn!("failed to query cameras: {e}"),
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Gesture Globe")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0]),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        "Gesture Globe",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(GlobeApp::new(cc, config))
        }),
    )
    .map_err(|e| anyhow!("Error running application: {e}"))
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.panel_fill = egui::Color32::from_rgb(1, 1, 1);
    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(20, 20, 24);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(35, 35, 42);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(55, 55, 68);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(79, 70, 229);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);

    visuals
}
