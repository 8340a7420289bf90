// src/app.rs
use crate::config::GlobeConfig;
use crate::control::SharedControl;
use crate::data::MotionTrace;
use crate::detector::create_detector;
use crate::gallery::{GalleryLoader, ImageGallery, IngestReport, UploadCandidate};
use crate::gesture::GestureInterpreter;
use crate::motion::MotionIntegrator;
use crate::tracking::{CaptureStatus, GestureSession};
use crate::ui::{draw_indicator, GlobeView, Theme};

use eframe::egui;
use tracing::{error, info, warn};

const PREVIEW_THUMBNAILS: usize = 5;

pub struct GlobeApp {
    config: GlobeConfig,

    // Pipeline
    control: SharedControl,
    integrator: MotionIntegrator,
    session: Option<GestureSession>,
    startup_error: Option<String>,

    // Content
    gallery: ImageGallery,
    loader: GalleryLoader,
    textures: Vec<egui::TextureHandle>,
    texture_generation: u64,

    // Presentation
    view: GlobeView,
    theme: Theme,
    trace: MotionTrace,
    notice: Option<String>,
}

impl GlobeApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: GlobeConfig) -> Self {
        let control = SharedControl::new(&config.motion, &config.zoom);
        let integrator =
            MotionIntegrator::new(config.motion.clone(), config.zoom.clone(), control.clone());
        let interpreter =
            GestureInterpreter::new(config.gesture.clone(), config.zoom.clone(), control.clone());

        let detector_kind = config.capture.detector;
        let (session, startup_error) = match GestureSession::start(
            config.capture.clone(),
            interpreter,
            move || create_detector(detector_kind),
        ) {
            Ok(session) => (Some(session), None),
            Err(e) => {
                error!("failed to start gesture capture: {e:#}");
                (None, Some(format!("{e:#}")))
            }
        };

        let theme = Theme::default();
        Self {
            gallery: ImageGallery::new(),
            loader: GalleryLoader::new(),
            trace: MotionTrace::new(config.trace.capacity),
            view: GlobeView::new(theme.clone()),
            theme,
            control,
            integrator,
            session,
            startup_error,
            textures: Vec::new(),
            texture_generation: 0,
            notice: None,
            config,
        }
    }

    pub fn capture_status(&self) -> CaptureStatus {
        match (&self.session, &self.startup_error) {
            (Some(session), _) => session.status(),
            (None, Some(reason)) => CaptureStatus::Unavailable(reason.clone()),
            (None, None) => CaptureStatus::Stopped,
        }
    }

    /// Hands the batch to a decode thread; the result lands in a later frame.
    fn ingest(&mut self, batch: Vec<UploadCandidate>) {
        if batch.is_empty() {
            return;
        }
        match self.loader.submit(self.config.upload.clone(), batch) {
            Ok(()) => self.notice = Some("Loading images...".to_string()),
            Err(e) => {
                error!("failed to start image decoding: {e}");
                self.notice = Some(format!("Upload failed: {e}"));
            }
        }
    }

    fn install_loaded_images(&mut self) {
        let Some(batch) = self.loader.poll() else {
            return;
        };
        let report = self.gallery.install(batch);
        if report.replaced {
            let count = self.gallery.len();
            self.control.set_image_count(count);
            self.view.set_panel_count(count, self.config.upload.panel_radius);
        }
        self.notice = Some(describe_ingest(&report));
    }

    fn open_file_dialog(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "webp"])
            .pick_files()
        else {
            return;
        };

        let batch = paths
            .iter()
            .filter_map(|path| match UploadCandidate::from_path(path) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            })
            .collect();
        self.ingest(batch);
    }

    fn collect_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }

        let batch = dropped
            .into_iter()
            .filter_map(|file| {
                let mime = Some(file.mime);
                if let Some(bytes) = file.bytes {
                    return Some(UploadCandidate::from_bytes(file.name, mime, bytes));
                }
                let path = file.path?;
                UploadCandidate::from_path(&path)
                    .map_err(|e| warn!("{e}"))
                    .ok()
            })
            .collect();
        self.ingest(batch);
    }

    /// Re-uploads textures after the gallery has been replaced. Dropping the
    /// old handles frees their GPU memory.
    fn sync_textures(&mut self, ctx: &egui::Context) {
        if self.texture_generation == self.gallery.generation() {
            return;
        }
        self.textures = self
            .gallery
            .images()
            .iter()
            .map(|img| {
                let size = [img.image.width() as usize, img.image.height() as usize];
                let color = egui::ColorImage::from_rgba_unmultiplied(size, img.image.as_raw());
                ctx.load_texture(img.uri.clone(), color, egui::TextureOptions::LINEAR)
            })
            .collect();
        self.texture_generation = self.gallery.generation();
    }

    fn export_trace(&mut self) {
        match self.trace.export_csv(&self.config.trace.output_directory) {
            Ok(path) => {
                info!("motion trace written to {}", path.display());
                self.notice = Some(format!("Trace saved to {}", path.display()));
            }
            Err(e) => {
                error!("trace export failed: {e:#}");
                self.notice = Some(format!("Trace export failed: {e}"));
            }
        }
    }

    fn render_globe(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.background))
            .show(ctx, |ui| {
                self.view.paint(ui, &self.textures);
            });
    }

    fn render_upload_panel(&mut self, ctx: &egui::Context) {
        egui::Area::new("upload")
            .anchor(egui::Align2::LEFT_TOP, [24.0, 24.0])
            .show(ctx, |ui| {
                glass_frame(&self.theme).show(ui, |ui| {
                    ui.set_max_width(280.0);

                    let label = if self.loader.is_loading() {
                        "Processing...".to_string()
                    } else if self.gallery.is_empty() {
                        "Upload Textures".to_string()
                    } else {
                        format!("{} Images Loaded", self.gallery.len())
                    };
                    let button = egui::Button::new(egui::RichText::new(label).strong())
                        .fill(self.theme.primary)
                        .min_size(egui::vec2(240.0, 36.0));
                    if ui.add(button).clicked() {
                        self.open_file_dialog();
                    }

                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new(format!(
                            "JPG, PNG, WEBP • MAX {}MB • MAX {}",
                            self.config.upload.max_file_bytes / (1024 * 1024),
                            self.config.upload.max_files
                        ))
                        .size(10.0)
                        .color(self.theme.text_secondary),
                    );

                    if !self.textures.is_empty() {
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            for tex in self.textures.iter().take(PREVIEW_THUMBNAILS) {
                                ui.image((tex.id(), egui::vec2(32.0, 32.0)));
                            }
                            let extra = self.textures.len().saturating_sub(PREVIEW_THUMBNAILS);
                            if extra > 0 {
                                ui.label(format!("+{extra}"));
                            }
                        });
                    }

                    ui.add_space(8.0);
                    if ui
                        .add_enabled(!self.trace.is_empty(), egui::Button::new("Export motion trace"))
                        .clicked()
                    {
                        self.export_trace();
                    }

                    if let Some(notice) = &self.notice {
                        ui.add_space(4.0);
                        ui.label(
                            egui::RichText::new(notice)
                                .size(11.0)
                                .color(self.theme.text_secondary),
                        );
                    }
                });
            });
    }

    fn render_instructions(&self, ctx: &egui::Context) {
        egui::Area::new("instructions")
            .anchor(egui::Align2::RIGHT_TOP, [-24.0, 24.0])
            .interactable(false)
            .show(ctx, |ui| {
                glass_frame(&self.theme).show(ui, |ui| {
                    ui.set_max_width(260.0);
                    ui.heading("Gesture Controls");
                    ui.add_space(6.0);
                    let rows = [
                        (self.theme.primary, "Move hand left/right to rotate the globe."),
                        (self.theme.pinch, "Pinch fingers to zoom out."),
                        (egui::Color32::from_rgb(236, 72, 153), "Release pinch to zoom back in."),
                        (self.theme.hand, "Keep your hand steady and open to stop rotation."),
                    ];
                    for (color, text) in rows {
                        ui.horizontal(|ui| {
                            draw_indicator(ui, true, color);
                            ui.label(egui::RichText::new(text).color(self.theme.text_primary));
                        });
                    }
                });
            });
    }

    fn render_webcam_panel(&self, ctx: &egui::Context) {
        let status = self.capture_status();
        let gesture = self.control.gesture();

        egui::Area::new("webcam")
            .anchor(egui::Align2::RIGHT_BOTTOM, [-24.0, -24.0])
            .interactable(false)
            .show(ctx, |ui| {
                glass_frame(&self.theme).show(ui, |ui| {
                    ui.set_min_width(200.0);
                    match &status {
                        CaptureStatus::Initializing => {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label("Starting camera...");
                            });
                        }
                        CaptureStatus::Unavailable(reason) => {
                            ui.colored_label(
                                self.theme.error,
                                "Camera access denied or module failure",
                            );
                            ui.label(
                                egui::RichText::new(reason)
                                    .size(10.0)
                                    .color(self.theme.text_secondary),
                            );
                        }
                        CaptureStatus::Stopped => {
                            ui.label(egui::RichText::new("Camera stopped").color(self.theme.text_secondary));
                        }
                        CaptureStatus::Active => {
                            ui.horizontal(|ui| {
                                draw_indicator(ui, gesture.hand_present, self.theme.hand);
                                ui.label("Hand");
                                ui.add_space(8.0);
                                draw_indicator(ui, gesture.is_pinching, self.theme.pinch);
                                ui.label("Pinch");
                            });
                        }
                    }
                });
            });
    }

    fn render_footer(&self, ctx: &egui::Context) {
        egui::Area::new("branding")
            .anchor(egui::Align2::LEFT_BOTTOM, [24.0, -24.0])
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new("GESTURE GLOBE")
                        .size(24.0)
                        .strong()
                        .color(self.theme.text_primary.gamma_multiply(0.2)),
                );
            });
    }
}

fn glass_frame(theme: &Theme) -> egui::Frame {
    egui::Frame::none()
        .fill(theme.surface)
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_white_alpha(20)))
        .rounding(egui::Rounding::same(12.0))
        .inner_margin(egui::Margin::same(16.0))
}

fn describe_ingest(report: &IngestReport) -> String {
    let mut parts = Vec::new();
    if report.replaced {
        parts.push(format!("Loaded {} images", report.loaded));
    } else {
        parts.push("No usable images; globe unchanged".to_string());
    }
    if report.rejected > 0 {
        parts.push(format!("{} skipped", report.rejected));
    }
    if report.failed > 0 {
        parts.push(format!("{} unreadable", report.failed));
    }
    parts.join(", ")
}

impl eframe::App for GlobeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.collect_dropped_files(ctx);
        self.install_loaded_images();
        self.sync_textures(ctx);

        let render = self.integrator.present(&mut self.view);
        self.trace.record(&self.control.snapshot(), &render);

        self.render_globe(ctx);
        self.render_upload_panel(ctx);
        self.render_instructions(ctx);
        self.render_webcam_panel(ctx);
        self.render_footer(ctx);

        ctx.request_repaint();
    }
}
