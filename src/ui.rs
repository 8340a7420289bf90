// src/ui.rs - Globe rendering and status widgets
use crate::layout::fibonacci_sphere;
use crate::motion::SceneTransform;
use eframe::egui::{self, Color32, Pos2, Rect, Rounding, Sense, Stroke, Vec2};
use nalgebra::{Rotation3, Vector2, Vector3};

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub background: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub hand: Color32,
    pub pinch: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(79, 70, 229),
            background: Color32::from_rgb(1, 1, 1),
            surface: Color32::from_rgba_unmultiplied(255, 255, 255, 12),
            error: Color32::from_rgb(239, 68, 68),
            hand: Color32::from_rgb(16, 185, 129),
            pinch: Color32::from_rgb(168, 85, 247),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(160, 160, 170),
        }
    }
}

const CAMERA_Z: f32 = 10.0;
const FOV_DEGREES: f32 = 50.0;
const CORE_RADIUS: f32 = 3.8;
const PANEL_SIZE: f32 = 1.0;
const STAR_COUNT: usize = 400;
const STAR_RADIUS: f32 = 60.0;

/// The rendered globe. Receives the eased rotation and zoom through
/// [`SceneTransform`] and paints itself with them.
pub struct GlobeView {
    rotation: Vector2<f64>,
    scale: f64,
    panels: Vec<Vector3<f32>>,
    stars: Vec<Vector3<f32>>,
    theme: Theme,
}

impl SceneTransform for GlobeView {
    fn apply(&mut self, rotation: Vector2<f64>, scale: f64) {
        self.rotation = rotation;
        self.scale = scale;
    }
}

impl GlobeView {
    pub fn new(theme: Theme) -> Self {
        Self {
            rotation: Vector2::zeros(),
            scale: 1.0,
            panels: Vec::new(),
            stars: fibonacci_sphere(STAR_COUNT, STAR_RADIUS),
            theme,
        }
    }

    pub fn set_panel_count(&mut self, count: usize, radius: f32) {
        self.panels = fibonacci_sphere(count, radius);
    }

    pub fn panel_positions(&self) -> &[Vector3<f32>] {
        &self.panels
    }

    pub fn rotation(&self) -> Vector2<f64> {
        self.rotation
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Euler XYZ with no z component: rotate about y first, then x.
    fn orientation(&self) -> Rotation3<f32> {
        Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation.x as f32)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), self.rotation.y as f32)
    }

    pub fn transform_point(&self, p: &Vector3<f32>) -> Vector3<f32> {
        (self.orientation() * p) * self.scale as f32
    }

    fn focal_length(rect: Rect) -> f32 {
        (rect.height() / 2.0) / (FOV_DEGREES.to_radians() / 2.0).tan()
    }

    /// Perspective projection from a camera at `(0, 0, CAMERA_Z)` looking at the
    /// origin. Returns the screen point and pixels per world unit at that depth.
    pub fn project(rect: Rect, p: &Vector3<f32>) -> Option<(Pos2, f32)> {
        let depth = CAMERA_Z - p.z;
        if depth <= 0.1 {
            return None;
        }
        let f = Self::focal_length(rect) / depth;
        let center = rect.center();
        Some((Pos2::new(center.x + p.x * f, center.y - p.y * f), f))
    }

    pub fn paint(&self, ui: &mut egui::Ui, textures: &[egui::TextureHandle]) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::hover());
        let rect = response.rect;
        painter.rect_filled(rect, Rounding::ZERO, self.theme.background);

        for star in &self.stars {
            if let Some((pos, f)) = Self::project(rect, star) {
                if rect.contains(pos) {
                    painter.circle_filled(pos, (f * 0.08).clamp(0.5, 1.5), Color32::from_white_alpha(90));
                }
            }
        }

        let mut placed: Vec<(usize, Vector3<f32>)> = self
            .panels
            .iter()
            .enumerate()
            .map(|(i, p)| (i, self.transform_point(p)))
            .collect();
        placed.sort_by(|a, b| a.1.z.total_cmp(&b.1.z));

        let (behind, in_front): (Vec<_>, Vec<_>) = placed.into_iter().partition(|(_, p)| p.z < 0.0);

        for (i, p) in &behind {
            self.paint_panel(&painter, rect, p, textures.get(*i), 0.35);
        }

        let scale = self.scale as f32;
        if let Some((center, f)) = Self::project(rect, &Vector3::zeros()) {
            let radius = CORE_RADIUS * scale * f;
            painter.circle_filled(center, radius, Color32::from_rgba_unmultiplied(17, 17, 17, 77));
            painter.circle_stroke(
                center,
                radius,
                Stroke::new(1.5, self.theme.primary.gamma_multiply(0.4)),
            );
        }

        for (i, p) in &in_front {
            self.paint_panel(&painter, rect, p, textures.get(*i), 0.9);
        }

        if self.panels.is_empty() {
            self.paint_empty_state(&painter, rect);
        }
    }

    fn paint_panel(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        p: &Vector3<f32>,
        texture: Option<&egui::TextureHandle>,
        opacity: f32,
    ) {
        let Some((center, f)) = Self::project(rect, p) else {
            return;
        };
        let edge = PANEL_SIZE * self.scale as f32 * f;

        let size = match texture {
            Some(tex) => {
                let s = tex.size_vec2();
                let longest = s.x.max(s.y).max(1.0);
                s * (edge / longest)
            }
            None => Vec2::splat(edge),
        };
        let panel = Rect::from_center_size(center, size);

        match texture {
            Some(tex) => {
                painter.image(
                    tex.id(),
                    panel,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE.gamma_multiply(opacity),
                );
            }
            None => painter.rect_filled(panel, Rounding::same(2.0), self.theme.surface),
        }
    }

    fn paint_empty_state(&self, painter: &egui::Painter, rect: Rect) {
        let center = rect.center();
        painter.circle_filled(center, 48.0, self.theme.surface);
        painter.circle_stroke(center, 24.0, Stroke::new(1.0, self.theme.primary.gamma_multiply(0.5)));
        painter.text(
            center + Vec2::new(0.0, 80.0),
            egui::Align2::CENTER_CENTER,
            "GLOBE EMPTY",
            egui::FontId::proportional(20.0),
            self.theme.text_primary.gamma_multiply(0.4),
        );
        painter.text(
            center + Vec2::new(0.0, 106.0),
            egui::Align2::CENTER_CENTER,
            "Drag & drop images to build the sphere",
            egui::FontId::proportional(11.0),
            self.theme.primary.gamma_multiply(0.5),
        );
    }
}

/// Small status dot; grows and lights up when `active`.
pub fn draw_indicator(ui: &mut egui::Ui, active: bool, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
    let painter = ui.painter();
    if active {
        painter.circle_filled(rect.center(), 6.0, color.gamma_multiply(0.25));
        painter.circle_filled(rect.center(), 4.0, color);
    } else {
        painter.circle_filled(rect.center(), 3.0, Color32::from_white_alpha(25));
    }
}
