//! Text labels drawn over the 3D view.
//!
//! Every frame the label renderer projects each label's world anchor through
//! the camera into pixel coordinates of its own surface; the results are then
//! painted with egui on top of the rendered scene.

use crate::{
    camera::PerspectiveCamera,
    data::Rgb,
    renderer::FrameRenderer,
    scene::{LabelStyle, NodeId, Scene},
};
use glam::Vec2;
use std::convert::Infallible;

const DEFAULT_COLOR: Rgb = Rgb::WHITE;
const DEFAULT_FONT_SIZE: f32 = 14.0;
const SHADOW: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 200);

/// A label placed on screen for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedLabel {
    pub node: NodeId,
    pub text: String,
    pub style: LabelStyle,
    /// Anchor position in physical pixels, origin top-left.
    pub screen: Vec2,
    /// Normalized depth in [0, 1]; larger is farther.
    pub depth: f32,
}

#[derive(Debug, Default)]
pub struct LabelRenderer {
    size: (u32, u32),
    labels: Vec<ProjectedLabel>,
}

impl LabelRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            labels: Vec::new(),
        }
    }

    /// Labels visible in the last rendered frame, farthest first.
    #[inline]
    pub fn labels(&self) -> &[ProjectedLabel] {
        &self.labels
    }
}

impl FrameRenderer for LabelRenderer {
    type Error = Infallible;

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Infallible> {
        let (w, h) = (self.size.0 as f32, self.size.1 as f32);
        self.labels.clear();

        for (id, label) in scene.labels() {
            let Ok(anchor) = scene.world_position(id) else {
                continue;
            };
            // Behind the camera or outside the clip depth range: hidden.
            let Some(ndc) = camera.project_to_ndc(anchor) else {
                continue;
            };
            if !(0.0..=1.0).contains(&ndc.z) {
                continue;
            }

            self.labels.push(ProjectedLabel {
                node: id,
                text: label.text.clone(),
                style: label.style.clone(),
                screen: Vec2::new((ndc.x * 0.5 + 0.5) * w, (-ndc.y * 0.5 + 0.5) * h),
                depth: ndc.z,
            });
        }

        // Paint far to near so closer labels end up on top.
        self.labels.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        Ok(())
    }
}

/// Paints projected labels centred on their anchors.
pub fn paint_labels(ctx: &egui::Context, labels: &[ProjectedLabel]) {
    let ppp = ctx.pixels_per_point();
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Background,
        egui::Id::new("semantic_space_labels"),
    ));

    for label in labels {
        let pos = egui::pos2(label.screen.x / ppp, label.screen.y / ppp);
        let color = label.style.color.unwrap_or(DEFAULT_COLOR).to_egui();
        let font = egui::FontId::proportional(label.style.font_size.unwrap_or(DEFAULT_FONT_SIZE));

        painter.text(
            pos + egui::vec2(1.0, 1.0),
            egui::Align2::CENTER_CENTER,
            &label.text,
            font.clone(),
            SHADOW,
        );
        if label.style.bold {
            // No bold face in the default fonts; overstrike instead.
            painter.text(
                pos + egui::vec2(0.6, 0.0),
                egui::Align2::CENTER_CENTER,
                &label.text,
                font.clone(),
                color,
            );
        }
        painter.text(pos, egui::Align2::CENTER_CENTER, &label.text, font, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Label, NodeKind};
    use glam::Vec3;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(75.0, 800.0 / 600.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.look_at(Vec3::ZERO);
        camera
    }

    #[test]
    fn projects_into_pixel_space() {
        let mut scene = Scene::new(Rgb::BLACK);
        scene.add(NodeKind::Label(Label::new("center")), Vec3::ZERO);
        scene.add(NodeKind::Label(Label::new("up")), Vec3::new(0.0, 2.0, 0.0));

        let mut renderer = LabelRenderer::new(800, 600);
        renderer.render(&scene, &camera()).unwrap();

        let labels = renderer.labels();
        assert_eq!(labels.len(), 2);
        let center = labels.iter().find(|l| l.text == "center").unwrap();
        assert!(center.screen.abs_diff_eq(Vec2::new(400.0, 300.0), 1e-3));
        // Screen y grows downwards.
        let up = labels.iter().find(|l| l.text == "up").unwrap();
        assert!(up.screen.y < 300.0);
        assert!((up.screen.x - 400.0).abs() < 1e-3);
    }

    #[test]
    fn hides_labels_behind_the_camera() {
        let mut scene = Scene::new(Rgb::BLACK);
        scene.add(NodeKind::Label(Label::new("behind")), Vec3::new(0.0, 0.0, 20.0));
        scene.add(NodeKind::Label(Label::new("beyond far plane")), Vec3::new(0.0, 0.0, -5000.0));

        let mut renderer = LabelRenderer::new(800, 600);
        renderer.render(&scene, &camera()).unwrap();
        assert!(renderer.labels().is_empty());
    }

    #[test]
    fn nearer_labels_are_painted_last() {
        let mut scene = Scene::new(Rgb::BLACK);
        scene.add(NodeKind::Label(Label::new("near")), Vec3::new(0.0, 0.0, 5.0));
        scene.add(NodeKind::Label(Label::new("far")), Vec3::new(0.0, 0.0, -5.0));

        let mut renderer = LabelRenderer::new(800, 600);
        renderer.render(&scene, &camera()).unwrap();
        let order: Vec<_> = renderer.labels().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(order, ["far", "near"]);
    }

    #[test]
    fn follows_resized_surface() {
        let mut scene = Scene::new(Rgb::BLACK);
        scene.add(NodeKind::Label(Label::new("center")), Vec3::ZERO);

        let mut renderer = LabelRenderer::new(800, 600);
        renderer.set_size(1024, 768);
        assert_eq!(renderer.size(), (1024, 768));

        let mut cam = camera();
        cam.aspect = 1024.0 / 768.0;
        cam.update_projection_matrix();
        renderer.render(&scene, &cam).unwrap();
        assert!(renderer.labels()[0].screen.abs_diff_eq(Vec2::new(512.0, 384.0), 1e-3));
    }
}
