use glam::Vec3;

/// Draws the camera HUD in the top-left corner.
pub fn draw_hud(ctx: &egui::Context, point_count: usize, distance: f32, camera_pos: Vec3) {
    egui::Window::new("Semantic Space")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            ui.label(format!("Points: {point_count}"));
            ui.label(format!("Distance: {distance:.2}"));
            ui.label(format!(
                "Camera: ({:.2}, {:.2}, {:.2})",
                camera_pos.x, camera_pos.y, camera_pos.z
            ));
            ui.separator();
            ui.small("Drag: orbit · Right/Shift drag: pan · Wheel: zoom · H: HUD");
        });
}
