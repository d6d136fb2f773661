use glam::{Mat4, Vec3, Vec4Swizzles};
use std::f32::consts::{PI, TAU};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Pending motion below this is treated as settled. Also keeps `phi` off the poles.
const EPS: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Camera position in world units.
    pub position: Vec3,
    /// The point the camera looks at; also the orbit center.
    pub target: Vec3,
    /// World "up". The orbit math assumes +Y.
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    /// Width / height of the viewport.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    // --- Derived (updated by `update_projection_matrix()`) ---
    proj: Mat4,
}

impl PerspectiveCamera {
    /// Creates a camera at the origin looking down -Z.
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_deg,
            aspect,
            near,
            far,
            proj: Mat4::IDENTITY, // placeholder
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recomputes the projection after `fov_deg`, `aspect`, `near` or `far` change.
    pub fn update_projection_matrix(&mut self) {
        // wgpu clip space has depth in [0, 1], which is what perspective_rh produces.
        self.proj = Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    #[inline]
    pub fn projection_matrix(&self) -> Mat4 {
        self.proj
    }

    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view_matrix()
    }

    /// Unit vector pointing to the right of the view direction.
    pub fn right(&self) -> Vec3 {
        (self.target - self.position).cross(self.up).normalize_or_zero()
    }

    /// Unit vector pointing up on screen (orthogonal to the view direction).
    pub fn screen_up(&self) -> Vec3 {
        self.right()
            .cross(self.target - self.position)
            .normalize_or_zero()
    }

    /// Projects a world point to normalized device coordinates
    /// (x, y in [-1, 1], z in [0, 1] when inside the depth range).
    /// Returns `None` for points at or behind the camera plane.
    pub fn project_to_ndc(&self, world: Vec3) -> Option<Vec3> {
        let clip = self.view_proj() * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(clip.xyz() / clip.w)
    }
}

/// Spherical coordinates around +Y: `phi` is the polar angle from +Y,
/// `theta` the azimuth measured from +Z towards +X.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keeps `phi` off the poles, where the view basis degenerates.
    fn make_safe(mut self) -> Self {
        self.phi = self.phi.clamp(EPS, PI - EPS);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
    Dolly,
}

/// Damped orbit / pan / dolly navigation around `camera.target`.
///
/// Input handlers only accumulate deltas; `update()` applies them to the
/// camera once per frame. With damping enabled each tick applies
/// `damping_factor` of the pending motion and keeps the rest, so the camera
/// glides to a stop.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enable_damping: bool,
    pub damping_factor: f32,
    /// When false, vertical panning moves the target in the horizontal
    /// (world XZ) plane instead of along the screen's up axis.
    pub screen_space_panning: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,

    // --- Pending motion ---
    spherical_delta: Spherical,
    pan_offset: Vec3,
    scale: f32,

    // --- Pointer state ---
    drag: Option<DragMode>,
    shift: bool,
    last_cursor: Option<(f64, f64)>,
    /// Size of the input surface in physical pixels.
    surface_size: (f32, f32),
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitControls {
    /// Creates undamped controls with unbounded zoom.
    pub fn new() -> Self {
        Self {
            enable_damping: false,
            damping_factor: 0.05,
            screen_space_panning: true,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            spherical_delta: Spherical::default(),
            pan_offset: Vec3::ZERO,
            scale: 1.0,
            drag: None,
            shift: false,
            last_cursor: None,
            surface_size: (1.0, 1.0),
        }
    }

    /// Tells the controls the size of the surface its pointer events come from.
    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = (width.max(1) as f32, height.max(1) as f32);
    }

    /// True when no motion is pending.
    pub fn is_settled(&self) -> bool {
        self.scale == 1.0
            && self.spherical_delta.theta.abs() < EPS
            && self.spherical_delta.phi.abs() < EPS
            && self.pan_offset.length_squared() < EPS * EPS
    }

    /// Applies pending motion to the camera. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if self.is_settled() {
            // Drop the residue so a settled camera is left bit-for-bit untouched.
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
            return false;
        }

        let before = (camera.position, camera.target);
        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        let mut s = Spherical::from_offset(camera.position - camera.target);
        s.theta += self.spherical_delta.theta * step;
        s.phi += self.spherical_delta.phi * step;
        s.phi = s.phi.clamp(self.min_polar_angle, self.max_polar_angle);
        s = s.make_safe();

        camera.target += self.pan_offset * step;

        s.radius = (s.radius * self.scale).clamp(self.min_distance, self.max_distance);
        camera.position = camera.target + s.to_offset();

        if self.enable_damping {
            self.spherical_delta.theta *= 1.0 - self.damping_factor;
            self.spherical_delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position != before.0 || camera.target != before.1
    }

    /// Queues a rotation around the vertical axis (positive turns the view left).
    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    /// Queues a rotation over the top (positive raises the camera).
    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Moves the camera closer by `dolly_scale` (< 1).
    pub fn dolly_in(&mut self, dolly_scale: f32) {
        self.scale *= dolly_scale;
    }

    /// Moves the camera away by `1 / dolly_scale`.
    pub fn dolly_out(&mut self, dolly_scale: f32) {
        self.scale /= dolly_scale;
    }

    /// Queues a pan by a pixel delta on the input surface.
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &PerspectiveCamera) {
        let height = self.surface_size.1;
        // Half the visible height at the target distance.
        let target_distance =
            (camera.position - camera.target).length() * (camera.fov_deg.to_radians() / 2.0).tan();

        let right = camera.right();
        self.pan_offset += right * -(2.0 * dx * target_distance / height);

        let up = if self.screen_space_panning {
            camera.screen_up()
        } else {
            camera.up.cross(right)
        };
        self.pan_offset += up * (2.0 * dy * target_distance / height);
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Applies `notches` of wheel input; positive values zoom in.
    pub fn wheel(&mut self, notches: f32) {
        let s = self.zoom_scale().powf(notches.abs());
        if notches > 0.0 {
            self.dolly_in(s);
        } else if notches < 0.0 {
            self.dolly_out(s);
        }
    }

    pub fn pointer_down(&mut self, button: MouseButton) {
        self.drag = match button {
            MouseButton::Left if self.shift => Some(DragMode::Pan),
            MouseButton::Left => Some(DragMode::Rotate),
            MouseButton::Right => Some(DragMode::Pan),
            MouseButton::Middle => Some(DragMode::Dolly),
            _ => self.drag,
        };
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn set_shift(&mut self, pressed: bool) {
        self.shift = pressed;
    }

    /// Feeds a cursor position in physical pixels.
    pub fn pointer_moved(&mut self, x: f64, y: f64, camera: &PerspectiveCamera) {
        if let (Some(last), Some(mode)) = (self.last_cursor, self.drag) {
            let dx = (x - last.0) as f32;
            let dy = (y - last.1) as f32;
            let height = self.surface_size.1;

            match mode {
                DragMode::Rotate => {
                    self.rotate_left(TAU * dx * self.rotate_speed / height);
                    self.rotate_up(TAU * dy * self.rotate_speed / height);
                }
                DragMode::Pan => self.pan(dx * self.pan_speed, dy * self.pan_speed, camera),
                DragMode::Dolly => {
                    if dy > 0.0 {
                        self.dolly_out(self.zoom_scale());
                    } else if dy < 0.0 {
                        self.dolly_in(self.zoom_scale());
                    }
                }
            }
        }
        self.last_cursor = Some((x, y));
    }

    /// Translates window events into pending motion.
    pub fn handle_event(&mut self, event: &WindowEvent, camera: &PerspectiveCamera) {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.set_shift(modifiers.state().shift_key());
            }
            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => self.pointer_down(*button),
                ElementState::Released => self.pointer_up(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x, position.y, camera);
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer_up();
                self.last_cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                self.wheel(notches);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(75.0, 16.0 / 9.0, 0.1, 1000.0);
        camera.position = Vec3::new(5.0, 5.0, 15.0);
        camera.look_at(Vec3::ZERO);
        camera
    }

    fn demo_controls() -> OrbitControls {
        let mut controls = OrbitControls::new();
        controls.enable_damping = true;
        controls.damping_factor = 0.05;
        controls.screen_space_panning = false;
        controls.min_distance = 2.0;
        controls.max_distance = 50.0;
        controls.set_surface_size(1600, 900);
        controls
    }

    fn azimuth(camera: &PerspectiveCamera) -> f32 {
        Spherical::from_offset(camera.position - camera.target).theta
    }

    #[test]
    fn spherical_round_trip() {
        let v = Vec3::new(5.0, 5.0, 15.0);
        let back = Spherical::from_offset(v).to_offset();
        assert!(back.abs_diff_eq(v, 1e-4));
    }

    #[test]
    fn projects_target_to_screen_center() {
        let camera = demo_camera();
        let ndc = camera.project_to_ndc(Vec3::ZERO).unwrap();
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);

        // Directly behind the camera.
        assert!(camera.project_to_ndc(Vec3::new(10.0, 10.0, 30.0)).is_none());
    }

    #[test]
    fn idle_controls_leave_camera_untouched() {
        let mut camera = demo_camera();
        let mut controls = demo_controls();
        let start = camera.position;
        for _ in 0..100 {
            assert!(!controls.update(&mut camera));
        }
        assert_eq!(camera.position, start);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn damped_rotation_converges_without_overshoot() {
        let mut camera = demo_camera();
        let mut controls = demo_controls();
        let radius = camera.position.length();
        let start = azimuth(&camera);

        controls.rotate_left(0.5);

        // The first frame only applies the damping fraction of the request.
        controls.update(&mut camera);
        assert!((start - azimuth(&camera) - 0.5 * 0.05).abs() < 1e-4);

        let mut prev = azimuth(&camera);
        for _ in 0..2000 {
            controls.update(&mut camera);
            let now = azimuth(&camera);
            // Always moving the same way, never past the requested angle.
            assert!(now <= prev + 1e-6);
            assert!(now >= start - 0.5 - 1e-4);
            assert!((camera.position.length() - radius).abs() < 1e-3);
            prev = now;
        }

        assert!(controls.is_settled());
        assert!((azimuth(&camera) - (start - 0.5)).abs() < 1e-3);

        // Once settled the camera stays put.
        let settled = camera.position;
        for _ in 0..50 {
            assert!(!controls.update(&mut camera));
        }
        assert_eq!(camera.position, settled);
    }

    #[test]
    fn drag_input_rotates_camera() {
        let mut camera = demo_camera();
        let mut controls = demo_controls();
        let start = azimuth(&camera);

        controls.pointer_down(MouseButton::Left);
        controls.pointer_moved(100.0, 100.0, &camera);
        controls.pointer_moved(190.0, 100.0, &camera);
        controls.pointer_up();

        // 90 px on a 900 px tall surface = a tenth of a full turn.
        let expected = TAU * 90.0 / 900.0;
        for _ in 0..1000 {
            controls.update(&mut camera);
        }
        assert!((start - azimuth(&camera) - expected).abs() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped_to_distance_bounds() {
        let mut camera = demo_camera();
        let mut controls = demo_controls();

        controls.wheel(200.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 2.0).abs() < 1e-4);

        controls.wheel(-400.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn world_space_pan_stays_horizontal() {
        let mut camera = demo_camera();
        let mut controls = demo_controls();

        controls.pan(0.0, 50.0, &camera);
        while controls.update(&mut camera) {}

        assert!(camera.target.y.abs() < 1e-5);
        // Panning "up" pushes the target away from the camera across the floor.
        assert!(camera.target.z < 0.0);
    }

    #[test]
    fn polar_angle_never_reaches_the_pole() {
        let mut camera = demo_camera();
        let mut controls = demo_controls();
        controls.enable_damping = false;

        controls.rotate_up(10.0);
        controls.update(&mut camera);

        assert!(camera.position.y > 0.0);
        assert!(camera.view_matrix().is_finite());
    }
}
