//! The semantic space itself: scene, camera, navigation and both renderers,
//! owned together so that resize and the frame tick keep them in step.

use crate::{
    camera::{OrbitControls, PerspectiveCamera},
    data::{Dataset, Rgb},
    overlay::LabelRenderer,
    renderer::FrameRenderer,
    scene::{
        AmbientLight, AxesHelper, DirectionalLight, Fog, Label, LabelStyle, Marker, NodeId,
        NodeKind, Scene, SceneError, StandardMaterial,
    },
};
use glam::Vec3;
use winit::event::WindowEvent;

const BACKGROUND: Rgb = Rgb(0x222222);
const FOG_NEAR: f32 = 10.0;
const FOG_FAR: f32 = 50.0;

const FOV_DEG: f32 = 75.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;
const CAMERA_START: Vec3 = Vec3::new(5.0, 5.0, 15.0);

const DAMPING_FACTOR: f32 = 0.05;
const MIN_DISTANCE: f32 = 2.0;
const MAX_DISTANCE: f32 = 50.0;

const AMBIENT_INTENSITY: f32 = 0.6;
const KEY_LIGHT_INTENSITY: f32 = 0.8;
const KEY_LIGHT_POSITION: Vec3 = Vec3::new(5.0, 10.0, 7.5);

const AXES_LENGTH: f32 = 10.0;
const AXIS_LABEL_SIZE: f32 = 16.0;

const MARKER_RADIUS: f32 = 0.3;
const MARKER_SEGMENTS: u32 = 32;
const MARKER_ROUGHNESS: f32 = 0.5;
const MARKER_METALNESS: f32 = 0.1;

/// Where a word label sits relative to its marker.
pub const LABEL_OFFSET: Vec3 = Vec3::new(0.0, 0.4, 0.0);

pub struct SemanticSpace<R: FrameRenderer> {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub renderer: R,
    pub label_renderer: LabelRenderer,
    /// Marker per data point, in dataset order.
    markers: Vec<NodeId>,
}

impl<R: FrameRenderer> SemanticSpace<R> {
    /// Builds the scene for `dataset` and sizes everything to `width` x `height`.
    /// A zero dimension (e.g. a window not yet mapped) is treated as 1.
    pub fn new(renderer: R, width: u32, height: u32, dataset: &Dataset) -> Result<Self, SceneError> {
        let (width, height) = (width.max(1), height.max(1));
        let mut scene = Scene::new(BACKGROUND);
        scene.fog = Some(Fog {
            color: BACKGROUND,
            near: FOG_NEAR,
            far: FOG_FAR,
        });

        let mut camera = PerspectiveCamera::new(FOV_DEG, aspect(width, height), NEAR, FAR);
        camera.position = CAMERA_START;
        camera.look_at(Vec3::ZERO);

        let mut controls = OrbitControls::new();
        controls.enable_damping = true;
        controls.damping_factor = DAMPING_FACTOR;
        controls.screen_space_panning = false;
        controls.min_distance = MIN_DISTANCE;
        controls.max_distance = MAX_DISTANCE;

        scene.add(
            NodeKind::AmbientLight(AmbientLight {
                color: Rgb::WHITE,
                intensity: AMBIENT_INTENSITY,
            }),
            Vec3::ZERO,
        );
        scene.add(
            NodeKind::DirectionalLight(DirectionalLight {
                color: Rgb::WHITE,
                intensity: KEY_LIGHT_INTENSITY,
                target: Vec3::ZERO,
            }),
            KEY_LIGHT_POSITION,
        );

        scene.add(NodeKind::Axes(AxesHelper { length: AXES_LENGTH }), Vec3::ZERO);
        let axis_tip = AXES_LENGTH + 1.0;
        for (name, dir, color) in [
            ("X", Vec3::X, Rgb::RED),
            ("Y", Vec3::Y, Rgb::GREEN),
            ("Z", Vec3::Z, Rgb::BLUE),
        ] {
            let style = LabelStyle {
                color: Some(color),
                font_size: Some(AXIS_LABEL_SIZE),
                bold: true,
            };
            scene.add(NodeKind::Label(Label::new(name).with_style(style)), dir * axis_tip);
        }

        let mut space = Self {
            scene,
            camera,
            controls,
            renderer,
            label_renderer: LabelRenderer::new(width, height),
            markers: Vec::with_capacity(dataset.len()),
        };
        space.renderer.set_size(width, height);
        space.controls.set_surface_size(width, height);

        for point in dataset.points() {
            let marker = space.scene.add(
                NodeKind::Marker(Marker {
                    radius: MARKER_RADIUS,
                    width_segments: MARKER_SEGMENTS,
                    height_segments: MARKER_SEGMENTS,
                    material: StandardMaterial {
                        color: point.color,
                        roughness: MARKER_ROUGHNESS,
                        metalness: MARKER_METALNESS,
                    },
                }),
                point.position(),
            );
            space
                .scene
                .add_child(marker, NodeKind::Label(Label::new(point.text.as_str())), LABEL_OFFSET)?;
            space.markers.push(marker);
        }

        log::info!(
            "Semantic space ready: {} points, {} scene nodes",
            space.markers.len(),
            space.scene.len()
        );
        Ok(space)
    }

    /// One marker per data point, in dataset order.
    #[inline]
    pub fn markers(&self) -> &[NodeId] {
        &self.markers
    }

    /// Keeps camera aspect, both renderers and the input surface at the new size.
    /// Zero-area sizes (e.g. a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        log::debug!("Resizing semantic space to {}x{}", width, height);
        self.camera.aspect = aspect(width, height);
        self.camera.update_projection_matrix();
        self.renderer.set_size(width, height);
        self.label_renderer.set_size(width, height);
        self.controls.set_surface_size(width, height);
    }

    /// Feeds a window event to the navigation controls.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        self.controls.handle_event(event, &self.camera);
    }

    /// Advances the controls, then renders the scene and its labels with the
    /// same camera. Returns whether the camera moved this tick.
    pub fn tick(&mut self) -> Result<bool, R::Error> {
        let moved = self.controls.update(&mut self.camera);
        self.renderer.render(&self.scene, &self.camera)?;
        if let Err(never) = self.label_renderer.render(&self.scene, &self.camera) {
            match never {}
        }
        Ok(moved)
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LabeledPoint;

    #[derive(Debug, PartialEq)]
    struct Refused;

    /// Remembers the size it was given and the camera of every frame.
    #[derive(Default)]
    struct RecordingRenderer {
        size: (u32, u32),
        frames: Vec<(Vec3, Vec3)>,
        refuse: bool,
    }

    impl FrameRenderer for RecordingRenderer {
        type Error = Refused;

        fn set_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn render(&mut self, _scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Refused> {
            if self.refuse {
                return Err(Refused);
            }
            self.frames.push((camera.position, camera.target));
            Ok(())
        }
    }

    fn demo_space() -> SemanticSpace<RecordingRenderer> {
        SemanticSpace::new(RecordingRenderer::default(), 1280, 720, &Dataset::builtin()).unwrap()
    }

    fn word_label(space: &SemanticSpace<RecordingRenderer>, marker: NodeId) -> (NodeId, &Label) {
        let node = space.scene.get(marker).unwrap();
        assert_eq!(node.children().len(), 1);
        let id = node.children()[0];
        match &space.scene.get(id).unwrap().kind {
            NodeKind::Label(label) => (id, label),
            other => panic!("expected a label, got {other:?}"),
        }
    }

    #[test]
    fn one_marker_and_label_per_point() {
        let dataset = Dataset::builtin();
        let space = demo_space();

        assert_eq!(space.markers().len(), dataset.len());
        assert_eq!(space.scene.markers().count(), dataset.len());
        // Word labels plus the three axis labels.
        assert_eq!(space.scene.labels().count(), dataset.len() + 3);

        for (marker, point) in space.markers().iter().zip(dataset.points()) {
            let (_, label) = word_label(&space, *marker);
            assert_eq!(label.text, point.text);
        }
    }

    #[test]
    fn markers_sit_exactly_on_their_points() {
        let dataset = Dataset::builtin();
        let space = demo_space();

        for (marker, point) in space.markers().iter().zip(dataset.points()) {
            assert_eq!(space.scene.world_position(*marker), Ok(point.position()));
            match &space.scene.get(*marker).unwrap().kind {
                NodeKind::Marker(m) => {
                    assert_eq!(m.material.color, point.color);
                    assert_eq!(m.radius, 0.3);
                    assert_eq!((m.width_segments, m.height_segments), (32, 32));
                }
                other => panic!("expected a marker, got {other:?}"),
            }
        }
    }

    #[test]
    fn labels_ride_on_their_markers() {
        let mut space = demo_space();
        let marker = space.markers()[0];
        let (label, _) = word_label(&space, marker);

        let node = space.scene.get(label).unwrap();
        assert_eq!(node.parent(), Some(marker));
        assert_eq!(node.position, LABEL_OFFSET);

        space.scene.get_mut(marker).unwrap().position = Vec3::new(1.0, 2.0, 3.0);
        let at = space.scene.world_position(label).unwrap();
        assert!(at.abs_diff_eq(Vec3::new(1.0, 2.4, 3.0), 1e-6));
    }

    #[test]
    fn homonyms_stay_distinct() {
        let space = demo_space();
        let apples: Vec<_> = space
            .markers()
            .iter()
            .filter(|m| word_label(&space, **m).1.text.starts_with("Apple"))
            .copied()
            .collect();

        assert_eq!(apples.len(), 2);
        assert_ne!(apples[0], apples[1]);
        assert_ne!(
            space.scene.world_position(apples[0]),
            space.scene.world_position(apples[1])
        );
    }

    #[test]
    fn duplicate_words_are_not_merged() {
        let dataset = Dataset::new(vec![
            LabeledPoint::new("Apple", 1.0, 0.0, 0.0, Rgb::WHITE),
            LabeledPoint::new("Apple", -1.0, 0.0, 0.0, Rgb::WHITE),
        ]);
        let space = SemanticSpace::new(RecordingRenderer::default(), 640, 480, &dataset).unwrap();
        assert_eq!(space.markers().len(), 2);
        assert_eq!(space.scene.labels().filter(|(_, l)| l.text == "Apple").count(), 2);
    }

    #[test]
    fn axis_labels_are_styled() {
        let space = demo_space();
        let axis: Vec<_> = space
            .scene
            .labels()
            .filter(|(id, _)| space.scene.get(*id).unwrap().parent().is_none())
            .map(|(id, l)| (l.text.clone(), l.style.color, space.scene.world_position(id).unwrap()))
            .collect();

        assert_eq!(
            axis,
            vec![
                ("X".to_string(), Some(Rgb::RED), Vec3::new(11.0, 0.0, 0.0)),
                ("Y".to_string(), Some(Rgb::GREEN), Vec3::new(0.0, 11.0, 0.0)),
                ("Z".to_string(), Some(Rgb::BLUE), Vec3::new(0.0, 0.0, 11.0)),
            ]
        );
        assert!(space
            .scene
            .labels()
            .filter(|(l, _)| space.scene.get(*l).unwrap().parent().is_none())
            .all(|(_, l)| l.style.bold && l.style.font_size == Some(16.0)));
    }

    #[test]
    fn starts_with_the_demo_setup() {
        let space = demo_space();
        assert_eq!(space.camera.position, Vec3::new(5.0, 5.0, 15.0));
        assert_eq!(space.camera.target, Vec3::ZERO);
        assert!((space.camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
        assert_eq!(space.scene.background, Rgb(0x222222));
        assert_eq!(space.scene.fog.map(|f| (f.near, f.far)), Some((10.0, 50.0)));
        assert_eq!(space.scene.axes().count(), 1);
        assert!(space.scene.key_light().is_some());
        assert_eq!(space.renderer.size(), (1280, 720));
        assert_eq!(space.label_renderer.size(), (1280, 720));
    }

    #[test]
    fn resize_keeps_both_layers_aligned() {
        let mut space = demo_space();
        space.resize(1024, 512);

        assert_eq!(space.renderer.size(), (1024, 512));
        assert_eq!(space.label_renderer.size(), (1024, 512));
        assert_eq!(space.camera.aspect, 2.0);

        let expected = glam::Mat4::perspective_rh(75f32.to_radians(), 2.0, 0.1, 1000.0);
        assert_eq!(space.camera.projection_matrix(), expected);
    }

    #[test]
    fn zero_sized_startup_keeps_a_finite_projection() {
        let space =
            SemanticSpace::new(RecordingRenderer::default(), 0, 0, &Dataset::builtin()).unwrap();
        assert_eq!(space.camera.aspect, 1.0);
        assert!(space.camera.projection_matrix().is_finite());
        assert_eq!(space.renderer.size(), (1, 1));
        assert_eq!(space.label_renderer.size(), (1, 1));

        let wide = SemanticSpace::new(RecordingRenderer::default(), 0, 720, &Dataset::builtin())
            .unwrap();
        assert!(wide.camera.aspect > 0.0);
        assert!(wide.camera.projection_matrix().is_finite());
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut space = demo_space();
        space.resize(0, 300);
        space.resize(800, 0);
        assert_eq!(space.renderer.size(), (1280, 720));
        assert_eq!(space.label_renderer.size(), (1280, 720));
        assert!((space.camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn idle_ticks_leave_the_camera_alone() {
        let mut space = demo_space();
        for _ in 0..100 {
            assert_eq!(space.tick(), Ok(false));
        }
        assert_eq!(space.camera.position, Vec3::new(5.0, 5.0, 15.0));
        assert_eq!(space.camera.target, Vec3::ZERO);
        assert_eq!(space.renderer.frames.len(), 100);
        // Every word label and axis label is in front of the starting camera.
        assert_eq!(space.label_renderer.labels().len(), Dataset::builtin().len() + 3);
    }

    #[test]
    fn tick_moves_camera_before_rendering() {
        let mut space = demo_space();
        space.controls.rotate_left(0.5);

        assert_eq!(space.tick(), Ok(true));
        let (seen_position, _) = space.renderer.frames[0];
        assert_eq!(seen_position, space.camera.position);
        assert_ne!(seen_position, Vec3::new(5.0, 5.0, 15.0));
    }

    #[test]
    fn orbit_glides_within_distance_bounds() {
        let mut space = demo_space();
        space.controls.rotate_left(1.0);
        space.controls.wheel(-200.0);

        let start_theta = 5f32.atan2(15.0);
        let goal_theta = start_theta - 1.0;
        let mut last_theta = start_theta;
        for _ in 0..3000 {
            space.tick().unwrap();
            let offset = space.camera.position - space.camera.target;
            let distance = offset.length();
            assert!((MIN_DISTANCE - 1e-4..=MAX_DISTANCE + 1e-4).contains(&distance));

            // Rotating "left" decreases the azimuth; it must never swing back
            // or run past the goal.
            let theta = offset.x.atan2(offset.z);
            assert!(theta <= last_theta + 1e-5);
            assert!(theta >= goal_theta - 1e-4);
            last_theta = theta;
        }
        assert!((last_theta - goal_theta).abs() < 1e-3);
        assert!(space.controls.is_settled());
        let settled = space.camera.position;
        space.tick().unwrap();
        assert_eq!(space.camera.position, settled);
    }

    #[test]
    fn render_failure_propagates_and_skips_labels() {
        let mut space = demo_space();
        space.renderer.refuse = true;
        assert_eq!(space.tick(), Err(Refused));
        assert!(space.label_renderer.labels().is_empty());
    }
}
