//! Arena-backed scene graph.
//!
//! Nodes carry a local translation and an optional parent; a node's world
//! position is the sum of the translations along its parent chain. Attaching a
//! label to a marker therefore makes the label follow the marker.

use crate::data::Rgb;
use glam::Vec3;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a node inside a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not belong to this scene")]
    UnknownNode(NodeId),
}

/// Lit surface parameters, following the usual metal/rough model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardMaterial {
    pub color: Rgb,
    pub roughness: f32,
    pub metalness: f32,
}

/// A sphere standing for one data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub material: StandardMaterial,
}

/// Text styling for overlay labels. `None` fields fall back to the overlay defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelStyle {
    pub color: Option<Rgb>,
    pub font_size: Option<f32>,
    pub bold: bool,
}

/// A text element anchored at a 3D point and drawn by the label renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub style: LabelStyle,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: LabelStyle::default(),
        }
    }

    pub fn with_style(mut self, style: LabelStyle) -> Self {
        self.style = style;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f32,
}

/// Parallel light shining from the node's position towards `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
    pub target: Vec3,
}

/// Three colored lines from the origin along +X, +Y and +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesHelper {
    pub length: f32,
}

/// Linear distance fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Marker(Marker),
    Label(Label),
    AmbientLight(AmbientLight),
    DirectionalLight(DirectionalLight),
    Axes(AxesHelper),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Translation relative to the parent (or to the world origin for root nodes).
    pub position: Vec3,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Rgb,
    pub fog: Option<Fog>,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    revision: u64,
}

impl Scene {
    pub fn new(background: Rgb) -> Self {
        Self {
            background,
            fog: None,
            nodes: Vec::new(),
            roots: Vec::new(),
            revision: next_revision(),
        }
    }

    /// Stamp of the node set. Changes whenever a node is added or handed out
    /// mutably, and is never shared by two differently built scenes.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Adds a node directly under the scene root.
    pub fn add(&mut self, kind: NodeKind, position: Vec3) -> NodeId {
        let id = self.push(kind, position, None);
        self.roots.push(id);
        id
    }

    /// Adds a node whose position is relative to `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        position: Vec3,
    ) -> Result<NodeId, SceneError> {
        if parent.0 >= self.nodes.len() {
            return Err(SceneError::UnknownNode(parent));
        }
        let id = self.push(kind, position, Some(parent));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn push(&mut self, kind: NodeKind, position: Vec3, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.revision = next_revision();
        self.nodes.push(Node {
            kind,
            position,
            parent,
            children: Vec::new(),
        });
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let node = self.nodes.get_mut(id.0)?;
        self.revision = next_revision();
        Some(node)
    }

    #[inline]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn world_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        let mut node = self.get(id).ok_or(SceneError::UnknownNode(id))?;
        let mut pos = node.position;
        while let Some(parent) = node.parent {
            // Parents are always pushed before their children, so this terminates.
            node = &self.nodes[parent.0];
            pos += node.position;
        }
        Ok(pos)
    }

    pub fn markers(&self) -> impl Iterator<Item = (NodeId, &Marker)> {
        self.nodes().filter_map(|(id, n)| match &n.kind {
            NodeKind::Marker(m) => Some((id, m)),
            _ => None,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = (NodeId, &Label)> {
        self.nodes().filter_map(|(id, n)| match &n.kind {
            NodeKind::Label(l) => Some((id, l)),
            _ => None,
        })
    }

    pub fn axes(&self) -> impl Iterator<Item = (NodeId, &AxesHelper)> {
        self.nodes().filter_map(|(id, n)| match &n.kind {
            NodeKind::Axes(a) => Some((id, a)),
            _ => None,
        })
    }

    /// Sum of all ambient lights as linear `rgb * intensity`.
    pub fn ambient_radiance(&self) -> Vec3 {
        self.nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::AmbientLight(l) => {
                    Some(Vec3::from(l.color.to_linear_f32()) * l.intensity)
                }
                _ => None,
            })
            .sum()
    }

    /// The first directional light as (unit direction towards the light, radiance).
    pub fn key_light(&self) -> Option<(Vec3, Vec3)> {
        self.nodes().find_map(|(id, n)| match &n.kind {
            NodeKind::DirectionalLight(l) => {
                let from = self.world_position(id).ok()?;
                let dir = (from - l.target).try_normalize()?;
                Some((dir, Vec3::from(l.color.to_linear_f32()) * l.intensity))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> NodeKind {
        NodeKind::Marker(Marker {
            radius: 0.3,
            width_segments: 8,
            height_segments: 8,
            material: StandardMaterial {
                color: Rgb::WHITE,
                roughness: 0.5,
                metalness: 0.1,
            },
        })
    }

    #[test]
    fn child_position_is_relative_to_parent() {
        let mut scene = Scene::new(Rgb::BLACK);
        let m = scene.add(marker(), Vec3::new(1.0, 2.0, 3.0));
        let l = scene
            .add_child(m, NodeKind::Label(Label::new("a")), Vec3::new(0.0, 0.4, 0.0))
            .unwrap();

        assert_eq!(scene.world_position(m).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(scene.world_position(l).unwrap(), Vec3::new(1.0, 2.4, 3.0));
        assert_eq!(scene.get(l).unwrap().parent(), Some(m));
        assert_eq!(scene.get(m).unwrap().children(), &[l]);
        assert_eq!(scene.roots(), &[m]);

        scene.get_mut(m).unwrap().position = Vec3::new(-1.0, 0.0, 0.0);
        assert_eq!(scene.world_position(l).unwrap(), Vec3::new(-1.0, 0.4, 0.0));
    }

    #[test]
    fn revision_tracks_node_changes() {
        let mut scene = Scene::new(Rgb::BLACK);
        let empty = scene.revision();

        let m = scene.add(marker(), Vec3::ZERO);
        let added = scene.revision();
        assert_ne!(added, empty);

        // Reads leave it alone.
        let _ = scene.world_position(m);
        let _ = scene.get(m);
        assert_eq!(scene.labels().count(), 0);
        assert_eq!(scene.revision(), added);

        scene.get_mut(m).unwrap().position = Vec3::X;
        assert_ne!(scene.revision(), added);

        assert_ne!(Scene::new(Rgb::BLACK).revision(), Scene::new(Rgb::BLACK).revision());
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut other = Scene::new(Rgb::BLACK);
        other.add(marker(), Vec3::ZERO);
        let foreign = other.add(marker(), Vec3::ZERO);

        let mut scene = Scene::new(Rgb::BLACK);
        let err = scene
            .add_child(foreign, NodeKind::Label(Label::new("x")), Vec3::ZERO)
            .unwrap_err();
        assert_eq!(err, SceneError::UnknownNode(foreign));
        assert!(scene.is_empty());
    }

    #[test]
    fn light_queries() {
        let mut scene = Scene::new(Rgb::BLACK);
        assert_eq!(scene.ambient_radiance(), Vec3::ZERO);
        assert!(scene.key_light().is_none());

        scene.add(
            NodeKind::AmbientLight(AmbientLight { color: Rgb::WHITE, intensity: 0.5 }),
            Vec3::ZERO,
        );
        scene.add(
            NodeKind::DirectionalLight(DirectionalLight {
                color: Rgb::WHITE,
                intensity: 2.0,
                target: Vec3::ZERO,
            }),
            Vec3::new(0.0, 10.0, 0.0),
        );

        assert!(scene.ambient_radiance().abs_diff_eq(Vec3::splat(0.5), 1e-5));
        let (dir, radiance) = scene.key_light().unwrap();
        assert!(dir.abs_diff_eq(Vec3::Y, 1e-6));
        assert!(radiance.abs_diff_eq(Vec3::splat(2.0), 1e-5));
    }
}
