//! Interactive 3D "semantic space" viewer.
//!
//! Words are placed as lit spheres at fixed 3D coordinates, each carrying a
//! text label that stays pinned above it on screen. The view orbits, pans
//! and zooms with damped mouse navigation.

pub mod app;
pub mod camera;
pub mod config;
pub mod data;
pub mod overlay;
pub mod renderer;
pub mod scene;
pub mod space;
pub mod ui;
