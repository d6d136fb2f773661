//! Core data types for the semantic space viewer: the labeled points themselves
//! and the GPU-facing layouts they are turned into.

use serde::Deserialize;
use std::str::FromStr;

/// A packed `0xRRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Rgb(pub u32);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xffffff);
    pub const BLACK: Rgb = Rgb(0x000000);
    // CSS named colors, used by the axis labels.
    pub const RED: Rgb = Rgb(0xff0000);
    pub const GREEN: Rgb = Rgb(0x008000);
    pub const BLUE: Rgb = Rgb(0x0000ff);

    #[inline]
    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Channels in [0, 1], still sRGB-encoded.
    pub fn to_srgb_f32(self) -> [f32; 3] {
        [
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
        ]
    }

    /// Channels decoded to linear light, which is what the shaders light with.
    pub fn to_linear_f32(self) -> [f32; 3] {
        self.to_srgb_f32().map(srgb_to_linear)
    }

    pub fn to_egui(self) -> egui::Color32 {
        egui::Color32::from_rgb(self.r(), self.g(), self.b())
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::WHITE
    }
}

/// Error returned when a color literal cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected 0xRRGGBB, #RRGGBB or RRGGBB")]
pub struct ColorParseError(pub String);

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex.len() != 6 {
            return Err(ColorParseError(s.to_string()));
        }

        u32::from_str_radix(hex, 16)
            .map(Rgb)
            .map_err(|_| ColorParseError(s.to_string()))
    }
}

/// Colors in dataset files may be written as integers or hex strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Packed(u32),
    Hex(String),
}

impl TryFrom<ColorRepr> for Rgb {
    type Error = ColorParseError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Packed(v) if v <= 0xffffff => Ok(Rgb(v)),
            ColorRepr::Packed(v) => Err(ColorParseError(format!("{v:#x}"))),
            ColorRepr::Hex(s) => s.parse(),
        }
    }
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// One word placed in the semantic space.
///
/// `text` is not a key: the same word may appear at several positions
/// (e.g. homonyms), and each occurrence gets its own marker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabeledPoint {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub color: Rgb,
}

impl LabeledPoint {
    pub fn new(text: impl Into<String>, x: f32, y: f32, z: f32, color: Rgb) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            z,
            color,
        }
    }

    #[inline]
    pub fn position(&self) -> glam::Vec3 {
        glam::Vec3::new(self.x, self.y, self.z)
    }
}

/// Vertex of the shared sphere mesh. Must match `VsIn` in the marker shader.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Per-marker instance data. Must match `InstanceIn` in the marker shader.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct MarkerInstance {
    /// World-space center of the sphere.
    pub translation: [f32; 3],
    /// Scales the shared unit sphere.
    pub radius: f32,
    /// Linear base color.
    pub color: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
}

/// Vertex of the axes indicator line list.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Per-frame uniforms shared by every pipeline, std140-compatible.
/// Must match `Frame` in both shaders.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _pad0: f32,
    /// Ambient radiance (rgb * intensity).
    pub ambient: [f32; 4],
    /// Unit vector pointing from the surface towards the directional light.
    pub light_dir: [f32; 4],
    /// Directional radiance (rgb * intensity).
    pub light_color: [f32; 4],
    pub fog_color: [f32; 4],
    /// x = near, y = far, z = 1.0 when fog is enabled.
    pub fog_params: [f32; 4],
}

const _: [(); 224] = [(); core::mem::size_of::<FrameUniform>()];
const _: [(); 36] = [(); core::mem::size_of::<MarkerInstance>()];
