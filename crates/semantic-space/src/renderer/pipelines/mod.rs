//! Render pipelines for the 3D pass. All of them read the per-frame uniform
//! block at group 0, binding 0.

pub mod axes;
pub mod markers;

/// WGSL declaration of `FrameUniform` plus the shared fog helper.
pub const FRAME_WGSL: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    camera_pos: vec3<f32>,
    _pad0: f32,
    ambient: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    fog_color: vec4<f32>,
    fog_params: vec4<f32>,
};
@group(0) @binding(0) var<uniform> F: Frame;

// Linear fog over view-space depth.
fn apply_fog(color: vec3<f32>, view_depth: f32) -> vec3<f32> {
    if (F.fog_params.z < 0.5) {
        return color;
    }
    let f = smoothstep(F.fog_params.x, F.fog_params.y, view_depth);
    return mix(color, F.fog_color.rgb, f);
}
"#;

/// Builds a shader module from the frame prelude followed by `body`.
pub(crate) fn shader_with_frame(
    device: &wgpu::Device,
    label: &str,
    body: &str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label:  Some(label),
        source: wgpu::ShaderSource::Wgsl(format!("{FRAME_WGSL}\n{body}").into()),
    })
}

/// Depth state shared by the opaque pipelines.
pub(crate) fn opaque_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format:              super::targets::DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare:       wgpu::CompareFunction::Less,
        stencil:             wgpu::StencilState::default(),
        bias:                wgpu::DepthBiasState::default(),
    }
}
