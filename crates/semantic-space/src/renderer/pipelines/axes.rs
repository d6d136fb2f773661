use super::{opaque_depth_state, shader_with_frame};
use crate::data::types::LineVertex;

const LINE_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

/// Three colored line segments along +X, +Y and +Z.
pub struct AxesPipeline {
    pipeline: wgpu::RenderPipeline,
    vb: wgpu::Buffer,
    vertex_count: u32,
}

/// Line list for an axes indicator of the given length. Each axis fades from
/// its primary color at the origin towards a lighter tint at the tip.
pub fn axes_vertices(length: f32, origin: glam::Vec3) -> Vec<LineVertex> {
    let axes = [
        (glam::Vec3::X, [1.0, 0.0, 0.0], [1.0, 0.6, 0.0]),
        (glam::Vec3::Y, [0.0, 1.0, 0.0], [0.6, 1.0, 0.0]),
        (glam::Vec3::Z, [0.0, 0.0, 1.0], [0.0, 0.6, 1.0]),
    ];

    axes.iter()
        .flat_map(|&(dir, base, tip)| {
            [
                LineVertex { position: origin.to_array(), color: base },
                LineVertex { position: (origin + dir * length).to_array(), color: tip },
            ]
        })
        .collect()
}

impl AxesPipeline {
    /// Room for this many helpers before the vertex buffer has to grow.
    const INITIAL_HELPERS: usize = 1;

    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        color_fmt: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let shader = shader_with_frame(device, "Axes WGSL", AXES_WGSL);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Axes Pipeline Layout"),
            bind_group_layouts: &[frame_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Axes Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &LINE_ATTRS,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(opaque_depth_state()),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
        });

        let vb = Self::create_buffer(device, Self::INITIAL_HELPERS * 6);

        Self {
            pipeline,
            vb,
            vertex_count: 0,
        }
    }

    fn create_buffer(device: &wgpu::Device, vertices: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Axes VB"),
            size: (vertices.max(1) * std::mem::size_of::<LineVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, vertices: &[LineVertex]) {
        let needed = (vertices.len() * std::mem::size_of::<LineVertex>()) as u64;
        if needed > self.vb.size() {
            self.vb = Self::create_buffer(device, vertices.len().next_power_of_two());
        }
        if !vertices.is_empty() {
            queue.write_buffer(&self.vb, 0, bytemuck::cast_slice(vertices));
        }
        self.vertex_count = vertices.len() as u32;
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame_bind: &'a wgpu::BindGroup) {
        if self.vertex_count == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame_bind, &[]);
        rpass.set_vertex_buffer(0, self.vb.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }
}

pub const AXES_WGSL: &str = r#"
struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) view_depth: f32,
};

@vertex
fn vs_main(v: VsIn) -> VsOut {
    var out: VsOut;
    out.clip = F.view_proj * vec4<f32>(v.position, 1.0);
    out.color = v.color;
    out.view_depth = -(F.view * vec4<f32>(v.position, 1.0)).z;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(apply_fog(in.color, in.view_depth), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_segment_per_axis() {
        let v = axes_vertices(5.0, glam::Vec3::ZERO);
        assert_eq!(v.len(), 6);
        assert_eq!(v[1].position, [5.0, 0.0, 0.0]);
        assert_eq!(v[3].position, [0.0, 5.0, 0.0]);
        assert_eq!(v[5].position, [0.0, 0.0, 5.0]);
        assert_eq!(v[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(v[2].color, [0.0, 1.0, 0.0]);
        assert_eq!(v[4].color, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn follows_helper_origin() {
        let v = axes_vertices(1.0, glam::Vec3::new(1.0, 2.0, 3.0));
        assert!(v.iter().step_by(2).all(|p| p.position == [1.0, 2.0, 3.0]));
        assert_eq!(v[5].position, [1.0, 2.0, 4.0]);
    }
}
