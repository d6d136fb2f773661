use super::{opaque_depth_state, shader_with_frame};
use crate::{
    data::types::{MarkerInstance, MeshVertex},
    renderer::geometry::SphereGeometry,
};
use wgpu::util::DeviceExt;

const MESH_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

// translation, radius, color, roughness, metalness
const INSTANCE_ATTRS: [wgpu::VertexAttribute; 5] =
    wgpu::vertex_attr_array![2 => Float32x3, 3 => Float32, 4 => Float32x3, 5 => Float32, 6 => Float32];

/// Draws every marker as an instance of one shared unit sphere.
pub struct MarkerPipeline {
    pipeline: wgpu::RenderPipeline,
    mesh_vb: wgpu::Buffer,
    mesh_ib: wgpu::Buffer,
    index_count: u32,
    /// Tessellation the current mesh was built with.
    segments: (u32, u32),
    instance_buf: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: u32,
}

impl MarkerPipeline {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        color_fmt: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let shader = shader_with_frame(device, "Marker WGSL", MARKER_WGSL);

        let vbuf_layouts = [
            // Sphere vertices
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<MeshVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &MESH_ATTRS,
            },
            // Per-marker instances
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<MarkerInstance>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &INSTANCE_ATTRS,
            },
        ];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Marker Pipeline Layout"),
            bind_group_layouts: &[frame_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Marker Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &vbuf_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
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

        let (segments, mesh_vb, mesh_ib, index_count) = Self::build_mesh(device, (32, 32));
        let instance_capacity = 16;
        let instance_buf = Self::create_instance_buffer(device, instance_capacity);

        Self {
            pipeline,
            mesh_vb,
            mesh_ib,
            index_count,
            segments,
            instance_buf,
            instance_capacity,
            instance_count: 0,
        }
    }

    fn build_mesh(
        device: &wgpu::Device,
        segments: (u32, u32),
    ) -> ((u32, u32), wgpu::Buffer, wgpu::Buffer, u32) {
        let sphere = SphereGeometry::new(1.0, segments.0, segments.1);
        let vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker Sphere VB"),
            contents: bytemuck::cast_slice(&sphere.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ib = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker Sphere IB"),
            contents: bytemuck::cast_slice(&sphere.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        (segments, vb, ib, sphere.indices.len() as u32)
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Marker Instances"),
            size: (capacity * std::mem::size_of::<MarkerInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Rebuilds the shared sphere if the requested tessellation changed.
    pub fn set_segments(&mut self, device: &wgpu::Device, segments: (u32, u32)) {
        if segments != self.segments {
            log::debug!("Rebuilding marker sphere at {}x{} segments", segments.0, segments.1);
            let (segments, vb, ib, count) = Self::build_mesh(device, segments);
            self.segments = segments;
            self.mesh_vb = vb;
            self.mesh_ib = ib;
            self.index_count = count;
        }
    }

    /// Uploads this frame's instances, growing the buffer when needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[MarkerInstance]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buf = Self::create_instance_buffer(device, self.instance_capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buf, 0, bytemuck::cast_slice(instances));
        }
        self.instance_count = instances.len() as u32;
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame_bind: &'a wgpu::BindGroup) {
        if self.instance_count == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame_bind, &[]);
        rpass.set_vertex_buffer(0, self.mesh_vb.slice(..));
        rpass.set_vertex_buffer(1, self.instance_buf.slice(..));
        rpass.set_index_buffer(self.mesh_ib.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count, 0, 0..self.instance_count);
    }
}

pub const MARKER_WGSL: &str = r#"
struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceIn {
    @location(2) translation: vec3<f32>,
    @location(3) radius: f32,
    @location(4) color: vec3<f32>,
    @location(5) roughness: f32,
    @location(6) metalness: f32,
};

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
    @location(3) material: vec2<f32>, // roughness, metalness
    @location(4) view_depth: f32,
};

@vertex
fn vs_main(v: VsIn, i: InstanceIn) -> VsOut {
    let world = v.position * i.radius + i.translation;
    var out: VsOut;
    out.clip = F.view_proj * vec4<f32>(world, 1.0);
    out.world_pos = world;
    out.normal = v.normal;
    out.color = i.color;
    out.material = vec2<f32>(i.roughness, i.metalness);
    out.view_depth = -(F.view * vec4<f32>(world, 1.0)).z;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let v = normalize(F.camera_pos - in.world_pos);
    let l = F.light_dir.xyz;
    let h = normalize(l + v);

    let roughness = clamp(in.material.x, 0.04, 1.0);
    let metalness = clamp(in.material.y, 0.0, 1.0);
    let diffuse = in.color * (1.0 - metalness);
    let f0 = mix(vec3<f32>(0.04), in.color, metalness);

    // Normalized Blinn-Phong lobe; rougher surfaces get a wider, dimmer highlight.
    let a = roughness * roughness;
    let shininess = max(2.0 / (a * a) - 2.0, 1.0);
    let spec = f0 * pow(max(dot(n, h), 0.0), shininess) * (shininess + 2.0) / 8.0;

    let n_dot_l = max(dot(n, l), 0.0);
    let lit = diffuse * F.ambient.rgb + (diffuse + spec) * F.light_color.rgb * n_dot_l;
    return vec4<f32>(apply_fog(lit, in.view_depth), 1.0);
}
"#;
