//! The main rendering orchestrator. Owns the GPU context, render targets,
//! and the scene pipelines, and composites the egui overlay on top.

pub mod context;
pub mod geometry;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    pipelines::{
        axes::{axes_vertices, AxesPipeline},
        markers::MarkerPipeline,
    },
    targets::Targets,
};
use crate::{
    camera::PerspectiveCamera,
    data::types::{FrameUniform, LineVertex, MarkerInstance},
    scene::Scene,
};
use bytemuck::Zeroable;
use glam::Vec3;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Something that can draw a scene as seen through a camera onto a surface
/// of a known pixel size.
pub trait FrameRenderer {
    type Error;

    /// Sets the output surface size in physical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy)]
pub struct RendererOptions {
    /// Multisample the 3D pass (4x where the surface format allows it).
    pub antialias: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self { antialias: true }
    }
}

/// Tessellated egui output to composite over the current frame.
pub struct Overlay<'a> {
    pub shapes: &'a [egui::ClippedPrimitive],
    pub textures_delta: &'a egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Remembers which scene revision the GPU buffers were built from.
#[derive(Debug, Default)]
struct UploadStamp(Option<u64>);

impl UploadStamp {
    /// True (and records the revision) if `scene` differs from the last upload.
    fn refresh(&mut self, scene: &Scene) -> bool {
        let rev = scene.revision();
        if self.0 == Some(rev) {
            return false;
        }
        self.0 = Some(rev);
        true
    }
}

/// Owns all rendering-related state.
pub struct Renderer {
    pub gfx: GfxContext,
    pub targets: Targets,
    markers: MarkerPipeline,
    axes: AxesPipeline,
    egui_renderer: egui_wgpu::Renderer,
    frame_ubo: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,
    uploaded: UploadStamp,
    /// Rendered 3D frame waiting for the overlay and `present`.
    pending: Option<wgpu::SurfaceTexture>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, options: RendererOptions) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let size = gfx.size;

        let requested = if options.antialias { 4 } else { 1 };
        let sample_count = gfx.supported_sample_count(requested);
        if sample_count != requested {
            log::warn!(
                "{}x MSAA not supported for {:?}; using {}x",
                requested,
                gfx.config.format,
                sample_count
            );
        }
        let targets = Targets::new(&gfx.device, size, gfx.config.format, sample_count);

        let frame_layout = gfx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame BGL"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<FrameUniform>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let frame_ubo = gfx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Frame UBO"),
                contents: bytemuck::bytes_of(&FrameUniform::zeroed()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let frame_bind = gfx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BG"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_ubo.as_entire_binding(),
            }],
        });

        let markers = MarkerPipeline::new(&gfx.device, &frame_layout, targets.color_fmt, sample_count);
        let axes = AxesPipeline::new(&gfx.device, &frame_layout, targets.color_fmt, sample_count);

        // The overlay draws single-sampled straight into the swap chain.
        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            targets,
            markers,
            axes,
            egui_renderer,
            frame_ubo,
            frame_bind,
            uploaded: UploadStamp::default(),
            pending: None,
        })
    }

    /// Reapplies the surface configuration after `SurfaceError::Lost`.
    pub fn reconfigure(&mut self) {
        self.pending = None;
        self.gfx.reconfigure();
    }

    fn frame_uniform(scene: &Scene, camera: &PerspectiveCamera) -> FrameUniform {
        let (light_dir, light_color) = scene.key_light().unwrap_or((Vec3::Y, Vec3::ZERO));
        let (fog_color, fog_params) = match scene.fog {
            Some(fog) => {
                let [r, g, b] = fog.color.to_linear_f32();
                ([r, g, b, 1.0], [fog.near, fog.far, 1.0, 0.0])
            }
            None => ([0.0; 4], [0.0; 4]),
        };

        FrameUniform {
            view_proj: camera.view_proj().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            _pad0: 0.0,
            ambient: scene.ambient_radiance().extend(0.0).to_array(),
            light_dir: light_dir.extend(0.0).to_array(),
            light_color: light_color.extend(0.0).to_array(),
            fog_color,
            fog_params,
        }
    }

    fn upload_scene(&mut self, scene: &Scene) {
        let device = &self.gfx.device;
        let queue = &self.gfx.queue;

        let mut segments = None;
        let instances: Vec<MarkerInstance> = scene
            .markers()
            .filter_map(|(id, m)| {
                segments.get_or_insert((m.width_segments, m.height_segments));
                let at = scene.world_position(id).ok()?;
                Some(MarkerInstance {
                    translation: at.to_array(),
                    radius: m.radius,
                    color: m.material.color.to_linear_f32(),
                    roughness: m.material.roughness,
                    metalness: m.material.metalness,
                })
            })
            .collect();
        if let Some(segments) = segments {
            self.markers.set_segments(device, segments);
        }
        self.markers.upload(device, queue, &instances);

        let lines: Vec<LineVertex> = scene
            .axes()
            .filter_map(|(id, a)| Some(axes_vertices(a.length, scene.world_position(id).ok()?)))
            .flatten()
            .collect();
        self.axes.upload(device, queue, &lines);
    }

    /// Draws `overlay` over the rendered frame and presents it.
    /// Does nothing beyond texture bookkeeping if no frame is pending.
    pub fn present(&mut self, overlay: Option<Overlay<'_>>) {
        if let Some(ov) = &overlay {
            for (id, delta) in &ov.textures_delta.set {
                self.egui_renderer
                    .update_texture(&self.gfx.device, &self.gfx.queue, *id, delta);
            }
        }

        if let Some(frame) = self.pending.take() {
            if let Some(ov) = &overlay {
                let swap_view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [self.gfx.config.width, self.gfx.config.height],
                    pixels_per_point: ov.pixels_per_point,
                };

                let mut encoder =
                    self.gfx
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("UI Encoder"),
                        });

                self.egui_renderer.update_buffers(
                    &self.gfx.device,
                    &self.gfx.queue,
                    &mut encoder,
                    ov.shapes,
                    &screen_descriptor,
                );

                {
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("EGUI Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &swap_view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });

                    self.egui_renderer
                        .render(&mut render_pass, ov.shapes, &screen_descriptor);
                }

                self.gfx.queue.submit(std::iter::once(encoder.finish()));
            }
            frame.present();
        }

        if let Some(ov) = &overlay {
            for id in &ov.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }
    }
}

impl FrameRenderer for Renderer {
    type Error = wgpu::SurfaceError;

    fn set_size(&mut self, width: u32, height: u32) {
        let size = winit::dpi::PhysicalSize::new(width, height);
        if width > 0 && height > 0 {
            self.gfx.resize(size);
            self.targets.resize(&self.gfx.device, size);
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.gfx.size.width, self.gfx.size.height)
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Self::Error> {
        // A frame nobody presented would hold the swap chain; flush it first.
        if let Some(stale) = self.pending.take() {
            stale.present();
        }

        let frame = self.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = Self::frame_uniform(scene, camera);
        self.gfx
            .queue
            .write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(&uniform));
        if self.uploaded.refresh(scene) {
            log::debug!("Uploading scene revision {}", scene.revision());
            self.upload_scene(scene);
        }

        let [r, g, b] = scene.background.to_linear_f32();
        let clear = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };

        let (view, resolve_target) = match &self.targets.msaa {
            Some(msaa) => (msaa, Some(&swap_view)),
            None => (&swap_view, None),
        };

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        // The multisampled buffer is only needed until it resolves.
                        store: if resolve_target.is_some() {
                            wgpu::StoreOp::Discard
                        } else {
                            wgpu::StoreOp::Store
                        },
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.axes.draw(&mut pass, &self.frame_bind);
            self.markers.draw(&mut pass, &self.frame_bind);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        self.pending = Some(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Rgb,
        scene::{Label, NodeKind},
    };

    #[test]
    fn static_scene_is_uploaded_once() {
        let mut scene = Scene::new(Rgb::BLACK);
        let id = scene.add(NodeKind::Label(Label::new("a")), Vec3::ZERO);

        let mut stamp = UploadStamp::default();
        assert!(stamp.refresh(&scene));
        for _ in 0..10 {
            assert!(!stamp.refresh(&scene));
        }

        scene.get_mut(id).unwrap().position = Vec3::ONE;
        assert!(stamp.refresh(&scene));
        assert!(!stamp.refresh(&scene));

        // A different scene swapped in is never mistaken for the old one.
        assert!(stamp.refresh(&Scene::new(Rgb::BLACK)));
    }
}
