//! Offscreen attachments for the 3D pass: depth, and a multisampled color
//! buffer that resolves into the swap chain when antialiasing is on.

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct Targets {
    // Private textures – keep alive for the lifetime of the views.
    _depth_tex: wgpu::Texture,
    _msaa_tex: Option<wgpu::Texture>,

    pub depth: wgpu::TextureView,
    /// Multisampled color target; `None` renders straight into the frame.
    pub msaa: Option<wgpu::TextureView>,

    pub color_fmt: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl Targets {
    pub fn new(
        device: &wgpu::Device,
        size: winit::dpi::PhysicalSize<u32>,
        color_fmt: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let tex_size = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };

        let create_tex = |label: &str, format| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: tex_size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        };

        let depth_tex = create_tex("Scene Depth Target", DEPTH_FORMAT);
        let msaa_tex = (sample_count > 1).then(|| create_tex("Scene MSAA Color Target", color_fmt));

        Self {
            depth: depth_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            msaa: msaa_tex
                .as_ref()
                .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default())),
            _depth_tex: depth_tex,
            _msaa_tex: msaa_tex,
            color_fmt,
            sample_count,
        }
    }

    /// Recreates all targets at the new window size.
    pub fn resize(&mut self, device: &wgpu::Device, size: winit::dpi::PhysicalSize<u32>) {
        *self = Self::new(device, size, self.color_fmt, self.sample_count);
    }
}
