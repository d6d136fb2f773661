use crate::{
    config::Config,
    data::Dataset,
    overlay::paint_labels,
    renderer::{Overlay, Renderer, RendererOptions},
    space::SemanticSpace,
    ui,
};
use anyhow::Result;
use std::sync::Arc;
use winit::{
    event::{ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

pub struct App {
    pub space: SemanticSpace<Renderer>,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub show_hud: bool,
    point_count: usize,
}

impl App {
    pub async fn new(window: Arc<Window>, config: &Config, dataset: &Dataset) -> Result<Self> {
        let options = RendererOptions {
            antialias: !config.no_antialias,
        };
        let renderer = Renderer::new(window.clone(), options).await?;
        let size = renderer.gfx.size;

        let space = SemanticSpace::new(renderer, size.width, size.height, dataset)?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        Ok(Self {
            space,
            egui_ctx,
            egui_state,
            show_hud: !config.hide_hud,
            point_count: dataset.len(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.space.resize(new_size.width, new_size.height);
    }

    /// Returns true if egui consumed the event.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        self.space.handle_event(event);

        match event {
            WindowEvent::Resized(physical_size) => self.resize(*physical_size),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && !event.repeat
                    && event.physical_key == PhysicalKey::Code(KeyCode::KeyH) =>
            {
                self.show_hud = !self.show_hud;
            }
            _ => {}
        }

        false
    }

    /// Recovers from a lost surface.
    pub fn reconfigure(&mut self) {
        log::warn!("Surface lost; reconfiguring");
        self.space.renderer.reconfigure();
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        self.space.tick()?;

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        paint_labels(&self.egui_ctx, self.space.label_renderer.labels());

        if self.show_hud {
            let camera = &self.space.camera;
            ui::draw_hud(
                &self.egui_ctx,
                self.point_count,
                camera.position.distance(camera.target),
                camera.position,
            );
        }

        let egui_output = self.egui_ctx.end_frame();
        self.egui_state
            .handle_platform_output(window, egui_output.platform_output);

        let pixels_per_point = self.egui_ctx.pixels_per_point();
        let shapes = self.egui_ctx.tessellate(egui_output.shapes, pixels_per_point);

        self.space.renderer.present(Some(Overlay {
            shapes: &shapes,
            textures_delta: &egui_output.textures_delta,
            pixels_per_point,
        }));

        Ok(())
    }
}
