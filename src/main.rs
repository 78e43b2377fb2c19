use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use citygml3d::citygml::{DocumentLoader, LoadStatus};
use citygml3d::config::{Args, ViewerConfig};
use citygml3d::error::Error;
use citygml3d::geometry::BoundingBox;
use citygml3d::renderer::camera::DEFAULT_FAR_PLANE;
use citygml3d::renderer::{CameraController, GpuState, MeshBatch};
use citygml3d::ui::{PanelView, UiActions, UiState, apply_theme, draw_help_overlay, draw_side_panel};

/// Browser-style pixels per wheel line.
const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Default)]
struct InputState {
    orbiting: bool,
    panning: bool,
    last_cursor: Option<Vec2>,
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    config: ViewerConfig,
    title: String,
    camera: CameraController,
    loader: DocumentLoader,
    status: LoadStatus,
    mesh_uploaded: bool,
    ui_state: UiState,
    input: InputState,

    frame_count: u32,
    fps_timer: Instant,
    last_vsync_state: bool,

    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(loader: DocumentLoader, config: ViewerConfig, document_name: String) -> Self {
        Self {
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera: CameraController::new(&config),
            status: loader.status(),
            loader,
            mesh_uploaded: false,
            ui_state: UiState::new(document_name.clone(), config.vsync),
            input: InputState::default(),

            frame_count: 0,
            fps_timer: Instant::now(),
            last_vsync_state: config.vsync,

            title: format!("CityGML 3D - {}", document_name),
            config,
            fatal: None,
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> citygml3d::Result<()> {
        let gpu = pollster::block_on(GpuState::new(window.clone(), self.config.vsync))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        let size = window.inner_size();
        self.camera.set_aspect(size.width, size.height);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
        self.sync_camera();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.fatal = Some(error);
        event_loop.exit();
    }

    /// Pushes the camera uniform if a handler moved the camera.
    fn sync_camera(&mut self) {
        if !self.camera.take_dirty() {
            return;
        }
        if let Some(gpu) = &self.gpu {
            gpu.update_camera(&self.camera);
        }
    }

    fn frame_document(&mut self) {
        let bounds = self.loader.context().bounds();
        let (distance, far_plane) = framing(bounds);
        self.camera.frame(distance, far_plane);
        self.sync_camera();
    }

    fn update(&mut self) {
        self.frame_count += 1;
        let elapsed = self.fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            self.ui_state.fps = self.frame_count as f32 / elapsed;
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }

        self.status = self.loader.pump();

        if self.status.is_done() && !self.mesh_uploaded {
            let Some(gpu) = &mut self.gpu else { return };

            let context = self.loader.context();
            let batch = MeshBatch::from_meshes(context.meshes(), context.bounds().center());
            gpu.upload_mesh(&batch);
            self.mesh_uploaded = true;
            self.frame_document();
        }
    }

    fn render(&mut self) -> citygml3d::Result<()> {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return Ok(());
        };

        let raw_input = egui_state.take_egui_input(window);

        let vertex_count = self.gpu.as_ref().map_or(0, GpuState::vertex_count);
        let distance = self.camera.distance();
        let elevation = self.camera.elevation();
        let context = self.loader.context();
        let view = PanelView {
            status: &self.status,
            progress: self.loader.progress(),
            stats: context.stats(),
            bounds: context.bounds(),
            camera_distance: distance,
            vertex_count,
        };

        let mut ui_actions = UiActions::default();
        let ui_state = &mut self.ui_state;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(ctx, ui_state, &view);

            if ui_state.show_help {
                draw_help_overlay(ctx, distance, elevation);
            }
        });

        if ui_actions.reset_view {
            self.frame_document();
        }

        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };
        let Some(window) = &self.window else {
            return Ok(());
        };
        let Some(egui_state) = &mut self.egui_state else {
            return Ok(());
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return Ok(());
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        if self.ui_state.vsync_enabled != self.last_vsync_state {
            gpu.set_vsync(self.ui_state.vsync_enabled);
            self.last_vsync_state = self.ui_state.vsync_enabled;
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(Error::Surface(e)),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_mesh(&view, &mut encoder);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
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

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
        Ok(())
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        let position = Vec2::new(position.x as f32, position.y as f32);
        let Some(last) = self.input.last_cursor.replace(position) else {
            return;
        };
        let delta = position - last;

        if self.input.orbiting {
            self.camera.orbit(delta.x, delta.y);
        } else if self.input.panning {
            self.camera.pan(delta.x, delta.y);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(PhysicalSize::new(1600, 900));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("creating window"));
                return;
            }
        };

        if let Err(e) = self.init_gpu(window) {
            self.fail(event_loop, anyhow::Error::new(e));
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(egui_state) = &mut self.egui_state {
            if let Some(window) = &self.window {
                let response = egui_state.on_window_event(window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                }
                self.camera.set_aspect(size.width, size.height);
            }

            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.input.orbiting = pressed,
                    MouseButton::Right => self.input.panning = pressed,
                    _ => {}
                }
            }

            WindowEvent::CursorMoved { position, .. } => self.handle_cursor(position),

            WindowEvent::CursorLeft { .. } => self.input.last_cursor = None,

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
                    MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                };
                self.camera.dolly(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = self.render() {
                    self.fail(event_loop, anyhow::Error::new(e).context("rendering frame"));
                    return;
                }
            }

            _ => {}
        }

        self.sync_camera();
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Initial camera distance and far plane for a document's bounds.
fn framing(bounds: &BoundingBox) -> (f32, f32) {
    if bounds.is_empty() {
        return (1.0, DEFAULT_FAR_PLANE);
    }
    let distance = bounds.diagonal_edge_length() as f32;
    let far_plane = (bounds.diagonal() as f32 * 4.0).max(DEFAULT_FAR_PLANE);
    (distance, far_plane)
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_summary(mut loader: DocumentLoader, name: &str) -> Result<()> {
    let started = Instant::now();
    let status = loader.run_to_end();
    let progress = loader.progress();
    let stats = loader.stats().clone();
    let (meshes, bounds) = loader.into_parts();

    println!("{}", name);
    println!("  bytes read        {}", progress.consumed);
    println!("  polygons          {}", stats.polygons);
    println!("  triangles         {}", stats.triangles);
    println!("  meshes            {}", meshes.len());
    println!(
        "  roof/wall/floor   {}/{}/{}",
        stats.roof_polygons, stats.wall_polygons, stats.floor_polygons
    );
    println!("  degenerate        {}", stats.degenerate_polygons);
    println!("  invalid tokens    {}", stats.invalid_tokens);
    if bounds.is_empty() {
        println!("  bounds            (empty)");
    } else {
        let (lower, upper, center) = (bounds.lower(), bounds.upper(), bounds.center());
        println!("  lower             {:.3} {:.3} {:.3}", lower.x, lower.y, lower.z);
        println!("  upper             {:.3} {:.3} {:.3}", upper.x, upper.y, upper.z);
        println!("  center            {:.3} {:.3} {:.3}", center.x, center.y, center.z);
        println!("  diagonal          {:.3}", bounds.diagonal());
    }
    println!("  elapsed           {:.2?}", started.elapsed());

    match status {
        LoadStatus::Failed(message) => anyhow::bail!("document incomplete: {}", message),
        _ => Ok(()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ViewerConfig::from(&args);
    let name = document_name(&args.path);

    let loader = DocumentLoader::open(&args.path, &config)
        .with_context(|| format!("opening {}", args.path.display()))?;

    if args.summary {
        return run_summary(loader, &name);
    }

    let event_loop = EventLoop::new().context("creating event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(loader, config, name);
    event_loop.run_app(&mut app).context("running event loop")?;

    match app.fatal.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
