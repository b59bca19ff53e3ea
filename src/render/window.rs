use std::sync::Arc;
use std::time::Duration;

use glam::Mat4;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use super::gpu::GpuContext;
use super::mesh::mesh_for;
use super::pipeline::{BarInstance, BarPipeline, SceneUniforms};
use super::Canvas;
use crate::error::{Result, VisualizerError};
use crate::layout::{BarMode, Viewport};

#[derive(Clone, Debug)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub mode: BarMode,
    /// Instance buffer size hint; one instance per drawn bar.
    pub max_bars: usize,
}

#[derive(Default)]
struct WindowHandler {
    attributes: Option<WindowAttributes>,
    window: Option<Arc<Window>>,
    error: Option<String>,
    close_requested: bool,
    resized: Option<PhysicalSize<u32>>,
}

impl ApplicationHandler for WindowHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attributes) = self.attributes.take() else {
            return;
        };
        match event_loop.create_window(attributes) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => self.close_requested = true,
            WindowEvent::Resized(size) => self.resized = Some(size),
            _ => {}
        }
    }
}

/// Window plus GPU state. Events are pumped from [`Canvas::poll_close_requested`],
/// so the caller's loop owns the thread.
pub struct BarWindow {
    // GPU state drops before the window, the window before its event loop.
    pipeline: BarPipeline,
    gpu: GpuContext,
    instances: Vec<BarInstance>,
    shaded: bool,
    window: Arc<Window>,
    handler: WindowHandler,
    event_loop: EventLoop<()>,
}

impl BarWindow {
    pub fn open(options: &WindowOptions) -> Result<Self> {
        let mut event_loop = EventLoop::new()
            .map_err(|e| VisualizerError::setup(format!("failed to create event loop: {e}")))?;

        let mut handler = WindowHandler {
            attributes: Some(
                Window::default_attributes()
                    .with_title(options.title.clone())
                    .with_inner_size(LogicalSize::new(options.width, options.height))
                    .with_resizable(false),
            ),
            ..Default::default()
        };

        // The window can only be created once the loop reports it has resumed.
        for _ in 0..200 {
            if handler.window.is_some() || handler.error.is_some() {
                break;
            }
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(Duration::from_millis(5)), &mut handler)
            {
                return Err(VisualizerError::setup(format!(
                    "event loop exited during startup ({code})"
                )));
            }
        }

        if let Some(err) = handler.error.take() {
            return Err(VisualizerError::setup(format!("failed to create window: {err}")));
        }
        let window = handler
            .window
            .clone()
            .ok_or_else(|| VisualizerError::setup("window was never created"))?;

        let gpu = GpuContext::new(Arc::clone(&window))?;
        let pipeline = BarPipeline::new(&gpu, &mesh_for(options.mode), options.max_bars);

        log::info!(
            "Window {}x{} ({:?} bars)",
            gpu.config.width,
            gpu.config.height,
            options.mode
        );

        Ok(Self {
            event_loop,
            handler,
            window,
            pipeline,
            gpu,
            shaded: options.mode == BarMode::Cube,
            instances: Vec::with_capacity(options.max_bars),
        })
    }

    fn apply_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.gpu.resize(size.width, size.height);
        self.pipeline.resize(&self.gpu);
        log::debug!("Resized to {}x{}", size.width, size.height);
    }
}

impl Canvas for BarWindow {
    fn poll_close_requested(&mut self) -> bool {
        if let PumpStatus::Exit(_) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler)
        {
            return true;
        }
        if let Some(size) = self.handler.resized.take() {
            self.apply_resize(size);
        }
        self.handler.close_requested
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.gpu.config.width, self.gpu.config.height)
    }

    fn begin_frame(&mut self) {
        self.instances.clear();
    }

    fn draw_mesh(&mut self, model_view: &Mat4, color: [f32; 4]) {
        self.instances.push(BarInstance::new(model_view, color));
    }

    fn present(&mut self) -> Result<()> {
        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out, dropping frame");
                return Ok(());
            }
            Err(e) => return Err(VisualizerError::setup(format!("surface error: {e}"))),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let uniforms = SceneUniforms::new(self.viewport().projection(), self.shaded);

        self.pipeline
            .render(&self.gpu, &view, &uniforms, &self.instances);
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }
}
