pub mod gpu;
pub mod mesh;
pub mod pipeline;
pub mod window;

use glam::Mat4;

use crate::error::Result;
use crate::layout::Viewport;

pub use window::{BarWindow, WindowOptions};

/// Drawing surface the render loop talks to.
pub trait Canvas {
    /// Processes pending window events. True once the host asked to close.
    fn poll_close_requested(&mut self) -> bool;

    fn viewport(&self) -> Viewport;

    fn begin_frame(&mut self);

    /// Queues the shared unit mesh with the given model-view transform and colour.
    fn draw_mesh(&mut self, model_view: &Mat4, color: [f32; 4]);

    fn present(&mut self) -> Result<()>;
}
