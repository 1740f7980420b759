//! # Rendering System
//!
//! Presentation is decoupled from simulation. After the ticks of a frame the
//! engine hands every system a [`RenderFrame`] carrying the interpolation
//! factor; render systems blend each entity's previous and current pose with
//! it and pass the result to a [`RenderBackend`].
//!
//! Render code only reads simulation state.

pub mod backend;
pub mod log_backend;
pub mod render_system;

pub use backend::RenderBackend;
pub use log_backend::LogBackend;
pub use render_system::RenderSystem;

/// Per-frame presentation data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    /// Fractional progress through the next pending tick, in `0..=1`
    pub alpha: f32,
    /// Simulated seconds so far
    pub elapsed: f64,
    /// Frame counter, starting at 1
    pub frame: u64,
}
