//! Window and frame loop for the Trigon triangle renderer.
//!
//! This crate handles:
//! - Window creation and the winit event loop
//! - GPU context initialization
//! - Swapchain creation and recreation
//! - Frame synchronization
//! - Recording and presenting the triangle each frame
//!
//! # Example
//!
//! ```no_run
//! use trigon_app::{run, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run(AppConfig::default().with_validation(true))
//! }
//! ```

mod config;
mod context;
mod frame;
mod runner;
mod triangle;

pub use config::AppConfig;
pub use context::AppContext;
pub use frame::FrameContext;
pub use runner::{init_logging, run};
pub use triangle::{full_scissor, full_viewport, TrianglePass};

// Re-export commonly used types for convenience
pub use trigon_gpu::{GpuContext, GpuContextBuilder};
