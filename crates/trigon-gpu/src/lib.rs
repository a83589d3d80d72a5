//! Vulkan setup layer for the Trigon triangle renderer.
//!
//! This crate provides:
//! - Instance creation with optional validation layers
//! - A debug messenger that forwards validation output to `tracing`
//! - Physical device rating and logical device creation
//! - Surface and swapchain handling
//! - Render pass, graphics pipeline, and framebuffer creation
//! - Command buffer and synchronization helpers

pub mod command;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod instance;
pub mod pipeline;
pub mod render_pass;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use command::CommandPool;
pub use context::{GpuContext, GpuContextBuilder};
pub use debug::DebugMessenger;
pub use device::{DeviceProfile, QueueFamilyIndices, SwapchainSupport};
pub use error::{GpuError, Result};
pub use framebuffer::Framebuffers;
pub use pipeline::{load_spirv, GraphicsPipeline, GraphicsPipelineConfig};
pub use render_pass::RenderPass;
pub use surface::Surface;
pub use swapchain::Swapchain;
pub use sync::{create_fence, create_semaphore, FrameCursor, FrameSync, FrameSyncManager};
