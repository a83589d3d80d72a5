//! Per-frame context for rendering.

use ash::vk;

/// Context for the current frame being rendered.
///
/// Provides access to the command buffer and the target of this frame.
pub struct FrameContext {
    /// Command buffer for recording rendering commands.
    pub command_buffer: vk::CommandBuffer,
    /// Framebuffer wrapping the acquired image.
    pub framebuffer: vk::Framebuffer,
    /// Size of the acquired image.
    pub extent: vk::Extent2D,
}
