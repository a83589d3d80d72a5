//! The triangle draw.

use ash::vk;
use trigon_gpu::{GraphicsPipeline, GraphicsPipelineConfig, RenderPass};
use trigon_shaders::TRIANGLE_VERTEX_COUNT;

use crate::frame::FrameContext;

/// Viewport covering the whole extent with the full depth range.
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor covering the whole extent.
pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

/// Render pass and pipeline that draw the hard-coded triangle.
pub struct TrianglePass {
    pub render_pass: RenderPass,
    pub pipeline: GraphicsPipeline,
    config: GraphicsPipelineConfig,
    clear_color: [f32; 4],
}

impl TrianglePass {
    /// Create the render pass and pipeline for `color_format`.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        color_format: vk::Format,
        config: GraphicsPipelineConfig,
        clear_color: [f32; 4],
    ) -> anyhow::Result<Self> {
        let render_pass = RenderPass::new(device, color_format)?;

        let pipeline = match GraphicsPipeline::new(device, render_pass.render_pass, &config) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                render_pass.destroy(device);
                return Err(e.into());
            }
        };

        Ok(Self {
            render_pass,
            pipeline,
            config,
            clear_color,
        })
    }

    /// Color format the render pass was built for.
    pub fn color_format(&self) -> vk::Format {
        self.render_pass.color_format
    }

    /// Rebuild for a new swapchain format.
    ///
    /// # Safety
    /// The GPU must be idle.
    pub unsafe fn rebuild(&mut self, device: &ash::Device, color_format: vk::Format) -> anyhow::Result<()> {
        let rebuilt = Self::new(device, color_format, self.config.clone(), self.clear_color)?;
        self.destroy(device);
        *self = rebuilt;
        Ok(())
    }

    /// Record the triangle into the frame's command buffer.
    ///
    /// # Safety
    /// The command buffer must be in the recording state.
    pub unsafe fn record(&self, device: &ash::Device, frame: &FrameContext) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass.render_pass)
            .framebuffer(frame.framebuffer)
            .render_area(full_scissor(frame.extent))
            .clear_values(&clear_values);

        let cmd = frame.command_buffer;

        // SAFETY: Caller guarantees the command buffer is recording
        unsafe {
            device.cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline.pipeline);
            device.cmd_set_viewport(cmd, 0, &[full_viewport(frame.extent)]);
            device.cmd_set_scissor(cmd, 0, &[full_scissor(frame.extent)]);
            device.cmd_draw(cmd, TRIANGLE_VERTEX_COUNT, 1, 0, 0);
            device.cmd_end_render_pass(cmd);
        }
    }

    /// Destroy the pipeline and render pass.
    ///
    /// # Safety
    /// Neither may still be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        self.pipeline.destroy(device);
        self.render_pass.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_spans_extent() {
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let viewport = full_viewport(extent);
        assert_eq!((viewport.width, viewport.height), (800.0, 600.0));
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));

        let scissor = full_scissor(extent);
        assert_eq!((scissor.offset.x, scissor.offset.y), (0, 0));
        assert_eq!(scissor.extent, extent);
    }
}
