//! Render pass creation.

use crate::error::Result;
use ash::vk;

/// Single-subpass render pass that clears and presents one color attachment.
pub struct RenderPass {
    pub render_pass: vk::RenderPass,
    pub color_format: vk::Format,
}

impl RenderPass {
    /// Create a render pass for swapchain images of `color_format`.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, color_format: vk::Format) -> Result<Self> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let color_refs = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);

        // The layout transition must wait until the acquired image is released
        // by the presentation engine.
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

        let attachments = [color_attachment];
        let subpasses = [subpass];
        let dependencies = [dependency];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = device.create_render_pass(&create_info, None)?;

        Ok(Self {
            render_pass,
            color_format,
        })
    }

    /// Destroy the render pass.
    ///
    /// # Safety
    /// No framebuffer or pipeline created against it may still be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_render_pass(self.render_pass, None);
    }
}
