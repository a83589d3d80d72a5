//! Swapchain framebuffers.

use crate::error::Result;
use ash::vk;

/// One framebuffer per swapchain image view.
pub struct Framebuffers {
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl Framebuffers {
    /// Create framebuffers binding each image view to `render_pass`.
    ///
    /// # Safety
    /// The device, render pass, and views must be valid and compatible.
    pub unsafe fn new(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        image_views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let mut framebuffers = Vec::with_capacity(image_views.len());

        for view in image_views {
            let attachments = [*view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            match device.create_framebuffer(&create_info, None) {
                Ok(framebuffer) => framebuffers.push(framebuffer),
                Err(e) => {
                    for &framebuffer in &framebuffers {
                        device.destroy_framebuffer(framebuffer, None);
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(Self { framebuffers })
    }

    /// Framebuffer for a swapchain image index.
    pub fn get(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    /// Destroy all framebuffers.
    ///
    /// # Safety
    /// The framebuffers must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for &framebuffer in &self.framebuffers {
            device.destroy_framebuffer(framebuffer, None);
        }
    }
}
