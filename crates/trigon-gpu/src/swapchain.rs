//! Swapchain management.

use crate::context::GpuContext;
use crate::device::QueueFamilyIndices;
use crate::error::{GpuError, Result};
use ash::vk;

/// Swapchain wrapper.
pub struct Swapchain {
    pub loader: ash::khr::swapchain::Device,
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the context's surface.
    ///
    /// `width`/`height` is the window's framebuffer size, used only when the
    /// surface leaves the extent up to the application.
    ///
    /// # Safety
    /// The GPU context must be valid. `old_swapchain`, if given, must belong to
    /// the same surface.
    pub unsafe fn new(
        gpu: &GpuContext,
        width: u32,
        height: u32,
        vsync: bool,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let support = gpu.surface().support(gpu.physical_device())?;

        let surface_format = select_surface_format(&support.formats)
            .ok_or_else(|| GpuError::SwapchainCreation("surface reports no formats".into()))?;
        let present_mode = select_present_mode(&support.present_modes, vsync);
        let extent = calculate_extent(&support.capabilities, width, height);
        let image_count = select_image_count(&support.capabilities);

        let queue_families = gpu.queue_families();
        let (sharing_mode, family_indices) = sharing_mode(&queue_families);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(gpu.surface().surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        let loader = ash::khr::swapchain::Device::new(gpu.instance(), gpu.device());

        let swapchain = loader
            .create_swapchain(&create_info, None)
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let images = loader.get_swapchain_images(swapchain)?;

        let mut image_views = Vec::with_capacity(images.len());
        for &image in &images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(surface_format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            match gpu.device().create_image_view(&view_info, None) {
                Ok(view) => image_views.push(view),
                Err(e) => {
                    for &view in &image_views {
                        gpu.device().destroy_image_view(view, None);
                    }
                    loader.destroy_swapchain(swapchain, None);
                    return Err(e.into());
                }
            }
        }

        tracing::debug!(
            "Swapchain: {:?} {:?}, {:?}, {} images",
            surface_format.format,
            surface_format.color_space,
            present_mode,
            images.len()
        );

        Ok(Self {
            loader,
            swapchain,
            images,
            image_views,
            format: surface_format.format,
            extent,
        })
    }

    /// Acquire the next image.
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    /// `ERROR_OUT_OF_DATE_KHR` maps to [`GpuError::SwapchainOutOfDate`].
    ///
    /// # Safety
    /// The semaphore must be unsignaled with no pending operations.
    pub unsafe fn acquire_next_image(
        &self,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<(u32, bool)> {
        let result =
            self.loader
                .acquire_next_image(self.swapchain, timeout_ns, semaphore, vk::Fence::null());

        match result {
            Ok((index, suboptimal)) => Ok((index, suboptimal)),
            // OUT_OF_DATE means no image was acquired; caller must recreate the swapchain.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(GpuError::SwapchainOutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Present an image.
    ///
    /// Returns `true` if the swapchain should be recreated.
    ///
    /// # Safety
    /// The image index must come from [`Self::acquire_next_image`].
    pub unsafe fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = self.loader.queue_present(queue, &present_info);

        match result {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Destroy the image views and the swapchain.
    ///
    /// # Safety
    /// The swapchain and its views must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for &view in &self.image_views {
            device.destroy_image_view(view, None);
        }
        self.loader.destroy_swapchain(self.swapchain, None);
    }
}

/// Select the best surface format.
///
/// Prefers 8-bit BGRA sRGB; otherwise takes the first format reported.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_SRGB
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first())
        .copied()
}

/// Select the best present mode.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if !vsync && available.contains(&vk::PresentModeKHR::MAILBOX) {
        return vk::PresentModeKHR::MAILBOX;
    }

    // FIFO is always supported
    vk::PresentModeKHR::FIFO
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One image more than the minimum, capped by the maximum (0 means no cap).
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        image_count
    }
}

/// Image sharing between the graphics and present families.
///
/// Separate families share images concurrently so no ownership transfers are
/// needed.
pub fn sharing_mode(queue_families: &QueueFamilyIndices) -> (vk::SharingMode, Vec<u32>) {
    match (queue_families.graphics, queue_families.present) {
        (Some(graphics), Some(present)) if graphics != present => {
            (vk::SharingMode::CONCURRENT, vec![graphics, present])
        }
        _ => (vk::SharingMode::EXCLUSIVE, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn srgb_format_is_preferred() {
        let available = [
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = select_surface_format(&available).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn first_format_is_fallback() {
        let available = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        let chosen = select_surface_format(&available).unwrap();
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
        assert!(select_surface_format(&[]).is_none());
    }

    #[test]
    fn mailbox_without_vsync() {
        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(select_present_mode(&available, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(select_present_mode(&available, true), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn fifo_when_mailbox_missing() {
        let available = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(select_present_mode(&available, false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn current_extent_wins() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            ..Default::default()
        };
        let extent = calculate_extent(&caps, 800, 600);
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn undefined_extent_is_clamped() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 640,
                height: 4096,
            },
            ..Default::default()
        };
        let extent = calculate_extent(&caps, 800, 600);
        assert_eq!((extent.width, extent.height), (640, 600));
    }

    #[test]
    fn image_count_respects_maximum() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(select_image_count(&caps), 3);

        caps.max_image_count = 2;
        assert_eq!(select_image_count(&caps), 2);

        caps.max_image_count = 8;
        assert_eq!(select_image_count(&caps), 3);
    }

    #[test]
    fn split_families_share_concurrently() {
        let split = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(2),
        };
        assert_eq!(
            sharing_mode(&split),
            (vk::SharingMode::CONCURRENT, vec![0, 2])
        );

        let shared = QueueFamilyIndices {
            graphics: Some(1),
            present: Some(1),
        };
        assert_eq!(sharing_mode(&shared), (vk::SharingMode::EXCLUSIVE, vec![]));
    }
}
