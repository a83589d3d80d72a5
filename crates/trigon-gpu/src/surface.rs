//! Window surface management.
//!
//! Wraps the Vulkan surface created for a window and the queries made against
//! it during device selection and swapchain creation.

use crate::device::SwapchainSupport;
use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// A presentable window surface.
pub struct Surface {
    /// The Vulkan surface handle.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Create a surface for a window.
    ///
    /// # Safety
    /// The instance must be valid and must outlive the surface. The window
    /// must outlive the surface as well.
    pub unsafe fn new<W>(entry: &ash::Entry, instance: &ash::Instance, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let surface = ash_window::create_surface(
            entry,
            instance,
            display.as_raw(),
            window_handle.as_raw(),
            None,
        )
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let loader = ash::khr::surface::Instance::new(entry, instance);

        Ok(Self { surface, loader })
    }

    /// Whether `queue_family` of `physical_device` can present to this surface.
    ///
    /// # Safety
    /// The physical device must belong to the instance that created the surface.
    pub unsafe fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<bool> {
        let supported = self.loader.get_physical_device_surface_support(
            physical_device,
            queue_family,
            self.surface,
        )?;
        Ok(supported)
    }

    /// Query capabilities, formats, and present modes for a device.
    ///
    /// # Safety
    /// The physical device must belong to the instance that created the surface.
    pub unsafe fn support(&self, physical_device: vk::PhysicalDevice) -> Result<SwapchainSupport> {
        let capabilities = self
            .loader
            .get_physical_device_surface_capabilities(physical_device, self.surface)?;

        let formats = self
            .loader
            .get_physical_device_surface_formats(physical_device, self.surface)?;

        let present_modes = self
            .loader
            .get_physical_device_surface_present_modes(physical_device, self.surface)?;

        Ok(SwapchainSupport {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// No swapchain created for this surface may still exist.
    pub unsafe fn destroy(&self) {
        self.loader.destroy_surface(self.surface, None);
    }
}
