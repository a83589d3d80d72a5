//! GPU context management.

use crate::debug::DebugMessenger;
use crate::device::{
    pick_physical_device, required_device_extensions, DeviceProfile, QueueFamilyIndices,
};
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, validation_layers};
use crate::surface::Surface;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::c_char;

/// Main GPU context holding the instance-level and device-level handles.
///
/// Drop order is the reverse of creation: device, surface, debug messenger,
/// instance.
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) debug_messenger: Option<DebugMessenger>,
    pub(crate) surface: Surface,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) profile: DeviceProfile,
    pub(crate) device: ash::Device,

    pub(crate) queue_families: QueueFamilyIndices,
    pub(crate) graphics_queue_family: u32,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the selected device's profile.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Get the window surface.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Get the graphics and present queue families.
    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the present queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Get the graphics queue family index.
    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Whether validation layers and the debug messenger are active.
    pub fn validation_enabled(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            self.device.destroy_device(None);
            self.surface.destroy();
            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
        tracing::debug!("GPU context destroyed");
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Trigon".to_string(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Build the GPU context for a window.
    ///
    /// Runs instance, debug messenger, surface, physical device, and logical
    /// device creation in that order. Anything already created is released
    /// again if a later step fails.
    ///
    /// # Safety
    /// The window must outlive the returned context.
    pub unsafe fn build<W>(self, window: &W) -> Result<GpuContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        // Load Vulkan entry point
        let entry = ash::Entry::load().map_err(|e| GpuError::Loading(e.to_string()))?;

        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?
            .as_raw();

        let instance = create_instance(&entry, &self.app_name, display, self.enable_validation)?;

        self.build_on_instance(entry, instance, window)
    }

    unsafe fn build_on_instance<W>(
        self,
        entry: ash::Entry,
        instance: ash::Instance,
        window: &W,
    ) -> Result<GpuContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let debug_messenger = if self.enable_validation {
            match DebugMessenger::new(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    instance.destroy_instance(None);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let release_instance = |messenger: Option<DebugMessenger>| {
            if let Some(messenger) = messenger {
                messenger.destroy();
            }
            instance.destroy_instance(None);
        };

        let surface = match Surface::new(&entry, &instance, window) {
            Ok(surface) => surface,
            Err(e) => {
                release_instance(debug_messenger);
                return Err(e);
            }
        };

        let created = pick_physical_device(&instance, &surface).and_then(|candidate| {
            let device = create_device(
                &instance,
                candidate.physical_device,
                &candidate.queue_families,
                self.enable_validation,
            )?;
            Ok((candidate, device))
        });

        let (candidate, queues) = match created {
            Ok(created) => created,
            Err(e) => {
                surface.destroy();
                release_instance(debug_messenger);
                return Err(e);
            }
        };

        tracing::info!("Selected GPU: {}", candidate.profile.name);

        Ok(GpuContext {
            entry,
            instance,
            debug_messenger,
            surface,
            physical_device: candidate.physical_device,
            profile: candidate.profile,
            device: queues.device,
            queue_families: candidate.queue_families,
            graphics_queue_family: queues.graphics_family,
            graphics_queue: queues.graphics_queue,
            present_queue: queues.present_queue,
        })
    }
}

/// A logical device and the queues fetched from it.
struct DeviceQueues {
    device: ash::Device,
    graphics_family: u32,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
}

/// Create the logical device and retrieve queues.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_families: &QueueFamilyIndices,
    enable_validation: bool,
) -> Result<DeviceQueues> {
    let graphics = queue_families.graphics.ok_or(GpuError::NoSuitableDevice)?;
    let present = queue_families.present.ok_or(GpuError::NoSuitableDevice)?;

    // One queue per unique family
    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extensions = required_device_extensions();
    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    // Device layers are ignored by current loaders but older ones still read them
    let layers = if enable_validation {
        validation_layers()
    } else {
        vec![]
    };
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default();

    #[allow(deprecated)]
    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .enabled_features(&features);

    let device = instance.create_device(physical_device, &device_create_info, None)?;

    let graphics_queue = device.get_device_queue(graphics, 0);
    let present_queue = device.get_device_queue(present, 0);

    Ok(DeviceQueues {
        device,
        graphics_family: graphics,
        graphics_queue,
        present_queue,
    })
}
