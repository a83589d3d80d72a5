//! Physical device selection.

use crate::error::{GpuError, Result};
use crate::surface::Surface;
use ash::vk;
use std::collections::BTreeSet;
use std::ffi::CStr;

/// Device extensions every candidate must support.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::swapchain::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_subset::NAME,
    ]
}

/// Required extensions that are absent from `available`.
pub fn missing_device_extensions(required: &[&CStr], available: &[String]) -> Vec<String> {
    required
        .iter()
        .map(|ext| ext.to_string_lossy())
        .filter(|name| !available.iter().any(|a| a == name))
        .map(|name| name.into_owned())
        .collect()
}

/// Queue families used for drawing and presenting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Pick families from `(flags, can_present)` pairs in family order.
    ///
    /// A family that can both draw and present is preferred over a split pair.
    pub fn from_families(families: &[(vk::QueueFlags, bool)]) -> Self {
        let mut indices = Self::default();

        for (i, &(flags, can_present)) in families.iter().enumerate() {
            let i = i as u32;
            let graphics = flags.contains(vk::QueueFlags::GRAPHICS);

            if graphics && can_present {
                return Self {
                    graphics: Some(i),
                    present: Some(i),
                };
            }
            if graphics && indices.graphics.is_none() {
                indices.graphics = Some(i);
            }
            if can_present && indices.present.is_none() {
                indices.present = Some(i);
            }
        }

        indices
    }

    /// Both a graphics and a present family were found.
    pub const fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Distinct family indices, sorted.
    pub fn unique(&self) -> Vec<u32> {
        self.graphics
            .into_iter()
            .chain(self.present)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Surface properties relevant to swapchain creation.
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// At least one format and one present mode are available.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// The device properties used for rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub max_image_dimension_2d: u32,
    pub geometry_shader: bool,
}

impl DeviceProfile {
    /// Read the profile of a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);

        let name = properties
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "<unnamed device>".to_string());

        Self {
            name,
            device_type: properties.device_type,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            geometry_shader: features.geometry_shader == vk::TRUE,
        }
    }
}

/// Score a device; zero means unusable.
///
/// Geometry shader support is mandatory. Larger maximum texture sizes score
/// higher and discrete GPUs get a flat bonus.
pub fn rate_device(profile: &DeviceProfile) -> u32 {
    if !profile.geometry_shader {
        return 0;
    }

    let mut score = profile.max_image_dimension_2d;
    if profile.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        score = score.saturating_add(1000);
    }
    score
}

/// Index of the best-rated candidate. Among equal scores the last one wins.
pub fn best_candidate(scores: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if best.map_or(true, |(_, s)| score >= s) {
            best = Some((i, score));
        }
    }
    best.filter(|&(_, score)| score > 0).map(|(i, _)| i)
}

/// Find graphics and present queue families.
///
/// # Safety
/// The physical device must belong to the instance that created the surface.
pub unsafe fn find_queue_families(
    instance: &ash::Instance,
    surface: &Surface,
    physical_device: vk::PhysicalDevice,
) -> Result<QueueFamilyIndices> {
    let properties = instance.get_physical_device_queue_family_properties(physical_device);

    let mut families = Vec::with_capacity(properties.len());
    for (i, family) in properties.iter().enumerate() {
        let can_present = surface.supports_present(physical_device, i as u32)?;
        families.push((family.queue_flags, can_present));
    }

    Ok(QueueFamilyIndices::from_families(&families))
}

/// A device that passed the suitability checks.
pub struct DeviceCandidate {
    pub physical_device: vk::PhysicalDevice,
    pub queue_families: QueueFamilyIndices,
    pub profile: DeviceProfile,
}

/// Check queue families, extensions, and swapchain support.
///
/// # Safety
/// The physical device must belong to the instance that created the surface.
unsafe fn check_device(
    instance: &ash::Instance,
    surface: &Surface,
    physical_device: vk::PhysicalDevice,
) -> Result<Option<QueueFamilyIndices>> {
    let queue_families = find_queue_families(instance, surface, physical_device)?;
    if !queue_families.is_complete() {
        return Ok(None);
    }

    let extensions = instance.enumerate_device_extension_properties(physical_device)?;
    let available: Vec<String> = extensions
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    let missing = missing_device_extensions(&required_device_extensions(), &available);
    if !missing.is_empty() {
        tracing::debug!("Device lacks extensions: {}", missing.join(", "));
        return Ok(None);
    }

    let support = surface.support(physical_device)?;
    if !support.is_adequate() {
        return Ok(None);
    }

    Ok(Some(queue_families))
}

/// Queue families of a suitable device; a device whose queries fail is
/// unsuitable.
fn suitability(
    name: &str,
    checked: Result<Option<QueueFamilyIndices>>,
) -> Option<QueueFamilyIndices> {
    checked.unwrap_or_else(|e| {
        tracing::warn!("Failed to query GPU {name}: {e}");
        None
    })
}

/// Pick the highest-rated suitable physical device.
///
/// # Safety
/// The surface must have been created from `instance`.
pub unsafe fn pick_physical_device(
    instance: &ash::Instance,
    surface: &Surface,
) -> Result<DeviceCandidate> {
    let devices = instance.enumerate_physical_devices()?;

    if devices.is_empty() {
        return Err(GpuError::NoVulkanDevices);
    }

    let mut candidates = Vec::new();
    for device in devices {
        let profile = DeviceProfile::query(instance, device);

        match suitability(&profile.name, check_device(instance, surface, device)) {
            Some(queue_families) => {
                tracing::debug!("Candidate GPU {} (score {})", profile.name, rate_device(&profile));
                candidates.push(DeviceCandidate {
                    physical_device: device,
                    queue_families,
                    profile,
                });
            }
            None => tracing::debug!("Skipping unsuitable GPU {}", profile.name),
        }
    }

    let scores: Vec<u32> = candidates.iter().map(|c| rate_device(&c.profile)).collect();
    let best = best_candidate(&scores).ok_or(GpuError::NoSuitableDevice)?;

    Ok(candidates.swap_remove(best))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(device_type: vk::PhysicalDeviceType, dim: u32, geometry: bool) -> DeviceProfile {
        DeviceProfile {
            name: "test".to_string(),
            device_type,
            max_image_dimension_2d: dim,
            geometry_shader: geometry,
        }
    }

    #[test]
    fn discrete_gpu_gets_bonus() {
        let discrete = profile(vk::PhysicalDeviceType::DISCRETE_GPU, 16384, true);
        let integrated = profile(vk::PhysicalDeviceType::INTEGRATED_GPU, 16384, true);
        assert_eq!(rate_device(&discrete), 17384);
        assert_eq!(rate_device(&integrated), 16384);
    }

    #[test]
    fn missing_geometry_shader_is_unusable() {
        let device = profile(vk::PhysicalDeviceType::DISCRETE_GPU, 32768, false);
        assert_eq!(rate_device(&device), 0);
    }

    #[test]
    fn best_candidate_prefers_highest_then_last() {
        assert_eq!(best_candidate(&[100, 300, 300, 200]), Some(2));
        assert_eq!(best_candidate(&[500, 100]), Some(0));
        assert_eq!(best_candidate(&[0, 0]), None);
        assert_eq!(best_candidate(&[]), None);
    }

    #[test]
    fn failed_query_marks_device_unsuitable() {
        let lost = Err(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR));
        assert_eq!(suitability("lost", lost), None);

        let families = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(0),
        };
        assert_eq!(suitability("ok", Ok(Some(families))), Some(families));
        assert_eq!(suitability("unsuitable", Ok(None)), None);
    }

    #[test]
    fn shared_family_is_preferred() {
        let families = [
            (vk::QueueFlags::GRAPHICS, false),
            (vk::QueueFlags::TRANSFER, true),
            (vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, true),
        ];
        let indices = QueueFamilyIndices::from_families(&families);
        assert_eq!(indices.graphics, Some(2));
        assert_eq!(indices.present, Some(2));
        assert_eq!(indices.unique(), vec![2]);
    }

    #[test]
    fn split_families_are_found() {
        let families = [
            (vk::QueueFlags::COMPUTE, true),
            (vk::QueueFlags::GRAPHICS, false),
        ];
        let indices = QueueFamilyIndices::from_families(&families);
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(0));
        assert!(indices.is_complete());
        assert_eq!(indices.unique(), vec![0, 1]);
    }

    #[test]
    fn no_present_support_is_incomplete() {
        let families = [(vk::QueueFlags::GRAPHICS, false)];
        let indices = QueueFamilyIndices::from_families(&families);
        assert!(!indices.is_complete());
    }

    #[test]
    fn swapchain_extension_is_required() {
        let available = vec!["VK_KHR_maintenance1".to_string()];
        let missing = missing_device_extensions(&[ash::khr::swapchain::NAME], &available);
        assert_eq!(missing, vec!["VK_KHR_swapchain".to_string()]);

        let available = vec!["VK_KHR_swapchain".to_string()];
        assert!(missing_device_extensions(&[ash::khr::swapchain::NAME], &available).is_empty());
    }

    #[test]
    fn empty_support_is_inadequate() {
        let mut support = SwapchainSupport::default();
        assert!(!support.is_adequate());

        support.formats.push(vk::SurfaceFormatKHR::default());
        assert!(!support.is_adequate());

        support.present_modes.push(vk::PresentModeKHR::FIFO);
        assert!(support.is_adequate());
    }
}
