//! Vulkan instance creation.

use crate::debug::messenger_create_info;
use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, CStr, CString};

/// Validation layers enabled when validation is requested.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Instance extensions needed to present to `display`.
///
/// Adds `VK_EXT_debug_utils` when validation is enabled.
pub fn required_instance_extensions(
    display: RawDisplayHandle,
    enable_validation: bool,
) -> Result<Vec<*const c_char>> {
    let mut extensions = ash_window::enumerate_required_extensions(display)?.to_vec();

    if enable_validation {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    {
        extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());
        extensions.push(ash::khr::get_physical_device_properties2::NAME.as_ptr());
    }

    Ok(extensions)
}

/// Names of every instance extension the loader reports.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn available_instance_extensions(entry: &ash::Entry) -> Result<Vec<String>> {
    let properties = entry.enumerate_instance_extension_properties(None)?;

    Ok(properties
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Names of every instance layer the loader reports.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn available_layers(entry: &ash::Entry) -> Result<Vec<String>> {
    let properties = entry.enumerate_instance_layer_properties()?;

    Ok(properties
        .iter()
        .filter_map(|layer| layer.layer_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Requested layers that are absent from `available`.
pub fn missing_layers(requested: &[&CStr], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .map(|layer| layer.to_string_lossy())
        .filter(|name| !available.iter().any(|a| a == name))
        .map(|name| name.into_owned())
        .collect()
}

/// Create a Vulkan instance.
///
/// When `enable_validation` is set every layer from [`validation_layers`] must
/// be installed, otherwise creation fails with
/// [`GpuError::ValidationLayersUnavailable`].
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    display: RawDisplayHandle,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let layers = if enable_validation {
        validation_layers()
    } else {
        vec![]
    };

    if !layers.is_empty() {
        let available = available_layers(entry)?;
        let missing = missing_layers(&layers, &available);
        if !missing.is_empty() {
            return Err(GpuError::ValidationLayersUnavailable(missing));
        }
    }

    let available_extensions = available_instance_extensions(entry)?;
    tracing::debug!("Available instance extensions:");
    for ext in &available_extensions {
        tracing::debug!("\t{ext}");
    }

    let app_name = CString::new(app_name).unwrap_or_else(|_| c"Trigon".to_owned());

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 1, 0, 0))
        .engine_name(c"Trigon")
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_0);

    let extension_names = required_instance_extensions(display, enable_validation)?;
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    // Chained so that instance creation and destruction are also validated
    let mut debug_info = messenger_create_info();

    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    if enable_validation {
        create_info = create_info.push_next(&mut debug_info);
    }

    let instance = entry.create_instance(&create_info, None)?;

    tracing::info!(
        "Vulkan instance created (validation: {})",
        if enable_validation { "on" } else { "off" }
    );

    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_layers_missing_when_all_present() {
        let available = vec![
            "VK_LAYER_MESA_device_select".to_string(),
            "VK_LAYER_KHRONOS_validation".to_string(),
        ];
        assert!(missing_layers(&validation_layers(), &available).is_empty());
    }

    #[test]
    fn absent_layer_is_reported() {
        let available = vec!["VK_LAYER_MESA_device_select".to_string()];
        assert_eq!(
            missing_layers(&validation_layers(), &available),
            vec!["VK_LAYER_KHRONOS_validation".to_string()]
        );
    }

    #[test]
    fn nothing_requested_nothing_missing() {
        assert!(missing_layers(&[], &[]).is_empty());
    }
}
