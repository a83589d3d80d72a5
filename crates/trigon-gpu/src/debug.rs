//! Validation layer output routed through `tracing`.

use crate::error::Result;
use ash::vk;
use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use tracing::Level;

/// Map a validation message severity to a tracing level.
pub fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Level::ERROR
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Level::WARN
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Level::INFO
    } else {
        Level::TRACE
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    // SAFETY: The loader passes valid callback data for the duration of the call
    let data = &*p_callback_data;
    let message: Cow<'_, str> = if data.p_message.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy()
    };

    let level = severity_level(message_severity);
    if level == Level::ERROR {
        tracing::error!(target: "vulkan", "[{message_type:?}] {message}");
    } else if level == Level::WARN {
        tracing::warn!(target: "vulkan", "[{message_type:?}] {message}");
    } else if level == Level::INFO {
        tracing::info!(target: "vulkan", "[{message_type:?}] {message}");
    } else {
        tracing::trace!(target: "vulkan", "[{message_type:?}] {message}");
    }

    vk::FALSE
}

/// Create info shared by the standalone messenger and the instance chain.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}

/// Debug utils messenger.
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Create a debug messenger.
    ///
    /// # Safety
    /// The instance must have been created with `VK_EXT_debug_utils` enabled.
    pub unsafe fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = messenger_create_info();
        let messenger = loader.create_debug_utils_messenger(&create_info, None)?;

        tracing::debug!("Debug messenger installed");

        Ok(Self { loader, messenger })
    }

    /// Destroy the messenger.
    ///
    /// # Safety
    /// Must be called before the owning instance is destroyed.
    pub unsafe fn destroy(&self) {
        self.loader
            .destroy_debug_utils_messenger(self.messenger, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_map_to_levels() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;

        assert_eq!(severity_level(S::ERROR), Level::ERROR);
        assert_eq!(severity_level(S::WARNING), Level::WARN);
        assert_eq!(severity_level(S::INFO), Level::INFO);
        assert_eq!(severity_level(S::VERBOSE), Level::TRACE);
    }

    #[test]
    fn highest_severity_wins() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;

        assert_eq!(severity_level(S::WARNING | S::ERROR), Level::ERROR);
    }

    #[test]
    fn create_info_has_callback() {
        let info = messenger_create_info();
        assert!(info.pfn_user_callback.is_some());
        assert!(info
            .message_type
            .contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION));
    }
}
