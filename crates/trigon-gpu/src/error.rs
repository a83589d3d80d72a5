//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found or opened.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// Validation was requested but some layers are missing.
    #[error("Validation layers requested, but not available: {}", .0.join(", "))]
    ValidationLayersUnavailable(Vec<String>),

    /// The instance reported zero physical devices.
    #[error("Failed to find GPUs with Vulkan support")]
    NoVulkanDevices,

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// The swapchain no longer matches the surface and must be recreated.
    #[error("Swapchain is out of date")]
    SwapchainOutOfDate,

    /// Shader module creation failed.
    #[error("Shader module creation failed: {0}")]
    ShaderModule(String),

    /// A SPIR-V file could not be read.
    #[error("Failed to load shader {path}: {source}")]
    ShaderLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_layers_are_listed() {
        let err = GpuError::ValidationLayersUnavailable(vec![
            "VK_LAYER_KHRONOS_validation".to_string(),
            "VK_LAYER_LUNARG_monitor".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation layers requested, but not available: \
             VK_LAYER_KHRONOS_validation, VK_LAYER_LUNARG_monitor"
        );
    }

    #[test]
    fn vulkan_results_convert() {
        let err: GpuError = vk::Result::ERROR_DEVICE_LOST.into();
        assert!(matches!(err, GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST)));
    }
}
