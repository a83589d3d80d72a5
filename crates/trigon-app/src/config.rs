//! Application configuration.

use std::path::PathBuf;

use trigon_gpu::{load_spirv, GraphicsPipelineConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Whether the window can be resized.
    pub resizable: bool,
    /// Force FIFO presentation; otherwise mailbox is used when available.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Number of frames recorded ahead of the GPU.
    pub frames_in_flight: usize,
    /// Color the render pass clears to.
    pub clear_color: [f32; 4],
    /// Compiled vertex shader to use instead of the embedded one.
    pub vertex_shader: Option<PathBuf>,
    /// Compiled fragment shader to use instead of the embedded one.
    pub fragment_shader: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_string(),
            width: 800,
            height: 600,
            resizable: false,
            vsync: false,
            validation: cfg!(debug_assertions),
            frames_in_flight: 1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            vertex_shader: None,
            fragment_shader: None,
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow or forbid window resizing.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the number of frames in flight (at least one).
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.max(1);
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Load the vertex shader from a SPIR-V file.
    pub fn with_vertex_shader(mut self, path: impl Into<PathBuf>) -> Self {
        self.vertex_shader = Some(path.into());
        self
    }

    /// Load the fragment shader from a SPIR-V file.
    pub fn with_fragment_shader(mut self, path: impl Into<PathBuf>) -> Self {
        self.fragment_shader = Some(path.into());
        self
    }

    /// Resolve the shader pair into a pipeline configuration.
    ///
    /// Paths override the embedded triangle shaders stage by stage.
    pub fn pipeline_config(&self) -> trigon_gpu::Result<GraphicsPipelineConfig> {
        let vertex = match &self.vertex_shader {
            Some(path) => load_spirv(path)?,
            None => trigon_shaders::triangle_vertex_shader().to_vec(),
        };
        let fragment = match &self.fragment_shader {
            Some(path) => load_spirv(path)?,
            None => trigon_shaders::triangle_fragment_shader().to_vec(),
        };

        Ok(GraphicsPipelineConfig::with_shaders(vertex, fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_window_triangle() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Vulkan");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(!config.resizable);
        assert_eq!(config.frames_in_flight, 1);
    }

    #[test]
    fn default_prefers_mailbox() {
        use ash::vk;
        use trigon_gpu::swapchain::select_present_mode;

        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        let vsync = AppConfig::default().vsync;
        assert_eq!(select_present_mode(&available, vsync), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn builder_sets_fields() {
        let config = AppConfig::new("Test")
            .with_size(1024, 768)
            .with_resizable(true)
            .with_vsync(true)
            .with_validation(true)
            .with_frames_in_flight(2)
            .with_clear_color([0.1, 0.2, 0.3, 1.0]);

        assert_eq!(config.title, "Test");
        assert_eq!((config.width, config.height), (1024, 768));
        assert!(config.resizable);
        assert!(config.vsync);
        assert!(config.validation);
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.clear_color, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn frames_in_flight_never_zero() {
        let config = AppConfig::default().with_frames_in_flight(0);
        assert_eq!(config.frames_in_flight, 1);
    }

    #[test]
    fn embedded_shaders_by_default() {
        let pipeline = AppConfig::default().pipeline_config().unwrap();
        assert_eq!(pipeline.vertex_shader, trigon_shaders::triangle_vertex_shader());
        assert_eq!(pipeline.fragment_shader, trigon_shaders::triangle_fragment_shader());
    }

    #[test]
    fn missing_shader_file_is_an_error() {
        let config = AppConfig::default().with_fragment_shader("/nonexistent/frag.spv");
        assert!(config.pipeline_config().is_err());
    }
}
