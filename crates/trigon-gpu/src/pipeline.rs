//! Pipeline creation and management.

use crate::error::{GpuError, Result};
use ash::vk;
use std::fs::File;
use std::path::Path;

/// Read a compiled SPIR-V file into 32-bit words.
pub fn load_spirv(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let shader_load = |source| GpuError::ShaderLoad {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::open(path).map_err(shader_load)?;
    ash::util::read_spv(&mut file).map_err(shader_load)
}

/// Graphics pipeline configuration.
#[derive(Clone)]
pub struct GraphicsPipelineConfig {
    pub vertex_shader: Vec<u32>,
    pub fragment_shader: Vec<u32>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            vertex_shader: Vec::new(),
            fragment_shader: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::CLOCKWISE,
        }
    }
}

impl GraphicsPipelineConfig {
    /// Config with the given shader pair and default fixed-function state.
    pub fn with_shaders(vertex_shader: Vec<u32>, fragment_shader: Vec<u32>) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            ..Default::default()
        }
    }
}

/// Graphics pipeline wrapper.
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

/// Create a shader module from SPIR-V words.
///
/// # Safety
/// The device must be valid.
unsafe fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
    stage: &str,
) -> Result<vk::ShaderModule> {
    if code.is_empty() {
        return Err(GpuError::ShaderModule(format!("{stage}: empty SPIR-V")));
    }

    let info = vk::ShaderModuleCreateInfo::default().code(code);
    device
        .create_shader_module(&info, None)
        .map_err(|e| GpuError::ShaderModule(format!("{stage}: {e}")))
}

impl GraphicsPipeline {
    /// Create a graphics pipeline for subpass 0 of `render_pass`.
    ///
    /// The pipeline takes no vertex input; viewport and scissor are dynamic.
    ///
    /// # Safety
    /// The device must be valid and shader code must be valid SPIR-V.
    pub unsafe fn new(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        config: &GraphicsPipelineConfig,
    ) -> Result<Self> {
        let vert_module = create_shader_module(device, &config.vertex_shader, "Vertex")?;
        let frag_module = match create_shader_module(device, &config.fragment_shader, "Fragment") {
            Ok(module) => module,
            Err(e) => {
                device.destroy_shader_module(vert_module, None);
                return Err(e);
            }
        };

        let result = Self::build(device, render_pass, config, vert_module, frag_module);

        // Shader modules are no longer needed once the pipeline exists
        device.destroy_shader_module(vert_module, None);
        device.destroy_shader_module(frag_module, None);

        result
    }

    unsafe fn build(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        config: &GraphicsPipelineConfig,
        vert_module: vk::ShaderModule,
        frag_module: vk::ShaderModule,
    ) -> Result<Self> {
        // Shader stages
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vert_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(frag_module)
                .name(c"main"),
        ];

        // Vertices come from the shader itself
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(config.topology)
            .primitive_restart_enable(false);

        // Viewport (dynamic)
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(config.polygon_mode)
            .cull_mode(config.cull_mode)
            .front_face(config.front_face)
            .depth_bias_enable(false)
            .line_width(1.0);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];

        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        // Empty layout: no descriptors or push constants
        let layout_info = vk::PipelineLayoutCreateInfo::default();

        let layout = device
            .create_pipeline_layout(&layout_info, None)
            .map_err(|e| GpuError::PipelineCreation(e.to_string()))?;

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines =
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None);

        match pipelines {
            Ok(pipelines) => Ok(Self {
                pipeline: pipelines[0],
                layout,
            }),
            Err((_pipelines, e)) => {
                device.destroy_pipeline_layout(layout, None);
                Err(GpuError::PipelineCreation(e.to_string()))
            }
        }
    }

    /// Destroy the pipeline.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_pipeline(self.pipeline, None);
        device.destroy_pipeline_layout(self.layout, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_draws_filled_triangles() {
        let config = GraphicsPipelineConfig::default();
        assert_eq!(config.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(config.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(config.front_face, vk::FrontFace::CLOCKWISE);
    }

    #[test]
    fn spirv_file_is_read_as_words() {
        let path = std::env::temp_dir().join(format!("trigon-test-{}.spv", std::process::id()));
        let words: [u32; 2] = [0x0723_0203, 0x0001_0000];
        {
            let mut file = File::create(&path).unwrap();
            for word in words {
                file.write_all(&word.to_le_bytes()).unwrap();
            }
        }

        let loaded = load_spirv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, words);
    }

    #[test]
    fn missing_spirv_file_names_path() {
        let err = load_spirv("/nonexistent/trigon/shader.spv").unwrap_err();
        assert!(matches!(err, GpuError::ShaderLoad { .. }));
        assert!(err.to_string().contains("/nonexistent/trigon/shader.spv"));
    }
}
