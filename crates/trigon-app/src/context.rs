//! Application context.

use std::sync::Arc;

use ash::vk;
use trigon_gpu::command::{begin_command_buffer, end_command_buffer, submit_command_buffers};
use trigon_gpu::sync::create_semaphore;
use trigon_gpu::{CommandPool, FrameSyncManager, Framebuffers, GpuContext, GpuError, Swapchain};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::config::AppConfig;
use crate::frame::FrameContext;
use crate::triangle::TrianglePass;

/// Application context owning every per-window Vulkan object.
///
/// Creation follows swapchain → render pass → pipeline → framebuffers →
/// command pool/buffers → sync objects; dropping it tears them down in
/// reverse, then the GPU context, then the window.
pub struct AppContext {
    /// Current swapchain.
    pub swapchain: Swapchain,
    /// Render pass and pipeline for the triangle.
    pub triangle: TrianglePass,
    /// One framebuffer per swapchain image.
    pub framebuffers: Framebuffers,
    /// Command pool for the per-frame command buffers.
    pub command_pool: CommandPool,
    /// Per-frame synchronization data.
    pub(crate) frames: FrameSyncManager,
    /// Per-swapchain-image render finished semaphores.
    pub(crate) render_finished_semaphores: Vec<vk::Semaphore>,
    /// Set when the window size changed since the swapchain was built.
    pub(crate) framebuffer_resized: bool,
    /// Total frames rendered.
    pub frame_count: u64,
    /// Whether vsync is enabled.
    pub vsync: bool,
    /// GPU context with device and queues.
    pub gpu: GpuContext,
    /// The window handle. Declared last so it outlives the surface.
    pub window: Arc<Window>,
}

/// Create one semaphore per swapchain image.
///
/// # Safety
/// The device must be valid.
unsafe fn create_render_finished_semaphores(
    device: &ash::Device,
    count: usize,
) -> anyhow::Result<Vec<vk::Semaphore>> {
    let mut semaphores = Vec::with_capacity(count);
    for _ in 0..count {
        match create_semaphore(device) {
            Ok(semaphore) => semaphores.push(semaphore),
            Err(e) => {
                destroy_semaphores(device, &semaphores);
                return Err(e.into());
            }
        }
    }
    Ok(semaphores)
}

/// # Safety
/// The semaphores must not be in use.
unsafe fn destroy_semaphores(device: &ash::Device, semaphores: &[vk::Semaphore]) {
    for &semaphore in semaphores {
        device.destroy_semaphore(semaphore, None);
    }
}

impl AppContext {
    /// Create a new application context.
    ///
    /// # Safety
    /// `gpu` must have been built for `window`.
    pub(crate) unsafe fn new(
        window: Arc<Window>,
        gpu: GpuContext,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let pipeline_config = config.pipeline_config()?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let device = gpu.device();

        let swapchain = Swapchain::new(&gpu, width, height, config.vsync, None)?;

        tracing::info!(
            "Swapchain created: {}x{} ({} images)",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.images.len()
        );

        // Each step below releases what came before it if it fails
        let triangle =
            match TrianglePass::new(device, swapchain.format, pipeline_config, config.clear_color) {
                Ok(triangle) => triangle,
                Err(e) => {
                    swapchain.destroy(device);
                    return Err(e);
                }
            };

        let release_pass = || {
            triangle.destroy(device);
            swapchain.destroy(device);
        };

        let framebuffers = match Framebuffers::new(
            device,
            triangle.render_pass.render_pass,
            &swapchain.image_views,
            swapchain.extent,
        ) {
            Ok(framebuffers) => framebuffers,
            Err(e) => {
                release_pass();
                return Err(e.into());
            }
        };

        let command_pool = match CommandPool::new(device, gpu.graphics_queue_family()) {
            Ok(pool) => pool,
            Err(e) => {
                framebuffers.destroy(device);
                release_pass();
                return Err(e.into());
            }
        };

        let release_all = || {
            command_pool.destroy(device);
            framebuffers.destroy(device);
            release_pass();
        };

        let sync = command_pool
            .allocate_command_buffers(device, config.frames_in_flight.max(1) as u32)
            .and_then(|buffers| FrameSyncManager::new(device, &buffers));
        let frames = match sync {
            Ok(frames) => frames,
            Err(e) => {
                release_all();
                return Err(e.into());
            }
        };

        let render_finished_semaphores =
            match create_render_finished_semaphores(device, swapchain.images.len()) {
                Ok(semaphores) => semaphores,
                Err(e) => {
                    frames.destroy(device);
                    release_all();
                    return Err(e);
                }
            };

        tracing::info!(
            "Frame resources ready ({} frame(s) in flight)",
            frames.frames_in_flight()
        );

        Ok(Self {
            swapchain,
            triangle,
            framebuffers,
            command_pool,
            frames,
            render_finished_semaphores,
            framebuffer_resized: false,
            frame_count: 0,
            vsync: config.vsync,
            gpu,
            window,
        })
    }

    /// Whether the window has no drawable area.
    pub(crate) fn is_minimized(&self) -> bool {
        is_zero_size(self.window.inner_size())
    }

    /// Note that the window was resized; the swapchain is rebuilt before the
    /// next frame.
    pub(crate) fn mark_resized(&mut self) {
        self.framebuffer_resized = true;
    }

    /// Draw and present one frame.
    ///
    /// Returns `false` if the frame was skipped (minimized window or stale
    /// swapchain).
    pub(crate) fn draw_frame(&mut self) -> anyhow::Result<bool> {
        let size = self.window.inner_size();
        if is_zero_size(size) {
            return Ok(false);
        }

        if self.framebuffer_resized {
            self.recreate_swapchain(size.width, size.height)?;
        }

        let device = self.gpu.device();

        // SAFETY: The frame's fence belongs to this device
        unsafe { self.frames.current().wait(device)? };

        let (image_available, in_flight, command_buffer) = {
            let frame = self.frames.current();
            (frame.image_available, frame.in_flight, frame.command_buffer)
        };

        let acquired = unsafe { self.swapchain.acquire_next_image(image_available, u64::MAX) };
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(GpuError::SwapchainOutOfDate) => {
                self.recreate_swapchain(size.width, size.height)?;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        // Reset only once work is certain to be submitted
        unsafe { self.frames.current().reset(device)? };

        let framebuffer = self
            .framebuffers
            .get(image_index)
            .ok_or_else(|| anyhow::anyhow!("no framebuffer for image {image_index}"))?;

        let frame_ctx = FrameContext {
            command_buffer,
            framebuffer,
            extent: self.swapchain.extent,
        };

        // SAFETY: The command buffer's last submission completed (fence)
        unsafe {
            begin_command_buffer(device, command_buffer)?;
            self.triangle.record(device, &frame_ctx);
            end_command_buffer(device, command_buffer)?;
        }

        let render_finished = self.render_finished_semaphores[image_index as usize];

        let wait_semaphores = [image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [render_finished];
        let command_buffers = [command_buffer];

        unsafe {
            submit_command_buffers(
                device,
                self.gpu.graphics_queue(),
                &command_buffers,
                &wait_semaphores,
                &wait_stages,
                &signal_semaphores,
                in_flight,
            )?;
        }

        // SAFETY: image_index was acquired above and its render is submitted
        let stale = unsafe {
            self.swapchain
                .present(self.gpu.present_queue(), image_index, &signal_semaphores)?
        };

        if stale || self.framebuffer_resized {
            self.recreate_swapchain(size.width, size.height)?;
        }

        self.frames.advance();
        self.frame_count += 1;

        Ok(true)
    }

    /// Recreate the swapchain and everything sized by it.
    pub(crate) fn recreate_swapchain(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.gpu.wait_idle()?;
        self.framebuffer_resized = false;

        let device = self.gpu.device();

        // SAFETY: The device is idle
        let swapchain = unsafe {
            Swapchain::new(
                &self.gpu,
                width,
                height,
                self.vsync,
                Some(self.swapchain.swapchain),
            )?
        };

        // SAFETY: The device is idle, so none of the old objects are in use
        unsafe {
            self.framebuffers.destroy(device);
            self.framebuffers.framebuffers.clear();
            self.swapchain.destroy(device);
        }
        self.swapchain = swapchain;

        if self.swapchain.format != self.triangle.color_format() {
            tracing::info!("Swapchain format changed to {:?}", self.swapchain.format);
            unsafe { self.triangle.rebuild(device, self.swapchain.format)? };
        }

        unsafe {
            self.framebuffers = Framebuffers::new(
                device,
                self.triangle.render_pass.render_pass,
                &self.swapchain.image_views,
                self.swapchain.extent,
            )?;

            if self.render_finished_semaphores.len() != self.swapchain.images.len() {
                destroy_semaphores(device, &self.render_finished_semaphores);
                self.render_finished_semaphores.clear();
                self.render_finished_semaphores =
                    create_render_finished_semaphores(device, self.swapchain.images.len())?;
            }
        }

        tracing::info!(
            "Swapchain recreated: {}x{}",
            self.swapchain.extent.width,
            self.swapchain.extent.height
        );

        Ok(())
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.wait_idle() {
            tracing::error!("Failed to wait idle: {e}");
        }

        let device = self.gpu.device();

        // SAFETY: The device is idle and these objects are destroyed once
        unsafe {
            destroy_semaphores(device, &self.render_finished_semaphores);
            self.frames.destroy(device);
            self.command_pool.destroy(device);
            self.framebuffers.destroy(device);
            self.triangle.destroy(device);
            self.swapchain.destroy(device);
        }

        tracing::debug!("Frame resources destroyed");
    }
}

/// A window with no drawable area, e.g. minimized.
pub(crate) fn is_zero_size(size: PhysicalSize<u32>) -> bool {
    size.width == 0 || size.height == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_windows_are_not_drawn() {
        assert!(is_zero_size(PhysicalSize::new(0, 0)));
        assert!(is_zero_size(PhysicalSize::new(800, 0)));
        assert!(!is_zero_size(PhysicalSize::new(800, 600)));
    }
}
