//! Command buffer management.

use crate::error::Result;
use ash::vk;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = device.create_command_pool(&create_info, None)?;

        Ok(Self { pool })
    }

    /// Allocate primary command buffers.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffers(
        &self,
        device: &ash::Device,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = device.allocate_command_buffers(&alloc_info)?;
        Ok(buffers)
    }

    /// Destroy the command pool, freeing its buffers.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_command_pool(self.pool, None);
    }
}

/// Reset a command buffer and begin recording.
///
/// # Safety
/// The command buffer must not be pending execution.
pub unsafe fn begin_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    device.begin_command_buffer(cmd, &begin_info)?;
    Ok(())
}

/// End recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn end_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    device.end_command_buffer(cmd)?;
    Ok(())
}

/// Submit command buffers to a queue.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffers(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(command_buffers)
        .wait_semaphores(wait_semaphores)
        .wait_dst_stage_mask(wait_stages)
        .signal_semaphores(signal_semaphores);

    device.queue_submit(queue, &[submit_info], fence)?;
    Ok(())
}
