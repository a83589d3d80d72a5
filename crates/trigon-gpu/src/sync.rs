//! Synchronization primitives.

use crate::error::Result;
use ash::vk;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = device.create_semaphore(&create_info, None)?;
    Ok(semaphore)
}

/// Create a fence.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = device.create_fence(&create_info, None)?;
    Ok(fence)
}

/// Wait for a fence to be signaled.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(device: &ash::Device, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
    device.wait_for_fences(&[fence], true, timeout_ns)?;
    Ok(())
}

/// Reset a fence to unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.reset_fences(&[fence])?;
    Ok(())
}

/// Per-frame synchronization resources.
pub struct FrameSync {
    /// Semaphore signaled when the acquired image is ready to be drawn to
    pub image_available: vk::Semaphore,
    /// Fence signaled when this frame's submission has finished
    pub in_flight: vk::Fence,
    /// Command buffer recorded for this frame
    pub command_buffer: vk::CommandBuffer,
}

impl FrameSync {
    /// Create frame synchronization resources.
    ///
    /// The fence starts signaled so the first wait returns immediately.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, command_buffer: vk::CommandBuffer) -> Result<Self> {
        let image_available = create_semaphore(device)?;
        let in_flight = match create_fence(device, true) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_semaphore(image_available, None);
                return Err(e);
            }
        };

        Ok(Self {
            image_available,
            in_flight,
            command_buffer,
        })
    }

    /// Wait for this frame's previous submission.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device) -> Result<()> {
        wait_for_fence(device, self.in_flight, u64::MAX)
    }

    /// Reset the fence for the next submission.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        reset_fence(device, self.in_flight)
    }

    /// Destroy synchronization resources.
    ///
    /// # Safety
    /// The device must be valid and resources must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_fence(self.in_flight, None);
    }
}

/// Round-robin frame slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCursor {
    current: usize,
    count: usize,
}

impl FrameCursor {
    /// Cursor over `count` slots; at least one slot is always present.
    pub fn new(count: usize) -> Self {
        Self {
            current: 0,
            count: count.max(1),
        }
    }

    /// Current slot.
    pub const fn current(&self) -> usize {
        self.current
    }

    /// Move to the next slot, wrapping around.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.count;
    }
}

/// Manages synchronization for multiple frames in flight.
pub struct FrameSyncManager {
    frame_syncs: Vec<FrameSync>,
    cursor: FrameCursor,
}

impl FrameSyncManager {
    /// Create sync resources for each of `command_buffers`; the number of
    /// buffers is the number of frames in flight.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, command_buffers: &[vk::CommandBuffer]) -> Result<Self> {
        let mut frame_syncs = Vec::with_capacity(command_buffers.len());
        for &command_buffer in command_buffers {
            match FrameSync::new(device, command_buffer) {
                Ok(sync) => frame_syncs.push(sync),
                Err(e) => {
                    for sync in &frame_syncs {
                        sync.destroy(device);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            cursor: FrameCursor::new(frame_syncs.len()),
            frame_syncs,
        })
    }

    /// Get the current frame's sync resources.
    pub fn current(&self) -> &FrameSync {
        &self.frame_syncs[self.cursor.current()]
    }

    /// Advance to the next frame.
    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    /// Number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frame_syncs.len()
    }

    /// Destroy all resources.
    ///
    /// # Safety
    /// The device must be valid and all resources must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for sync in &self.frame_syncs {
            sync.destroy(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot_stays_at_zero() {
        let mut cursor = FrameCursor::new(1);
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.current(), 0);
    }

    #[test]
    fn cursor_wraps() {
        let mut cursor = FrameCursor::new(3);
        let visited: Vec<usize> = (0..5)
            .map(|_| {
                let slot = cursor.current();
                cursor.advance();
                slot
            })
            .collect();
        assert_eq!(visited, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn zero_slots_become_one() {
        let mut cursor = FrameCursor::new(0);
        cursor.advance();
        assert_eq!(cursor, FrameCursor::new(1));
    }
}
