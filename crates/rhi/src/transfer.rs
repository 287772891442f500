//! One-shot GPU uploads.
//!
//! The vertex data is small enough to be written with a single
//! `vkCmdUpdateBuffer`, so the upload path is a scoped helper rather than a
//! general transfer system: allocate a transient command buffer, record the
//! buffer update, submit, block on a dedicated fence until the copy has
//! completed, then free the command buffer.

use ash::vk;
use tracing::debug;

use crate::buffer::Buffer;
use crate::command::CommandPool;
use crate::error::{RhiError, RhiResult};
use crate::sync::Fence;

/// `vkCmdUpdateBuffer` accepts at most this many bytes per call.
const MAX_UPDATE_BYTES: usize = 65536;

/// Writes `data` into `buffer` through a blocking one-shot submission.
///
/// The caller's thread is suspended until the GPU signals the transfer
/// fence; on return the buffer contents are fully visible to later
/// submissions on the same queue.
///
/// # Arguments
///
/// * `pool` - Command pool to allocate the transient command buffer from
/// * `queue` - Queue the transfer is submitted to
/// * `buffer` - Destination buffer (must carry TRANSFER_DST usage)
/// * `data` - Bytes to write at offset 0
///
/// # Errors
///
/// Returns an error if the data does not satisfy the `vkCmdUpdateBuffer`
/// constraints (multiple of 4 bytes, at most 65536, within the buffer), or
/// if any Vulkan call fails.
pub fn write_buffer_once(
    pool: &CommandPool,
    queue: vk::Queue,
    buffer: &Buffer,
    data: &[u8],
) -> RhiResult<()> {
    if data.is_empty() || data.len() % 4 != 0 {
        return Err(RhiError::InvalidHandle(format!(
            "Inline buffer update must be a nonzero multiple of 4 bytes, got {}",
            data.len()
        )));
    }
    if data.len() > MAX_UPDATE_BYTES {
        return Err(RhiError::InvalidHandle(format!(
            "Inline buffer update limited to {} bytes, got {}",
            MAX_UPDATE_BYTES,
            data.len()
        )));
    }
    if data.len() as vk::DeviceSize > buffer.size() {
        return Err(RhiError::InvalidHandle(format!(
            "Upload of {} bytes exceeds buffer size {}",
            data.len(),
            buffer.size()
        )));
    }

    let device = pool.device().clone();
    let cmd = pool.allocate_command_buffer()?;

    // Record the copy
    unsafe {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device.handle().begin_command_buffer(cmd, &begin_info)?;
        device.handle().cmd_update_buffer(cmd, buffer.handle(), 0, data);
        device.handle().end_command_buffer(cmd)?;
    }

    // Submit and block on a dedicated fence until the GPU is done; the
    // command buffer cannot be freed while it may still execute
    let fence = Fence::new(device.clone(), false)?;

    let command_buffers = [cmd];
    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

    unsafe {
        device
            .handle()
            .queue_submit(queue, &[submit_info], fence.handle())
            .map_err(|e| RhiError::SubmissionFailed(format!("one-shot upload: {:?}", e)))?;
    }

    fence.wait(u64::MAX)?;

    pool.free_command_buffers(&command_buffers);

    debug!("Uploaded {} bytes via one-shot transfer", data.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_update_bytes_matches_vulkan_limit() {
        assert_eq!(MAX_UPDATE_BYTES, 65536);
        assert_eq!(MAX_UPDATE_BYTES % 4, 0);
    }
}
