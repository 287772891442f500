//! Per-swapchain-image render targets.
//!
//! This module binds the swapchain images to the render pass output: for each
//! presentable image it creates a color image view and a single-attachment
//! framebuffer. Both arrays are index-aligned with the swapchain image array,
//! so index i always refers to the same physical image for the lifetime of
//! the program.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;
use crate::pipeline::RenderPass;
use crate::swapchain::Swapchain;

/// Image views and framebuffers for every swapchain image.
///
/// Created immediately after the swapchain (and the render pass the
/// framebuffers are bound to); destroyed before it. Framebuffer extent
/// always equals the swapchain extent.
pub struct RenderTargets {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// One color view per swapchain image, index-aligned.
    image_views: Vec<vk::ImageView>,
    /// One framebuffer per swapchain image, index-aligned.
    framebuffers: Vec<vk::Framebuffer>,
    /// Extent shared by every framebuffer.
    extent: vk::Extent2D,
}

impl RenderTargets {
    /// Creates a view and a framebuffer for each swapchain image.
    ///
    /// # Arguments
    ///
    /// * `swapchain` - The swapchain whose images are wrapped
    /// * `render_pass` - The render pass the framebuffers are created against
    ///
    /// # Errors
    ///
    /// Returns an error if any view or framebuffer creation fails. Objects
    /// created before the failure are destroyed by the drop of the partially
    /// built value.
    pub fn new(swapchain: &Swapchain, render_pass: &RenderPass) -> RhiResult<Self> {
        let device = swapchain.device().clone();
        let extent = swapchain.extent();
        let format = swapchain.format();

        let mut targets = Self {
            device: device.clone(),
            image_views: Vec::with_capacity(swapchain.images().len()),
            framebuffers: Vec::with_capacity(swapchain.images().len()),
            extent,
        };

        for (i, &image) in swapchain.images().iter().enumerate() {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            let view = unsafe { device.handle().create_image_view(&view_info, None)? };
            targets.image_views.push(view);

            let attachments = [view];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass.handle())
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe {
                device
                    .handle()
                    .create_framebuffer(&framebuffer_info, None)?
            };
            targets.framebuffers.push(framebuffer);

            debug!("Created render target for swapchain image {}", i);
        }

        info!(
            "Created {} render targets ({}x{})",
            targets.framebuffers.len(),
            extent.width,
            extent.height
        );

        Ok(targets)
    }

    /// Returns the framebuffer for swapchain image `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        self.framebuffers[index]
    }

    /// Returns the number of render targets (== swapchain image count).
    #[inline]
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Returns true if there are no render targets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    /// Returns the extent shared by every framebuffer.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for RenderTargets {
    fn drop(&mut self) {
        unsafe {
            // Framebuffers reference the views, so they go first
            for &framebuffer in &self.framebuffers {
                self.device.handle().destroy_framebuffer(framebuffer, None);
            }
            for &view in &self.image_views {
                self.device.handle().destroy_image_view(view, None);
            }
        }
        debug!("Destroyed {} render targets", self.framebuffers.len());
    }
}
