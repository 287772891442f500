//! Main renderer orchestration.
//!
//! This module provides the [`Renderer`] struct that owns every GPU object
//! and drives the acquire / submit / present cycle once per frame.

use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use glam::Vec2;
use tracing::{debug, error, info};

use prism_platform::{Surface, Window};
use prism_rhi::buffer::Buffer;
use prism_rhi::command::CommandPool;
use prism_rhi::device::Device;
use prism_rhi::instance::Instance;
use prism_rhi::physical_device::select_physical_device;
use prism_rhi::pipeline::{Pipeline, PipelineLayout, RenderPass};
use prism_rhi::render_target::RenderTargets;
use prism_rhi::shader::{Shader, ShaderStage};
use prism_rhi::swapchain::Swapchain;
use prism_rhi::transfer;
use prism_rhi::vertex::Vertex;
use prism_rhi::{RhiError, RhiResult};

use crate::frame::{FrameSlot, FrameTracker};

/// The clip-space triangle written to the vertex buffer once at startup.
const TRIANGLE: [Vertex; 3] = [
    Vertex::new(Vec2::new(-0.8, -0.8)),
    Vertex::new(Vec2::new(0.8, -0.8)),
    Vertex::new(Vec2::new(0.8, 0.8)),
];

/// Clear color for the presentation render pass (opaque black).
const CLEAR_COLOR: vk::ClearColorValue = vk::ClearColorValue {
    float32: [0.0, 0.0, 0.0, 1.0],
};

/// Main renderer that owns all Vulkan resources.
///
/// # Resource Destruction Order
///
/// Vulkan objects must be destroyed in reverse order of creation:
/// 1. Wait for all GPU work to complete (mandatory before any destroy call)
/// 2. Frame slots (semaphores, fences)
/// 3. Command pool (frees the recorded command buffers)
/// 4. Vertex buffer
/// 5. Render targets (framebuffers, then image views)
/// 6. Pipeline, pipeline layout, render pass
/// 7. Swapchain
/// 8. Surface
/// 9. Device
/// 10. Instance
///
/// ManuallyDrop is used to make that order explicit in [`Drop`].
pub struct Renderer {
    /// Vulkan instance (destroyed last).
    instance: ManuallyDrop<Instance>,
    /// Logical device; dropped after every object created from it.
    device: ManuallyDrop<Arc<Device>>,
    /// Window surface (destroyed after swapchain, before device).
    surface: ManuallyDrop<Surface>,
    /// Swapchain (destroyed after the render targets that view its images).
    swapchain: ManuallyDrop<Swapchain>,
    /// Render pass the pipeline and framebuffers are built against.
    render_pass: ManuallyDrop<RenderPass>,
    /// Empty pipeline layout.
    pipeline_layout: ManuallyDrop<PipelineLayout>,
    /// The triangle graphics pipeline.
    pipeline: ManuallyDrop<Pipeline>,
    /// Per-swapchain-image views and framebuffers.
    render_targets: ManuallyDrop<RenderTargets>,
    /// The one vertex buffer, written once before the loop starts.
    vertex_buffer: ManuallyDrop<Buffer>,
    /// Command pool on the graphics family.
    command_pool: ManuallyDrop<CommandPool>,
    /// One pre-recorded command buffer per swapchain image, index-aligned.
    command_buffers: Vec<vk::CommandBuffer>,
    /// Frame-slot ring (MAX_FRAMES_IN_FLIGHT entries).
    frame_slots: Vec<FrameSlot>,
    /// Round-robin slot / image-index tracker.
    frames: FrameTracker,
}

impl Renderer {
    /// Creates a new renderer for the given window.
    ///
    /// This runs the whole one-shot setup sequence: instance, surface,
    /// device, swapchain, render pass, pipeline, render targets, vertex
    /// buffer upload, command recording, and frame slots. Afterwards the
    /// only per-frame work left is the synchronization cycle in
    /// [`render_frame`](Self::render_frame).
    ///
    /// # Errors
    ///
    /// Returns an error if any resource creation fails. Every setup failure
    /// is fatal: later stages assume earlier objects exist.
    pub fn new(window: &Window) -> RhiResult<Self> {
        let width = window.width();
        let height = window.height();

        info!("Initializing renderer ({}x{})", width, height);

        // Instance with validation in debug builds
        let enable_validation = cfg!(debug_assertions);
        let instance = Instance::new(enable_validation)?;

        // Surface
        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        // Physical device with a graphics queue confirmed to present
        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        // Logical device and queues
        let device = Device::new(&instance, &physical_device_info)?;

        // Swapchain
        let swapchain = Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;

        // Render pass and pipeline, fixed to the swapchain's format/extent
        let render_pass = RenderPass::new(device.clone(), swapchain.format())?;
        let pipeline_layout = PipelineLayout::new_empty(device.clone())?;

        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new("shaders/spirv/triangle.vert.spv"),
            ShaderStage::Vertex,
            "main",
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new("shaders/spirv/triangle.frag.spv"),
            ShaderStage::Fragment,
            "main",
        )?;

        let pipeline = Pipeline::create_graphics(
            device.clone(),
            &vertex_shader,
            &fragment_shader,
            &render_pass,
            &pipeline_layout,
            swapchain.extent(),
        )?;
        // The shader modules are no longer needed once the pipeline exists;
        // they drop at the end of this function

        // One framebuffer per swapchain image
        let render_targets = RenderTargets::new(&swapchain, &render_pass)?;

        // Command pool on the graphics family
        let graphics_family = device.queue_families().graphics_family.unwrap();
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;

        // Vertex buffer, written once via a blocking one-shot transfer
        let vertex_data: &[u8] = bytemuck::cast_slice(&TRIANGLE);
        let vertex_buffer = Buffer::new_vertex(device.clone(), vertex_data.len() as u64)?;
        transfer::write_buffer_once(
            &command_pool,
            device.graphics_queue(),
            &vertex_buffer,
            vertex_data,
        )?;

        // Pre-record one command buffer per swapchain image
        let command_buffers = command_pool.allocate_command_buffers(render_targets.len() as u32)?;
        record_commands(
            &device,
            &command_buffers,
            &render_targets,
            &render_pass,
            &pipeline,
            &vertex_buffer,
        )?;

        // Frame slots, independent of the swapchain image count
        let frame_slots = FrameSlot::ring(&device)?;

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            frame_slots.len()
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            render_pass: ManuallyDrop::new(render_pass),
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            pipeline: ManuallyDrop::new(pipeline),
            render_targets: ManuallyDrop::new(render_targets),
            vertex_buffer: ManuallyDrop::new(vertex_buffer),
            command_pool: ManuallyDrop::new(command_pool),
            command_buffers,
            frame_slots,
            frames: FrameTracker::new(),
        })
    }

    /// Renders one frame.
    ///
    /// Runs a single iteration of the synchronization cycle on the current
    /// frame slot:
    ///
    /// 1. Wait on the slot's in-flight fence. This is the only CPU stall in
    ///    the cycle; it guarantees the slot's objects and the command buffer
    ///    submitted with them two iterations ago are no longer referenced.
    /// 2. Reset the fence.
    /// 3. Acquire the next swapchain image, signaling the slot's
    ///    image-available semaphore on the GPU timeline.
    /// 4. Submit the pre-recorded command buffer for that image.
    /// 5. Present, waiting on the render-finished semaphore.
    /// 6. Advance the slot index.
    ///
    /// # Errors
    ///
    /// Any acquire, submit, or present failure is returned as a fatal error:
    /// with the swapchain fixed for the program's lifetime there is no
    /// recovery path, and a failed submission leaves CPU and GPU state
    /// desynchronized.
    pub fn render_frame(&mut self) -> RhiResult<()> {
        let slot = &self.frame_slots[self.frames.current_frame()];

        // 1-2. Bound in-flight work: the previous use of this slot must have
        // fully completed before its fence and semaphores are reused
        slot.in_flight().wait(u64::MAX)?;
        slot.in_flight().reset()?;

        // 3. Acquire; does not block the host
        let (image_index, suboptimal) = self
            .swapchain
            .acquire_next_image(slot.image_available().handle())
            .map_err(RhiError::from)?;
        if suboptimal {
            // No recreation path exists; keep presenting
            debug!("Acquire reported the swapchain suboptimal");
        }
        self.frames.set_image_index(image_index);

        // 4. Submit the command buffer recorded for this image. Nothing
        // before the color-attachment-output stage touches the image, so
        // that is the only stage gated on the acquire semaphore.
        let image_index = self.frames.image_index();
        let wait_semaphores = [slot.image_available().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [slot.render_finished().handle()];
        let command_buffers = [self.command_buffers[image_index as usize]];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .handle()
                .queue_submit(
                    self.device.graphics_queue(),
                    &[submit_info],
                    slot.in_flight().handle(),
                )
                .map_err(|e| RhiError::SubmissionFailed(format!("queue submit: {:?}", e)))?;
        }

        // 5. Present once rendering has finished on the GPU timeline
        let suboptimal = self
            .swapchain
            .present(
                self.device.present_queue(),
                image_index,
                slot.render_finished().handle(),
            )
            .map_err(|e| RhiError::SubmissionFailed(format!("queue present: {:?}", e)))?;
        if suboptimal {
            debug!("Present reported the swapchain suboptimal");
        }

        // 6. Advance the slot ring
        self.frames.next_frame();

        Ok(())
    }

    /// Waits for all queued GPU work to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

/// Records the per-image presentation command buffers.
///
/// Each buffer is recorded exactly once and resubmitted every frame that
/// presents its image: begin -> begin render pass on `RenderTarget[i]`
/// (clearing to opaque black) -> bind pipeline -> bind the vertex buffer at
/// offset 0 -> draw 3 vertices, 1 instance -> end render pass -> end.
fn record_commands(
    device: &Arc<Device>,
    command_buffers: &[vk::CommandBuffer],
    render_targets: &RenderTargets,
    render_pass: &RenderPass,
    pipeline: &Pipeline,
    vertex_buffer: &Buffer,
) -> RhiResult<()> {
    let clear_values = [vk::ClearValue { color: CLEAR_COLOR }];
    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: render_targets.extent(),
    };

    for (i, &cmd) in command_buffers.iter().enumerate() {
        unsafe {
            // No ONE_TIME_SUBMIT: the buffer is replayed every frame
            let begin_info = vk::CommandBufferBeginInfo::default();
            device.handle().begin_command_buffer(cmd, &begin_info)?;

            let render_pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(render_pass.handle())
                .framebuffer(render_targets.framebuffer(i))
                .render_area(render_area)
                .clear_values(&clear_values);

            device
                .handle()
                .cmd_begin_render_pass(cmd, &render_pass_info, vk::SubpassContents::INLINE);

            device
                .handle()
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.handle());

            device
                .handle()
                .cmd_bind_vertex_buffers(cmd, 0, &[vertex_buffer.handle()], &[0]);

            device
                .handle()
                .cmd_draw(cmd, TRIANGLE.len() as u32, 1, 0, 0);

            device.handle().cmd_end_render_pass(cmd);

            device.handle().end_command_buffer(cmd)?;
        }
    }

    info!("Recorded {} presentation command buffers", command_buffers.len());

    Ok(())
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Wait for all GPU work to complete before destroying anything
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        // Frame slots first: their fences/semaphores are the most recently
        // created objects
        self.frame_slots.clear();

        // Then everything else in reverse creation order. The command pool
        // frees the recorded command buffers with it.
        unsafe {
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.vertex_buffer);
            ManuallyDrop::drop(&mut self.render_targets);
            ManuallyDrop::drop(&mut self.pipeline);
            ManuallyDrop::drop(&mut self.pipeline_layout);
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
