//! prism - Main Entry Point
//!
//! Opens a fixed-size window and presents a single triangle through an
//! explicitly synchronized Vulkan swapchain until the window is closed.

use anyhow::Result;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use prism_platform::Window;
use prism_renderer::Renderer;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

struct App {
    window: Option<Window>,
    renderer: Option<Renderer>,
    /// First fatal error hit inside the loop; drives the process exit code.
    failure: Option<anyhow::Error>,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, WIDTH, HEIGHT, "prism") {
            Ok(window) => window,
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("window creation"));
                return;
            }
        };

        match Renderer::new(&window) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                self.fail(
                    event_loop,
                    anyhow::Error::new(e).context("renderer creation"),
                );
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Some(ref mut renderer) = self.renderer {
                    if let Err(e) = renderer.render_frame() {
                        // Submission failures leave CPU and GPU state
                        // desynchronized; stop presenting immediately
                        self.fail(event_loop, anyhow::Error::new(e).context("render frame"));
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    prism_core::init_logging();
    info!("Starting prism");

    // Create event loop
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    // Create app and run
    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    // Dropping the renderer waits for the device to go idle before any
    // teardown, on the clean path and the error path alike
    drop(app.renderer.take());

    match app.failure.take() {
        // Nonzero exit with a diagnostic on any unrecoverable failure
        Some(err) => Err(err),
        None => Ok(()),
    }
}
