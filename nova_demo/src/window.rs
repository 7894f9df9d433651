/// DemoWindow - winit window implementing WindowHost
///
/// Events are pumped on demand, so the frame loop keeps control of the main
/// thread instead of handing it to `EventLoop::run_app`.

use nova_renderer::nova::{Config, Error, Result};
use nova_renderer::nova::device::{Extent2D, WindowHost};
use nova_renderer::{engine_debug, engine_error};
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

/// Window flags updated by the event handler
struct WindowState {
    window: Window,
    close_requested: bool,
    resized: bool,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if window_id != self.window.id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                engine_debug!("nova::demo", "Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                engine_debug!("nova::demo", "Window resized to {}x{}", size.width, size.height);
                self.resized = true;
            }
            _ => {}
        }
    }
}

pub struct DemoWindow {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl DemoWindow {
    /// Open a visible, resizable window sized from the configuration
    #[allow(deprecated)]
    pub fn new(config: &Config) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| {
            engine_error!("nova::demo", "Failed to create event loop: {}", e);
            Error::InitializationFailed(format!("Failed to create event loop: {}", e))
        })?;

        let window_attrs = Window::default_attributes()
            .with_title(config.window_title.clone())
            .with_inner_size(PhysicalSize::new(config.window_width, config.window_height))
            .with_resizable(true);
        let window = event_loop.create_window(window_attrs).map_err(|e| {
            engine_error!("nova::demo", "Failed to create window: {}", e);
            Error::InitializationFailed(format!("Failed to create window: {}", e))
        })?;

        Ok(Self {
            event_loop,
            state: WindowState { window, close_requested: false, resized: false },
        })
    }

    pub fn window(&self) -> &Window {
        &self.state.window
    }
}

impl WindowHost for DemoWindow {
    fn should_close(&self) -> bool {
        self.state.close_requested
    }

    fn poll_events(&mut self) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.state) {
            engine_debug!("nova::demo", "Event loop exited with code {}", code);
            self.state.close_requested = true;
        }
    }

    fn framebuffer_size(&self) -> Extent2D {
        let size = self.state.window.inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.state.resized)
    }
}
