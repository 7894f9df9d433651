//! Nova demo - draws a colored triangle every frame through the Vulkan frame loop
//!
//! Resize or minimize the window to exercise swapchain recreation; close it to
//! drain the GPU and print frame and validation statistics.

mod window;

use nova_renderer::nova::{Config, Result};
use nova_renderer::nova::device::WindowHost;
use nova_renderer::glam::Vec4;
use nova_renderer::{engine_error, engine_info};

use window::DemoWindow;

fn run() -> Result<()> {
    let config = Config {
        app_name: "Nova Demo".to_string(),
        window_title: "Nova - frame pacing demo".to_string(),
        clear_color: Vec4::new(0.1, 0.2, 0.4, 1.0),
        ..Config::default()
    };
    config.validate()?;

    let mut window = DemoWindow::new(&config)?;
    let stats = {
        let mut frame_loop = nova_renderer_vulkan::create_frame_loop(
            window.window(),
            window.framebuffer_size(),
            &config,
        )?;
        frame_loop.run(&mut window)?
    };

    engine_info!("nova::demo", "Iterations: {}, presented: {}, skipped: {}, recreations: {}, submissions: {}",
        stats.iterations, stats.frames_presented, stats.frames_skipped, stats.recreations, stats.submissions);

    if config.enable_validation {
        nova_renderer_vulkan::print_validation_stats_report();
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        engine_error!("nova::demo", "Demo failed: {}", e);
        std::process::exit(1);
    }
}
