//! Application runner and event loop.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use trigon_gpu::GpuContextBuilder;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::AppConfig;
use crate::context::AppContext;

/// Install the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

/// Open a window and draw the triangle until it is closed.
///
/// Initialization failures and render errors end the loop and are returned.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    init_logging();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        state: None,
        failure: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Redraw continuously, but sleep until the next event while minimized.
fn control_flow(minimized: bool) -> ControlFlow {
    if minimized {
        ControlFlow::Wait
    } else {
        ControlFlow::Poll
    }
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    state: Option<AppState>,
    failure: Option<anyhow::Error>,
}

/// Internal application state.
struct AppState {
    ctx: AppContext,
    started: Instant,
}

impl AppRunner {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        if let Some(state) = self.state.take() {
            state.shutdown();
        }
        self.failure = Some(e);
        event_loop.exit();
    }

    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(self.config.resizable);

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        // SAFETY: The window is stored in the app context after the GPU context
        // and is therefore dropped after it
        let gpu = unsafe {
            GpuContextBuilder::new()
                .app_name(&self.config.title)
                .validation(self.config.validation)
                .build(window.as_ref())?
        };

        info!(
            "GPU: {} (validation {})",
            gpu.profile().name,
            if gpu.validation_enabled() { "on" } else { "off" }
        );

        // SAFETY: gpu was built for this window
        let ctx = unsafe { AppContext::new(window, gpu, &self.config)? };

        Ok(AppState {
            ctx,
            started: Instant::now(),
        })
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => self.fail(event_loop, e.context("failed to initialize")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(state) = self.state.take() {
                    state.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = &mut self.state else {
                    return;
                };
                if let Err(e) = state.render_frame() {
                    self.fail(event_loop, e.context("render error"));
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.ctx.mark_resized();
                    info!("Resized to {}x{}", size.width, size.height);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            let minimized = state.ctx.is_minimized();
            event_loop.set_control_flow(control_flow(minimized));
            if !minimized {
                state.ctx.window.request_redraw();
            }
        }
    }
}

impl AppState {
    fn render_frame(&mut self) -> anyhow::Result<()> {
        if self.ctx.draw_frame()? && self.ctx.frame_count % 1000 == 0 {
            debug!("Frame {}", self.ctx.frame_count);
        }
        Ok(())
    }

    /// Log frame statistics and release every Vulkan object.
    fn shutdown(self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if self.ctx.frame_count > 0 && elapsed > 0.0 {
            info!(
                "Rendered {} frames in {:.1}s ({:.1} fps average)",
                self.ctx.frame_count,
                elapsed,
                self.ctx.frame_count as f64 / elapsed
            );
        }

        info!("Starting cleanup...");
        drop(self.ctx);
        info!("Cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::is_zero_size;

    #[test]
    fn minimized_window_waits_for_events() {
        assert_eq!(control_flow(true), ControlFlow::Wait);
        assert_eq!(control_flow(false), ControlFlow::Poll);
        assert_eq!(control_flow(is_zero_size(PhysicalSize::new(0, 0))), ControlFlow::Wait);
    }
}
