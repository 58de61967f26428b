//! Host runtime.
//!
//! Drives a winit event loop and translates host-delivered application and
//! window events into bridge events. All bridge mutation happens on the
//! event-loop thread; the module loader is the only off-thread work, and its
//! completion is consumed at event-batch boundaries (`new_events`), never
//! mid-event.

use std::time::Duration;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use kishar_lifecycle::{
    Bridge, BridgeError, Effect, HostEvent, LifecycleState, PixelFormat, RenderFence,
    SurfaceDescriptor,
};

use crate::controller::{ContextController, RenderOutcome};
use crate::loader::{EngineModule, ModuleLoader};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Clear color for the per-frame clear pass.
    pub clear_color: wgpu::Color,
    /// How long teardown waits for an in-flight frame before proceeding.
    pub teardown_wait: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "kishar".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            clear_color: wgpu::Color {
                r: 0.012,
                g: 0.015,
                b: 0.022,
                a: 1.0,
            },
            teardown_wait: Duration::from_millis(250),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut host = HostAdapter::new(config);

        // The load request precedes any UI event the host can deliver.
        host.dispatch(HostEvent::ModuleLoadRequested);

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        if let Some(err) = host.fatal.take() {
            return Err(anyhow::Error::new(err));
        }
        Ok(())
    }
}

/// The window and the context controller that borrows it, kept together so
/// the borrow can never outlive the window.
#[self_referencing]
struct SurfaceBinding {
    window: Window,

    #[borrows(window)]
    #[covariant]
    controller: ContextController<'this>,
}

struct HostAdapter {
    config: RuntimeConfig,

    bridge: Bridge,
    fence: RenderFence,
    loader: ModuleLoader,
    module: Option<EngineModule>,

    binding: Option<SurfaceBinding>,
    window_id: Option<WindowId>,
    /// Token handed to the bridge for the current window's surface. Bumped
    /// when a window is re-created so the bridge sees a fresh surface.
    surface_epoch: u64,

    frame_tick: u64,
    exit_requested: bool,
    fatal: Option<BridgeError>,
}

impl HostAdapter {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            bridge: Bridge::new(),
            fence: RenderFence::new(),
            loader: ModuleLoader::new(),
            module: None,
            binding: None,
            window_id: None,
            surface_epoch: 0,
            frame_tick: 0,
            exit_requested: false,
            fatal: None,
        }
    }

    /// Feeds one event through the bridge and executes the resulting
    /// effects in order, before anything else can be processed.
    fn dispatch(&mut self, event: HostEvent) {
        let effects = self.bridge.handle(event);
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::BeginModuleLoad => self.loader.spawn(),

            Effect::Initialize(desc) => {
                let ok = self.initialize_context(&desc);
                self.bridge.confirm_initialize(ok);
            }

            Effect::Resize(desc) => {
                let result = match self.binding.as_mut() {
                    Some(binding) => binding.with_controller_mut(|c| c.resize(&desc)),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    log::warn!("resize failed: {e}; dropping context");
                    self.teardown_context();
                    self.bridge.confirm_initialize(false);
                }
            }

            Effect::Render(tick) => self.render_frame(tick),

            Effect::Teardown => self.teardown_context(),

            Effect::ReleaseModule => {
                self.loader.abandon();
                if self.module.take().is_some() {
                    log::info!("module released");
                }
            }

            Effect::ReportFatal(err) => {
                log::error!("fatal: {err}");
                self.fatal = Some(err);
                self.exit_requested = true;
            }
        }
    }

    fn initialize_context(&mut self, desc: &SurfaceDescriptor) -> bool {
        let Some(module) = self.module.as_ref() else {
            log::error!("{}", BridgeError::Sequencing("initialize before module load"));
            return false;
        };
        let Some(binding) = self.binding.as_mut() else {
            log::error!("{}", BridgeError::Sequencing("initialize with no window"));
            return false;
        };

        match binding.with_controller_mut(|c| c.initialize(module, desc)) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("context initialize failed: {e}");
                false
            }
        }
    }

    fn render_frame(&mut self, tick: u64) {
        let Some(binding) = self.binding.as_mut() else {
            return;
        };

        let fence = &self.fence;
        let clear = self.config.clear_color;
        let outcome = binding.with_controller_mut(|c| c.render(fence, tick, clear));

        // Device loss surfaces as a skip with the context gone; tell the
        // bridge so the next surface event can attempt recovery.
        if outcome == RenderOutcome::Skipped
            && !binding.borrow_controller().has_context()
            && self.bridge.context_live()
        {
            self.bridge.confirm_initialize(false);
        }
    }

    fn teardown_context(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            let fence = &self.fence;
            let wait = self.config.teardown_wait;
            binding.with_controller_mut(|c| c.teardown(fence, wait));
        }
    }

    fn pump_loader(&mut self) {
        if let Some(result) = self.loader.try_complete() {
            match result {
                Ok(module) => {
                    self.module = Some(module);
                    self.dispatch(HostEvent::LoadSucceeded);
                }
                Err(e) => self.dispatch(HostEvent::LoadFailed(e.to_string())),
            }
        }
    }

    fn current_descriptor(&self) -> Option<SurfaceDescriptor> {
        let binding = self.binding.as_ref()?;
        let size = binding.with_window(|w| w.inner_size());
        Some(SurfaceDescriptor::new(
            self.surface_epoch,
            size.width,
            size.height,
            PixelFormat::Bgra8Srgb,
        ))
    }

    fn request_redraw(&self) {
        if let Some(binding) = self.binding.as_ref() {
            binding.with_window(|w| w.request_redraw());
        }
    }

    /// The frame loop only stays armed while render ticks can produce work;
    /// anywhere else the waiting event loop goes genuinely idle.
    fn wants_redraw(&self) -> bool {
        self.bridge.state() == LifecycleState::Foreground
    }

    fn finish_if_requested(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            // Runs the destroy sequence before the loop unwinds; a second
            // pass through here is a no-op thanks to bridge idempotence.
            self.dispatch(HostEvent::Destroy);
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for HostAdapter {
    fn new_events(&mut self, event_loop: &ActiveEventLoop, _cause: StartCause) {
        // Loader completion is consumed only here, at the start of a batch,
        // so no event observes a half-applied load.
        self.pump_loader();
        self.finish_if_requested(event_loop);
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.binding.is_none() {
            let attrs = Window::default_attributes()
                .with_title(self.config.title.clone())
                .with_inner_size(self.config.initial_size);

            let window = match event_loop.create_window(attrs) {
                Ok(w) => w,
                Err(e) => {
                    log::error!("failed to create window: {e}");
                    self.fatal = Some(BridgeError::engine("create-window", e.to_string()));
                    self.exit_requested = true;
                    self.finish_if_requested(event_loop);
                    return;
                }
            };

            self.window_id = Some(window.id());
            self.surface_epoch += 1;

            self.binding = Some(
                SurfaceBindingBuilder {
                    window,
                    controller_builder: |w| ContextController::new(w),
                }
                .build(),
            );
        }

        // The drawable exists again from the host's point of view.
        if let Some(desc) = self.current_descriptor() {
            self.dispatch(HostEvent::SurfaceAvailable(desc));
        }
        self.dispatch(HostEvent::Foreground);
        if self.wants_redraw() {
            self.request_redraw();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        // Mobile hosts reclaim the drawable the moment this returns, so the
        // context must be gone before then. Teardown here is synchronous.
        self.dispatch(HostEvent::Background);
        self.dispatch(HostEvent::SurfaceDestroyed);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if Some(window_id) != self.window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.exit_requested = true;
            }

            WindowEvent::Resized(size) => {
                let desc = SurfaceDescriptor::new(
                    self.surface_epoch,
                    size.width,
                    size.height,
                    PixelFormat::Bgra8Srgb,
                );
                self.dispatch(HostEvent::SurfaceChanged(desc));
            }

            WindowEvent::Focused(focused) => {
                self.dispatch(if focused {
                    HostEvent::Foreground
                } else {
                    HostEvent::Background
                });
                // Redraw requests stop while backgrounded; wake the frame
                // loop back up on the transition in.
                if self.wants_redraw() {
                    self.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    self.exit_requested = true;
                }
            }

            WindowEvent::RedrawRequested => {
                let tick = self.frame_tick;
                self.frame_tick += 1;
                self.dispatch(HostEvent::RenderTick(tick));
            }

            _ => {}
        }

        self.finish_if_requested(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        self.finish_if_requested(event_loop);
        if self.exit_requested {
            return;
        }

        // Continuous redraw keeps render ticks flowing, but only while
        // foregrounded; in any other state the loop waits for real events.
        if self.wants_redraw() {
            self.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Idempotent with any destroy already dispatched above.
        self.dispatch(HostEvent::Destroy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> SurfaceDescriptor {
        SurfaceDescriptor::new(1u64, 640, 480, PixelFormat::Bgra8Srgb)
    }

    // ── frame-loop arming ─────────────────────────────────────────────────

    #[test]
    fn redraws_are_only_requested_while_foreground() {
        let mut host = HostAdapter::new(RuntimeConfig::default());
        assert!(!host.wants_redraw());

        // Drive the bridge directly; no loader or window is involved.
        host.bridge.handle(HostEvent::ModuleLoadRequested);
        host.bridge.handle(HostEvent::LoadSucceeded);
        assert!(!host.wants_redraw());

        host.bridge.handle(HostEvent::SurfaceAvailable(desc()));
        host.bridge.confirm_initialize(true);
        host.bridge.handle(HostEvent::Foreground);
        assert!(host.wants_redraw());

        // Losing focus parks the frame loop instead of busy-spinning
        // dropped ticks.
        host.bridge.handle(HostEvent::Background);
        assert!(!host.wants_redraw());

        host.bridge.handle(HostEvent::Foreground);
        assert!(host.wants_redraw());

        host.bridge.handle(HostEvent::SurfaceDestroyed);
        assert!(!host.wants_redraw());
    }
}
