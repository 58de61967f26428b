use crate::effect::Effect;
use crate::error::BridgeError;
use crate::event::HostEvent;
use crate::state::LifecycleState;
use crate::surface::{SurfaceDescriptor, SurfaceToken};

/// How far module loading has progressed. Orthogonal to focus and to
/// context liveness; the three together derive [`LifecycleState`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum LoadPhase {
    Unloaded,
    Loading,
    Loaded,
    Destroyed,
    Failed,
}

/// The lifecycle bridge: a pure state machine over host events.
///
/// `handle` mutates the bridge and returns the effects the caller must
/// execute, in order, before processing the next event. The bridge itself
/// never touches a window or a GPU, which is what keeps the whole ordering
/// contract unit-testable.
///
/// One instance per process, owned by the host adapter; constructed at
/// process start and threaded through the host's entry points explicitly
/// rather than living in a static.
#[derive(Debug)]
pub struct Bridge {
    phase: LoadPhase,
    /// Host focus. Set by `Foreground`/`Background`, independent of whether
    /// a surface exists yet; this is what lets surface and focus events
    /// arrive interleaved in either order and still converge.
    focused: bool,
    /// At most one surface event queued while the module is still loading.
    /// A newer event replaces an older unconsumed one.
    pending: Option<SurfaceDescriptor>,
    /// The descriptor the live context was built from. Cleared the moment
    /// the surface is invalidated, never retained past that.
    current: Option<SurfaceDescriptor>,
    context_live: bool,
    /// Initialize attempts spent on `attempt_token`'s surface. Engine
    /// errors grant one retry per surface; a fresh surface resets this.
    init_attempts: u8,
    attempt_token: Option<SurfaceToken>,
}

impl Bridge {
    pub fn new() -> Self {
        Self {
            phase: LoadPhase::Unloaded,
            focused: false,
            pending: None,
            current: None,
            context_live: false,
            init_attempts: 0,
            attempt_token: None,
        }
    }

    /// Canonical lifecycle state, derived from internal facts.
    pub fn state(&self) -> LifecycleState {
        match self.phase {
            LoadPhase::Unloaded => LifecycleState::Unloaded,
            LoadPhase::Loading => LifecycleState::Loading,
            LoadPhase::Failed => LifecycleState::Failed,
            LoadPhase::Destroyed => LifecycleState::Destroyed,
            LoadPhase::Loaded => {
                if self.context_live {
                    if self.focused {
                        LifecycleState::Foreground
                    } else {
                        LifecycleState::Background
                    }
                } else {
                    LifecycleState::Ready
                }
            }
        }
    }

    /// True while a native context exists (as far as the bridge knows).
    pub fn context_live(&self) -> bool {
        self.context_live
    }

    /// Processes one host event and returns the effects to execute.
    pub fn handle(&mut self, event: HostEvent) -> Vec<Effect> {
        match self.phase {
            LoadPhase::Failed => {
                log::debug!("bridge failed; dropping {event:?}");
                return Vec::new();
            }
            LoadPhase::Destroyed => {
                // Restartable: a new load request re-arms the bridge.
                // Anything else after destroy is silently dropped.
                if event == HostEvent::ModuleLoadRequested {
                    return self.restart();
                }
                log::debug!("bridge destroyed; dropping {event:?}");
                return Vec::new();
            }
            _ => {}
        }

        match event {
            HostEvent::ModuleLoadRequested => self.on_load_requested(),
            HostEvent::LoadSucceeded => self.on_load_succeeded(),
            HostEvent::LoadFailed(message) => self.on_load_failed(message),
            HostEvent::SurfaceAvailable(desc) => self.on_surface(desc, SurfaceEvent::Available),
            HostEvent::SurfaceChanged(desc) => self.on_surface(desc, SurfaceEvent::Changed),
            HostEvent::SurfaceDestroyed => self.on_surface_destroyed(),
            HostEvent::Foreground => {
                self.focused = true;
                Vec::new()
            }
            HostEvent::Background => {
                self.focused = false;
                Vec::new()
            }
            HostEvent::RenderTick(tick) => self.on_render_tick(tick),
            HostEvent::Destroy => self.on_destroy(),
        }
    }

    /// Completion report for an `Initialize` effect. Must be called by the
    /// adapter before it processes the next event.
    pub fn confirm_initialize(&mut self, ok: bool) {
        if ok {
            self.context_live = true;
            self.init_attempts = 0;
        } else {
            self.context_live = false;
            self.init_attempts = self.init_attempts.saturating_add(1);
            log::warn!(
                "context initialize failed (attempt {}); staying contextless",
                self.init_attempts
            );
        }
    }

    fn restart(&mut self) -> Vec<Effect> {
        log::info!("bridge restarting after destroy");
        *self = Bridge::new();
        self.phase = LoadPhase::Loading;
        vec![Effect::BeginModuleLoad]
    }

    fn on_load_requested(&mut self) -> Vec<Effect> {
        if self.phase != LoadPhase::Unloaded {
            log::warn!("{}", BridgeError::Sequencing("duplicate module load request"));
            return Vec::new();
        }
        self.phase = LoadPhase::Loading;
        vec![Effect::BeginModuleLoad]
    }

    fn on_load_succeeded(&mut self) -> Vec<Effect> {
        if self.phase != LoadPhase::Loading {
            log::warn!("{}", BridgeError::Sequencing("load completion outside Loading"));
            return Vec::new();
        }
        self.phase = LoadPhase::Loaded;
        // Flush the surface event that arrived while loading, if any.
        match self.pending.take() {
            Some(desc) => self.accept_surface(desc),
            None => Vec::new(),
        }
    }

    fn on_load_failed(&mut self, message: String) -> Vec<Effect> {
        if self.phase != LoadPhase::Loading {
            log::warn!("{}", BridgeError::Sequencing("load completion outside Loading"));
            return Vec::new();
        }
        self.phase = LoadPhase::Failed;
        self.pending = None;
        vec![Effect::ReportFatal(BridgeError::Load(message))]
    }

    fn on_surface(&mut self, desc: SurfaceDescriptor, kind: SurfaceEvent) -> Vec<Effect> {
        // Not yet Ready: queue (newest wins), apply once the load completes.
        if matches!(self.phase, LoadPhase::Unloaded | LoadPhase::Loading) {
            self.pending = Some(desc);
            return Vec::new();
        }

        if !self.context_live {
            // No context yet (initial state, after surface loss, or after an
            // engine error): either event degenerates to "surface available".
            return self.accept_surface(desc);
        }

        let Some(current) = self.current else {
            log::error!("{}", BridgeError::Sequencing("live context without a descriptor"));
            return self.accept_surface(desc);
        };

        // Identical geometry: strictly a no-op. Re-creating or reconfiguring
        // a swapchain is observable at the GPU level.
        if desc.same_geometry(&current) {
            return Vec::new();
        }

        match kind {
            SurfaceEvent::Changed if desc.token == current.token => {
                self.current = Some(desc);
                vec![Effect::Resize(desc)]
            }
            _ => {
                // A genuinely new surface (or an Available re-announcement
                // with different geometry): the old handle must die before
                // the new descriptor is accepted.
                self.context_live = false;
                let mut effects = vec![Effect::Teardown];
                effects.extend(self.accept_surface(desc));
                effects
            }
        }
    }

    fn accept_surface(&mut self, desc: SurfaceDescriptor) -> Vec<Effect> {
        if self.attempt_token != Some(desc.token) {
            self.attempt_token = Some(desc.token);
            self.init_attempts = 0;
        }
        // One retry per surface. Past that, stay contextless; render ticks
        // degrade to skips rather than hammering a broken device.
        if self.init_attempts >= 2 {
            log::warn!("initialize retry budget exhausted for {:?}", desc.token);
            self.current = Some(desc);
            return Vec::new();
        }
        self.current = Some(desc);
        vec![Effect::Initialize(desc)]
    }

    fn on_surface_destroyed(&mut self) -> Vec<Effect> {
        // A descriptor queued during load is simply discarded; no context
        // exists, so there is nothing to tear down.
        self.pending = None;
        self.current = None;
        // Whatever drawable comes next is a new surface even if the host
        // reuses the token; it gets a full initialize budget.
        self.attempt_token = None;
        self.init_attempts = 0;
        if self.context_live {
            self.context_live = false;
            vec![Effect::Teardown]
        } else {
            Vec::new()
        }
    }

    fn on_render_tick(&mut self, tick: u64) -> Vec<Effect> {
        // A tick arriving just after teardown or while backgrounded is a
        // legitimate host race, not a defect; it is dropped silently.
        if self.state() == LifecycleState::Foreground {
            vec![Effect::Render(tick)]
        } else {
            Vec::new()
        }
    }

    fn on_destroy(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        // Leave foreground first, then drop the context, then the module.
        self.focused = false;
        if self.context_live {
            self.context_live = false;
            effects.push(Effect::Teardown);
        }
        if matches!(self.phase, LoadPhase::Loading | LoadPhase::Loaded) {
            effects.push(Effect::ReleaseModule);
        }

        self.phase = LoadPhase::Destroyed;
        self.pending = None;
        self.current = None;
        effects
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SurfaceEvent {
    Available,
    Changed,
}
