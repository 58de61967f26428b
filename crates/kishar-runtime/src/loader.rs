//! Asynchronous module loader.
//!
//! "Module" here is the natively-compiled rendering engine's process-wide
//! state: the wgpu instance, the selected adapter, and the logical
//! device/queue pair. Acquiring these can take long enough to matter on the
//! host callback thread, so the load runs on a dedicated worker and hands
//! its result back over an spsc channel. The runtime consumes the result
//! only at the start of event processing, never mid-event.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use kishar_lifecycle::BridgeError;

/// The loaded rendering module. Dropping it releases the device and
/// instance; the bridge's destroy path does this exactly once.
pub struct EngineModule {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// One-shot loader. `spawn` starts the worker; `try_complete` is polled at
/// event-batch boundaries and yields the result exactly once.
pub struct ModuleLoader {
    rx: Option<Receiver<Result<EngineModule, BridgeError>>>,
    completed: bool,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self {
            rx: None,
            completed: false,
        }
    }

    /// Starts the load on a worker thread. Never blocks the caller.
    pub fn spawn(&mut self) {
        if self.rx.is_some() || self.completed {
            log::warn!("module load already requested; ignoring duplicate spawn");
            return;
        }

        let (tx, rx) = mpsc::channel();
        self.rx = Some(rx);

        let worker_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name("kishar-module-load".to_string())
            .spawn(move || {
                // The receiver may already be gone if the host destroyed the
                // process while we were loading; that is fine.
                let _ = worker_tx.send(load_module());
            });

        if let Err(e) = spawned {
            let _ = tx.send(Err(BridgeError::Load(format!(
                "failed to spawn loader thread: {e}"
            ))));
        }
    }

    /// Non-blocking completion check. Returns `Some` exactly once.
    pub fn try_complete(&mut self) -> Option<Result<EngineModule, BridgeError>> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.rx = None;
                self.completed = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                self.completed = true;
                Some(Err(BridgeError::Load(
                    "loader thread exited without a result".to_string(),
                )))
            }
        }
    }

    /// Drops the pending receiver and re-arms the loader. Used by the
    /// release path on destroy; a restarted bridge may request a whole new
    /// load afterwards, so the one-shot guard must not outlive the module.
    pub fn abandon(&mut self) {
        self.rx = None;
        self.completed = false;
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_module() -> Result<EngineModule, BridgeError> {
    // All backends: let wgpu pick the platform-optimal one.
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    // No surface exists yet at load time; the adapter is selected without a
    // compatibility constraint and the controller validates format support
    // against the real surface at initialize time.
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .map_err(|e| BridgeError::Load(format!("no suitable GPU adapter: {e}")))?;

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("kishar device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        experimental_features: wgpu::ExperimentalFeatures::disabled(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    }))
    .map_err(|e| BridgeError::Load(format!("device request failed: {e}")))?;

    log::info!("module loaded: {}", adapter.get_info().name);

    Ok(EngineModule {
        instance,
        adapter,
        device,
        queue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── completion handoff ────────────────────────────────────────────────

    #[test]
    fn try_complete_before_spawn_yields_nothing() {
        let mut loader = ModuleLoader::new();
        assert!(loader.try_complete().is_none());
    }

    #[test]
    fn abandoned_loader_stops_reporting() {
        let mut loader = ModuleLoader::new();
        loader.spawn();
        loader.abandon();
        assert!(loader.try_complete().is_none());
    }

    #[test]
    fn abandon_permits_a_fresh_spawn() {
        let mut loader = ModuleLoader::new();
        loader.spawn();

        // Consume whatever the first load produced, then release it the way
        // the destroy path does.
        while loader.try_complete().is_none() {
            std::thread::yield_now();
        }
        loader.abandon();

        // A restarted bridge gets a working loader again.
        loader.spawn();
        assert!(loader.rx.is_some());
    }
}
