use crate::error::BridgeError;
use crate::surface::SurfaceDescriptor;

/// Work the bridge asks its caller to perform after a transition.
///
/// Effects are data, not closures: the adapter executes them against the
/// context controller after `Bridge::handle` returns, which keeps the state
/// machine testable without a host or a GPU.
#[derive(Debug, PartialEq)]
pub enum Effect {
    /// Spawn the asynchronous module load.
    BeginModuleLoad,
    /// Create a native context for this surface.
    Initialize(SurfaceDescriptor),
    /// Reconfigure the existing context for a new extent.
    Resize(SurfaceDescriptor),
    /// Submit one frame.
    Render(u64),
    /// Destroy the native context. Must complete synchronously, under the
    /// teardown fence, before the caller returns to the host.
    Teardown,
    /// Drop the loaded module reference. Emitted once, by the destroy path.
    ReleaseModule,
    /// Surface a fatal error to the host.
    ReportFatal(BridgeError),
}
