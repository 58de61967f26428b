use crate::surface::SurfaceDescriptor;

/// Host-delivered lifecycle and surface events, plus the two completion
/// signals the module loader hands back onto the event thread.
///
/// Delivery is strictly serialized: the bridge assumes events arrive one at
/// a time, in order, but makes no assumption about which thread delivers a
/// given event relative to its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Process start: begin the asynchronous module load. Must not block.
    ModuleLoadRequested,
    /// Loader completion signal, success path.
    LoadSucceeded,
    /// Loader completion signal, failure path. Fatal.
    LoadFailed(String),
    /// The host created a drawable surface.
    SurfaceAvailable(SurfaceDescriptor),
    /// The host resized or otherwise re-described an existing surface.
    SurfaceChanged(SurfaceDescriptor),
    /// The host is about to reclaim the surface. Teardown must complete
    /// before this event finishes processing.
    SurfaceDestroyed,
    Foreground,
    Background,
    /// A frame-loop tick. Only produces work in `Foreground`.
    RenderTick(u64),
    /// Terminal shutdown request. Idempotent.
    Destroy,
}
