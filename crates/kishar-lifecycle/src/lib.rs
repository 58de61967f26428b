//! Kishar lifecycle core.
//!
//! This crate owns the contract between an OS-managed application lifecycle
//! and a native graphics context:
//! - the bridge state machine (`(state, event) -> effects`), pure and
//!   host-independent
//! - the teardown fence that keeps frame submission and context destruction
//!   from overlapping
//! - the error taxonomy shared with the runtime layer
//!
//! Nothing here touches a window or a GPU; the `kishar-runtime` crate adapts
//! real host events onto these types.

pub mod bridge;
pub mod effect;
pub mod error;
pub mod event;
pub mod fence;
pub mod state;
pub mod surface;

pub use bridge::Bridge;
pub use effect::Effect;
pub use error::BridgeError;
pub use event::HostEvent;
pub use fence::{RenderFence, RenderGuard};
pub use state::LifecycleState;
pub use surface::{PixelFormat, SurfaceDescriptor, SurfaceToken};
