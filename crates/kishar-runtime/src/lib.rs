//! Kishar runtime crate.
//!
//! This crate adapts a real host environment onto the lifecycle core:
//! - `runtime` drives a winit event loop and feeds the bridge
//! - `controller` owns the wgpu surface/device pair (the native context)
//! - `loader` performs the asynchronous module load off the event thread
//! - `logging` centralizes logger initialization

pub mod controller;
pub mod loader;
pub mod logging;
pub mod runtime;

pub use controller::{ContextController, RenderOutcome};
pub use loader::{EngineModule, ModuleLoader};
pub use logging::{init_logging, LoggingConfig};
pub use runtime::{Runtime, RuntimeConfig};
