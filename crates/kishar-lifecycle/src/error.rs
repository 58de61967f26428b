use thiserror::Error;

/// Error taxonomy for the bridge and its context controller.
///
/// - `Load` is fatal: the bridge enters `Failed` and stops forwarding events.
/// - `Engine` is recoverable: absorbed locally, retried once on the next
///   surface event, otherwise the bridge stays contextless and render ticks
///   degrade to skips.
/// - `Sequencing` marks a programming defect (an invariant-breaking call
///   order). It is logged and the offending event dropped; crashing
///   mid-frame is worse than one dropped frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("module load failed: {0}")]
    Load(String),

    #[error("engine error during {op}: {message}")]
    Engine { op: &'static str, message: String },

    #[error("sequencing violation: {0}")]
    Sequencing(&'static str),
}

impl BridgeError {
    pub fn engine(op: &'static str, message: impl Into<String>) -> Self {
        Self::Engine {
            op,
            message: message.into(),
        }
    }

    /// True for errors that must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Load(_))
    }
}
