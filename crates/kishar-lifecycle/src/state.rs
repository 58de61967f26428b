/// Canonical lifecycle state reported by the bridge.
///
/// The bridge derives this from its internal facts (load phase, focus flag,
/// context liveness) rather than storing it directly; see `bridge.rs`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LifecycleState {
    /// No module load has been requested yet.
    Unloaded,
    /// Module load is in flight; surface events are queued, not applied.
    Loading,
    /// Module is loaded, no live context (no surface, or surface destroyed).
    Ready,
    /// Live context and the host has focus: rendering is permitted.
    Foreground,
    /// Live context but the host is backgrounded: resources persist,
    /// render ticks are suppressed.
    Background,
    /// Terminal: destroy sequence has run.
    Destroyed,
    /// Terminal: the module failed to load.
    Failed,
}

impl LifecycleState {
    /// True in `Destroyed` and `Failed`; no further effects are produced
    /// (except the restart path out of `Destroyed`).
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Destroyed | LifecycleState::Failed)
    }

    /// True while a native context is allowed to exist.
    pub fn accepts_context(self) -> bool {
        matches!(
            self,
            LifecycleState::Ready | LifecycleState::Foreground | LifecycleState::Background
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(LifecycleState::Destroyed.is_terminal());
        assert!(LifecycleState::Failed.is_terminal());
        assert!(!LifecycleState::Foreground.is_terminal());
        assert!(!LifecycleState::Unloaded.is_terminal());
    }

    #[test]
    fn context_is_only_legal_once_loaded() {
        assert!(!LifecycleState::Unloaded.accepts_context());
        assert!(!LifecycleState::Loading.accepts_context());
        assert!(LifecycleState::Ready.accepts_context());
        assert!(LifecycleState::Foreground.accepts_context());
        assert!(LifecycleState::Background.accepts_context());
        assert!(!LifecycleState::Destroyed.accepts_context());
    }
}
