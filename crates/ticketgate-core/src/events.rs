//! Core events emitted by the engine

/// Events emitted by the policy engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Policy was reloaded; the new document is active
    PolicyReloaded {
        override_count: usize,
        global_filter_count: usize,
    },
}
