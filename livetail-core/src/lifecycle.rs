/// What the host platform reports about the application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// the app left the foreground; streams keep running
    Suspend,
    /// the app is back in the foreground
    Resume,
    /// the app is going away; release the connection now
    Terminate,
}

/// Source of lifecycle events, polled once per tick.
///
/// Hosts adapt whatever callback mechanism their platform has to this
/// pull shape; a headless embedding passes [`NoSignals`].
pub trait LifecycleSignal {
    fn poll_event(&mut self) -> Option<LifecycleEvent>;
}

/// A signal source that never reports anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

impl LifecycleSignal for NoSignals {
    fn poll_event(&mut self) -> Option<LifecycleEvent> {
        None
    }
}
