//! Panel change notifications
//!
//! The runtime emits these after reloads; any UI binding subscribes and
//! re-pulls rows from the views when one arrives.

use tokio::sync::broadcast;

/// What caused a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    /// First load at startup
    Activation,
    /// User asked for it
    Manual,
    /// A watched file changed
    Watcher,
    /// Fallback refresh timer
    Timer,
}

impl ReloadTrigger {
    /// Whether a failed load should be shown to the user
    pub fn surfaces_errors(self) -> bool {
        matches!(self, Self::Activation | Self::Manual)
    }
}

/// Events emitted by the runtime for panel consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// A new config snapshot is current; rows should be recomputed
    Refreshed {
        generation: u64,
        trigger: ReloadTrigger,
    },
    /// Loading the config failed and the user should hear about it
    ConfigError { message: String },
}

/// Broadcast-based event stream for multiple consumers
pub struct EventStream {
    tx: broadcast::Sender<PanelEvent>,
}

impl EventStream {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: PanelEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_interactive_triggers_surface_errors() {
        assert!(ReloadTrigger::Activation.surfaces_errors());
        assert!(ReloadTrigger::Manual.surfaces_errors());
        assert!(!ReloadTrigger::Watcher.surfaces_errors());
        assert!(!ReloadTrigger::Timer.surfaces_errors());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let stream = EventStream::default();
        let mut rx = stream.subscribe();
        stream.emit(PanelEvent::ConfigError {
            message: "bad".to_string(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            PanelEvent::ConfigError {
                message: "bad".to_string()
            }
        );
    }
}
