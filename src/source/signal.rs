//! Configuration change notification.

/// Identifies a registered listener so it can be disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&str) + Send + Sync>;

/// Synchronous callback list fired after a configuration change.
///
/// Listeners are called in registration order on the emitting thread.
#[derive(Default)]
pub struct ConfigurationSignal {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl ConfigurationSignal {
    /// Registers a listener.
    pub fn connect<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Calls every listener once with the committed value.
    pub fn emit(&self, value: &str) {
        for (_, listener) in &self.listeners {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
