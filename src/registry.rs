//! Listener registry mapping event names to ordered subscriber lists.
//!
//! Supports persistent (`on`) and one-shot (`once`) subscriptions. One-shot
//! handles are removed from the list before their callback is invoked, so a
//! re-entrant emit for the same name can never fire them twice.

use std::collections::HashMap;

/// Callback invoked with a decoded protocol message.
pub type Listener = Box<dyn FnMut(&serde_json::Value) + Send>;

struct Subscriber {
    listener: Listener,
    once: bool,
}

/// Ordered subscribers keyed by event name.
///
/// Entries are only ever removed by one-shot firing; there is no
/// unsubscribe operation.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Vec<Subscriber>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }

    /// Register a persistent subscriber for `event`.
    ///
    /// All subscribers for the same name fire in registration order.
    pub fn on(&mut self, event: impl Into<String>, listener: impl FnMut(&serde_json::Value) + Send + 'static) {
        self.listeners.entry(event.into()).or_default().push(Subscriber {
            listener: Box::new(listener),
            once: false,
        });
    }

    /// Register a subscriber for `event` that fires at most once.
    pub fn once(&mut self, event: impl Into<String>, listener: impl FnMut(&serde_json::Value) + Send + 'static) {
        self.listeners.entry(event.into()).or_default().push(Subscriber {
            listener: Box::new(listener),
            once: true,
        });
    }

    /// Invoke every subscriber registered for `event` with `message`.
    ///
    /// One-shot subscribers are taken out of the list first, then invoked.
    pub fn emit(&mut self, event: &str, message: &serde_json::Value) {
        let Some(subscribers) = self.listeners.get_mut(event) else {
            return;
        };
        let mut i = 0;
        while i < subscribers.len() {
            if subscribers[i].once {
                let mut subscriber = subscribers.remove(i);
                (subscriber.listener)(message);
            } else {
                (subscribers[i].listener)(message);
                i += 1;
            }
        }
    }

    /// Number of subscribers currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Listener) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |tag: &str| -> Listener {
            let log = log_clone.clone();
            let tag = tag.to_string();
            Box::new(move |_msg| log.lock().unwrap().push(tag.clone()))
        };
        (log, make)
    }

    #[test]
    fn registry_new_empty() {
        let reg = ListenerRegistry::new();
        assert_eq!(reg.listener_count("data"), 0);
    }

    #[test]
    fn registry_emit_without_listeners_is_noop() {
        let mut reg = ListenerRegistry::new();
        reg.emit("data", &serde_json::json!({}));
    }

    #[test]
    fn registry_on_fires_every_emit() {
        let (log, make) = recorder();
        let mut reg = ListenerRegistry::new();
        reg.on("data", make("a"));

        let msg = serde_json::json!({"seq": 1});
        reg.emit("data", &msg);
        reg.emit("data", &msg);

        assert_eq!(*log.lock().unwrap(), vec!["a", "a"]);
        assert_eq!(reg.listener_count("data"), 1);
    }

    #[test]
    fn registry_subscribers_fire_in_registration_order() {
        let (log, make) = recorder();
        let mut reg = ListenerRegistry::new();
        reg.on("data", make("first"));
        reg.on("data", make("second"));
        reg.on("data", make("third"));

        reg.emit("data", &serde_json::json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn registry_once_fires_exactly_once() {
        let (log, make) = recorder();
        let mut reg = ListenerRegistry::new();
        reg.once("data", make("one-shot"));

        let msg = serde_json::json!({});
        reg.emit("data", &msg);
        reg.emit("data", &msg);

        assert_eq!(*log.lock().unwrap(), vec!["one-shot"]);
        assert_eq!(reg.listener_count("data"), 0);
    }

    #[test]
    fn registry_once_between_persistent_preserves_order() {
        let (log, make) = recorder();
        let mut reg = ListenerRegistry::new();
        reg.on("data", make("a"));
        reg.once("data", make("b"));
        reg.on("data", make("c"));

        let msg = serde_json::json!({});
        reg.emit("data", &msg);
        reg.emit("data", &msg);

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "a", "c"]);
    }

    #[test]
    fn registry_emit_only_matching_name() {
        let (log, make) = recorder();
        let mut reg = ListenerRegistry::new();
        reg.on("event_stopped", make("stopped"));
        reg.on("data", make("data"));

        reg.emit("event_stopped", &serde_json::json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["stopped"]);
    }

    #[test]
    fn registry_listener_receives_message() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let mut reg = ListenerRegistry::new();
        reg.on("data", move |msg| {
            *seen_clone.lock().unwrap() = Some(msg.clone());
        });

        let msg = serde_json::json!({"type": "event", "event": "x"});
        reg.emit("data", &msg);
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&msg));
    }
}
