//! Window-level keyboard dispatch with scoped listener registrations.
//!
//! Each mounted editor registers exactly one listener and holds the returned
//! [`KeyListener`] guard. Dropping the guard detaches the listener, so a
//! remount that drops the old guard before registering a new one can never
//! leave two handlers attached.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Char(char),
}

impl Key {
    /// Parse a key name as typed by the user.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "delete" | "del" => Some(Key::Delete),
            "backspace" => Some(Key::Backspace),
            "escape" | "esc" => Some(Key::Escape),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }

    /// Delete and Backspace both remove the active object.
    pub fn is_delete(&self) -> bool {
        matches!(self, Key::Delete | Key::Backspace)
    }
}

/// A key press event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key }
    }
}

type Handler = Box<dyn FnMut(&KeyEvent) -> bool>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

/// The window's key listener table.
#[derive(Clone, Default)]
pub struct KeyboardHub {
    registry: Rc<RefCell<Registry>>,
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler. It stays attached until the returned guard is dropped.
    /// The handler returns true when it consumed the event.
    #[must_use = "dropping the guard detaches the listener immediately"]
    pub fn register(&self, handler: impl FnMut(&KeyEvent) -> bool + 'static) -> KeyListener {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.handlers.push((id, Box::new(handler)));
        log::debug!("Key listener {} attached", id);
        KeyListener {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Deliver a key press to every attached handler.
    /// Returns true if any handler consumed it.
    ///
    /// Handlers must not register or drop listeners while being dispatched to.
    pub fn dispatch(&self, event: KeyEvent) -> bool {
        let mut registry = self.registry.borrow_mut();
        let mut consumed = false;
        for (_, handler) in registry.handlers.iter_mut() {
            consumed |= handler(&event);
        }
        consumed
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().handlers.len()
    }
}

impl std::fmt::Debug for KeyboardHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Guard for one registered key handler.
pub struct KeyListener {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl KeyListener {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for KeyListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyListener").field("id", &self.id).finish()
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.borrow_mut();
            registry.handlers.retain(|(id, _)| *id != self.id);
            log::debug!("Key listener {} detached", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("Delete"), Some(Key::Delete));
        assert_eq!(Key::from_name("backspace"), Some(Key::Backspace));
        assert_eq!(Key::from_name("x"), Some(Key::Char('x')));
        assert_eq!(Key::from_name("nope"), None);
        assert!(Key::Backspace.is_delete());
        assert!(!Key::Escape.is_delete());
    }

    #[test]
    fn test_dispatch_reaches_registered_handler() {
        let hub = KeyboardHub::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let _listener = hub.register(move |event| {
            counter.set(counter.get() + 1);
            event.key.is_delete()
        });

        assert!(hub.dispatch(KeyEvent::new(Key::Delete)));
        assert!(!hub.dispatch(KeyEvent::new(Key::Escape)));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_drop_detaches_exactly_once() {
        let hub = KeyboardHub::new();
        let first = hub.register(|_| true);
        let second = hub.register(|_| false);
        assert_eq!(hub.listener_count(), 2);
        assert_ne!(first.id(), second.id());

        drop(first);
        assert_eq!(hub.listener_count(), 1);
        assert!(!hub.dispatch(KeyEvent::new(Key::Delete)));

        drop(second);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_guard_outliving_hub_is_harmless() {
        let hub = KeyboardHub::new();
        let listener = hub.register(|_| true);
        drop(hub);
        drop(listener);
    }
}
