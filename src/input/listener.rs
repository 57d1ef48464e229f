//! Listener capability and the priority ordered listener lists.

use super::event::{InputEvent, UnicodeEvent};

use ::std::{cell::RefCell, rc::Rc};

/// A consumer of input events.
///
/// Returning `true` from a callback swallows the event: no lower priority
/// listener sees it.
pub trait InputEventListener {
    fn on_input_event(&mut self, event: &InputEvent) -> bool;

    fn on_unicode_event(&mut self, event: &UnicodeEvent) -> bool {
        let _ = event;
        false
    }

    /// Listeners with a higher priority are offered events first.
    fn priority(&self) -> i32 {
        0
    }
}

/// Shared handle to a listener. Listeners are owned by the application and
/// registered by handle; identity is pointer identity.
pub type ListenerHandle = Rc<RefCell<dyn InputEventListener>>;

/// Priority ordered set of listeners.
#[derive(Clone, Default)]
pub struct ListenerList {
    listeners: Vec<ListenerHandle>,
}

impl ::std::fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.listeners.len())
            .finish()
    }
}

impl ListenerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Adding a listener which is already present is a no-op.
    /// The list is kept sorted by descending priority, preserving insertion
    /// order among equal priorities.
    pub fn add(&mut self, listener: ListenerHandle) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        self.listeners
            .sort_by_key(|listener| ::std::cmp::Reverse(listener.borrow().priority()));
        true
    }

    pub fn remove(&mut self, listener: &ListenerHandle) -> bool {
        let len = self.listeners.len();
        self.listeners.retain(|existing| !same_listener(existing, listener));
        self.listeners.len() != len
    }

    pub fn contains(&self, listener: &ListenerHandle) -> bool {
        self.listeners
            .iter()
            .any(|existing| same_listener(existing, listener))
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Offer an event to each listener in priority order until one swallows
    /// it. Iterates over a copy of the list.
    pub fn dispatch(&self, event: &InputEvent) -> bool {
        self.snapshot()
            .iter()
            .any(|listener| listener.borrow_mut().on_input_event(event))
    }

    /// Offer text input to each listener in priority order until one swallows
    /// it.
    pub fn dispatch_unicode(&self, event: &UnicodeEvent) -> bool {
        self.snapshot()
            .iter()
            .any(|listener| listener.borrow_mut().on_unicode_event(event))
    }

    fn snapshot(&self) -> Vec<ListenerHandle> {
        self.listeners.clone()
    }
}

/// Pointer identity of two listener handles, ignoring vtables.
pub(crate) fn same_listener(a: &ListenerHandle, b: &ListenerHandle) -> bool {
    ::std::ptr::eq(
        Rc::as_ptr(a) as *const u8,
        Rc::as_ptr(b) as *const u8,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::input::keys::{DeviceKind, KeyId};

    use ::pretty_assertions::assert_eq;

    /// Listener which records what it saw into a shared log and optionally
    /// swallows everything.
    pub(crate) struct Recorder {
        pub(crate) tag: &'static str,
        pub(crate) priority: i32,
        pub(crate) swallow: bool,
        pub(crate) log: Rc<RefCell<Vec<(&'static str, InputEvent)>>>,
        pub(crate) text: String,
    }

    impl Recorder {
        pub(crate) fn handle(
            tag: &'static str,
            priority: i32,
            swallow: bool,
            log: &Rc<RefCell<Vec<(&'static str, InputEvent)>>>,
        ) -> Rc<RefCell<Recorder>> {
            Rc::new(RefCell::new(Recorder {
                tag,
                priority,
                swallow,
                log: Rc::clone(log),
                text: String::new(),
            }))
        }
    }

    impl InputEventListener for Recorder {
        fn on_input_event(&mut self, event: &InputEvent) -> bool {
            self.log.borrow_mut().push((self.tag, event.clone()));
            self.swallow
        }

        fn on_unicode_event(&mut self, event: &UnicodeEvent) -> bool {
            self.text.push(event.input_char);
            self.swallow
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    fn tags(log: &Rc<RefCell<Vec<(&'static str, InputEvent)>>>) -> Vec<&'static str> {
        log.borrow().iter().map(|(tag, _)| *tag).collect()
    }

    #[test]
    fn test_dispatch_in_priority_order() {
        let log = Rc::default();
        let mut list = ListenerList::new();
        list.add(Recorder::handle("low", 1, false, &log));
        list.add(Recorder::handle("high", 10, false, &log));
        list.add(Recorder::handle("mid", 5, false, &log));

        let swallowed = list.dispatch(&InputEvent::new(DeviceKind::Keyboard, KeyId::A));
        assert!(!swallowed);
        assert_eq!(tags(&log), ["high", "mid", "low"]);
    }

    #[test]
    fn test_swallow_stops_dispatch() {
        let log = Rc::default();
        let mut list = ListenerList::new();
        list.add(Recorder::handle("high", 10, false, &log));
        list.add(Recorder::handle("mid", 5, true, &log));
        list.add(Recorder::handle("low", 1, false, &log));

        assert!(list.dispatch(&InputEvent::new(DeviceKind::Keyboard, KeyId::A)));
        assert_eq!(tags(&log), ["high", "mid"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let log = Rc::default();
        let listener: ListenerHandle = Recorder::handle("only", 0, false, &log);
        let mut list = ListenerList::new();

        assert!(list.add(Rc::clone(&listener)));
        assert!(!list.add(Rc::clone(&listener)));
        assert_eq!(list.len(), 1);

        assert!(list.remove(&listener));
        assert!(!list.remove(&listener));
        assert!(list.is_empty());
    }

    #[test]
    fn test_equal_priorities_keep_insertion_order() {
        let log = Rc::default();
        let mut list = ListenerList::new();
        list.add(Recorder::handle("first", 3, false, &log));
        list.add(Recorder::handle("second", 3, false, &log));
        list.add(Recorder::handle("third", 3, false, &log));

        list.dispatch(&InputEvent::new(DeviceKind::Mouse, KeyId::Mouse1));
        assert_eq!(tags(&log), ["first", "second", "third"]);
    }

    #[test]
    fn test_unicode_dispatch() {
        let log = Rc::default();
        let listener = Recorder::handle("text", 0, true, &log);
        let mut list = ListenerList::new();
        list.add(listener.clone());

        assert!(list.dispatch_unicode(&UnicodeEvent::new('ö')));
        assert_eq!(listener.borrow().text, "ö");
    }
}
