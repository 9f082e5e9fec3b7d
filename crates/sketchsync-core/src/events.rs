//! Scene change notifications for collaborators such as plugins.

use crate::shapes::{Element, ElementId};

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A tool, shortcut, undo or redo on this client.
    Local,
    /// A message applied from the server.
    Remote,
}

/// Read-only observer of scene changes.
///
/// All methods default to doing nothing so observers only implement what they use.
pub trait SceneObserver {
    fn on_created(&mut self, _element: &Element, _origin: Origin) {}

    fn on_updated(&mut self, _element: &Element, _origin: Origin) {}

    fn on_deleted(&mut self, _id: &ElementId, _origin: Origin) {}
}

/// Fan-out to registered observers, in registration order.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn SceneObserver>>,
}

impl EventBus {
    pub fn with_observers(observers: Vec<Box<dyn SceneObserver>>) -> Self {
        Self { observers }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SceneObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn created(&mut self, element: &Element, origin: Origin) {
        for observer in &mut self.observers {
            observer.on_created(element, origin);
        }
    }

    pub fn updated(&mut self, element: &Element, origin: Origin) {
        for observer in &mut self.observers {
            observer.on_updated(element, origin);
        }
    }

    pub fn deleted(&mut self, id: &ElementId, origin: Origin) {
        for observer in &mut self.observers {
            observer.on_deleted(id, origin);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("observers", &self.observers.len()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shapes::ElementKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Observer that records `kind:id:origin` strings into a shared log.
    pub(crate) struct Recorder(pub Rc<RefCell<Vec<String>>>);

    impl SceneObserver for Recorder {
        fn on_created(&mut self, element: &Element, origin: Origin) {
            self.0.borrow_mut().push(format!("created:{}:{origin:?}", element.id));
        }

        fn on_updated(&mut self, element: &Element, origin: Origin) {
            self.0.borrow_mut().push(format!("updated:{}:{origin:?}", element.id));
        }

        fn on_deleted(&mut self, id: &ElementId, origin: Origin) {
            self.0.borrow_mut().push(format!("deleted:{id}:{origin:?}"));
        }
    }

    #[test]
    fn test_bus_fans_out_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();
        bus.subscribe(Box::new(Recorder(log.clone())));
        bus.subscribe(Box::new(Recorder(log.clone())));

        let el = Element::with_id("a", ElementKind::Rect, 0.0, 0.0);
        bus.created(&el, Origin::Local);
        bus.deleted(&el.id, Origin::Remote);

        assert_eq!(
            *log.borrow(),
            vec!["created:a:Local", "created:a:Local", "deleted:a:Remote", "deleted:a:Remote"]
        );
    }

    #[test]
    fn test_default_methods_are_noops() {
        struct Quiet;
        impl SceneObserver for Quiet {}
        let mut bus = EventBus::with_observers(vec![Box::new(Quiet)]);
        bus.updated(&Element::with_id("a", ElementKind::Rect, 0.0, 0.0), Origin::Local);
        assert_eq!(bus.len(), 1);
    }
}
