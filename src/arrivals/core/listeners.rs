//! New-contact listener registry.
//!
//! Listeners are notified synchronously in registration order. The registry
//! is shared (`Rc`) so that listeners may hold a handle to it; any attempt
//! to add, remove or clear listeners while a broadcast is in progress is
//! rejected with an illegal-state error instead of mutating the list under
//! iteration.
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::arrivals::{
    core::contact::Contact,
    errors::{ArrivalError, ArrivalResult},
};

/// Receives every contact emitted by a process.
pub trait ContactListener {
    fn new_contact(&mut self, contact: &Contact);
}

/// Shared handle to a listener.
pub type ListenerHandle = Rc<RefCell<dyn ContactListener>>;

/// Ordered listener list with broadcast guard.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RefCell<Vec<ListenerHandle>>,
    broadcasting: Cell<bool>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.borrow().len())
            .field("broadcasting", &self.broadcasting.get())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Append a listener.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] during a broadcast.
    pub fn add(&self, listener: ListenerHandle) -> ArrivalResult<()> {
        self.guard()?;
        self.listeners.borrow_mut().push(listener);
        Ok(())
    }

    /// Remove a listener by identity; returns whether it was registered.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] during a broadcast.
    pub fn remove(&self, listener: &ListenerHandle) -> ArrivalResult<bool> {
        self.guard()?;
        let mut list = self.listeners.borrow_mut();
        let before = list.len();
        list.retain(|l| !Rc::ptr_eq(l, listener));
        Ok(list.len() != before)
    }

    /// Remove every listener.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] during a broadcast.
    pub fn clear(&self) -> ArrivalResult<()> {
        self.guard()?;
        self.listeners.borrow_mut().clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting.get()
    }

    /// Notify every listener of `contact` in registration order.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] on a nested broadcast.
    pub fn notify(&self, contact: &Contact) -> ArrivalResult<()> {
        if self.broadcasting.replace(true) {
            return Err(ArrivalError::illegal("Nested broadcast of a new contact."));
        }
        let snapshot: Vec<ListenerHandle> = self.listeners.borrow().clone();
        for listener in &snapshot {
            listener.borrow_mut().new_contact(contact);
        }
        self.broadcasting.set(false);
        Ok(())
    }

    fn guard(&self) -> ArrivalResult<()> {
        if self.broadcasting.get() {
            return Err(ArrivalError::illegal("Listener list modified during a broadcast."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrivals::core::contact::ContactBuilder;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Registration order, removal by identity and rejection of list
    // mutation from inside a broadcast.
    // -------------------------------------------------------------------------

    struct Recorder {
        tag: usize,
        log: Rc<RefCell<Vec<(usize, u64)>>>,
    }

    impl ContactListener for Recorder {
        fn new_contact(&mut self, contact: &Contact) {
            self.log.borrow_mut().push((self.tag, contact.id));
        }
    }

    struct Meddler {
        registry: Rc<ListenerRegistry>,
        outcome: Option<ArrivalResult<()>>,
    }

    impl ContactListener for Meddler {
        fn new_contact(&mut self, _contact: &Contact) {
            let log = Rc::new(RefCell::new(Vec::new()));
            self.outcome = Some(self.registry.add(Rc::new(RefCell::new(Recorder { tag: 99, log }))));
        }
    }

    #[test]
    // Purpose
    // -------
    // Listeners are called in registration order and removal is by
    // identity.
    fn notifies_in_registration_order() {
        // Arrange
        let reg = ListenerRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first: ListenerHandle = Rc::new(RefCell::new(Recorder { tag: 1, log: log.clone() }));
        let second: ListenerHandle = Rc::new(RefCell::new(Recorder { tag: 2, log: log.clone() }));
        reg.add(first.clone()).unwrap();
        reg.add(second.clone()).unwrap();

        // Act
        reg.notify(&ContactBuilder::new(5).build()).unwrap();
        assert!(reg.remove(&first).unwrap());
        reg.notify(&ContactBuilder::new(6).build()).unwrap();

        // Assert
        assert_eq!(*log.borrow(), vec![(1, 5), (2, 5), (2, 6)]);
        assert!(!reg.remove(&first).unwrap());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    // Purpose
    // -------
    // A listener that tries to register another listener mid-broadcast is
    // refused, and the registry is usable again afterwards.
    fn mutation_during_broadcast_is_rejected() {
        // Arrange
        let reg = ListenerRegistry::new();
        let meddler = Rc::new(RefCell::new(Meddler { registry: reg.clone(), outcome: None }));
        reg.add(meddler.clone()).unwrap();

        // Act
        reg.notify(&ContactBuilder::new(1).build()).unwrap();

        // Assert
        let outcome = meddler.borrow_mut().outcome.take();
        assert!(matches!(outcome, Some(Err(ArrivalError::IllegalState { .. }))));
        assert_eq!(reg.len(), 1);
        assert!(!reg.is_broadcasting());
        assert!(reg.clear().is_ok());
    }
}
