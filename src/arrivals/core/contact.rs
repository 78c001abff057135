//! Contacts, contact factories and explicit contact duplication.
//!
//! A [`Contact`] is the unit emitted by an arrival process. Its routing
//! linkage (`queue`, `agent_group`) is transient simulation state owned by
//! the downstream router; duplication through [`Contact::duplicate`] copies
//! only the fields listed in a [`CarryOver`] and never the linkage.
use std::collections::BTreeMap;

/// Identifier of the arrival process that produced a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

/// One arriving service request.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: u64,
    pub source: Option<ProcessId>,
    pub arrival_time: f64,
    pub type_id: usize,
    pub priority: f64,
    pub attributes: BTreeMap<String, f64>,
    /// Queue currently holding the contact, set by the router.
    pub queue: Option<usize>,
    /// Agent group currently serving the contact, set by the router.
    pub agent_group: Option<usize>,
}

/// Fields a duplicate inherits from its original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarryOver {
    pub source: bool,
    pub arrival_time: bool,
    pub type_id: bool,
    pub priority: bool,
    pub attributes: bool,
}

impl CarryOver {
    /// Carry every persistent field.
    pub const ALL: CarryOver =
        CarryOver { source: true, arrival_time: true, type_id: true, priority: true, attributes: true };

    /// Carry nothing; the duplicate starts from builder defaults.
    pub const NONE: CarryOver = CarryOver {
        source: false,
        arrival_time: false,
        type_id: false,
        priority: false,
        attributes: false,
    };
}

impl Contact {
    pub fn builder(id: u64) -> ContactBuilder {
        ContactBuilder::new(id)
    }

    /// New contact with id `new_id` carrying the fields selected by `carry`.
    /// Queue and agent-group linkage always start empty.
    pub fn duplicate(&self, new_id: u64, carry: CarryOver) -> Contact {
        let mut b = ContactBuilder::new(new_id);
        if carry.source {
            b.source = self.source;
        }
        if carry.arrival_time {
            b.arrival_time = self.arrival_time;
        }
        if carry.type_id {
            b.type_id = self.type_id;
        }
        if carry.priority {
            b.priority = self.priority;
        }
        if carry.attributes {
            b.attributes = self.attributes.clone();
        }
        b.build()
    }
}

/// Builder for [`Contact`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContactBuilder {
    id: u64,
    source: Option<ProcessId>,
    arrival_time: f64,
    type_id: usize,
    priority: f64,
    attributes: BTreeMap<String, f64>,
}

impl ContactBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            source: None,
            arrival_time: 0.0,
            type_id: 0,
            priority: 1.0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn source(mut self, source: ProcessId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn arrival_time(mut self, time: f64) -> Self {
        self.arrival_time = time;
        self
    }

    pub fn type_id(mut self, type_id: usize) -> Self {
        self.type_id = type_id;
        self
    }

    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Contact {
        Contact {
            id: self.id,
            source: self.source,
            arrival_time: self.arrival_time,
            type_id: self.type_id,
            priority: self.priority,
            attributes: self.attributes,
            queue: None,
            agent_group: None,
        }
    }
}

/// Creates one contact per arrival.
///
/// Errors are plain messages; the owning process wraps them into
/// [`ArrivalError::ContactInstantiation`](crate::arrivals::errors::ArrivalError::ContactInstantiation)
/// together with [`ContactFactory::name`].
pub trait ContactFactory {
    fn name(&self) -> &str;

    fn create(&mut self, source: ProcessId, time: f64) -> Result<Contact, String>;
}

/// Factory producing contacts of one type with sequential ids.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleContactFactory {
    name: String,
    type_id: usize,
    priority: f64,
    next_id: u64,
}

impl SimpleContactFactory {
    pub fn new(name: impl Into<String>, type_id: usize) -> Self {
        Self { name: name.into(), type_id, priority: 1.0, next_id: 0 }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Number of contacts created so far.
    pub fn created(&self) -> u64 {
        self.next_id
    }
}

impl ContactFactory for SimpleContactFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&mut self, source: ProcessId, time: f64) -> Result<Contact, String> {
        let id = self.next_id;
        self.next_id += 1;
        Ok(Contact::builder(id)
            .source(source)
            .arrival_time(time)
            .type_id(self.type_id)
            .priority(self.priority)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Duplication copies exactly the selected fields and never the routing
    // linkage.
    fn duplicate_respects_carry_over_and_drops_linkage() {
        // Arrange
        let mut original = Contact::builder(7)
            .source(ProcessId(3))
            .arrival_time(12.5)
            .type_id(2)
            .priority(4.0)
            .attribute("value", 9.0)
            .build();
        original.queue = Some(1);
        original.agent_group = Some(5);

        // Act
        let full = original.duplicate(8, CarryOver::ALL);
        let bare = original.duplicate(9, CarryOver { type_id: true, ..CarryOver::NONE });

        // Assert
        assert_eq!(full.id, 8);
        assert_eq!(full.source, Some(ProcessId(3)));
        assert_eq!(full.arrival_time, 12.5);
        assert_eq!(full.attributes.get("value"), Some(&9.0));
        assert_eq!(full.queue, None);
        assert_eq!(full.agent_group, None);
        assert_eq!(bare.type_id, 2);
        assert_eq!(bare.source, None);
        assert_eq!(bare.priority, 1.0);
        assert!(bare.attributes.is_empty());
    }

    #[test]
    // Purpose
    // -------
    // The simple factory tags contacts with their source and numbers them
    // sequentially.
    fn simple_factory_numbers_contacts() {
        let mut f = SimpleContactFactory::new("inbound", 1).with_priority(2.0);
        let a = f.create(ProcessId(0), 1.0).unwrap();
        let b = f.create(ProcessId(0), 2.0).unwrap();
        assert_eq!((a.id, b.id), (0, 1));
        assert_eq!(b.source, Some(ProcessId(0)));
        assert_eq!(b.priority, 2.0);
        assert_eq!(f.created(), 2);
        assert_eq!(f.name(), "inbound");
    }
}
