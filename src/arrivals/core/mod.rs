//! core — collaborators every arrival process is built on.
//!
//! - [`periods`]: the period oracle (preliminary, main and wrap-up periods).
//! - [`busyness`]: day/period busyness factors and their generators.
//! - [`scheduler`]: the narrow scheduling interface plus a reference
//!   event list.
//! - [`contact`]: contacts, factories and carry-over duplication.
//! - [`listeners`]: the ordered new-contact listener registry.

pub mod busyness;
pub mod contact;
pub mod listeners;
pub mod periods;
pub mod scheduler;

pub use self::busyness::{BusynessModel, BusynessState, DayBusyness};
pub use self::contact::{CarryOver, Contact, ContactBuilder, ContactFactory, ProcessId, SimpleContactFactory};
pub use self::listeners::{ContactListener, ListenerHandle, ListenerRegistry};
pub use self::periods::{PeriodOracle, PeriodSchedule};
pub use self::scheduler::{EventId, EventList, Scheduler};
