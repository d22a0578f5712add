pub mod dispatcher;
pub mod error;
pub mod registry;

pub use dispatcher::{BroadcastDispatcher, DeliveryCounters, DispatchReport};
pub use error::BroadcastError;
pub use registry::{ConnectionRegistry, Frame, Member, Membership, Outbox};
