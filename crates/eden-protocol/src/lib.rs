pub mod payload;
pub mod responses;
pub mod routes;

pub use payload::AlertPayload;
pub use responses::{ErrorBody, IngestAck};
